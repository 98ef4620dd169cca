//! PageDriver - Abstract Browser Automation Trait
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  PageDriver (Abstract Trait)                                  │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────────┐   │
//! │  │  CdpDriver          │        │  MockDriver<A>          │   │
//! │  │  (feature=browser)  │        │  (unit tests)           │   │
//! │  │  chromiumoxide,     │        │  in-memory DOM rendered │   │
//! │  │  one browser        │        │  by a MockApp           │   │
//! │  │  context per page   │        │                         │   │
//! │  └─────────────────────┘        └─────────────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drivers are deliberately primitive: they resolve a [`Locator`] to the
//! current list of matches and act on one match by index. Waiting,
//! strictness and diagnostics live in [`crate::Session`].

use crate::dialog::DialogSlot;
use crate::locator::Locator;
use crate::result::HarnessResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Snapshot of one element matched by a locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lower-case tag name
    pub tag: String,
    /// Whitespace-normalised text content (or value for form controls)
    pub text: String,
    /// Whether the element is rendered and visible
    pub visible: bool,
}

impl ElementInfo {
    /// Create a new element snapshot
    #[must_use]
    pub fn new(tag: impl Into<String>, text: impl Into<String>, visible: bool) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            visible,
        }
    }
}

/// Primitive page operations every backend provides.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the load event
    async fn goto(&mut self, url: &str) -> HarnessResult<()>;

    /// Resolve a locator to all current matches, in document order
    async fn resolve(&self, locator: &Locator) -> HarnessResult<Vec<ElementInfo>>;

    /// Click the match at `index`
    async fn click(&mut self, locator: &Locator, index: usize) -> HarnessResult<()>;

    /// Replace the value of the form control at `index`
    async fn fill(&mut self, locator: &Locator, index: usize, value: &str) -> HarnessResult<()>;

    /// Current page URL
    async fn current_url(&self) -> HarnessResult<String>;

    /// Dialog registry for this page
    fn dialogs(&self) -> &DialogSlot;

    /// Close the page and release its browser context
    async fn close(&mut self) -> HarnessResult<()>;
}

/// Opens one fresh, isolated page per scenario.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a new page in its own browser context
    async fn open_page(&self) -> HarnessResult<Box<dyn PageDriver>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_info_new() {
        let info = ElementInfo::new("button", "like", true);
        assert_eq!(info.tag, "button");
        assert_eq!(info.text, "like");
        assert!(info.visible);
    }
}

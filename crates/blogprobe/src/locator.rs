//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a declarative chain of steps: select by role, test id,
//! text, label or CSS, then optionally narrow with `parent`, text filters and
//! positional picks. Locators hold no page reference; a [`crate::Session`]
//! resolves them against its driver on every poll, so they can be built once
//! and reused after the page re-renders.
//!
//! Matching rules (shared by every driver):
//!
//! - role names and text use case-insensitive substring matching after
//!   whitespace normalisation
//! - text selection keeps the deepest matching element
//! - label selection yields the labelled form control

use serde::{Deserialize, Serialize};
use std::fmt;

/// ARIA roles the harness can select by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// `<button>`, `input[type=submit|button]`, `[role=button]`
    Button,
    /// `<a href>`, `[role=link]`
    Link,
    /// text inputs and textareas
    Textbox,
    /// `<h1>`..`<h6>`
    Heading,
    /// `input[type=checkbox]`
    Checkbox,
}

impl Role {
    /// Role name as used in ARIA and in locator descriptions
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Link => "link",
            Self::Textbox => "textbox",
            Self::Heading => "heading",
            Self::Checkbox => "checkbox",
        }
    }

    /// Implicit role of an HTML tag (with its `type` attribute for inputs)
    #[must_use]
    pub fn implicit(tag: &str, input_type: Option<&str>) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "button" => Some(Self::Button),
            "a" => Some(Self::Link),
            "textarea" => Some(Self::Textbox),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(Self::Heading),
            "input" => match input_type.map(str::to_ascii_lowercase).as_deref() {
                Some("submit" | "button" | "reset") => Some(Self::Button),
                Some("checkbox") => Some(Self::Checkbox),
                None | Some("text" | "password" | "email" | "search" | "url" | "tel") => {
                    Some(Self::Textbox)
                }
                Some(_) => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single selection criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g. `.likes`, `#notification`)
    Css {
        /// Selector text
        css: String,
    },
    /// `data-testid` attribute
    TestId {
        /// Test id value
        id: String,
    },
    /// Visible text content
    Text {
        /// Text to find
        text: String,
    },
    /// Form control by its label text or `aria-label`
    Label {
        /// Label text
        text: String,
    },
    /// ARIA role with optional accessible name
    Role {
        /// Role to match
        role: Role,
        /// Accessible name to match
        name: Option<String>,
    },
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { css } => write!(f, "css={css}"),
            Self::TestId { id } => write!(f, "test-id={id}"),
            Self::Text { text } => write!(f, "text={text:?}"),
            Self::Label { text } => write!(f, "label={text:?}"),
            Self::Role { role, name: None } => write!(f, "role={role}"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role={role}[name={name:?}]"),
        }
    }
}

/// Positional pick among the current matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pick", content = "index", rename_all = "snake_case")]
pub enum Nth {
    /// First match in document order
    First,
    /// Last match in document order
    Last,
    /// Zero-based index
    Index(usize),
}

impl Nth {
    /// Apply this pick to a match count, returning the selected index
    #[must_use]
    pub const fn resolve(self, len: usize) -> Option<usize> {
        match self {
            Self::First if len > 0 => Some(0),
            Self::Last if len > 0 => Some(len - 1),
            Self::Index(i) if i < len => Some(i),
            _ => None,
        }
    }
}

/// One step of a locator chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Select descendants of the current set (the document for the first step)
    Select {
        /// Criterion
        selector: Selector,
    },
    /// Replace every element with its parent
    Parent,
    /// Keep elements whose text contains the given text
    HasText {
        /// Text filter
        text: String,
    },
    /// Keep a single element by position
    Nth {
        /// Position
        nth: Nth,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select { selector } => write!(f, "{selector}"),
            Self::Parent => f.write_str(".."),
            Self::HasText { text } => write!(f, "has-text={text:?}"),
            Self::Nth { nth: Nth::First } => f.write_str("nth=0"),
            Self::Nth { nth: Nth::Last } => f.write_str("nth=-1"),
            Self::Nth {
                nth: Nth::Index(i),
            } => write!(f, "nth={i}"),
        }
    }
}

/// A declarative description of "what to find".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    steps: Vec<Step>,
}

impl Locator {
    fn from_selector(selector: Selector) -> Self {
        Self {
            steps: vec![Step::Select { selector }],
        }
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css { css: css.into() })
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::TestId { id: id.into() })
    }

    /// Locate by text content
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text { text: text.into() })
    }

    /// Locate a form control by label
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Label { text: text.into() })
    }

    /// Locate by role and accessible name
    #[must_use]
    pub fn role(role: Role, name: impl Into<String>) -> Self {
        Self::from_selector(Selector::Role {
            role,
            name: Some(name.into()),
        })
    }

    /// Shorthand for `Locator::role(Role::Button, name)`
    #[must_use]
    pub fn button(name: impl Into<String>) -> Self {
        Self::role(Role::Button, name)
    }

    #[must_use]
    fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Scope a CSS selection inside this locator's matches
    #[must_use]
    pub fn locator(self, css: impl Into<String>) -> Self {
        self.push(Step::Select {
            selector: Selector::Css { css: css.into() },
        })
    }

    /// Scope a role selection inside this locator's matches
    #[must_use]
    pub fn get_by_role(self, role: Role, name: impl Into<String>) -> Self {
        self.push(Step::Select {
            selector: Selector::Role {
                role,
                name: Some(name.into()),
            },
        })
    }

    /// Scope a text selection inside this locator's matches
    #[must_use]
    pub fn get_by_text(self, text: impl Into<String>) -> Self {
        self.push(Step::Select {
            selector: Selector::Text { text: text.into() },
        })
    }

    /// Scope a test-id selection inside this locator's matches
    #[must_use]
    pub fn get_by_test_id(self, id: impl Into<String>) -> Self {
        self.push(Step::Select {
            selector: Selector::TestId { id: id.into() },
        })
    }

    /// Move to the parent element of each match
    #[must_use]
    pub fn parent(self) -> Self {
        self.push(Step::Parent)
    }

    /// Resolve `inner` inside this locator's matches
    #[must_use]
    pub fn within(mut self, inner: Self) -> Self {
        self.steps.extend(inner.steps);
        self
    }

    /// Keep matches whose text contains `text`
    #[must_use]
    pub fn filter_has_text(self, text: impl Into<String>) -> Self {
        self.push(Step::HasText { text: text.into() })
    }

    /// First match
    #[must_use]
    pub fn first(self) -> Self {
        self.push(Step::Nth { nth: Nth::First })
    }

    /// Last match
    #[must_use]
    pub fn last(self) -> Self {
        self.push(Step::Nth { nth: Nth::Last })
    }

    /// Match at a zero-based index
    #[must_use]
    pub fn nth(self, index: usize) -> Self {
        self.push(Step::Nth {
            nth: Nth::Index(index),
        })
    }

    /// Steps of this locator, in application order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Collapse whitespace runs to a single space and trim.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive substring match after whitespace normalisation.
#[must_use]
pub fn text_matches(haystack: &str, needle: &str) -> bool {
    normalize_whitespace(haystack)
        .to_lowercase()
        .contains(&normalize_whitespace(needle).to_lowercase())
}

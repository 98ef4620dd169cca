//! One isolated page per scenario.
//!
//! A [`Session`] wraps a [`PageDriver`] with the behaviour scenarios rely on:
//! actions auto-wait until their target is visible, refuse ambiguous locators
//! and report the last observed state when they give up. Every session has a
//! uuid that is attached to its log lines.

use crate::assertion::LocatorAssertions;
use crate::dialog::{Dialog, DialogResponse, DialogWaiter};
use crate::driver::{ElementInfo, PageDriver};
use crate::locator::{Locator, Role};
use crate::result::{HarnessError, HarnessResult};
use crate::wait::{poll_until, Check, PollPolicy};
use uuid::Uuid;

/// A browser page owned by exactly one scenario
pub struct Session {
    id: Uuid,
    driver: Box<dyn PageDriver>,
    base_url: String,
    action_policy: PollPolicy,
    expect_policy: PollPolicy,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("action_policy", &self.action_policy)
            .field("expect_policy", &self.expect_policy)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session over a freshly opened page
    #[must_use]
    pub fn new(driver: Box<dyn PageDriver>, base_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver,
            base_url: base_url.into(),
            action_policy: PollPolicy::default(),
            expect_policy: PollPolicy::default(),
        }
    }

    /// Set the polling policy used by actions
    #[must_use]
    pub const fn with_action_policy(mut self, policy: PollPolicy) -> Self {
        self.action_policy = policy;
        self
    }

    /// Set the polling policy used by assertions
    #[must_use]
    pub const fn with_expect_policy(mut self, policy: PollPolicy) -> Self {
        self.expect_policy = policy;
        self
    }

    /// Session id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Application root URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Polling policy for assertions
    #[must_use]
    pub const fn expect_policy(&self) -> &PollPolicy {
        &self.expect_policy
    }

    /// Underlying page driver
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    // -------------------------------------------------------------------------
    // Locator factories
    // -------------------------------------------------------------------------

    /// Locate by CSS selector
    #[must_use]
    pub fn locator(&self, css: &str) -> Locator {
        Locator::css(css)
    }

    /// Locate by role and accessible name
    #[must_use]
    pub fn get_by_role(&self, role: Role, name: &str) -> Locator {
        Locator::role(role, name)
    }

    /// Locate by text content
    #[must_use]
    pub fn get_by_text(&self, text: &str) -> Locator {
        Locator::text(text)
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn get_by_test_id(&self, id: &str) -> Locator {
        Locator::test_id(id)
    }

    /// Locate a form control by its label
    #[must_use]
    pub fn get_by_label(&self, text: &str) -> Locator {
        Locator::label(text)
    }

    // -------------------------------------------------------------------------
    // Navigation and actions
    // -------------------------------------------------------------------------

    /// Navigate to a path relative to the base URL (or an absolute URL)
    ///
    /// # Errors
    ///
    /// Returns a navigation error if the page cannot be loaded.
    pub async fn goto(&mut self, path: &str) -> HarnessResult<()> {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        tracing::debug!(session = %self.id, %url, "goto");
        self.driver.goto(&url).await
    }

    /// Navigate to the application root
    ///
    /// # Errors
    ///
    /// Returns a navigation error if the page cannot be loaded.
    pub async fn goto_root(&mut self) -> HarnessResult<()> {
        let url = self.base_url.clone();
        tracing::debug!(session = %self.id, %url, "goto root");
        self.driver.goto(&url).await
    }

    /// Click the single visible element matched by `locator`
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` if nothing visible matches within the action
    /// timeout and `StrictModeViolation` if several elements match.
    pub async fn click(&mut self, locator: &Locator) -> HarnessResult<()> {
        let index = self.actionable(locator).await?;
        tracing::debug!(session = %self.id, %locator, "click");
        self.driver.click(locator, index).await
    }

    /// Replace the value of the single visible form control matched by `locator`
    ///
    /// # Errors
    ///
    /// As for [`Session::click`].
    pub async fn fill(&mut self, locator: &Locator, value: &str) -> HarnessResult<()> {
        let index = self.actionable(locator).await?;
        tracing::debug!(session = %self.id, %locator, "fill");
        self.driver.fill(locator, index, value).await
    }

    /// Wait until the single element matched by `locator` is visible
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` if nothing visible matches within the action
    /// timeout and `StrictModeViolation` if several elements match.
    pub async fn wait_for(&self, locator: &Locator) -> HarnessResult<()> {
        self.actionable(locator).await?;
        tracing::debug!(session = %self.id, %locator, "visible");
        Ok(())
    }

    /// Number of current matches (no waiting)
    ///
    /// # Errors
    ///
    /// Returns a driver error if the page cannot be queried.
    pub async fn count(&self, locator: &Locator) -> HarnessResult<usize> {
        Ok(self.driver.resolve(locator).await?.len())
    }

    /// Text of every current match (no waiting)
    ///
    /// # Errors
    ///
    /// Returns a driver error if the page cannot be queried.
    pub async fn all_inner_texts(&self, locator: &Locator) -> HarnessResult<Vec<String>> {
        Ok(self
            .driver
            .resolve(locator)
            .await?
            .into_iter()
            .map(|e| e.text)
            .collect())
    }

    /// Current matches (no waiting)
    ///
    /// # Errors
    ///
    /// Returns a driver error if the page cannot be queried.
    pub async fn resolve(&self, locator: &Locator) -> HarnessResult<Vec<ElementInfo>> {
        self.driver.resolve(locator).await
    }

    /// Start an assertion on `locator`
    #[must_use]
    pub fn expect<'a>(&'a self, locator: &Locator) -> LocatorAssertions<'a> {
        LocatorAssertions::new(self, locator.clone(), self.expect_policy)
    }

    // -------------------------------------------------------------------------
    // Dialogs
    // -------------------------------------------------------------------------

    /// Arm a one-shot handler for the next native dialog.
    ///
    /// Must be called before the action that opens the dialog.
    ///
    /// # Errors
    ///
    /// Returns a dialog error if a handler is already armed.
    pub fn expect_dialog(&self, response: DialogResponse) -> HarnessResult<DialogWaiter> {
        self.driver.dialogs().arm(response)
    }

    /// Arm a dialog handler, click, then wait for the dialog it answered.
    ///
    /// # Errors
    ///
    /// Returns the click error, or a dialog error if no dialog opens within
    /// the action timeout.
    pub async fn click_expecting_dialog(
        &mut self,
        locator: &Locator,
        response: DialogResponse,
    ) -> HarnessResult<Dialog> {
        let waiter = self.expect_dialog(response)?;
        if let Err(e) = self.click(locator).await {
            self.driver.dialogs().disarm();
            return Err(e);
        }
        let dialog = match waiter.wait(self.action_policy.timeout()).await {
            Ok(dialog) => dialog,
            Err(e) => {
                self.driver.dialogs().disarm();
                return Err(e);
            }
        };
        tracing::debug!(session = %self.id, message = dialog.message(), "dialog answered");
        Ok(dialog)
    }

    /// Close the page and release its browser context
    ///
    /// # Errors
    ///
    /// Returns a browser error if the page could not be closed cleanly.
    pub async fn close(&mut self) -> HarnessResult<()> {
        tracing::debug!(session = %self.id, "close");
        self.driver.close().await
    }

    /// Wait until `locator` has exactly one visible target and return its index.
    ///
    /// Locators ending in `first`/`last`/`nth` resolve to at most one element,
    /// so they never trip the strictness check.
    async fn actionable(&self, locator: &Locator) -> HarnessResult<usize> {
        let driver = self.driver.as_ref();

        let outcome = poll_until(&self.action_policy, || async move {
            let matches = driver.resolve(locator).await?;
            if matches.len() > 1 {
                return Err(HarnessError::StrictModeViolation {
                    locator: locator.to_string(),
                    count: matches.len(),
                });
            }
            Ok(match matches.first() {
                Some(element) if element.visible => Check::Ready(0),
                Some(element) => Check::NotYet(format!("<{}> present but hidden", element.tag)),
                None => Check::NotYet("no matches".to_string()),
            })
        })
        .await?;

        outcome.map_err(|stall| HarnessError::ElementNotFound {
            locator: locator.to_string(),
            waited_ms: stall.elapsed_ms(),
            observed: stall.last_observed,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{MockApp, MockDriver, MockNode, PageEvents, StaticPage};

    #[derive(Default)]
    struct Delayed {
        ticks: u32,
        removed: bool,
    }

    impl MockApp for Delayed {
        fn render(&self) -> MockNode {
            let mut root = MockNode::new("div")
                .child(MockNode::new("button").text("reveal").key("reveal"))
                .child(MockNode::new("button").text("later").key("later").hidden(self.ticks < 2))
                .child(MockNode::new("button").text("like").key("like-a"))
                .child(MockNode::new("button").text("like").key("like-b"));
            if !self.removed {
                root = root.child(MockNode::new("button").text("remove").key("remove"));
            }
            root
        }

        fn click(&mut self, key: &str, page: &mut PageEvents<'_>) -> HarnessResult<()> {
            match key {
                "reveal" => self.ticks += 2,
                "remove" => self.removed = page.confirm("Remove it?"),
                _ => {}
            }
            Ok(())
        }

        fn fill(&mut self, _key: &str, _value: &str) -> HarnessResult<()> {
            Ok(())
        }
    }

    fn fast() -> PollPolicy {
        PollPolicy::new(60).with_interval(5).with_max_interval(10)
    }

    fn session<A: MockApp + 'static>(app: A) -> Session {
        Session::new(Box::new(MockDriver::new(app)), "http://blog.local")
            .with_action_policy(fast())
            .with_expect_policy(fast())
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_hidden_element_times_out() {
            let mut s = session(Delayed::default());
            let err = s.click(&Locator::button("later")).await.unwrap_err();
            match err {
                HarnessError::ElementNotFound { observed, .. } => {
                    assert!(observed.contains("hidden"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_click_after_reveal() {
            let mut s = session(Delayed::default());
            s.click(&Locator::button("reveal")).await.unwrap();
            s.click(&Locator::button("later")).await.unwrap();
        }

        #[tokio::test]
        async fn test_ambiguous_click_is_strict_violation() {
            let mut s = session(Delayed::default());
            let err = s.click(&Locator::button("like")).await.unwrap_err();
            assert!(matches!(
                err,
                HarnessError::StrictModeViolation { count: 2, .. }
            ));
            s.click(&Locator::button("like").last()).await.unwrap();
        }

        #[tokio::test]
        async fn test_missing_element_reports_no_matches() {
            let mut s = session(Delayed::default());
            let err = s.click(&Locator::button("nope")).await.unwrap_err();
            assert!(err.to_string().contains("no matches"));
        }

        #[tokio::test]
        async fn test_wait_for_hidden_element_is_not_found() {
            let s = session(Delayed::default());
            let err = s.wait_for(&Locator::button("later")).await.unwrap_err();
            assert!(
                matches!(err, HarnessError::ElementNotFound { .. }),
                "unexpected error: {err}"
            );
        }

        #[tokio::test]
        async fn test_wait_for_revealed_element() {
            let mut s = session(Delayed::default());
            s.click(&Locator::button("reveal")).await.unwrap();
            s.wait_for(&Locator::button("later")).await.unwrap();
        }

        #[tokio::test]
        async fn test_goto_joins_base_url() {
            let mut s = session(StaticPage::new(MockNode::new("div")));
            s.goto("/blogs").await.unwrap();
            assert_eq!(
                s.driver().current_url().await.unwrap(),
                "http://blog.local/blogs"
            );
            s.goto_root().await.unwrap();
            assert_eq!(s.driver().current_url().await.unwrap(), "http://blog.local");
        }

        #[tokio::test]
        async fn test_count_and_texts() {
            let s = session(Delayed::default());
            assert_eq!(s.count(&Locator::button("like")).await.unwrap(), 2);
            assert_eq!(
                s.all_inner_texts(&Locator::button("like")).await.unwrap(),
                vec!["like", "like"]
            );
        }
    }

    mod dialog_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_expecting_dialog_accepts() {
            let mut s = session(Delayed::default());
            let dialog = s
                .click_expecting_dialog(&Locator::button("remove"), DialogResponse::Accept)
                .await
                .unwrap();
            assert_eq!(dialog.message(), "Remove it?");
            assert_eq!(s.count(&Locator::button("remove")).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_unarmed_confirm_is_dismissed() {
            let mut s = session(Delayed::default());
            s.click(&Locator::button("remove")).await.unwrap();
            assert_eq!(s.count(&Locator::button("remove")).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_no_dialog_times_out_and_disarms() {
            let mut s = session(Delayed::default());
            let err = s
                .click_expecting_dialog(&Locator::button("reveal"), DialogResponse::Accept)
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::Dialog { .. }));
            assert!(!s.driver().dialogs().is_armed());
        }

        #[tokio::test]
        async fn test_failed_click_disarms_handler() {
            let mut s = session(Delayed::default());
            let err = s
                .click_expecting_dialog(&Locator::button("missing"), DialogResponse::Accept)
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::ElementNotFound { .. }));
            assert!(!s.driver().dialogs().is_armed());
        }
    }
}

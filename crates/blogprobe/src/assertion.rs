//! Assertion Layer
//!
//! `session.expect(&locator)` returns a [`LocatorAssertions`]. Every assertion
//! re-resolves the locator under the session's poll policy until the
//! condition holds or the timeout elapses, then fails with
//! [`HarnessError::AssertionTimeout`] carrying the last observed state.
//!
//! ```ignore
//! session.expect(&Locator::css(".likes")).to_contain_text("1").await?;
//! session.expect(&Locator::css(".detail")).to_have_count(3).await?;
//! session.expect(&Locator::css(".likes")).to_be_sorted_descending().await?;
//! ```

use crate::driver::ElementInfo;
use crate::locator::{normalize_whitespace, text_matches, Locator};
use crate::result::{HarnessError, HarnessResult};
use crate::session::Session;
use crate::wait::{poll_until, Check, PollPolicy};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

// =============================================================================
// PURE CHECKS
// =============================================================================

#[allow(clippy::expect_used)]
fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+").expect("static regex is valid"))
}

/// First integer appearing in `text`, if any
#[must_use]
pub fn first_integer(text: &str) -> Option<i64> {
    integer_pattern()
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Check that every adjacent pair is non-increasing.
///
/// # Errors
///
/// Describes the first pair that is out of order.
pub fn check_descending(values: &[i64]) -> Result<(), String> {
    for (i, pair) in values.windows(2).enumerate() {
        if pair[0] < pair[1] {
            return Err(format!(
                "value at position {i} ({}) is less than value at position {} ({})",
                pair[0],
                i + 1,
                pair[1]
            ));
        }
    }
    Ok(())
}

/// Check that the first value is greater than or equal to every other value.
///
/// # Errors
///
/// Describes the first value that exceeds the leading one.
pub fn check_leading_maximum(values: &[i64]) -> Result<(), String> {
    let Some((&lead, rest)) = values.split_first() else {
        return Ok(());
    };
    match rest.iter().position(|&v| v > lead) {
        Some(i) => Err(format!(
            "value at position {} ({}) exceeds the leading value ({lead})",
            i + 1,
            rest[i]
        )),
        None => Ok(()),
    }
}

fn describe(elements: &[ElementInfo]) -> String {
    if elements.is_empty() {
        return "no matches".to_string();
    }
    let shown: Vec<String> = elements
        .iter()
        .take(5)
        .map(|e| {
            let state = if e.visible { "" } else { " (hidden)" };
            format!("{:?}{state}", e.text)
        })
        .collect();
    let more = if elements.len() > 5 { ", ..." } else { "" };
    format!("{} match(es): [{}{more}]", elements.len(), shown.join(", "))
}

fn integers(elements: &[ElementInfo]) -> Result<Vec<i64>, String> {
    elements
        .iter()
        .map(|e| first_integer(&e.text).ok_or_else(|| format!("no number in {:?}", e.text)))
        .collect()
}

// =============================================================================
// LOCATOR ASSERTIONS
// =============================================================================

/// Polling assertions bound to one locator
#[derive(Debug)]
pub struct LocatorAssertions<'a> {
    session: &'a Session,
    locator: Locator,
    policy: PollPolicy,
}

impl<'a> LocatorAssertions<'a> {
    pub(crate) const fn new(session: &'a Session, locator: Locator, policy: PollPolicy) -> Self {
        Self {
            session,
            locator,
            policy,
        }
    }

    /// Override the expect timeout for this assertion
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Poll until `judge` accepts the current matches.
    async fn satisfy<F>(&self, expected: String, judge: F) -> HarnessResult<()>
    where
        F: Fn(&[ElementInfo]) -> HarnessResult<Result<(), String>>,
    {
        let session = self.session;
        let locator = &self.locator;
        let judge = &judge;

        let outcome = poll_until(&self.policy, || async move {
            let elements = session.resolve(locator).await?;
            Ok(match judge(&elements)? {
                Ok(()) => Check::Ready(()),
                Err(why) if why.is_empty() => Check::NotYet(describe(&elements)),
                Err(why) => Check::NotYet(format!("{why}; {}", describe(&elements))),
            })
        })
        .await?;

        match outcome {
            Ok(()) => {
                tracing::trace!(locator = %self.locator, %expected, "assertion passed");
                Ok(())
            }
            Err(stall) => Err(HarnessError::AssertionTimeout {
                locator: self.locator.to_string(),
                expected,
                observed: stall.last_observed.clone(),
                waited_ms: stall.elapsed_ms(),
            }),
        }
    }

    fn single<'e>(
        &self,
        elements: &'e [ElementInfo],
    ) -> HarnessResult<Option<&'e ElementInfo>> {
        if elements.len() > 1 {
            return Err(HarnessError::StrictModeViolation {
                locator: self.locator.to_string(),
                count: elements.len(),
            });
        }
        Ok(elements.first())
    }

    /// The single match is visible
    ///
    /// # Errors
    ///
    /// `AssertionTimeout` if it never becomes visible, `StrictModeViolation`
    /// if the locator matches several elements.
    pub async fn to_be_visible(&self) -> HarnessResult<()> {
        self.satisfy("to be visible".to_string(), |els| {
            Ok(match self.single(els)? {
                Some(e) if e.visible => Ok(()),
                _ => Err(String::new()),
            })
        })
        .await
    }

    /// Nothing matched is visible (or nothing matches)
    ///
    /// # Errors
    ///
    /// `AssertionTimeout` if a visible match remains.
    pub async fn to_be_hidden(&self) -> HarnessResult<()> {
        self.satisfy("to be hidden".to_string(), |els| {
            Ok(if els.iter().any(|e| e.visible) {
                Err(String::new())
            } else {
                Ok(())
            })
        })
        .await
    }

    /// The single match's text contains `text` (case-insensitive)
    ///
    /// # Errors
    ///
    /// `AssertionTimeout` if the text never appears.
    pub async fn to_contain_text(&self, text: &str) -> HarnessResult<()> {
        self.satisfy(format!("to contain text {text:?}"), |els| {
            Ok(match self.single(els)? {
                Some(e) if text_matches(&e.text, text) => Ok(()),
                _ => Err(String::new()),
            })
        })
        .await
    }

    /// The single match's text equals `text` after whitespace normalisation
    ///
    /// # Errors
    ///
    /// `AssertionTimeout` if the text never matches.
    pub async fn to_have_text(&self, text: &str) -> HarnessResult<()> {
        let wanted = normalize_whitespace(text);
        self.satisfy(format!("to have text {wanted:?}"), |els| {
            Ok(match self.single(els)? {
                Some(e) if normalize_whitespace(&e.text) == wanted => Ok(()),
                _ => Err(String::new()),
            })
        })
        .await
    }

    /// Exactly `count` elements match
    ///
    /// # Errors
    ///
    /// `AssertionTimeout` if the count never settles on `count`.
    pub async fn to_have_count(&self, count: usize) -> HarnessResult<()> {
        self.satisfy(format!("to have count {count}"), |els| {
            Ok(if els.len() == count {
                Ok(())
            } else {
                Err(String::new())
            })
        })
        .await
    }

    /// At least `count` elements match
    ///
    /// # Errors
    ///
    /// `AssertionTimeout` if fewer elements keep matching.
    pub async fn to_have_count_at_least(&self, count: usize) -> HarnessResult<()> {
        self.satisfy(format!("to have count >= {count}"), |els| {
            Ok(if els.len() >= count {
                Ok(())
            } else {
                Err(String::new())
            })
        })
        .await
    }

    /// The numbers in the matches' texts are non-increasing, pair by pair
    ///
    /// # Errors
    ///
    /// `AssertionTimeout` describing the first pair out of order.
    pub async fn to_be_sorted_descending(&self) -> HarnessResult<()> {
        self.satisfy("to be sorted descending".to_string(), |els| {
            Ok(integers(els).and_then(|values| check_descending(&values)))
        })
        .await
    }

    /// The first match's number is at least every other match's number
    ///
    /// # Errors
    ///
    /// `AssertionTimeout` naming the value that exceeds the leading one.
    pub async fn to_have_leading_maximum(&self) -> HarnessResult<()> {
        self.satisfy("to have the leading maximum".to_string(), |els| {
            Ok(integers(els).and_then(|values| check_leading_maximum(&values)))
        })
        .await
    }
}

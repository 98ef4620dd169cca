//! Dialog Handling
//!
//! Native dialogs (`alert`, `confirm`, `prompt`) arrive asynchronously after
//! the action that triggered them. The harness models the answer as a one-shot
//! handler that must be armed *before* the trigger: [`DialogSlot::arm`]
//! returns a [`DialogWaiter`] the scenario awaits after clicking. A dialog that
//! opens while nothing is armed is dismissed automatically, so an unexpected
//! dialog can never block the page.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Type of browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogType {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
    /// Before unload dialog (Leave/Stay buttons)
    BeforeUnload,
}

impl std::fmt::Display for DialogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
            Self::BeforeUnload => write!(f, "beforeunload"),
        }
    }
}

/// How an armed handler answers the next dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogResponse {
    /// Accept (OK/Yes/Leave)
    Accept,
    /// Accept with input text (for prompts)
    AcceptWith(String),
    /// Dismiss (Cancel/No/Stay)
    Dismiss,
}

/// Action taken on a dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogAction {
    /// Accepted by an armed handler
    Accepted,
    /// Accepted with prompt text by an armed handler
    AcceptedWith(String),
    /// Dismissed by an armed handler
    Dismissed,
    /// Dismissed because no handler was armed
    AutoDismissed,
}

/// Represents a browser dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    dialog_type: DialogType,
    message: String,
    default_value: Option<String>,
    action: DialogAction,
}

impl Dialog {
    /// Get dialog type
    #[must_use]
    pub fn dialog_type(&self) -> DialogType {
        self.dialog_type
    }

    /// Get dialog message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get default value (for prompts)
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Get action taken
    #[must_use]
    pub fn action(&self) -> &DialogAction {
        &self.action
    }

    /// Whether the page saw the dialog accepted
    #[must_use]
    pub fn was_accepted(&self) -> bool {
        matches!(
            self.action,
            DialogAction::Accepted | DialogAction::AcceptedWith(_)
        )
    }
}

struct Armed {
    response: DialogResponse,
    tx: oneshot::Sender<Dialog>,
}

#[derive(Default)]
struct SlotState {
    armed: Option<Armed>,
    history: Vec<Dialog>,
}

/// Per-page registry holding at most one armed handler plus dialog history.
///
/// Drivers call [`DialogSlot::answer`] when the page opens a dialog and use the
/// returned [`Dialog`] to tell the page how it was answered.
#[derive(Clone, Default)]
pub struct DialogSlot {
    state: Arc<Mutex<SlotState>>,
}

impl DialogSlot {
    /// Create an empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot handler for the next dialog.
    ///
    /// # Errors
    ///
    /// Returns a dialog error if a handler is already armed.
    pub fn arm(&self, response: DialogResponse) -> HarnessResult<DialogWaiter> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| HarnessError::dialog("dialog slot poisoned"))?;
        if state.armed.is_some() {
            return Err(HarnessError::dialog(
                "a dialog handler is already armed on this page",
            ));
        }
        let (tx, rx) = oneshot::channel();
        state.armed = Some(Armed { response, tx });
        Ok(DialogWaiter { rx })
    }

    /// Answer a dialog the page just opened.
    ///
    /// Consumes the armed handler if there is one, otherwise auto-dismisses.
    pub fn answer(
        &self,
        dialog_type: DialogType,
        message: impl Into<String>,
        default_value: Option<String>,
    ) -> Dialog {
        let mut dialog = Dialog {
            dialog_type,
            message: message.into(),
            default_value,
            action: DialogAction::AutoDismissed,
        };

        let Ok(mut state) = self.state.lock() else {
            return dialog;
        };

        if let Some(armed) = state.armed.take() {
            dialog.action = match armed.response {
                DialogResponse::Accept => DialogAction::Accepted,
                DialogResponse::AcceptWith(text) => DialogAction::AcceptedWith(text),
                DialogResponse::Dismiss => DialogAction::Dismissed,
            };
            let _ = armed.tx.send(dialog.clone());
        } else {
            tracing::warn!(message = %dialog.message, kind = %dialog.dialog_type, "dialog opened with no handler armed; dismissing");
        }

        state.history.push(dialog.clone());
        dialog
    }

    /// Whether a handler is currently armed
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.lock().map(|s| s.armed.is_some()).unwrap_or(false)
    }

    /// Drop the armed handler, if any
    pub fn disarm(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.armed = None;
        }
    }

    /// All dialogs seen on this page
    #[must_use]
    pub fn history(&self) -> Vec<Dialog> {
        self.state
            .lock()
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for DialogSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogSlot")
            .field("armed", &self.is_armed())
            .field("dialog_count", &self.history().len())
            .finish()
    }
}

/// Receives the dialog answered by an armed handler
#[derive(Debug)]
pub struct DialogWaiter {
    rx: oneshot::Receiver<Dialog>,
}

impl DialogWaiter {
    /// Wait until the armed handler has answered a dialog.
    ///
    /// # Errors
    ///
    /// Returns a dialog error if no dialog opens within `timeout` or the
    /// handler was dropped (page closed or handler disarmed).
    pub async fn wait(self, timeout: Duration) -> HarnessResult<Dialog> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(dialog)) => Ok(dialog),
            Ok(Err(_)) => Err(HarnessError::dialog(
                "dialog handler dropped before a dialog opened",
            )),
            Err(_) => Err(HarnessError::dialog(format!(
                "no dialog opened within {}ms",
                timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_type_display() {
        assert_eq!(DialogType::Confirm.to_string(), "confirm");
        assert_eq!(DialogType::BeforeUnload.to_string(), "beforeunload");
    }

    #[tokio::test]
    async fn test_armed_handler_receives_dialog() {
        let slot = DialogSlot::new();
        let waiter = slot.arm(DialogResponse::Accept).unwrap();
        assert!(slot.is_armed());

        let answered = slot.answer(DialogType::Confirm, "Remove blog a by b", None);
        assert!(answered.was_accepted());
        assert!(!slot.is_armed());

        let seen = waiter.wait(Duration::from_millis(100)).await.unwrap();
        assert_eq!(seen.message(), "Remove blog a by b");
        assert_eq!(seen.dialog_type(), DialogType::Confirm);
    }

    #[test]
    fn test_unarmed_dialog_is_auto_dismissed() {
        let slot = DialogSlot::new();
        let answered = slot.answer(DialogType::Confirm, "sure?", None);
        assert_eq!(answered.action(), &DialogAction::AutoDismissed);
        assert!(!answered.was_accepted());
        assert_eq!(slot.history().len(), 1);
    }

    #[test]
    fn test_handler_is_one_shot() {
        let slot = DialogSlot::new();
        let _waiter = slot.arm(DialogResponse::Dismiss).unwrap();
        assert_eq!(
            slot.answer(DialogType::Confirm, "first", None).action(),
            &DialogAction::Dismissed
        );
        assert_eq!(
            slot.answer(DialogType::Confirm, "second", None).action(),
            &DialogAction::AutoDismissed
        );
    }

    #[test]
    fn test_double_arm_rejected() {
        let slot = DialogSlot::new();
        let _waiter = slot.arm(DialogResponse::Accept).unwrap();
        assert!(matches!(
            slot.arm(DialogResponse::Accept),
            Err(HarnessError::Dialog { .. })
        ));
    }

    #[test]
    fn test_prompt_answer() {
        let slot = DialogSlot::new();
        let _waiter = slot.arm(DialogResponse::AcceptWith("42".into())).unwrap();
        let d = slot.answer(DialogType::Prompt, "age?", Some("0".into()));
        assert_eq!(d.action(), &DialogAction::AcceptedWith("42".into()));
        assert_eq!(d.default_value(), Some("0"));
    }

    #[tokio::test]
    async fn test_waiter_times_out() {
        let slot = DialogSlot::new();
        let waiter = slot.arm(DialogResponse::Accept).unwrap();
        let err = waiter.wait(Duration::from_millis(10)).await.unwrap_err();
        assert!(err.to_string().contains("no dialog opened"));
    }

    #[tokio::test]
    async fn test_disarm_drops_waiter() {
        let slot = DialogSlot::new();
        let waiter = slot.arm(DialogResponse::Accept).unwrap();
        slot.disarm();
        let err = waiter.wait(Duration::from_millis(100)).await.unwrap_err();
        assert!(err.to_string().contains("dropped"));
    }
}

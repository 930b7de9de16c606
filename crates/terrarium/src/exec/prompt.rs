//! Suspended interactive prompts.
//!
//! Some commands cannot finish without asking the user something: a
//! password at login, a new password, a confirmation before a
//! destructive load. Instead of calling back into the host, the
//! executor suspends with an explicit request and a typed pending
//! action; the host answers through `respond`, which resumes exactly
//! that action. At most one prompt is outstanding at a time.

/// What the host should ask the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Question to display, e.g. `password for alice:`.
    pub message: String,
    /// When false the host should hide the typed answer.
    pub echo: bool,
}

impl PromptRequest {
    pub fn visible(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            echo: true,
        }
    }

    pub fn hidden(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            echo: false,
        }
    }
}

/// What a pending prompt resolves into once answered.
#[derive(Debug, Clone)]
pub(crate) enum PendingAction {
    /// Check the answer against `user`'s stored hash, then switch.
    LoginPassword { user: String },
    /// Hash the answer and store it as `user`'s password.
    NewPassword { user: String },
    /// On an affirmative answer, restore the current user's manual
    /// snapshot (including the tree).
    ConfirmLoad,
}

/// A prompt waiting for its answer.
#[derive(Debug, Clone)]
pub(crate) struct PendingPrompt {
    pub request: PromptRequest,
    pub action: PendingAction,
}

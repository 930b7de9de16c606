//! Execution result types.

/// Presentation hint attached to an outcome. Hosts may ignore it;
/// nothing semantic rides on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayStyle {
    #[default]
    Plain,
    /// Informational, e.g. login greetings and job acknowledgments.
    Notice,
    /// Failure text.
    Error,
    /// The display (and the screen log) should be wiped.
    Clear,
}

/// Result of running one submitted line. Success is a boolean plus
/// human-readable text; there is no numeric exit code.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub ok: bool,
    pub output: String,
    pub style: DisplayStyle,
}

impl ExecOutcome {
    /// Successful outcome with plain output.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            ok: true,
            output: output.into(),
            style: DisplayStyle::Plain,
        }
    }

    /// Successful outcome styled as a notice.
    pub fn notice(output: impl Into<String>) -> Self {
        Self {
            ok: true,
            output: output.into(),
            style: DisplayStyle::Notice,
        }
    }

    /// Failed outcome carrying its one-line message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            output: message.into(),
            style: DisplayStyle::Error,
        }
    }

    /// Successful outcome asking the host to clear its display.
    pub fn cleared() -> Self {
        Self {
            ok: true,
            output: String::new(),
            style: DisplayStyle::Clear,
        }
    }

    pub fn is_success(&self) -> bool {
        self.ok
    }
}

use std::fmt;

/// Lifecycle of the session controller.
///
/// `Catalog → Loading → (ResumePrompt) → Active ⇄ Paused → (ConfirmSubmit)
/// → Submitting → Results`, with load failures falling back to `Catalog`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    #[default]
    Catalog,
    Loading,
    /// A stored snapshot exists; waiting for resume or discard.
    ResumePrompt,
    Active,
    Paused,
    /// Unanswered questions remain; waiting for the user to confirm.
    ConfirmSubmit,
    Submitting,
    Results,
}

impl SessionPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Catalog => "catalog",
            SessionPhase::Loading => "loading",
            SessionPhase::ResumePrompt => "resume-prompt",
            SessionPhase::Active => "active",
            SessionPhase::Paused => "paused",
            SessionPhase::ConfirmSubmit => "confirm-submit",
            SessionPhase::Submitting => "submitting",
            SessionPhase::Results => "results",
        }
    }

    /// Phases in which a live `SessionState` is held and the clock may run.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(
            self,
            SessionPhase::Active | SessionPhase::Paused | SessionPhase::ConfirmSubmit
        )
    }

    /// Phases in which a countdown tick is applied.
    #[must_use]
    pub fn accepts_ticks(self) -> bool {
        matches!(self, SessionPhase::Active | SessionPhase::ConfirmSubmit)
    }

    #[must_use]
    pub fn is_submitted(self) -> bool {
        matches!(self, SessionPhase::Submitting | SessionPhase::Results)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_only_apply_while_clock_runs() {
        assert!(SessionPhase::Active.accepts_ticks());
        assert!(SessionPhase::ConfirmSubmit.accepts_ticks());
        assert!(!SessionPhase::Paused.accepts_ticks());
        assert!(!SessionPhase::Results.accepts_ticks());
    }

    #[test]
    fn display_is_kebab_case() {
        assert_eq!(SessionPhase::ResumePrompt.to_string(), "resume-prompt");
        assert_eq!(SessionPhase::default(), SessionPhase::Catalog);
    }
}

/// Phases of a single fetch session.
///
/// Sessions move through these states in order:
/// Idle → Sent → Connected → Streaming → Completed
///
/// `Failed` can be entered from any non-terminal state. `Completed` and
/// `Failed` are terminal; a session reaches exactly one of them, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created, nothing written yet.
    #[default]
    Idle,

    /// Request written and body flushed.
    Sent,

    /// Response head received, charset resolved and pipeline attached.
    Connected,

    /// At least one body chunk appended to the buffer.
    Streaming,

    /// End of stream reached, full text delivered.
    Completed,

    /// A stream error ended the session; no partial text is delivered.
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool { matches!(self, SessionState::Completed | SessionState::Failed) }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Sent => write!(f, "Sent"),
            SessionState::Connected => write!(f, "Connected"),
            SessionState::Streaming => write!(f, "Streaming"),
            SessionState::Completed => write!(f, "Completed"),
            SessionState::Failed => write!(f, "Failed"),
        }
    }
}

//! Per-send bookkeeping: lifecycle state and the shared retry counter.

/// Lifecycle of one logical send.
///
/// ```text
/// Idle -> Connecting -> Streaming -> Completed
///            ^  |          |
///            +--+----------+   (retry, bounded)
/// Connecting | Streaming -> Failed | Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// Result of reporting a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again; `attempt` is the 1-based retry number.
    Retry { attempt: u32 },
    /// No retries left; the session is now `Failed`.
    Exhausted,
    /// The session had already ended.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct StreamSession {
    state: SessionState,
    retries_used: u32,
    max_retries: u32,
    opened: bool,
}

impl StreamSession {
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: SessionState::Idle,
            retries_used: 0,
            max_retries,
            opened: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn retries_used(&self) -> u32 {
        self.retries_used
    }

    /// Connection attempts made or in flight.
    pub fn attempts(&self) -> u32 {
        self.retries_used + 1
    }

    /// Whether any attempt has connected, i.e. the assistant placeholder exists.
    pub fn opened(&self) -> bool {
        self.opened
    }

    /// `Idle -> Connecting`.
    pub fn begin(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Connecting;
        }
    }

    /// `Connecting -> Streaming`. Returns true on the first connection of the
    /// session only.
    pub fn connected(&mut self) -> bool {
        if self.state != SessionState::Connecting {
            return false;
        }
        self.state = SessionState::Streaming;
        let first = !self.opened;
        self.opened = true;
        first
    }

    /// A retryable attempt failure while connecting or streaming.
    pub fn attempt_failed(&mut self) -> RetryDecision {
        if !matches!(
            self.state,
            SessionState::Connecting | SessionState::Streaming
        ) {
            return RetryDecision::Ignored;
        }
        if self.retries_used < self.max_retries {
            self.retries_used += 1;
            self.state = SessionState::Connecting;
            RetryDecision::Retry {
                attempt: self.retries_used,
            }
        } else {
            self.state = SessionState::Failed;
            RetryDecision::Exhausted
        }
    }

    /// Fail without retrying. Returns false if already terminal.
    pub fn fail(&mut self) -> bool {
        self.finish(SessionState::Failed)
    }

    /// `Streaming -> Completed` on clean end of stream.
    pub fn complete(&mut self) -> bool {
        if self.state != SessionState::Streaming {
            return false;
        }
        self.state = SessionState::Completed;
        true
    }

    /// Cancel the session. Idempotent: returns false, and changes nothing,
    /// when the session already ended.
    pub fn cancel(&mut self) -> bool {
        self.finish(SessionState::Cancelled)
    }

    fn finish(&mut self, terminal: SessionState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = terminal;
        true
    }
}

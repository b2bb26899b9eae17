//! Cancellation support for review sessions
//!
//! Allows interrupting an in-flight stream read.

use tokio_util::sync::CancellationToken;

/// Wrapper around CancellationToken for session cancellation
#[derive(Clone, Debug)]
pub struct SessionCancellation {
    token: CancellationToken,
}

impl SessionCancellation {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Cancel the read loop using this token
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token handed to the read loop
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Create a fresh token (for starting a new session)
    pub fn reset(&mut self) {
        self.token = CancellationToken::new();
    }
}

impl Default for SessionCancellation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_issues_fresh_token() {
        let mut cancellation = SessionCancellation::new();
        let old = cancellation.token();
        cancellation.cancel();
        assert!(old.is_cancelled());

        cancellation.reset();
        assert!(!cancellation.token().is_cancelled());
    }
}

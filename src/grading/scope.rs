use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Why a scope stopped admitting work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Deadline,
    Cancelled,
}

/// A cancellation token paired with an optional absolute deadline.
///
/// Scopes only ever narrow: `bounded` keeps the earlier of the existing
/// deadline and the new one, so the tighter limit always wins.
#[derive(Debug, Clone)]
pub struct Scope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Scope {
    /// A scope without deadline, cancelled through `token`
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Derives a scope that additionally ends `budget` from now
    pub fn bounded(&self, budget: Duration) -> Self {
        let candidate = Instant::now() + budget;
        let deadline = match self.deadline {
            Some(current) => current.min(candidate),
            None => candidate,
        };
        Self {
            token: self.token.clone(),
            deadline: Some(deadline),
        }
    }

    /// Returns the reason if the scope is already over, without waiting
    pub fn check(&self) -> Option<Expiry> {
        if self.token.is_cancelled() {
            Some(Expiry::Cancelled)
        } else if self.deadline.is_some_and(|d| d <= Instant::now()) {
            Some(Expiry::Deadline)
        } else {
            None
        }
    }

    /// Resolves once the deadline passes or the token is cancelled
    pub async fn expired(&self) -> Expiry {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => Expiry::Cancelled,
                _ = sleep_until(deadline) => Expiry::Deadline,
            },
            None => {
                self.token.cancelled().await;
                Expiry::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tighter_deadline_wins() {
        let root = Scope::new(CancellationToken::new());
        assert_eq!(root.deadline(), None);

        let session = root.bounded(Duration::from_millis(100));
        let case = session.bounded(Duration::from_secs(10));
        assert_eq!(case.deadline(), session.deadline());

        let tight = session.bounded(Duration::from_millis(10));
        assert!(tight.deadline() < session.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_on_deadline() {
        let scope = Scope::new(CancellationToken::new()).bounded(Duration::from_millis(50));
        assert_eq!(scope.check(), None);
        assert_eq!(scope.expired().await, Expiry::Deadline);
        assert_eq!(scope.check(), Some(Expiry::Deadline));
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_derived_scopes() {
        let token = CancellationToken::new();
        let scope = Scope::new(token.clone()).bounded(Duration::from_secs(60));
        token.cancel();
        assert_eq!(scope.check(), Some(Expiry::Cancelled));
        assert_eq!(scope.expired().await, Expiry::Cancelled);
    }
}

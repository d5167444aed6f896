//! Collision-free external identifiers for posts and groups.
//!
//! Two flavours: `generate` asks a `UniquenessOracle` before handing a
//! candidate out, `insert_with_unique_id` lets the insert itself detect a
//! collision through the unique constraint. Both retry under a bounded
//! `RetryPolicy`.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::repository::UniquenessOracle;

#[derive(Debug, Error)]
pub enum UidError {
    #[error("no free unique id after {0} attempts")]
    Exhausted(u32),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Duration::from_millis(100),
        }
    }
}

fn candidate() -> String {
    Uuid::new_v4().to_string()
}

/// Draw random ids until the oracle reports one as unused
///
/// Advisory only: a concurrent insert can still take the id between the check
/// and the write, so create paths go through `insert_with_unique_id`. This is
/// the entry point for callers that need an id before they can insert, and the
/// one the repositories' `UniquenessOracle` impls serve.
pub async fn generate<O>(oracle: &O, policy: &RetryPolicy) -> Result<String, UidError>
where
    O: UniquenessOracle + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        let uid = candidate();
        if !oracle.unique_id_exists(&uid).await? {
            return Ok(uid);
        }

        tracing::warn!(attempt, uid = %uid, "unique id already taken, retrying");
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    Err(UidError::Exhausted(policy.max_attempts))
}

/// Run `insert` with fresh ids until it stops failing on the unique constraint
pub async fn insert_with_unique_id<T, F, Fut>(policy: &RetryPolicy, mut insert: F) -> Result<T, UidError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, DatabaseError>>,
{
    for attempt in 1..=policy.max_attempts {
        match insert(candidate()).await {
            Ok(row) => return Ok(row),
            Err(DatabaseError::UniqueViolation(constraint)) => {
                tracing::warn!(attempt, constraint = %constraint, "unique id collided on insert, retrying");
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(UidError::Exhausted(policy.max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const NO_BACKOFF: RetryPolicy = RetryPolicy {
        max_attempts: 10,
        backoff: Duration::ZERO,
    };

    /// Reports the first `taken` candidates as already used and remembers every one it saw
    struct CollidingOracle {
        taken: usize,
        seen: Mutex<Vec<String>>,
    }

    impl CollidingOracle {
        fn new(taken: usize) -> Self {
            Self {
                taken,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UniquenessOracle for CollidingOracle {
        async fn unique_id_exists(&self, unique_id: &str) -> Result<bool, DatabaseError> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(unique_id.to_string());
            Ok(seen.len() <= self.taken)
        }
    }

    struct BrokenOracle;

    #[async_trait]
    impl UniquenessOracle for BrokenOracle {
        async fn unique_id_exists(&self, _unique_id: &str) -> Result<bool, DatabaseError> {
            Err(DatabaseError::Config("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn free_first_draw_is_returned() {
        let oracle = CollidingOracle::new(0);
        let uid = generate(&oracle, &NO_BACKOFF).await.unwrap();

        assert!(Uuid::parse_str(&uid).is_ok());
        assert_eq!(oracle.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retries_past_taken_draws_and_never_returns_one() {
        let oracle = CollidingOracle::new(3);
        let uid = generate(&oracle, &NO_BACKOFF).await.unwrap();

        let seen = oracle.seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(!seen[..3].contains(&uid));
        assert_eq!(seen[3], uid);
    }

    #[tokio::test]
    async fn every_draw_taken_is_exhausted() {
        let oracle = CollidingOracle::new(usize::MAX);
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff: Duration::ZERO,
        };

        let err = generate(&oracle, &policy).await.unwrap_err();
        assert!(matches!(err, UidError::Exhausted(4)));
        assert_eq!(oracle.seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn oracle_failure_propagates() {
        let err = generate(&BrokenOracle, &NO_BACKOFF).await.unwrap_err();
        assert!(matches!(err, UidError::Database(DatabaseError::Config(_))));
    }

    #[tokio::test]
    async fn insert_retries_on_unique_violation_only() {
        let mut calls = 0;
        let uid = insert_with_unique_id(&NO_BACKOFF, |uid| {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(DatabaseError::UniqueViolation("posts_unique_id_key".to_string()))
                } else {
                    Ok(uid)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert!(Uuid::parse_str(&uid).is_ok());
    }

    #[tokio::test]
    async fn insert_does_not_retry_other_failures() {
        let mut calls = 0;
        let result: Result<(), UidError> = insert_with_unique_id(&NO_BACKOFF, |_| {
            calls += 1;
            async { Err(DatabaseError::NotFound("user".to_string())) }
        })
        .await;

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(UidError::Database(DatabaseError::NotFound(_)))));
    }
}

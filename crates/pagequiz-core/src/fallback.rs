//! Ordered fallback over candidates.
//!
//! Tries candidates one at a time, strictly sequentially. Each failure is
//! classified: retryable failures advance to the next candidate, fatal ones
//! stop the chain.

use std::future::Future;

/// What a failure means for the rest of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Move on to the next candidate.
    Retryable,
    /// Stop trying candidates.
    Fatal,
}

/// A candidate that failed, with its error and classification.
#[derive(Debug)]
pub struct Failure<C, E> {
    pub candidate: C,
    pub error: E,
    pub disposition: Disposition,
}

/// The first candidate that succeeded.
#[derive(Debug)]
pub struct Success<C, T, E> {
    pub candidate: C,
    pub value: T,
    /// Failures of the candidates tried before this one.
    pub failures: Vec<Failure<C, E>>,
}

/// Try `candidates` in order until one succeeds.
///
/// Returns the winner, or every failure if the chain was exhausted or a
/// fatal failure stopped it.
pub async fn try_in_order<C, T, E, I, F, Fut, K>(
    candidates: I,
    mut attempt: F,
    classify: K,
) -> Result<Success<C, T, E>, Vec<Failure<C, E>>>
where
    I: IntoIterator<Item = C>,
    F: FnMut(&C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    K: Fn(&E) -> Disposition,
{
    let mut failures = Vec::new();

    for candidate in candidates {
        match attempt(&candidate).await {
            Ok(value) => {
                return Ok(Success {
                    candidate,
                    value,
                    failures,
                })
            }
            Err(error) => {
                let disposition = classify(&error);
                failures.push(Failure {
                    candidate,
                    error,
                    disposition,
                });
                if disposition == Disposition::Fatal {
                    break;
                }
            }
        }
    }

    Err(failures)
}

//! Latency measurement around single storage operations.

use std::fmt;
use std::future::Future;
use std::time::Instant;

use serde::Serialize;

/// The kind of operation being timed, used to label error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Write,
    Read,
    Stat,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Write => "Write",
            Operation::Read => "Read",
            Operation::Stat => "Stat",
        })
    }
}

/// Outcome of one timed attempt.
///
/// On the wire this is either a number of milliseconds or an error message.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TimingResult {
    /// Elapsed time in milliseconds.
    Elapsed(f64),
    /// A human-readable description of the failure.
    Error(String),
}

impl TimingResult {
    /// Returns the elapsed milliseconds, if the operation succeeded.
    pub fn elapsed_ms(&self) -> Option<f64> {
        match self {
            TimingResult::Elapsed(ms) => Some(*ms),
            TimingResult::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TimingResult::Error(_))
    }
}

/// A [`TimingResult`] together with the value the operation produced, if any.
#[derive(Debug)]
pub struct Timed<T> {
    pub timing: TimingResult,
    pub value: Option<T>,
}

/// Runs `future` once and measures how long it takes to complete.
///
/// The clock starts on the first poll, which happens inside this function, so constructing the
/// future beforehand is not measured. `Instant` is monotonic and has sub-millisecond resolution.
/// Errors are rendered to a message prefixed with the operation, e.g. `"Read error: ..."`.
pub async fn timed<F, T, E>(operation: Operation, future: F) -> Timed<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let start = Instant::now();
    let result = future.await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    match result {
        Ok(value) => {
            tracing::info!(%operation, elapsed_ms, "{operation} completed in {elapsed_ms}ms");
            Timed {
                timing: TimingResult::Elapsed(elapsed_ms),
                value: Some(value),
            }
        }
        Err(err) => {
            tracing::error!(%operation, error = &err as &dyn std::error::Error, "{operation} failed");
            Timed {
                timing: TimingResult::Error(format!("{operation} error: {err}")),
                value: None,
            }
        }
    }
}

/// Arithmetic mean of the successful timings.
///
/// Failed timings are excluded. Returns `None` if there are no successful timings at all, never 0.
pub fn mean<'a>(timings: impl IntoIterator<Item = &'a TimingResult>) -> Option<f64> {
    let (sum, count) = timings
        .into_iter()
        .filter_map(TimingResult::elapsed_ms)
        .fold((0.0, 0usize), |(sum, count), ms| (sum + ms, count + 1));

    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[tokio::test]
    async fn measures_elapsed_time() {
        let timed = timed(Operation::Write, async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, Boom>(42)
        })
        .await;

        assert_eq!(timed.value, Some(42));
        let ms = timed.timing.elapsed_ms().unwrap();
        assert!(ms >= 5.0, "{ms}");
    }

    #[tokio::test]
    async fn captures_errors_as_messages() {
        let timed = timed(Operation::Read, async { Err::<(), _>(Boom) }).await;

        assert_eq!(timed.value, None);
        assert_eq!(timed.timing, TimingResult::Error("Read error: boom".into()));
    }

    #[test]
    fn mean_skips_errors() {
        let timings = [
            TimingResult::Elapsed(1.0),
            TimingResult::Error("Read error: boom".into()),
            TimingResult::Elapsed(3.0),
        ];
        assert_eq!(mean(&timings), Some(2.0));
    }

    #[test]
    fn mean_of_nothing_is_undefined() {
        assert_eq!(mean(std::iter::empty()), None);

        let timings = [
            TimingResult::Error("Read error: a".into()),
            TimingResult::Error("Read error: b".into()),
        ];
        assert_eq!(mean(&timings), None);
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&[
            TimingResult::Elapsed(1.5),
            TimingResult::Error("Write error: nope".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"[1.5,"Write error: nope"]"#);
    }
}

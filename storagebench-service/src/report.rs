//! Aggregated results of an invocation and their wire representation.

use serde::Serialize;

use crate::config::BenchmarkMode;
use crate::selector::Target;
use crate::timing::{TimingResult, mean};

/// Outcome of the final size check.
///
/// On the wire this is either a number of bytes or an error message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SizeResult {
    Bytes(u64),
    Error(String),
}

/// A single timed write or read and the backend it went to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperationRecord {
    pub target: Target,
    pub timing: TimingResult,
}

/// Everything measured during one invocation.
///
/// Use [`into_response`](Self::into_response) to render the response sent back to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub mode: BenchmarkMode,
    pub writes: Vec<OperationRecord>,
    pub reads: Vec<OperationRecord>,
    pub file_size: SizeResult,
}

impl BenchmarkReport {
    /// The timing of the first write that went to `target`.
    pub fn write_timing(&self, target: Target) -> TimingResult {
        self.writes
            .iter()
            .find(|record| record.target == target)
            .map(|record| record.timing.clone())
            .unwrap_or_else(|| TimingResult::Error(format!("Write error: no write to {target}")))
    }

    /// Mean of the successful reads, optionally restricted to the reads served by `target`.
    pub fn mean_read_ms(&self, target: Option<Target>) -> Option<f64> {
        mean(
            self.reads
                .iter()
                .filter(|record| target.is_none_or(|target| record.target == target))
                .map(|record| &record.timing),
        )
    }

    pub fn into_response(self) -> BenchmarkResponse {
        match self.mode {
            BenchmarkMode::Unified => BenchmarkResponse::Unified(UnifiedResponse {
                write_time_ms: self
                    .writes
                    .first()
                    .map(|record| record.timing.clone())
                    .unwrap_or_else(|| TimingResult::Error("Write error: no write".into())),
                av_read_time_ms: self.mean_read_ms(None),
                file_size_bytes: self.file_size,
            }),
            BenchmarkMode::Dual => BenchmarkResponse::Dual(DualResponse {
                efs_write_time_ms: self.write_timing(Target::MountedFilesystem),
                s3_write_time_ms: self.write_timing(Target::RemoteObjectStore),
                av_efs_read_time_ms: self.mean_read_ms(Some(Target::MountedFilesystem)),
                av_s3_read_time_ms: self.mean_read_ms(Some(Target::RemoteObjectStore)),
                file_size_bytes: self.file_size,
            }),
        }
    }
}

/// The response returned to the caller of an invocation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BenchmarkResponse {
    Unified(UnifiedResponse),
    Dual(DualResponse),
}

/// Response of a unified-mode invocation.
///
/// Averages are `null` when no read succeeded.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedResponse {
    pub write_time_ms: TimingResult,
    pub av_read_time_ms: Option<f64>,
    pub file_size_bytes: SizeResult,
}

/// Response of a dual-mode invocation, which measures both backends side by side.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DualResponse {
    pub efs_write_time_ms: TimingResult,
    pub s3_write_time_ms: TimingResult,
    pub av_efs_read_time_ms: Option<f64>,
    pub av_s3_read_time_ms: Option<f64>,
    pub file_size_bytes: SizeResult,
}

//! Caller-owned job lifecycle.
//!
//! The engine never persists jobs; callers keep a [`JobState`] next to whatever queue they run
//! and feed it the [`ProgressEvent`]s the encode pipeline emits.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::encode::runner::ProgressEvent;
use crate::foundation::error::{StoryreelError, StoryreelResult};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum JobStatus {
    Pending,
    /// `fraction` is the progress of `step` in `[0, 1]`.
    Processing { step: String, fraction: f64 },
    Completed { output: PathBuf },
    Failed { error: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JobState {
    pub id: String,
    pub status: JobStatus,
    /// Unix epoch milliseconds.
    pub created_at: u64,
    pub updated_at: u64,
}

impl JobState {
    pub fn new(id: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn processing(&mut self, step: impl Into<String>, fraction: f64) -> StoryreelResult<()> {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.transition(JobStatus::Processing {
            step: step.into(),
            fraction,
        })
    }

    pub fn complete(&mut self, output: impl Into<PathBuf>) -> StoryreelResult<()> {
        self.transition(JobStatus::Completed {
            output: output.into(),
        })
    }

    pub fn fail(&mut self, error: impl std::fmt::Display) -> StoryreelResult<()> {
        self.transition(JobStatus::Failed {
            error: error.to_string(),
        })
    }

    /// Fold a pipeline progress event into the state. `total_ms` is the length of the video
    /// being encoded and scales ffmpeg's output position.
    pub fn apply(&mut self, ev: &ProgressEvent, total_ms: f64) -> StoryreelResult<()> {
        match ev {
            ProgressEvent::Started { step } => self.processing(step.as_str(), 0.0),
            ProgressEvent::Progress { step, out_time_ms } => {
                let fraction = if total_ms > 0.0 {
                    out_time_ms / total_ms
                } else {
                    0.0
                };
                self.processing(step.as_str(), fraction)
            }
            ProgressEvent::Finished { step } => self.processing(step.as_str(), 1.0),
        }
    }

    fn transition(&mut self, next: JobStatus) -> StoryreelResult<()> {
        if self.status.is_terminal() {
            return Err(StoryreelError::validation(format!(
                "job '{}' is already {:?}",
                self.id, self.status
            )));
        }
        tracing::debug!(job = %self.id, status = ?next, "job status");
        self.status = next;
        self.updated_at = now_ms().max(self.updated_at);
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "../tests/unit/job.rs"]
mod tests;

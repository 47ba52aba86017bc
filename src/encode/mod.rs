//! ffmpeg encoding.
//!
//! Every subprocess goes through a [`runner::ProcessRunner`] with a hard timeout; the pipeline
//! turns a compiled plan plus media files into the final mp4.

/// ffmpeg/ffprobe command builders and the duration probe.
pub mod ffmpeg;
/// Sequential normalize/cut/concat/mux job.
pub mod pipeline;
/// Subprocess execution, cancellation and progress parsing.
pub mod runner;

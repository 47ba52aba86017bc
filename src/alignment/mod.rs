//! Word-level speech alignment: the data model, forced alignment through `whisperx`, and the
//! estimated fallback used when forced alignment is unavailable.

pub mod estimate;
pub mod model;
/// `whisperx` command line aligner and the alignment provider seam.
pub mod whisperx;

//! Caption line wrapping, banner title auto-fit and text measurement.

/// Measured auto-fit for the static banner title.
pub mod banner_fit;
/// Estimated-width greedy wrap for caption words.
pub mod caption_wrap;
pub mod measure;

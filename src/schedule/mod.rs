//! Banner visibility and background segment planning.

pub mod background;
pub mod banner;

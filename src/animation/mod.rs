//! Easing curves and the per-word caption entrance.

pub mod caption;
pub mod ease;

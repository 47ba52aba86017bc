//! Time base, geometry, errors and hashing shared by every other module.

pub mod core;
pub mod error;
pub(crate) mod math;

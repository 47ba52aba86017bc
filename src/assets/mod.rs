//! Background clip library, font resolution and the banner image.

pub mod banner;
pub mod clips;
pub mod fonts;

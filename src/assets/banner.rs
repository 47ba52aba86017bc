use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{Canvas, Size};
use crate::foundation::error::{StoryreelError, StoryreelResult};

const CARD_RGBA: [u8; 4] = [24, 24, 32, 235];
const ACCENT_RGBA: [u8; 4] = [255, 196, 0, 255];

/// Renders the title banner. Implementations may fail; callers fall back to
/// [`placeholder_banner`] through [`banner_or_placeholder`].
pub trait BannerImageProvider: Send + Sync {
    fn render(&self, title: &str, width: u32, height: u32) -> StoryreelResult<image::RgbaImage>;
}

/// Banner size for a video: full video width, `fraction` of the video height.
pub fn banner_dimensions(canvas: Canvas, fraction: f64) -> StoryreelResult<(u32, u32)> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(StoryreelError::validation("banner canvas must be non-empty"));
    }
    if !(fraction.is_finite() && fraction > 0.0 && fraction <= 1.0) {
        return Err(StoryreelError::validation(
            "banner height fraction must be in (0, 1]",
        ));
    }
    let height = (f64::from(canvas.height) * fraction).round().max(1.0) as u32;
    Ok((canvas.width, height))
}

pub fn banner_size(width: u32, height: u32) -> Size {
    Size::new(f64::from(width), f64::from(height))
}

/// Solid card with an accent stripe along the left edge.
pub fn placeholder_banner(width: u32, height: u32) -> image::RgbaImage {
    let stripe = (width / 60).max(4).min(width);
    image::RgbaImage::from_fn(width, height, |x, _| {
        if x < stripe {
            image::Rgba(ACCENT_RGBA)
        } else {
            image::Rgba(CARD_RGBA)
        }
    })
}

/// Ask `provider` for the banner; any failure yields the placeholder. Output always has the
/// requested dimensions.
#[tracing::instrument(skip(provider, title))]
pub fn banner_or_placeholder(
    provider: Option<&dyn BannerImageProvider>,
    title: &str,
    width: u32,
    height: u32,
) -> image::RgbaImage {
    let Some(provider) = provider else {
        return placeholder_banner(width, height);
    };
    match provider.render(title, width, height) {
        Ok(img) if img.dimensions() == (width, height) => img,
        Ok(img) => {
            tracing::debug!(got = ?img.dimensions(), "banner resized to target");
            image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "banner render failed, using placeholder");
            placeholder_banner(width, height)
        }
    }
}

/// Banner read from an image file on disk.
#[derive(Clone, Debug)]
pub struct FileBanner {
    pub path: PathBuf,
}

impl BannerImageProvider for FileBanner {
    fn render(&self, _title: &str, _width: u32, _height: u32) -> StoryreelResult<image::RgbaImage> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read banner image '{}'", self.path.display()))?;
        let img = image::load_from_memory(&bytes).context("decode banner image")?;
        Ok(img.to_rgba8())
    }
}

pub fn save_png(img: &image::RgbaImage, path: &Path) -> StoryreelResult<()> {
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write banner png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/banner.rs"]
mod tests;

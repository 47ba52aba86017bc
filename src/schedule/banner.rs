use crate::foundation::core::{Canvas, MsWindow, Rect, SafeZone, Size};
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Where the banner sits inside the safe zone.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BannerOptions {
    /// Banner image height as a fraction of the video height.
    pub height_fraction: f64,
    /// Offset below the top edge of the safe zone.
    pub top_offset_px: f64,
}

impl Default for BannerOptions {
    fn default() -> Self {
        Self {
            height_fraction: 400.0 / 1920.0,
            top_offset_px: 0.0,
        }
    }
}

/// Banner visibility window and on-screen rectangle.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BannerSchedule {
    pub window: MsWindow,
    pub placement: Rect,
}

impl BannerSchedule {
    pub fn is_visible_at(&self, t_ms: f64) -> bool {
        self.window.contains(t_ms)
    }
}

/// Show the banner over the opening narration, `[0, opening_ms)`, clipped to the video.
///
/// The image keeps its aspect ratio, is scaled down to fit the safe zone if needed, and is
/// centred horizontally at `top_offset_px` below the safe zone's top edge.
pub fn schedule_banner(
    opening_ms: f64,
    total_ms: f64,
    canvas: Canvas,
    safe_zone: &SafeZone,
    banner_size: Size,
    opts: &BannerOptions,
) -> StoryreelResult<BannerSchedule> {
    if !opening_ms.is_finite() || opening_ms < 0.0 {
        return Err(StoryreelError::validation(
            "opening duration must be finite and >= 0",
        ));
    }
    if !total_ms.is_finite() || total_ms <= 0.0 {
        return Err(StoryreelError::validation(
            "total duration must be finite and > 0",
        ));
    }
    if !(banner_size.width > 0.0 && banner_size.height > 0.0) {
        return Err(StoryreelError::validation(
            "banner image must have positive width and height",
        ));
    }
    if !opts.top_offset_px.is_finite() || opts.top_offset_px < 0.0 {
        return Err(StoryreelError::validation(
            "banner top_offset_px must be finite and >= 0",
        ));
    }

    let content = safe_zone.content_rect(canvas)?;
    let avail_h = content.height() - opts.top_offset_px;
    if avail_h <= 0.0 {
        return Err(StoryreelError::validation(
            "banner top offset leaves no room inside the safe zone",
        ));
    }
    let scale = (content.width() / banner_size.width)
        .min(avail_h / banner_size.height)
        .min(1.0);
    let w = banner_size.width * scale;
    let h = banner_size.height * scale;
    let x0 = content.x0 + (content.width() - w) / 2.0;
    let y0 = content.y0 + opts.top_offset_px;

    Ok(BannerSchedule {
        window: MsWindow {
            start_ms: 0.0,
            end_ms: opening_ms.min(total_ms),
        },
        placement: Rect::new(x0, y0, x0 + w, y0 + h),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/banner.rs"]
mod tests;

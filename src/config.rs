//! Job configuration loaded from JSON. Every field has a default, so `{}` is a valid config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::animation::caption::BounceConfig;
use crate::assets::clips::ClipSelection;
use crate::assets::fonts::FontFallback;
use crate::compile::compiler::CaptionOptions;
use crate::encode::ffmpeg::EncodeSettings;
use crate::foundation::core::{Canvas, Fps, SafeZone};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::layout::banner_fit::TitleFitOptions;
use crate::layout::caption_wrap::CaptionLayoutOptions;
use crate::schedule::background::BackgroundOptions;
use crate::schedule::banner::BannerOptions;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub video: VideoConfig,
    pub safe_zone: SafeZone,
    pub captions: CaptionsConfig,
    pub banner: BannerConfig,
    pub background: BackgroundConfig,
    pub timeouts: TimeoutConfig,
    /// Caption/title font candidates, tried in order.
    pub fonts: Vec<PathBuf>,
    /// Silence kept after the last word when the story audio length is unknown.
    pub tail_padding_ms: f64,
    /// Background planning seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            safe_zone: SafeZone::default(),
            captions: CaptionsConfig::default(),
            banner: BannerConfig::default(),
            background: BackgroundConfig::default(),
            timeouts: TimeoutConfig::default(),
            fonts: Vec::new(),
            tail_padding_ms: 1500.0,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
}

impl Default for VideoConfig {
    fn default() -> Self {
        let canvas = Canvas::default();
        Self {
            width: canvas.width,
            height: canvas.height,
            fps: Fps::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptionsConfig {
    pub font_size: f64,
    pub line_height: f64,
    pub max_width: f64,
    pub linger_ms: f64,
    pub max_lines_per_page: usize,
    pub bounce: BounceConfig,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        let opts = CaptionOptions::default();
        Self {
            font_size: opts.layout.font_size,
            line_height: opts.layout.line_height,
            max_width: opts.layout.container_width,
            linger_ms: opts.linger_ms,
            max_lines_per_page: opts.max_lines_per_page,
            bounce: opts.bounce,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BannerConfig {
    pub height_fraction: f64,
    pub top_offset_px: f64,
    pub title_fit: TitleFitOptions,
}

impl Default for BannerConfig {
    fn default() -> Self {
        let opts = BannerOptions::default();
        Self {
            height_fraction: opts.height_fraction,
            top_offset_px: opts.top_offset_px,
            title_fit: TitleFitOptions::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub switch_every_sec: f64,
    pub crossfade_sec: f64,
    pub speed_multiplier: f64,
    pub selection: ClipSelection,
    /// Categories left out of the mixed pool.
    pub high_motion: Vec<String>,
    /// Substitute for clips that cannot be probed.
    pub default_clip: Option<PathBuf>,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        let opts = BackgroundOptions::default();
        Self {
            switch_every_sec: opts.switch_every_sec,
            crossfade_sec: opts.crossfade_sec,
            speed_multiplier: opts.speed_multiplier,
            selection: ClipSelection::Mixed,
            high_motion: vec!["minecraft".to_string(), "subway".to_string()],
            default_clip: None,
        }
    }
}

/// Hard subprocess limits, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub encode_sec: u64,
    pub align_sec: u64,
    pub probe_sec: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            encode_sec: 600,
            align_sec: 300,
            probe_sec: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn encode(&self) -> Duration {
        Duration::from_secs(self.encode_sec)
    }

    pub fn align(&self) -> Duration {
        Duration::from_secs(self.align_sec)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_sec)
    }
}

impl JobConfig {
    pub fn from_json_str(json: &str) -> StoryreelResult<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_json(path: &Path) -> StoryreelResult<Self> {
        use anyhow::Context as _;

        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read job config '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> StoryreelResult<()> {
        let canvas = self.canvas();
        canvas.validate()?;
        Fps::new(self.video.fps.num, self.video.fps.den)?;
        self.safe_zone.content_rect(canvas)?;

        let captions = self.caption_options();
        captions.layout.validate()?;
        captions.bounce.validate()?;
        if !self.captions.linger_ms.is_finite() || self.captions.linger_ms < 0.0 {
            return Err(StoryreelError::validation(
                "captions linger_ms must be finite and >= 0",
            ));
        }
        if self.captions.max_lines_per_page == 0 {
            return Err(StoryreelError::validation(
                "captions max_lines_per_page must be > 0",
            ));
        }

        if !(self.banner.height_fraction > 0.0 && self.banner.height_fraction <= 1.0) {
            return Err(StoryreelError::validation(
                "banner height_fraction must be in (0, 1]",
            ));
        }
        if !self.banner.top_offset_px.is_finite() || self.banner.top_offset_px < 0.0 {
            return Err(StoryreelError::validation(
                "banner top_offset_px must be finite and >= 0",
            ));
        }
        self.banner.title_fit.validate()?;

        self.background_options().validate()?;
        if let ClipSelection::Category(name) = &self.background.selection
            && name.trim().is_empty()
        {
            return Err(StoryreelError::validation(
                "background category name must not be empty",
            ));
        }

        let t = &self.timeouts;
        if t.encode_sec == 0 || t.align_sec == 0 || t.probe_sec == 0 {
            return Err(StoryreelError::validation("timeouts must be > 0 seconds"));
        }
        if !self.tail_padding_ms.is_finite() || self.tail_padding_ms < 0.0 {
            return Err(StoryreelError::validation(
                "tail_padding_ms must be finite and >= 0",
            ));
        }
        Ok(())
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.video.width,
            height: self.video.height,
        }
    }

    pub fn caption_options(&self) -> CaptionOptions {
        CaptionOptions {
            layout: CaptionLayoutOptions {
                font_size: self.captions.font_size,
                line_height: self.captions.line_height,
                container_width: self.captions.max_width,
                ..CaptionLayoutOptions::default()
            },
            linger_ms: self.captions.linger_ms,
            max_lines_per_page: self.captions.max_lines_per_page,
            bounce: self.captions.bounce,
        }
    }

    pub fn banner_options(&self) -> BannerOptions {
        BannerOptions {
            height_fraction: self.banner.height_fraction,
            top_offset_px: self.banner.top_offset_px,
        }
    }

    pub fn background_options(&self) -> BackgroundOptions {
        BackgroundOptions {
            width: self.video.width,
            height: self.video.height,
            fps: self.video.fps,
            switch_every_sec: self.background.switch_every_sec,
            crossfade_sec: self.background.crossfade_sec,
            speed_multiplier: self.background.speed_multiplier,
        }
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            width: self.video.width,
            height: self.video.height,
            fps: self.video.fps,
            timeout: self.timeouts.encode(),
            ..EncodeSettings::default()
        }
    }

    pub fn font_fallback(&self) -> FontFallback {
        FontFallback::new(self.fonts.iter().cloned())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;

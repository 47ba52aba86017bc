use crate::animation::ease::Ease;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::foundation::math::{interpolate, lerp};

/// Share of the animation spent in the enter stage.
pub const ENTER_FRACTION: f64 = 0.6;

const SCALE_KEYS_AT: [f64; 3] = [0.0, 0.5, 1.0];
const SCALE_KEYS: [f64; 3] = [1.0, 1.12, 1.0];
const ENTER_OPACITY: f64 = 0.8;

/// Transform applied to the active caption word.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationFrame {
    pub translate_y: f64,
    pub scale: f64,
    pub opacity: f64,
}

impl AnimationFrame {
    /// Before the word's start.
    pub const PRE_ENTRY: Self = Self {
        translate_y: 0.0,
        scale: 1.0,
        opacity: ENTER_OPACITY,
    };

    /// After the animation has run its course.
    pub const SETTLED: Self = Self {
        translate_y: 0.0,
        scale: 1.0,
        opacity: 1.0,
    };

    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        (self.translate_y - other.translate_y).abs() <= eps
            && (self.scale - other.scale).abs() <= eps
            && (self.opacity - other.opacity).abs() <= eps
    }
}

/// Bounce/overshoot entrance parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BounceConfig {
    pub overshoot_px: f64,
    pub damping_ms: f64,
    pub duration_ms: f64,
}

impl Default for BounceConfig {
    fn default() -> Self {
        Self {
            overshoot_px: 6.0,
            damping_ms: 120.0,
            duration_ms: 200.0,
        }
    }
}

impl BounceConfig {
    pub fn validate(&self) -> StoryreelResult<()> {
        if !self.overshoot_px.is_finite() || self.overshoot_px < 0.0 {
            return Err(StoryreelError::validation(
                "bounce overshoot_px must be finite and >= 0",
            ));
        }
        if !self.damping_ms.is_finite() || self.damping_ms <= 0.0 {
            return Err(StoryreelError::validation(
                "bounce damping_ms must be finite and > 0",
            ));
        }
        if !self.duration_ms.is_finite() || self.duration_ms <= 0.0 {
            return Err(StoryreelError::validation(
                "bounce duration_ms must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Per-word caption animation as a pure function of time since the word's start.
///
/// - `elapsed < 0`: [`AnimationFrame::PRE_ENTRY`]
/// - enter stage, `[0, 0.6 * duration]`: the word drops in from `-overshoot_px` along a critically
///   damped curve while scale pulses `1.0 -> 1.12 -> 1.0` and opacity rises `0.8 -> 1.0`
/// - settle stage, `(0.6 * duration, duration]` and beyond: [`AnimationFrame::SETTLED`]
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaptionAnimator {
    config: BounceConfig,
}

impl CaptionAnimator {
    pub fn new(config: BounceConfig) -> StoryreelResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BounceConfig {
        &self.config
    }

    pub fn enter_ms(&self) -> f64 {
        ENTER_FRACTION * self.config.duration_ms
    }

    pub fn duration_ms(&self) -> f64 {
        self.config.duration_ms
    }

    fn drop_ease(&self) -> Ease {
        Ease::CriticallyDamped {
            k: 4.0 * self.enter_ms() / self.config.damping_ms,
        }
    }

    pub fn sample(&self, elapsed_ms: f64) -> AnimationFrame {
        if elapsed_ms.is_nan() || elapsed_ms < 0.0 {
            return AnimationFrame::PRE_ENTRY;
        }
        let enter = self.enter_ms();
        if elapsed_ms > enter {
            return AnimationFrame::SETTLED;
        }

        let progress = (elapsed_ms / enter).clamp(0.0, 1.0);
        let drop = self.drop_ease().apply(progress);
        AnimationFrame {
            translate_y: self.config.overshoot_px * (drop - 1.0),
            scale: interpolate(progress, &SCALE_KEYS_AT, &SCALE_KEYS),
            opacity: lerp(ENTER_OPACITY, 1.0, progress),
        }
    }

    /// `true` once `elapsed_ms` is past every animated value.
    pub fn is_settled(&self, elapsed_ms: f64) -> bool {
        elapsed_ms > self.enter_ms()
    }
}

impl Default for CaptionAnimator {
    fn default() -> Self {
        Self {
            config: BounceConfig::default(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/caption.rs"]
mod tests;

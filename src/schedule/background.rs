use std::path::PathBuf;

use rand::Rng;

use crate::foundation::core::Fps;
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Source range kept clear at the end of every clip.
pub const SOURCE_TAIL_MARGIN_SEC: f64 = 1.0;
/// Tolerance when checking that segment durations add up to the total.
pub const DURATION_EPSILON_SEC: f64 = 1e-6;

/// Where a background clip's pixels come from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ClipOrigin {
    /// A video file on disk.
    File { path: PathBuf },
    /// Solid colour generated by the encoder (lavfi `color` source).
    Placeholder { color: String },
}

/// One background clip the planner may choose from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipSource {
    pub id: String,
    pub category: String,
    pub origin: ClipOrigin,
    pub duration_sec: f64,
}

/// Non-empty set of clips with known durations.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipPool {
    clips: Vec<ClipSource>,
}

impl ClipPool {
    pub fn new(clips: Vec<ClipSource>) -> StoryreelResult<Self> {
        if clips.is_empty() {
            return Err(StoryreelError::asset(
                "background clip pool is empty: no content to schedule",
            ));
        }
        for c in &clips {
            if !c.duration_sec.is_finite() || c.duration_sec <= 0.0 {
                return Err(StoryreelError::validation(format!(
                    "clip '{}' has invalid duration {}",
                    c.id, c.duration_sec
                )));
            }
        }
        let mut ids: Vec<&str> = clips.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(dup) = ids.windows(2).find(|p| p[0] == p[1]) {
            return Err(StoryreelError::validation(format!(
                "duplicate clip id '{}'",
                dup[0]
            )));
        }
        Ok(Self { clips })
    }

    pub fn clips(&self) -> &[ClipSource] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ClipSource> {
        self.clips.iter().find(|c| c.id == id)
    }
}

/// Background track parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackgroundOptions {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub switch_every_sec: f64,
    pub crossfade_sec: f64,
    pub speed_multiplier: f64,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: Fps::default(),
            switch_every_sec: 5.0,
            crossfade_sec: 0.4,
            speed_multiplier: 1.0,
        }
    }
}

impl BackgroundOptions {
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StoryreelError::validation(
                "background width/height must be non-zero",
            ));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if !self.switch_every_sec.is_finite() || self.switch_every_sec <= 0.0 {
            return Err(StoryreelError::validation(
                "switch_every_sec must be finite and > 0",
            ));
        }
        if !self.crossfade_sec.is_finite() || self.crossfade_sec < 0.0 {
            return Err(StoryreelError::validation(
                "crossfade_sec must be finite and >= 0",
            ));
        }
        if self.crossfade_sec >= self.switch_every_sec {
            return Err(StoryreelError::validation(format!(
                "crossfade_sec ({}) must be shorter than switch_every_sec ({})",
                self.crossfade_sec, self.switch_every_sec
            )));
        }
        if !self.speed_multiplier.is_finite() || self.speed_multiplier <= 0.0 {
            return Err(StoryreelError::validation(
                "speed_multiplier must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// One scheduled stretch of background video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundSegment {
    pub clip_id: String,
    pub source_start_sec: f64,
    pub duration_sec: f64,
    pub speed_multiplier: f64,
}

/// Crossfade between segment `incoming - 1` and segment `incoming`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transition {
    pub incoming: usize,
    pub at_sec: f64,
    pub duration_sec: f64,
}

/// Ordered segments covering the whole video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundSchedule {
    pub segments: Vec<BackgroundSegment>,
    pub total_duration_sec: f64,
    pub crossfade_sec: f64,
}

impl BackgroundSchedule {
    /// Check the invariants every consumer relies on.
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.segments.is_empty() {
            return Err(StoryreelError::schedule("background schedule has no segments"));
        }
        if !self.total_duration_sec.is_finite() || self.total_duration_sec <= 0.0 {
            return Err(StoryreelError::schedule(
                "background total duration must be finite and > 0",
            ));
        }
        for (i, s) in self.segments.iter().enumerate() {
            if !s.duration_sec.is_finite() || s.duration_sec <= 0.0 {
                return Err(StoryreelError::schedule(format!(
                    "segment {i} has non-positive duration {}",
                    s.duration_sec
                )));
            }
            if !s.source_start_sec.is_finite() || s.source_start_sec < 0.0 {
                return Err(StoryreelError::schedule(format!(
                    "segment {i} has invalid source start {}",
                    s.source_start_sec
                )));
            }
            if !s.speed_multiplier.is_finite() || s.speed_multiplier <= 0.0 {
                return Err(StoryreelError::schedule(format!(
                    "segment {i} has invalid speed {}",
                    s.speed_multiplier
                )));
            }
        }
        let sum: f64 = self.segments.iter().map(|s| s.duration_sec).sum();
        if (sum - self.total_duration_sec).abs() > DURATION_EPSILON_SEC {
            return Err(StoryreelError::schedule(format!(
                "segment durations sum to {sum}s, expected {}s",
                self.total_duration_sec
            )));
        }
        if !self.crossfade_sec.is_finite() || self.crossfade_sec < 0.0 {
            return Err(StoryreelError::schedule("crossfade must be finite and >= 0"));
        }
        for (i, pair) in self.segments.windows(2).enumerate() {
            let shorter = pair[0].duration_sec.min(pair[1].duration_sec);
            if self.crossfade_sec >= shorter {
                return Err(StoryreelError::schedule(format!(
                    "crossfade {}s is not shorter than segments {i}/{} ({shorter}s)",
                    self.crossfade_sec,
                    i + 1
                )));
            }
        }
        Ok(())
    }

    /// Timeline start of every segment, in seconds.
    pub fn segment_starts_sec(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.segments.len());
        let mut t = 0.0;
        for s in &self.segments {
            out.push(t);
            t += s.duration_sec;
        }
        out
    }

    /// One crossfade per boundary; empty for a single segment or a zero crossfade.
    pub fn transitions(&self) -> Vec<Transition> {
        if self.crossfade_sec <= 0.0 {
            return Vec::new();
        }
        self.segment_starts_sec()
            .into_iter()
            .enumerate()
            .skip(1)
            .map(|(incoming, at_sec)| Transition {
                incoming,
                at_sec,
                duration_sec: self.crossfade_sec,
            })
            .collect()
    }

    /// Seconds of source footage segment `index` consumes, including the crossfade tail it
    /// plays under the next segment.
    pub fn rendered_duration_sec(&self, index: usize) -> f64 {
        let Some(s) = self.segments.get(index) else {
            return 0.0;
        };
        let tail = if index + 1 < self.segments.len() {
            self.crossfade_sec
        } else {
            0.0
        };
        s.duration_sec + tail
    }
}

/// Cut the pool into `switch_every_sec` segments covering `total_sec`.
///
/// Clip choice is uniform and never repeats the previous clip when the pool has more than one.
/// Each segment starts at a random source offset that leaves [`SOURCE_TAIL_MARGIN_SEC`] of the
/// clip unread. A remainder no longer than the crossfade is absorbed into the last segment.
#[tracing::instrument(skip(pool, rng), fields(pool = pool.len()))]
pub fn plan_background<R: Rng + ?Sized>(
    pool: &ClipPool,
    total_sec: f64,
    opts: &BackgroundOptions,
    rng: &mut R,
) -> StoryreelResult<BackgroundSchedule> {
    opts.validate()?;
    if !total_sec.is_finite() || total_sec <= 0.0 {
        return Err(StoryreelError::validation(
            "background total duration must be finite and > 0",
        ));
    }

    let step = opts.switch_every_sec;
    let absorb = opts.crossfade_sec.max(DURATION_EPSILON_SEC);
    let n = pool.len();
    let mut segments = Vec::new();
    let mut last: Option<usize> = None;
    let mut k = 0u64;
    loop {
        let accumulated = k as f64 * step;
        let remaining = total_sec - accumulated;
        if remaining <= DURATION_EPSILON_SEC {
            break;
        }
        let mut duration = step.min(remaining);
        let is_last = remaining - duration <= absorb;
        if is_last {
            duration = remaining;
        }

        let idx = match last {
            Some(prev) if n > 1 => {
                let r = rng.gen_range(0..n - 1);
                if r >= prev { r + 1 } else { r }
            }
            _ => rng.gen_range(0..n),
        };
        let clip = &pool.clips()[idx];

        let tail = if is_last { 0.0 } else { opts.crossfade_sec };
        let span = (duration + tail) * opts.speed_multiplier;
        let max_start = clip.duration_sec - span - SOURCE_TAIL_MARGIN_SEC;
        let source_start_sec = if max_start > 0.0 {
            rng.gen_range(0.0..max_start)
        } else {
            0.0
        };

        segments.push(BackgroundSegment {
            clip_id: clip.id.clone(),
            source_start_sec,
            duration_sec: duration,
            speed_multiplier: opts.speed_multiplier,
        });
        last = Some(idx);
        if is_last {
            break;
        }
        k += 1;
    }

    let schedule = BackgroundSchedule {
        segments,
        total_duration_sec: total_sec,
        crossfade_sec: opts.crossfade_sec,
    };
    schedule.validate()?;
    tracing::debug!(segments = schedule.segments.len(), "background planned");
    Ok(schedule)
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/background.rs"]
mod tests;

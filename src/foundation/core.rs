use crate::foundation::error::{StoryreelError, StoryreelResult};

pub use kurbo::{Point, Rect, Size};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    pub start: FrameIndex,
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    pub fn new(start: FrameIndex, end: FrameIndex) -> StoryreelResult<Self> {
        if start.0 > end.0 {
            return Err(StoryreelError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Timestamps of the first frame and of the frame just past the range.
    pub fn ms_window(self, fps: Fps) -> MsWindow {
        MsWindow {
            start_ms: frames_to_ms(self.start.0, fps),
            end_ms: frames_to_ms(self.end.0, fps),
        }
    }
}

/// Rational frame rate. Every time conversion in the engine goes through this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> StoryreelResult<Self> {
        if den == 0 {
            return Err(StoryreelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(StoryreelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_ms(self) -> f64 {
        1000.0 * f64::from(self.den) / f64::from(self.num)
    }

    pub fn ms_to_frames(self, ms: f64) -> FrameIndex {
        FrameIndex(ms_to_frames(ms, self))
    }

    pub fn frames_to_ms(self, frame: FrameIndex) -> f64 {
        frames_to_ms(frame.0, self)
    }

    /// `num/den` as accepted by ffmpeg's `-r` and `fps=` options.
    pub fn ffmpeg_rate(self) -> String {
        if self.den == 1 {
            self.num.to_string()
        } else {
            format!("{}/{}", self.num, self.den)
        }
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

/// Floor conversion from milliseconds to a frame index.
///
/// Guarantees `frames_to_ms(f) <= ms < frames_to_ms(f + 1)` for the returned `f` whenever
/// `ms >= 0`, so both backends resolve an instant to the same frame. Negative and NaN inputs map
/// to frame 0.
pub fn ms_to_frames(ms: f64, fps: Fps) -> u64 {
    if ms.is_nan() || ms <= 0.0 {
        return 0;
    }
    if !ms.is_finite() {
        return u64::MAX;
    }
    let raw = (ms * f64::from(fps.num) / (1000.0 * f64::from(fps.den))).floor();
    let mut f = raw as u64;
    // The division above can land one frame off near exact boundaries.
    for _ in 0..2 {
        if f > 0 && frames_to_ms(f, fps) > ms {
            f -= 1;
        }
    }
    for _ in 0..2 {
        if f < u64::MAX && frames_to_ms(f + 1, fps) <= ms {
            f += 1;
        }
    }
    f
}

/// Timestamp of `frame` in milliseconds.
pub fn frames_to_ms(frame: u64, fps: Fps) -> f64 {
    (frame as f64) * 1000.0 * f64::from(fps.den) / f64::from(fps.num)
}

/// Smallest frame whose timestamp is `>= ms`.
pub fn first_frame_at_or_after(ms: f64, fps: Fps) -> u64 {
    let f = ms_to_frames(ms, fps);
    if frames_to_ms(f, fps) < ms {
        f.saturating_add(1)
    } else {
        f
    }
}

/// Half-open `[start_ms, end_ms)` window on the output timeline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MsWindow {
    pub start_ms: f64,
    pub end_ms: f64,
}

impl MsWindow {
    pub fn new(start_ms: f64, end_ms: f64) -> StoryreelResult<Self> {
        if !start_ms.is_finite() || !end_ms.is_finite() {
            return Err(StoryreelError::validation("window bounds must be finite"));
        }
        if start_ms > end_ms {
            return Err(StoryreelError::validation(format!(
                "window start {start_ms}ms is after end {end_ms}ms"
            )));
        }
        Ok(Self { start_ms, end_ms })
    }

    pub fn contains(self, t_ms: f64) -> bool {
        self.start_ms <= t_ms && t_ms < self.end_ms
    }

    pub fn duration_ms(self) -> f64 {
        self.end_ms - self.start_ms
    }

    pub fn is_empty(self) -> bool {
        self.end_ms <= self.start_ms
    }

    /// Frames whose timestamp lies inside this window.
    pub fn frames(self, fps: Fps) -> FrameRange {
        let start = first_frame_at_or_after(self.start_ms, fps);
        let end = first_frame_at_or_after(self.end_ms, fps).max(start);
        FrameRange {
            start: FrameIndex(start),
            end: FrameIndex(end),
        }
    }

    /// The window snapped outward-inclusive to frame timestamps.
    ///
    /// `aligned.contains(t)` holds exactly when `frames().contains(ms_to_frames(t))` holds.
    pub fn aligned(self, fps: Fps) -> Self {
        self.frames(fps).ms_window(fps)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn validate(self) -> StoryreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StoryreelError::validation("canvas width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(StoryreelError::validation(
                "canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

/// Pixel insets that captions and the banner must stay inside of.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SafeZone {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for SafeZone {
    fn default() -> Self {
        Self {
            left: 120.0,
            right: 120.0,
            top: 320.0,
            bottom: 320.0,
        }
    }
}

impl SafeZone {
    /// Drawable region left over inside `canvas`.
    pub fn content_rect(&self, canvas: Canvas) -> StoryreelResult<Rect> {
        let insets = [self.left, self.right, self.top, self.bottom];
        if insets.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(StoryreelError::validation(
                "safe zone insets must be finite and >= 0",
            ));
        }
        let x1 = f64::from(canvas.width) - self.right;
        let y1 = f64::from(canvas.height) - self.bottom;
        if x1 <= self.left || y1 <= self.top {
            return Err(StoryreelError::validation(format!(
                "safe zone leaves no drawable area on a {}x{} canvas",
                canvas.width, canvas.height
            )));
        }
        Ok(Rect::new(self.left, self.top, x1, y1))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

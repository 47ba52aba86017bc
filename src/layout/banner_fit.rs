use crate::foundation::core::Size;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::layout::measure::TextMeasurer;

/// Candidate font sizes for the banner title, tried largest first.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TitleFitOptions {
    pub max_font_size: f64,
    pub min_font_size: f64,
    pub step: f64,
    pub line_height: f64,
}

impl Default for TitleFitOptions {
    fn default() -> Self {
        Self {
            max_font_size: 48.0,
            min_font_size: 16.0,
            step: 2.0,
            line_height: 1.3,
        }
    }
}

impl TitleFitOptions {
    pub fn validate(&self) -> StoryreelResult<()> {
        for (name, v) in [
            ("max_font_size", self.max_font_size),
            ("min_font_size", self.min_font_size),
            ("step", self.step),
            ("line_height", self.line_height),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(StoryreelError::validation(format!(
                    "title fit {name} must be finite and > 0"
                )));
            }
        }
        if self.min_font_size > self.max_font_size {
            return Err(StoryreelError::validation(
                "title fit min_font_size must be <= max_font_size",
            ));
        }
        Ok(())
    }

    /// Sizes from max down to min in `step` decrements; min is always the last candidate.
    pub fn candidates(&self) -> Vec<f64> {
        let mut out = Vec::new();
        let mut i = 0u32;
        loop {
            let size = self.max_font_size - f64::from(i) * self.step;
            if size <= self.min_font_size {
                break;
            }
            out.push(size);
            i += 1;
        }
        out.push(self.min_font_size);
        out
    }
}

/// Result of fitting a title into its box.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FittedTitle {
    pub font_size: f64,
    pub lines: Vec<String>,
    pub line_height: f64,
    /// Height the wrapped lines occupy.
    pub height: f64,
    /// `true` when even the minimum size does not fit the box height.
    pub overflow: bool,
}

/// Largest candidate size whose measured wrap fits `area`.
///
/// Falls back to the minimum size's wrap (marked `overflow`) when nothing fits.
pub fn fit_title(
    title: &str,
    area: Size,
    opts: &TitleFitOptions,
    measurer: &mut dyn TextMeasurer,
) -> StoryreelResult<FittedTitle> {
    opts.validate()?;
    if !(area.width > 0.0 && area.height > 0.0) {
        return Err(StoryreelError::validation(
            "title area must have positive width and height",
        ));
    }

    let mut last = None;
    for font_size in opts.candidates() {
        let lines = wrap_measured(title, area.width, font_size, measurer)?;
        let height = lines.len() as f64 * font_size * opts.line_height;
        let fitted = FittedTitle {
            font_size,
            lines,
            line_height: opts.line_height,
            height,
            overflow: height > area.height,
        };
        if !fitted.overflow {
            return Ok(fitted);
        }
        last = Some(fitted);
    }
    let fallback = last.ok_or_else(|| StoryreelError::validation("no title font sizes to try"))?;
    tracing::debug!(
        font_size = fallback.font_size,
        height = fallback.height,
        "banner title overflows at minimum size"
    );
    Ok(fallback)
}

/// Greedy wrap with measured widths; a line is closed when adding the next word would make a
/// non-empty line wider than `max_width`.
pub fn wrap_measured(
    text: &str,
    max_width: f64,
    font_size: f64,
    measurer: &mut dyn TextMeasurer,
) -> StoryreelResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && measurer.measure_width(&candidate, font_size)? > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines)
}

#[cfg(test)]
#[path = "../../tests/unit/layout/banner_fit.rs"]
mod tests;

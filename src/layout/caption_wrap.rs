use std::ops::Range;

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Options for the estimated-width caption wrap.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptionLayoutOptions {
    pub font_size: f64,
    pub line_height: f64,
    pub container_width: f64,
    /// Estimated glyph advance as a fraction of `font_size`.
    pub glyph_width_ratio: f64,
}

impl Default for CaptionLayoutOptions {
    fn default() -> Self {
        Self {
            font_size: 48.0,
            line_height: 1.3,
            container_width: 800.0,
            glyph_width_ratio: 0.6,
        }
    }
}

impl CaptionLayoutOptions {
    pub fn validate(&self) -> StoryreelResult<()> {
        for (name, v) in [
            ("font_size", self.font_size),
            ("line_height", self.line_height),
            ("container_width", self.container_width),
            ("glyph_width_ratio", self.glyph_width_ratio),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(StoryreelError::validation(format!(
                    "caption layout {name} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }

    fn glyph_width(&self) -> f64 {
        self.font_size * self.glyph_width_ratio
    }

    fn space_width(&self) -> f64 {
        self.glyph_width() * 0.5
    }
}

/// Placement of one caption word, relative to the caption container's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePosition {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub line_index: usize,
}

/// Greedy wrap of caption words using an estimated glyph width.
///
/// A word opens a new line when it would push a non-empty line past `container_width`. The
/// running width counts a trailing space after every word except the one that opened the line,
/// so a wrapped line may end up one space wider than the container. Lines are centred
/// horizontally and stacked `font_size * line_height` apart.
pub fn layout_caption_words<'a, I>(
    words: I,
    opts: &CaptionLayoutOptions,
) -> StoryreelResult<Vec<LinePosition>>
where
    I: IntoIterator<Item = &'a str>,
{
    opts.validate()?;
    let glyph = opts.glyph_width();
    let space = opts.space_width();

    let mut lines: Vec<Vec<f64>> = Vec::new();
    let mut current: Vec<f64> = Vec::new();
    let mut current_width = 0.0;
    for word in words {
        let w = word.chars().count() as f64 * glyph;
        if !current.is_empty() && current_width + w > opts.container_width {
            lines.push(std::mem::take(&mut current));
            // The word opening a line is counted without its trailing space.
            current.push(w);
            current_width = w;
        } else {
            current.push(w);
            current_width += w + space;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let line_advance = opts.font_size * opts.line_height;
    let mut out = Vec::with_capacity(lines.iter().map(Vec::len).sum());
    for (line_index, widths) in lines.iter().enumerate() {
        let line_width = widths.iter().sum::<f64>() + space * (widths.len() - 1) as f64;
        let mut x = (opts.container_width - line_width) / 2.0;
        let y = line_index as f64 * line_advance;
        for &width in widths {
            out.push(LinePosition {
                x,
                y,
                width,
                line_index,
            });
            x += width + space;
        }
    }
    Ok(out)
}

/// Index ranges of contiguous words sharing a `line_index`.
pub fn group_lines(positions: &[LinePosition]) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=positions.len() {
        if i == positions.len() || positions[i].line_index != positions[start].line_index {
            if start < i {
                out.push(start..i);
            }
            start = i;
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/layout/caption_wrap.rs"]
mod tests;

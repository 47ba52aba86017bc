use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Width of a single line of text at a given font size.
pub trait TextMeasurer {
    fn measure_width(&mut self, text: &str, font_size: f64) -> StoryreelResult<f64>;
}

/// Character-count estimate (`chars * font_size * ratio`); needs no font.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimatedMeasurer {
    pub glyph_width_ratio: f64,
}

impl Default for EstimatedMeasurer {
    fn default() -> Self {
        Self {
            glyph_width_ratio: 0.6,
        }
    }
}

impl TextMeasurer for EstimatedMeasurer {
    fn measure_width(&mut self, text: &str, font_size: f64) -> StoryreelResult<f64> {
        Ok(text.chars().count() as f64 * font_size * self.glyph_width_ratio)
    }
}

/// Unit brush; measurement never paints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeasureBrush;

/// Shaped-text measurement through `parley`, using one registered font.
pub struct ParleyMeasurer {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<MeasureBrush>,
    family_name: String,
}

impl ParleyMeasurer {
    /// Register `font_bytes` and measure with its first family.
    pub fn from_font_bytes(font_bytes: &[u8]) -> StoryreelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let family_name = register_family(&mut font_ctx, font_bytes)?;
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }
}

impl TextMeasurer for ParleyMeasurer {
    fn measure_width(&mut self, text: &str, font_size: f64) -> StoryreelResult<f64> {
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(StoryreelError::validation(
                "text font_size must be finite and > 0",
            ));
        }
        if text.is_empty() {
            return Ok(0.0);
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font_size as f32));
        builder.push_default(parley::style::StyleProperty::Brush(MeasureBrush));

        let mut layout: parley::Layout<MeasureBrush> = builder.build(text);
        layout.break_all_lines(None);

        let mut width = 0.0f64;
        for line in layout.lines() {
            width = width.max(f64::from(line.metrics().advance));
        }
        Ok(width)
    }
}

/// Register font bytes with `font_ctx` and return the first family's name.
pub(crate) fn register_family(
    font_ctx: &mut parley::FontContext,
    font_bytes: &[u8],
) -> StoryreelResult<String> {
    let families = font_ctx
        .collection
        .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
    let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
        StoryreelError::validation("no font families registered from font bytes")
    })?;
    Ok(font_ctx
        .collection
        .family_name(family_id)
        .ok_or_else(|| StoryreelError::validation("registered font family has no name"))?
        .to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/layout/measure.rs"]
mod tests;

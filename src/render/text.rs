use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};

/// Environment variable consulted before the built-in font search list.
pub const FONT_ENV_VAR: &str = "TEXTREEL_FONT";

/// Well-known bold sans-serif font locations, probed in order.
const BOLD_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Locate a bold system font: `$TEXTREEL_FONT` first, then a fixed candidate list.
pub fn find_bold_font() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os(FONT_ENV_VAR).map(PathBuf::from)
        && p.is_file()
    {
        return Some(p);
    }
    BOLD_FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
}

/// Read font bytes from `path`.
pub fn read_font(path: &Path) -> ReelResult<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read font '{}'", path.display()))?;
    if bytes.is_empty() {
        return Err(ReelError::validation(format!(
            "font file '{}' is empty",
            path.display()
        )));
    }
    Ok(bytes)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// Reusable Parley font/layout contexts for bold single-style text.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: Option<String>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            family_name: None,
        }
    }

    /// Register `font_bytes` (once) and return its family name.
    fn ensure_family(&mut self, font_bytes: &[u8]) -> ReelResult<String> {
        if let Some(name) = &self.family_name {
            return Ok(name.clone());
        }
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ReelError::validation("no font families registered from font bytes")
        })?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::validation("registered font family has no name"))?
            .to_string();
        self.family_name = Some(name.clone());
        Ok(name)
    }

    /// Shape and break `text` in bold at `size_px`, wrapping at `max_width_px`.
    ///
    /// Lines are laid out start-aligned; horizontal centering is applied per line at draw time
    /// via [`centered_line_offsets`].
    pub fn layout_bold(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        brush: TextBrushRgba8,
        max_width_px: f32,
    ) -> ReelResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        if !max_width_px.is_finite() || max_width_px <= 0.0 {
            return Err(ReelError::validation(
                "text max_width_px must be finite and > 0",
            ));
        }
        let family_name = self.ensure_family(font_bytes)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::BOLD,
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(Some(max_width_px));
        layout.align(
            Some(max_width_px),
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        Ok(layout)
    }
}

/// Horizontal offset for each line of `layout` so it is centered across `width`.
pub fn centered_line_offsets(layout: &parley::Layout<TextBrushRgba8>, width: f32) -> Vec<f32> {
    layout
        .lines()
        .map(|line| center_offset(width, line.metrics().advance))
        .collect()
}

/// Offset that centers an extent of `inner` inside `outer`, never negative.
pub fn center_offset(outer: f32, inner: f32) -> f32 {
    ((outer - inner) * 0.5).max(0.0)
}

/// Top edge of a text block of `block_h` centered in a `band_h` band centered on `canvas_h`.
///
/// Blocks taller than the band start at the band's top edge.
pub fn band_block_top(canvas_h: f32, band_h: f32, block_h: f32) -> f32 {
    let band_top = canvas_h * 0.5 - band_h * 0.5;
    band_top + center_offset(band_h, block_h)
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

use crate::encode::pool::PixelBuffer;
use crate::foundation::core::{Canvas, PixelFormat, Rgba8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::text::{
    TextBrushRgba8, TextLayoutEngine, band_block_top, centered_line_offsets, find_bold_font,
    read_font,
};

/// Styling for rendered title frames.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RendererOpts {
    /// Solid background fill.
    pub background: Rgba8,
    /// Text color.
    pub foreground: Rgba8,
    /// Bold font size in pixels.
    pub font_size_px: f32,
    /// Height of the band, centered on the frame, that the text block is centered in.
    pub band_height_px: f32,
    /// Bold font file. `None` searches well-known system locations.
    pub font_path: Option<PathBuf>,
}

impl Default for RendererOpts {
    fn default() -> Self {
        Self {
            background: Rgba8::WHITE,
            foreground: Rgba8::BLACK,
            font_size_px: 50.0,
            band_height_px: 100.0,
            font_path: None,
        }
    }
}

impl RendererOpts {
    /// Check sizes are usable.
    pub fn validate(&self) -> ReelResult<()> {
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(ReelError::validation("renderer font_size_px must be > 0"));
        }
        if !self.band_height_px.is_finite() || self.band_height_px <= 0.0 {
            return Err(ReelError::validation(
                "renderer band_height_px must be > 0",
            ));
        }
        Ok(())
    }

    /// Resolve the configured or discovered font path.
    pub fn resolve_font_path(&self) -> ReelResult<PathBuf> {
        match &self.font_path {
            Some(p) => Ok(p.clone()),
            None => find_bold_font().ok_or_else(|| {
                ReelError::validation(
                    "no bold font found on this system; set renderer.font_path or $TEXTREEL_FONT",
                )
            }),
        }
    }
}

struct CachedText {
    text: String,
    width: u32,
    layout: parley::Layout<TextBrushRgba8>,
    line_offsets: Vec<f32>,
}

/// Rasterizes centered bold text over a solid background.
///
/// Deterministic: the same `(text, canvas)` always produces identical bytes.
pub struct FrameRenderer {
    opts: RendererOpts,
    font_bytes: Arc<Vec<u8>>,
    font: vello_cpu::peniko::FontData,
    engine: TextLayoutEngine,
    cached: Option<CachedText>,
    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
}

impl FrameRenderer {
    /// Load the font and build a renderer.
    pub fn new(opts: RendererOpts) -> ReelResult<Self> {
        opts.validate()?;
        let path = opts.resolve_font_path()?;
        let bytes = read_font(&path)?;
        tracing::debug!(font = %path.display(), bytes = bytes.len(), "loaded renderer font");
        Self::with_font_bytes(opts, bytes)
    }

    /// Build a renderer from in-memory font bytes.
    pub fn with_font_bytes(opts: RendererOpts, font_bytes: Vec<u8>) -> ReelResult<Self> {
        opts.validate()?;
        let font_bytes = Arc::new(font_bytes);
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font_bytes.as_ref().clone()),
            0,
        );
        Ok(Self {
            opts,
            font_bytes,
            font,
            engine: TextLayoutEngine::new(),
            cached: None,
            ctx: None,
            pixmap: None,
        })
    }

    /// Renderer styling.
    pub fn opts(&self) -> &RendererOpts {
        &self.opts
    }

    /// Render `text` into a freshly allocated buffer of `canvas` size.
    pub fn render(&mut self, text: &str, canvas: Canvas) -> ReelResult<PixelBuffer> {
        let mut buf = PixelBuffer::alloc(canvas, PixelFormat::Rgba8Premul)?;
        self.render_into(text, &mut buf)?;
        Ok(buf)
    }

    /// Render `text` into an existing (typically pooled) buffer, overwriting every pixel.
    pub fn render_into(&mut self, text: &str, buf: &mut PixelBuffer) -> ReelResult<()> {
        if buf.format() != PixelFormat::Rgba8Premul {
            return Err(ReelError::validation(
                "frame renderer only writes Rgba8Premul buffers",
            ));
        }
        let canvas = buf.canvas();
        let (w, h) = canvas_u16(canvas)?;
        self.ensure_layout(text, canvas.width)?;

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        let mut pixmap = match self.pixmap.take() {
            Some(p) if p.width() == w && p.height() == h => p,
            _ => vello_cpu::Pixmap::new(w, h),
        };
        ctx.reset();

        let bg = self.opts.background;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(canvas.width),
            f64::from(canvas.height),
        ));

        if let Some(t) = self.cached.as_ref() {
            let top = band_block_top(
                canvas.height as f32,
                self.opts.band_height_px,
                t.layout.height(),
            );
            for (line, dx) in t.layout.lines().zip(t.line_offsets.iter().copied()) {
                ctx.set_transform(vello_cpu::kurbo::Affine::translate((
                    f64::from(dx),
                    f64::from(top),
                )));
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));
                    // Positioned glyphs carry the run offset and the line baseline.
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&self.font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        let src = pixmap.data_as_u8_slice();
        let dst = buf.data_mut();
        if src.len() != dst.len() {
            return Err(ReelError::internal(format!(
                "rendered pixmap has {} bytes, buffer has {}",
                src.len(),
                dst.len()
            )));
        }
        dst.copy_from_slice(src);

        self.ctx = Some(ctx);
        self.pixmap = Some(pixmap);
        Ok(())
    }

    fn ensure_layout(&mut self, text: &str, width: u32) -> ReelResult<()> {
        if let Some(c) = &self.cached
            && c.text == text
            && c.width == width
        {
            return Ok(());
        }
        if text.trim().is_empty() {
            self.cached = None;
            return Ok(());
        }
        let fg = self.opts.foreground;
        let brush = TextBrushRgba8 {
            r: fg.r,
            g: fg.g,
            b: fg.b,
            a: fg.a,
        };
        let layout = self.engine.layout_bold(
            text,
            self.font_bytes.as_slice(),
            self.opts.font_size_px,
            brush,
            width as f32,
        )?;
        let line_offsets = centered_line_offsets(&layout, width as f32);
        self.cached = Some(CachedText {
            text: text.to_string(),
            width,
            layout,
            line_offsets,
        });
        Ok(())
    }
}

fn canvas_u16(canvas: Canvas) -> ReelResult<(u16, u16)> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(ReelError::allocation_failed(format!(
            "cannot rasterize a {canvas} frame"
        )));
    }
    let w: u16 = canvas.width.try_into().map_err(|_| {
        ReelError::allocation_failed(format!("frame width exceeds u16: {}", canvas.width))
    })?;
    let h: u16 = canvas.height.try_into().map_err(|_| {
        ReelError::allocation_failed(format!("frame height exceeds u16: {}", canvas.height))
    })?;
    Ok((w, h))
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;

use image::imageops::FilterType;

use crate::deck::model::TextRun;
use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::premul_over_in_place;
use crate::render::backend::{FrameRGBA, RenderSettings, SlideRenderer};
use crate::render::text::{FlatText, TextBrushRgba8, TextLayoutEngine};
use crate::render::units::{NormalizedElement, PxRect};

/// Upper bound on the resampled size of a single picture.
const MAX_PICTURE_PIXELS: u64 = 16_384 * 16_384;

/// In-process slide rasterizer.
///
/// Pictures are decoded with `image` and resampled with Lanczos3. Text is shaped by `parley`
/// and filled by `vello_cpu` into a transparent layer that is composited over the canvas, so
/// later elements still cover earlier ones.
pub struct CpuSlideRenderer {
    settings: RenderSettings,
    text_engine: TextLayoutEngine,
    font: Option<vello_cpu::peniko::FontData>,
    ctx: Option<vello_cpu::RenderContext>,
}

impl CpuSlideRenderer {
    /// Create a renderer; the font (if any) is registered once here.
    pub fn new(settings: RenderSettings) -> Self {
        let text_engine = TextLayoutEngine::new(settings.font.as_deref().map(Vec::as_slice));
        let font = settings.font.as_ref().map(|bytes| {
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes.to_vec()), 0)
        });
        Self {
            settings,
            text_engine,
            font,
            ctx: None,
        }
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> SlidecastResult<R>,
    ) -> SlidecastResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    fn paint_text(
        &mut self,
        canvas: &mut FrameRGBA,
        rect: PxRect,
        runs: &[TextRun],
    ) -> SlidecastResult<()> {
        let flat = FlatText::from_runs(runs, self.settings.default_font_px);
        if flat.is_blank() {
            return Ok(());
        }
        let [r, g, b, a] = self.settings.text_rgba;
        let layout = self.text_engine.layout(
            &flat,
            self.settings.default_font_px,
            TextBrushRgba8 { r, g, b, a },
        )?;
        let font = self.font.clone().ok_or_else(|| {
            SlidecastError::rasterization("slide has text but no usable font is configured")
        })?;

        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| SlidecastError::validation("canvas width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| SlidecastError::validation("canvas height exceeds u16"))?;
        let mut layer = vello_cpu::Pixmap::new(width, height);

        self.with_ctx_mut(width, height, |_, ctx| {
            let tr = kurbo::Affine::translate((f64::from(rect.x), f64::from(rect.y)));
            ctx.set_transform(affine_to_cpu(tr));
            for line in layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));
                    // Positions include the run offset and the line baseline.
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
            ctx.flush();
            ctx.render_to_pixmap(&mut layer);
            Ok(())
        })?;

        premul_over_in_place(&mut canvas.data, layer.data_as_u8_slice())
    }
}

impl SlideRenderer for CpuSlideRenderer {
    fn render(&mut self, elements: &[NormalizedElement]) -> SlidecastResult<FrameRGBA> {
        let res = self.settings.resolution;
        let [r, g, b, a] = self.settings.background_rgba;
        let mut canvas = FrameRGBA::solid(
            res.width,
            res.height,
            Rgba8Premul::from_straight_rgba(r, g, b, a),
        );

        for el in elements {
            let rect = el.rect();
            if rect.is_degenerate() {
                tracing::trace!(?rect, "skipping element with empty geometry");
                continue;
            }
            match el {
                NormalizedElement::Text { runs, .. } => self.paint_text(&mut canvas, rect, runs)?,
                NormalizedElement::Picture { payload, .. } => {
                    paint_picture(&mut canvas, rect, payload)?
                }
            }
        }
        Ok(canvas)
    }
}

fn paint_picture(canvas: &mut FrameRGBA, rect: PxRect, payload: &[u8]) -> SlidecastResult<()> {
    let (w, h) = (rect.width as u32, rect.height as u32);
    if u64::from(w) * u64::from(h) > MAX_PICTURE_PIXELS {
        return Err(SlidecastError::rasterization(format!(
            "picture of {w}x{h} px is too large to resample"
        )));
    }
    let decoded = image::load_from_memory(payload)
        .map_err(|e| SlidecastError::rasterization(format!("decode picture: {e}")))?;
    let has_alpha = decoded.color().has_alpha();
    let src = decoded.to_rgba8();
    let resized = if src.dimensions() == (w, h) {
        src
    } else {
        image::imageops::resize(&src, w, h, FilterType::Lanczos3)
    };
    blit_rgba8(canvas, rect.x, rect.y, &resized, has_alpha);
    Ok(())
}

/// Copy straight-alpha `src` into the canvas at `(x, y)`, clipped to the canvas.
///
/// Sources without an alpha channel overwrite; others are composited over.
fn blit_rgba8(canvas: &mut FrameRGBA, x: i32, y: i32, src: &image::RgbaImage, has_alpha: bool) {
    let (sw, sh) = src.dimensions();
    let x0 = i64::from(x).max(0);
    let y0 = i64::from(y).max(0);
    let x1 = (i64::from(x) + i64::from(sw)).min(i64::from(canvas.width));
    let y1 = (i64::from(y) + i64::from(sh)).min(i64::from(canvas.height));
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let stride = canvas.width as usize * 4;
    for cy in y0..y1 {
        let sy = (cy - i64::from(y)) as u32;
        let row = cy as usize * stride;
        for cx in x0..x1 {
            let sx = (cx - i64::from(x)) as u32;
            let [r, g, b, a] = src.get_pixel(sx, sy).0;
            let i = row + cx as usize * 4;
            let d = &mut canvas.data[i..i + 4];
            if !has_alpha || a == 255 {
                d.copy_from_slice(&[r, g, b, 255]);
                continue;
            }
            if a == 0 {
                continue;
            }
            let s = Rgba8Premul::from_straight_rgba(r, g, b, a).to_array();
            // Lengths match by construction.
            let _ = premul_over_in_place(d, &s);
        }
    }
}

fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;

//! # Font — TTF/OTF Rasterization, Glyph Atlas, Text Layout
//!
//! Uses [fontdue](https://docs.rs/fontdue) to rasterize TrueType/OpenType
//! fonts into a single-channel coverage atlas. The text fragment shader reads
//! the `r` channel and multiplies it into the tint alpha, so glyphs take any
//! color without re-rasterization.
//!
//! ## Atlas Packing and Oversampling
//!
//! Printable ASCII (32–126) is rasterized at **2× the requested pixel size**
//! and shelf-packed row by row with 1 px padding. Layout metrics (advance,
//! bearings, glyph box) are divided back down, so the quads are drawn at the
//! nominal size while sampling the doubled-resolution bitmap — linear
//! filtering then does the downscale, which is what makes small text look
//! crisp. The atlas dimension is a tier of the *effective* (oversampled)
//! size: ≤64 → 512², ≤128 → 1024², ≤256 → 2048², else 4096².
//!
//! ## Re-Rasterization
//!
//! The raw font bytes are retained for the font's lifetime. `set_size`
//! re-runs the whole pipeline from those bytes and re-uploads into the *same*
//! GL texture object, so existing draw code keeps working with no handle
//! churn — the next flush simply samples the new contents.
//!
//! ## Layout Rules
//!
//! The cursor starts at `(x, y + ascent)` so `y` is the top of the first
//! line. `\n` returns to the left edge and advances one line height; `\t`
//! advances four space widths; code points outside 32–126 are skipped.
//! [`Font::measure`] replays the exact same cursor walk without emitting
//! vertices, so measured and rendered advances always agree.

use glow::HasContext;

use crate::error::RenderError;

/// First and last packed code points (printable ASCII).
const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 126;
const CHAR_COUNT: usize = (LAST_CHAR - FIRST_CHAR) as usize + 1;

/// Glyphs are rasterized at this multiple of the nominal size.
const OVERSAMPLE: f32 = 2.0;

/// Padding between packed glyphs, in atlas pixels.
const GLYPH_PADDING: u32 = 1;

pub(crate) const TEXT_FRAGMENT_SRC: &str = include_str!("shaders/text.frag");

/// Layout metrics and atlas UV box for one glyph, in nominal (not
/// oversampled) pixels.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GlyphMetrics {
    /// Horizontal cursor advance.
    pub advance: f32,
    /// Offset from the cursor to the glyph box's left edge.
    pub offset_x: f32,
    /// Offset from the baseline to the glyph box's top edge (Y down).
    pub offset_y: f32,
    /// Glyph box dimensions; zero for invisible glyphs such as space.
    pub width: f32,
    pub height: f32,
    /// Normalized UV box within the atlas.
    pub uv_min: (f32, f32),
    pub uv_max: (f32, f32),
}

/// A loaded font: retained source bytes, per-glyph metrics, and the coverage
/// atlas texture at the current pixel size.
///
/// Destroy explicitly with [`Font::destroy`]; the consuming signature makes
/// use-after-destroy a compile error.
pub struct Font {
    /// Raw TTF/OTF bytes, kept so `set_size` can re-rasterize.
    data: Vec<u8>,
    /// Indexed by `code_point - 32`, always [`CHAR_COUNT`] entries.
    glyphs: Vec<GlyphMetrics>,
    texture: glow::Texture,
    atlas_width: u32,
    atlas_height: u32,
    size: f32,
    ascent: f32,
    descent: f32,
    line_gap: f32,
    line_height: f32,
}

impl Font {
    /// Read a font file fully and rasterize its atlas at `size` pixels.
    ///
    /// A missing, unreadable, empty, or unparseable file fails cleanly with
    /// a diagnostic; no half-initialized font is ever returned.
    pub fn load(gl: &glow::Context, path: &str, size: f32) -> Result<Self, RenderError> {
        let data = std::fs::read(path).map_err(|e| RenderError::resource_load(path, e))?;
        if data.is_empty() {
            return Err(RenderError::resource_load(path, "file is empty"));
        }

        let texture = unsafe { gl.create_texture() }
            .map_err(|e| RenderError::allocation(format!("font atlas texture: {e}")))?;

        let mut font = Self {
            data,
            glyphs: Vec::new(),
            texture,
            atlas_width: 0,
            atlas_height: 0,
            size: 0.0,
            ascent: 0.0,
            descent: 0.0,
            line_gap: 0.0,
            line_height: 0.0,
        };

        if let Err(err) = font.rasterize(gl, size) {
            unsafe { gl.delete_texture(texture) };
            return Err(err);
        }

        log::info!("loaded font '{path}' at size {size}");
        Ok(font)
    }

    /// Re-rasterize the atlas at a new pixel size, reusing the existing GL
    /// texture object. Requesting the current size is a no-op.
    pub fn set_size(&mut self, gl: &glow::Context, size: f32) -> Result<(), RenderError> {
        if size == self.size {
            return Ok(());
        }
        self.rasterize(gl, size)
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    pub fn descent(&self) -> f32 {
        self.descent
    }

    pub fn line_gap(&self) -> f32 {
        self.line_gap
    }

    /// Vertical distance between successive baselines
    /// (`ascent − descent + line_gap`).
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Atlas bitmap dimensions at the current size.
    pub fn atlas_size(&self) -> (u32, u32) {
        (self.atlas_width, self.atlas_height)
    }

    /// Measure a string without drawing it: (widest line, line count × line
    /// height). Uses the same cursor walk as rendering.
    pub fn measure(&self, text: &str) -> (f32, f32) {
        let mut cursor = GlyphCursor::new(self, 0.0, 0.0);
        for c in text.chars() {
            cursor.advance(c);
        }
        cursor.measured()
    }

    /// Release the GL atlas texture.
    pub fn destroy(self, gl: &glow::Context) {
        unsafe { gl.delete_texture(self.texture) };
    }

    pub(crate) fn texture(&self) -> glow::Texture {
        self.texture
    }

    /// Run the rasterization pipeline from the retained bytes and upload the
    /// result into the atlas texture (same handle, new contents).
    fn rasterize(&mut self, gl: &glow::Context, size: f32) -> Result<(), RenderError> {
        let atlas = rasterize_atlas(&self.data, size)?;

        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );

            // Single-channel rows are not 4-byte aligned.
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::R8 as i32,
                atlas.dimension as i32,
                atlas.dimension as i32,
                0,
                glow::RED,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(atlas.bitmap.as_slice())),
            );
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            gl.bind_texture(glow::TEXTURE_2D, None);
        }

        self.glyphs = atlas.glyphs;
        self.atlas_width = atlas.dimension;
        self.atlas_height = atlas.dimension;
        self.size = size;
        self.ascent = atlas.ascent;
        self.descent = atlas.descent;
        self.line_gap = atlas.line_gap;
        self.line_height = atlas.line_height;
        Ok(())
    }

    fn glyph(&self, c: char) -> Option<&GlyphMetrics> {
        let code = c as u32;
        if !(FIRST_CHAR as u32..=LAST_CHAR as u32).contains(&code) {
            return None;
        }
        self.glyphs.get((code - FIRST_CHAR as u32) as usize)
    }
}

/// Cursor walk shared by rendering and measuring, so the two can never
/// disagree on advances.
pub(crate) struct GlyphCursor<'f> {
    font: &'f Font,
    origin_x: f32,
    x: f32,
    y: f32,
    max_width: f32,
    lines: u32,
}

impl<'f> GlyphCursor<'f> {
    /// `(x, y)` is the top-left of the first line; the baseline sits at
    /// `y + ascent`.
    pub fn new(font: &'f Font, x: f32, y: f32) -> Self {
        Self {
            font,
            origin_x: x,
            x,
            y: y + font.ascent,
            max_width: 0.0,
            lines: 1,
        }
    }

    /// Step the cursor over one code point. Returns the glyph and its quad's
    /// top-left position when the code point produces visible geometry.
    pub fn advance(&mut self, c: char) -> Option<(GlyphMetrics, f32, f32)> {
        match c {
            '\n' => {
                self.max_width = self.max_width.max(self.x - self.origin_x);
                self.x = self.origin_x;
                self.y += self.font.line_height;
                self.lines += 1;
                None
            }
            '\t' => {
                let space = self.font.glyph(' ').map_or(0.0, |g| g.advance);
                self.x += space * 4.0;
                None
            }
            _ => {
                let glyph = *self.font.glyph(c)?;
                let position = (self.x + glyph.offset_x, self.y + glyph.offset_y);
                self.x += glyph.advance;
                if glyph.width == 0.0 || glyph.height == 0.0 {
                    return None;
                }
                Some((glyph, position.0, position.1))
            }
        }
    }

    /// Finish a measuring walk: (widest line, line count × line height).
    pub fn measured(self) -> (f32, f32) {
        let max_width = self.max_width.max(self.x - self.origin_x);
        (max_width, self.lines as f32 * self.font.line_height)
    }
}

/// CPU-side result of one rasterization pass.
#[derive(Debug)]
struct RasterizedAtlas {
    bitmap: Vec<u8>,
    dimension: u32,
    glyphs: Vec<GlyphMetrics>,
    ascent: f32,
    descent: f32,
    line_gap: f32,
    line_height: f32,
}

/// Atlas dimension tier for a nominal pixel size, sized for the oversampled
/// bitmaps.
fn atlas_dimensions(size: f32) -> u32 {
    let effective = size * OVERSAMPLE;
    if effective <= 64.0 {
        512
    } else if effective <= 128.0 {
        1024
    } else if effective <= 256.0 {
        2048
    } else {
        4096
    }
}

/// Row-based rectangle packer with fixed padding.
struct ShelfPacker {
    width: u32,
    height: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
}

impl ShelfPacker {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cursor_x: GLYPH_PADDING,
            cursor_y: GLYPH_PADDING,
            row_height: 0,
        }
    }

    /// Reserve a `w`×`h` slot, wrapping to a new row when the current one is
    /// full. Returns `None` once the atlas is exhausted.
    fn pack(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w + 2 * GLYPH_PADDING > self.width {
            return None;
        }
        if self.cursor_x + w + GLYPH_PADDING > self.width {
            self.cursor_x = GLYPH_PADDING;
            self.cursor_y += self.row_height + GLYPH_PADDING;
            self.row_height = 0;
        }
        if self.cursor_y + h + GLYPH_PADDING > self.height {
            return None;
        }

        let slot = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + GLYPH_PADDING;
        self.row_height = self.row_height.max(h);
        Some(slot)
    }
}

/// Rasterize the printable ASCII range at 2× oversampling and pack it into a
/// coverage bitmap, extracting nominal-size layout metrics per glyph.
fn rasterize_atlas(data: &[u8], size: f32) -> Result<RasterizedAtlas, RenderError> {
    if size <= 0.0 {
        return Err(RenderError::FontParse {
            reason: format!("cannot rasterize at pixel size {size}"),
        });
    }

    let sample_size = size * OVERSAMPLE;
    let font = fontdue::Font::from_bytes(
        data,
        fontdue::FontSettings {
            scale: sample_size,
            ..Default::default()
        },
    )
    .map_err(|reason| RenderError::FontParse {
        reason: reason.to_owned(),
    })?;

    let line = font
        .horizontal_line_metrics(size)
        .ok_or_else(|| RenderError::FontParse {
            reason: "font has no horizontal line metrics".to_owned(),
        })?;
    let line_height = line.ascent - line.descent + line.line_gap;

    let dimension = atlas_dimensions(size);
    let mut bitmap = vec![0u8; (dimension * dimension) as usize];
    let mut packer = ShelfPacker::new(dimension, dimension);
    let mut glyphs = Vec::with_capacity(CHAR_COUNT);

    for code in FIRST_CHAR..=LAST_CHAR {
        let ch = code as char;
        let (metrics, coverage) = font.rasterize(ch, sample_size);
        let advance = metrics.advance_width / OVERSAMPLE;

        if metrics.width == 0 || metrics.height == 0 {
            glyphs.push(GlyphMetrics {
                advance,
                ..Default::default()
            });
            continue;
        }

        let (gw, gh) = (metrics.width as u32, metrics.height as u32);
        let Some((px, py)) = packer.pack(gw, gh) else {
            log::warn!("glyph atlas overflow at '{ch}' (atlas {dimension}px, size {size})");
            glyphs.push(GlyphMetrics {
                advance,
                ..Default::default()
            });
            continue;
        };

        for row in 0..gh {
            let src = (row * gw) as usize;
            let dst = ((py + row) * dimension + px) as usize;
            bitmap[dst..dst + gw as usize].copy_from_slice(&coverage[src..src + gw as usize]);
        }

        let dim = dimension as f32;
        glyphs.push(GlyphMetrics {
            advance,
            offset_x: metrics.xmin as f32 / OVERSAMPLE,
            // fontdue's ymin is baseline-to-bottom in Y-up space; convert to
            // baseline-to-top in Y-down screen space.
            offset_y: -(metrics.ymin as f32 + metrics.height as f32) / OVERSAMPLE,
            width: gw as f32 / OVERSAMPLE,
            height: gh as f32 / OVERSAMPLE,
            uv_min: (px as f32 / dim, py as f32 / dim),
            uv_max: ((px + gw) as f32 / dim, (py + gh) as f32 / dim),
        });
    }

    Ok(RasterizedAtlas {
        bitmap,
        dimension,
        glyphs,
        ascent: line.ascent,
        descent: line.descent,
        line_gap: line.line_gap,
        line_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    /// A font with hand-written metrics: every letter advances 10, space 5.
    fn test_font() -> Font {
        let mut glyphs = vec![GlyphMetrics::default(); CHAR_COUNT];
        glyphs[(b' ' - FIRST_CHAR) as usize].advance = 5.0;
        for code in b'!'..=LAST_CHAR {
            glyphs[(code - FIRST_CHAR) as usize] = GlyphMetrics {
                advance: 10.0,
                offset_x: 1.0,
                offset_y: -12.0,
                width: 8.0,
                height: 12.0,
                uv_min: (0.0, 0.0),
                uv_max: (0.1, 0.1),
            };
        }
        Font {
            data: Vec::new(),
            glyphs,
            texture: glow::NativeTexture(NonZeroU32::new(1).unwrap()),
            atlas_width: 512,
            atlas_height: 512,
            size: 24.0,
            ascent: 18.0,
            descent: -6.0,
            line_gap: 2.0,
            line_height: 26.0,
        }
    }

    #[test]
    fn atlas_tier_tracks_the_effective_size() {
        assert_eq!(atlas_dimensions(24.0), 512);
        assert_eq!(atlas_dimensions(32.0), 512);
        assert_eq!(atlas_dimensions(33.0), 1024);
        assert_eq!(atlas_dimensions(64.0), 1024);
        assert_eq!(atlas_dimensions(96.0), 2048);
        assert_eq!(atlas_dimensions(128.0), 2048);
        assert_eq!(atlas_dimensions(200.0), 4096);
    }

    #[test]
    fn shelf_packer_wraps_rows_and_pads() {
        let mut packer = ShelfPacker::new(32, 32);
        assert_eq!(packer.pack(10, 8), Some((1, 1)));
        assert_eq!(packer.pack(10, 6), Some((12, 1)));
        // Doesn't fit the remaining row width; wraps below the tallest glyph.
        assert_eq!(packer.pack(20, 4), Some((1, 10)));
    }

    #[test]
    fn shelf_packer_reports_exhaustion() {
        let mut packer = ShelfPacker::new(16, 16);
        assert!(packer.pack(14, 14).is_some());
        assert_eq!(packer.pack(14, 14), None);
        // An entry wider than the atlas can never fit.
        assert_eq!(ShelfPacker::new(16, 16).pack(16, 4), None);
    }

    #[test]
    fn measure_tracks_widest_line_and_line_count() {
        let font = test_font();
        let (w, h) = font.measure("!!\n!!!");
        assert_eq!(w, 30.0);
        assert_eq!(h, 2.0 * 26.0);
    }

    #[test]
    fn tab_advances_four_space_widths() {
        let font = test_font();
        assert_eq!(font.measure("\t").0, 20.0);
    }

    #[test]
    fn out_of_range_code_points_are_skipped() {
        let font = test_font();
        assert_eq!(font.measure("!\u{7f}!\u{1F600}").0, font.measure("!!").0);
    }

    #[test]
    fn empty_string_measures_one_line() {
        let font = test_font();
        let (w, h) = font.measure("");
        assert_eq!(w, 0.0);
        assert_eq!(h, 26.0);
    }

    #[test]
    fn rendering_walk_matches_measure() {
        let font = test_font();
        let text = "!ab cd!";

        let mut cursor = GlyphCursor::new(&font, 40.0, 7.0);
        let mut rightmost: f32 = 40.0;
        for c in text.chars() {
            if let Some((glyph, gx, _)) = cursor.advance(c) {
                rightmost = rightmost.max(gx - glyph.offset_x + glyph.advance);
            }
        }

        assert_eq!(rightmost - 40.0, font.measure(text).0);
    }

    #[test]
    fn first_baseline_sits_at_ascent() {
        let font = test_font();
        let mut cursor = GlyphCursor::new(&font, 0.0, 100.0);
        let (glyph, gx, gy) = cursor.advance('!').unwrap();
        assert_eq!(gx, glyph.offset_x);
        assert_eq!(gy, 100.0 + font.ascent + glyph.offset_y);
    }

    #[test]
    fn newline_returns_to_origin_and_drops_one_line() {
        let font = test_font();
        let mut cursor = GlyphCursor::new(&font, 30.0, 0.0);
        let (_, first_x, first_y) = cursor.advance('!').unwrap();
        cursor.advance('\n');
        let (_, second_x, second_y) = cursor.advance('!').unwrap();

        assert_eq!(second_x, first_x);
        assert_eq!(second_y, first_y + font.line_height());
    }

    #[test]
    fn space_advances_without_emitting_geometry() {
        let font = test_font();
        let mut cursor = GlyphCursor::new(&font, 0.0, 0.0);
        assert!(cursor.advance(' ').is_none());
        let (_, gx, _) = cursor.advance('!').unwrap();
        assert_eq!(gx, 5.0 + 1.0); // space advance + offset_x
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = rasterize_atlas(&[0u8; 64], 24.0).unwrap_err();
        assert!(matches!(err, RenderError::FontParse { .. }));
    }

    #[test]
    fn non_positive_size_is_rejected() {
        assert!(rasterize_atlas(&[], 0.0).is_err());
        assert!(rasterize_atlas(&[], -12.0).is_err());
    }
}

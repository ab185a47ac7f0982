//! Watermark layout and compositing.
//!
//! Layout is pure: [`anchor`] resolves one of nine [`Position`]s to a point
//! and alignment using 5% of the image dimensions as edge padding, and
//! [`layout_text`] turns a watermark string into positioned draw runs. Only
//! [`Watermark::apply`] touches pixels.
//!
//! Two kinds are supported:
//!
//! - **Image**: an overlay scaled to a percentage of the target width, with
//!   opacity approximated by a brightness shift.
//! - **Text**: a leading `©` drawn in a symbol font followed by the rest of
//!   the text in a larger script font. Widths are estimated as
//!   `chars × size × 0.5` rather than measured.

use crate::config::{WatermarkConfig, WatermarkKind};
use ab_glyph::FontVec;
use image::{DynamicImage, Rgba, RgbaImage, imageops};
use imageproc::drawing::draw_text_mut;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fraction of the image width/height kept clear at the edges.
const EDGE_PADDING: f64 = 0.05;
/// Estimated advance of one character, as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f64 = 0.5;
/// Script font size relative to the symbol font.
const SCRIPT_SCALE: f64 = 1.5;
const COPYRIGHT: char = '©';

/// Where on the image the watermark is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    #[serde(alias = "middle-center")]
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// A resolved anchor point and how content hangs off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
    pub h_align: HAlign,
    pub v_align: VAlign,
}

impl Position {
    fn alignment(self) -> (HAlign, VAlign) {
        use HAlign::*;
        use VAlign::*;
        match self {
            Position::TopLeft => (Left, Top),
            Position::TopCenter => (HAlign::Center, Top),
            Position::TopRight => (Right, Top),
            Position::MiddleLeft => (Left, Middle),
            Position::Center => (HAlign::Center, Middle),
            Position::MiddleRight => (Right, Middle),
            Position::BottomLeft => (Left, Bottom),
            Position::BottomCenter => (HAlign::Center, Bottom),
            Position::BottomRight => (Right, Bottom),
        }
    }
}

/// Resolve `position` on a `width`×`height` image.
///
/// ```
/// # use darkroom::imaging::watermark::{anchor, Position, HAlign, VAlign};
/// let a = anchor(Position::BottomRight, 1000, 800);
/// assert_eq!((a.x, a.y), (950, 760));
/// assert_eq!((a.h_align, a.v_align), (HAlign::Right, VAlign::Bottom));
/// ```
pub fn anchor(position: Position, width: u32, height: u32) -> Anchor {
    let pad_x = (width as f64 * EDGE_PADDING).round() as i32;
    let pad_y = (height as f64 * EDGE_PADDING).round() as i32;
    let (h_align, v_align) = position.alignment();
    let x = match h_align {
        HAlign::Left => pad_x,
        HAlign::Center => width as i32 / 2,
        HAlign::Right => width as i32 - pad_x,
    };
    let y = match v_align {
        VAlign::Top => pad_y,
        VAlign::Middle => height as i32 / 2,
        VAlign::Bottom => height as i32 - pad_y,
    };
    Anchor {
        x,
        y,
        h_align,
        v_align,
    }
}

/// Top-left corner for a `w`×`h` box hung off `anchor`.
fn place(anchor: Anchor, w: i32, h: i32) -> (i32, i32) {
    let x = match anchor.h_align {
        HAlign::Left => anchor.x,
        HAlign::Center => anchor.x - w / 2,
        HAlign::Right => anchor.x - w,
    };
    let y = match anchor.v_align {
        VAlign::Top => anchor.y,
        VAlign::Middle => anchor.y - h / 2,
        VAlign::Bottom => anchor.y - h,
    };
    (x, y)
}

/// Which of the two watermark fonts a run is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    Symbol,
    Script,
}

/// One `draw_text` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font: FontRole,
    pub x: i32,
    pub y: i32,
    pub size: f32,
}

fn estimated_width(text: &str, size: f64) -> i32 {
    (text.chars().count() as f64 * size * CHAR_WIDTH_FACTOR).round() as i32
}

/// Lay out a text watermark.
///
/// `base_size` is the symbol font size; the script font is drawn larger.
/// `symbol_available`/`script_available` report which fonts loaded. With both
/// present and a leading `©`, left and right alignments produce two adjacent
/// runs (glyph, then name); every other case is a single run.
pub fn layout_text(
    text: &str,
    anchor: Anchor,
    base_size: f64,
    symbol_available: bool,
    script_available: bool,
) -> Vec<TextRun> {
    let script_size = base_size * SCRIPT_SCALE;
    let single = |font: FontRole, size: f64| {
        let (x, y) = place(anchor, estimated_width(text, size), size.round() as i32);
        vec![TextRun {
            text: text.to_string(),
            font,
            x,
            y,
            size: size as f32,
        }]
    };

    match (symbol_available, script_available) {
        (true, true) => {}
        (false, true) => return single(FontRole::Script, script_size),
        (true, false) => return single(FontRole::Symbol, base_size),
        (false, false) => return Vec::new(),
    }

    if anchor.h_align == HAlign::Center {
        return single(FontRole::Script, script_size);
    }
    let Some(rest) = text.strip_prefix(COPYRIGHT) else {
        return single(FontRole::Script, script_size);
    };
    let rest = rest.trim_start();
    let glyph = COPYRIGHT.to_string();

    let glyph_w = estimated_width(&glyph, base_size);
    let gap = (base_size * CHAR_WIDTH_FACTOR / 2.0).round() as i32;
    let rest_w = estimated_width(rest, script_size);
    let line_h = script_size.round() as i32;
    let (left, top) = place(anchor, glyph_w + gap + rest_w, line_h);
    // Baseline the smaller glyph against the script line.
    let glyph_top = top + (line_h - base_size.round() as i32);

    vec![
        TextRun {
            text: glyph,
            font: FontRole::Symbol,
            x: left,
            y: glyph_top,
            size: base_size as f32,
        },
        TextRun {
            text: rest.to_string(),
            font: FontRole::Script,
            x: left + glyph_w + gap,
            y: top,
            size: script_size as f32,
        },
    ]
}

fn load_font(path: Option<&std::path::Path>) -> Option<FontVec> {
    let path = path?;
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Watermark font unavailable");
            return None;
        }
    };
    match FontVec::try_from_vec(data) {
        Ok(font) => Some(font),
        Err(_) => {
            warn!(path = %path.display(), "Watermark font could not be parsed");
            None
        }
    }
}

/// A watermark ready to composite. Built once per operation from config.
pub enum Watermark {
    Image {
        overlay: RgbaImage,
        size_percent: u32,
        opacity: f32,
        position: Position,
    },
    Text {
        text: String,
        symbol_font: Option<FontVec>,
        script_font: Option<FontVec>,
        size_percent: u32,
        opacity: f32,
        position: Position,
    },
}

impl Watermark {
    /// Build the watermark described by `config`.
    ///
    /// Returns `None` when watermarking is disabled or the configuration is
    /// unusable (missing overlay image, empty text, no loadable font).
    pub fn from_config(config: &WatermarkConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        match config.kind {
            WatermarkKind::Image => {
                let path = config.image.as_deref()?;
                match image::open(path) {
                    Ok(img) => Some(Self::Image {
                        overlay: img.to_rgba8(),
                        size_percent: config.size_percent,
                        opacity: config.opacity,
                        position: config.position,
                    }),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Watermark image unavailable");
                        None
                    }
                }
            }
            WatermarkKind::Text => {
                if config.text.trim().is_empty() {
                    return None;
                }
                let symbol_font = load_font(config.symbol_font.as_deref());
                let script_font = load_font(config.script_font.as_deref());
                if symbol_font.is_none() && script_font.is_none() {
                    warn!("No watermark font could be loaded; watermark skipped");
                    return None;
                }
                Some(Self::Text {
                    text: config.text.clone(),
                    symbol_font,
                    script_font,
                    size_percent: config.text_size_percent,
                    opacity: config.opacity,
                    position: config.position,
                })
            }
        }
    }

    /// Composite the watermark onto a copy of `img`.
    pub fn apply(&self, img: &DynamicImage) -> DynamicImage {
        let mut canvas = img.to_rgba8();
        let (width, height) = canvas.dimensions();
        match self {
            Self::Image {
                overlay,
                size_percent,
                opacity,
                position,
            } => {
                let target_w = ((width as u64 * *size_percent as u64) / 100).max(1) as u32;
                let target_h = ((overlay.height() as u64 * target_w as u64)
                    / overlay.width().max(1) as u64)
                    .max(1) as u32;
                let scaled =
                    imageops::resize(overlay, target_w, target_h, imageops::FilterType::Lanczos3);
                let shift = ((1.0 - opacity.clamp(0.0, 1.0)) * 128.0).round() as i32;
                let shaded = imageops::colorops::brighten(&scaled, shift);
                let (x, y) = place(
                    anchor(*position, width, height),
                    target_w as i32,
                    target_h as i32,
                );
                debug!(x, y, target_w, target_h, "Compositing image watermark");
                imageops::overlay(&mut canvas, &shaded, x as i64, y as i64);
            }
            Self::Text {
                text,
                symbol_font,
                script_font,
                size_percent,
                opacity,
                position,
            } => {
                let base_size = (width as f64 * *size_percent as f64 / 100.0).max(8.0);
                let runs = layout_text(
                    text,
                    anchor(*position, width, height),
                    base_size,
                    symbol_font.is_some(),
                    script_font.is_some(),
                );
                let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
                let color = Rgba([255, 255, 255, alpha]);
                let mut layer = RgbaImage::new(width, height);
                for run in &runs {
                    let font = match run.font {
                        FontRole::Symbol => symbol_font.as_ref(),
                        FontRole::Script => script_font.as_ref(),
                    };
                    if let Some(font) = font {
                        draw_text_mut(&mut layer, color, run.x, run.y, run.size, font, &run.text);
                    }
                }
                imageops::overlay(&mut canvas, &layer, 0, 0);
            }
        }

        if img.color().has_alpha() {
            DynamicImage::ImageRgba8(canvas)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
        }
    }
}

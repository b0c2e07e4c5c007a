//! Content stream interpretation.
//!
//! Walks a page's decoded operations while tracking the graphics and text
//! state, and records three kinds of marks: positioned text runs, painted
//! vector paths and image placements. All output geometry is converted to
//! the top-left-origin page space used throughout the crate.

use crate::error::Result;
use crate::model::BBox;

use super::backend::{
    decode_text_simple, get_number_from_value, ContentOp, FontResolver, PageBox, PageId,
    PdfBackend, PdfValue, XObject,
};

/// Form XObjects nested deeper than this are ignored.
const MAX_FORM_DEPTH: usize = 8;

/// Advance estimate (in em) for fonts without declared widths.
const AVERAGE_GLYPH_WIDTH: f32 = 0.5;

/// TJ adjustments larger than this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Affine transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn from_array(m: [f32; 6]) -> Self {
        Self::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }

    /// `self` applied first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed vertical unit vector.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// A positioned piece of text from one show-text operation.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Left edge
    pub x: f32,
    /// Baseline, measured from the page top
    pub baseline: f32,
    pub width: f32,
    pub font_size: f32,
    /// Base font name, e.g. "Helvetica-Bold"
    pub font_name: String,
}

impl TextRun {
    /// Approximate glyph box from the baseline and font size.
    pub fn bbox(&self) -> BBox {
        BBox::new(
            self.x,
            self.baseline - self.font_size * 0.8,
            self.x + self.width.max(0.0),
            self.baseline + self.font_size * 0.2,
        )
    }
}

/// A straight segment of a painted path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// A painted vector path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathShape {
    pub bbox: BBox,
    /// Straight segments, including rectangle sides
    pub segments: Vec<Segment>,
}

/// An image drawn on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    pub bbox: BBox,
    pub ref_id: u32,
    pub width: u32,
    pub height: u32,
}

/// Everything marked on one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub runs: Vec<TextRun>,
    pub paths: Vec<PathShape>,
    pub images: Vec<ImagePlacement>,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    font_name: String,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            font_name: String::new(),
            size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Resolver used when a page's fonts cannot be read.
struct PlainFonts;

impl FontResolver for PlainFonts {
    fn decode(&self, _font: &[u8], bytes: &[u8]) -> String {
        decode_text_simple(bytes)
    }

    fn advance(&self, _font: &[u8], _bytes: &[u8]) -> Option<f32> {
        None
    }

    fn base_font(&self, _font: &[u8]) -> Option<String> {
        None
    }
}

/// Interprets the content stream of one page.
pub struct ContentInterpreter<'a> {
    backend: &'a dyn PdfBackend,
    page: PageId,
    page_box: PageBox,
    fonts: Box<dyn FontResolver + 'a>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    points: Vec<(f32, f32)>,
    segments: Vec<Segment>,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
    inline_images: u32,
    out: PageContent,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(backend: &'a dyn PdfBackend, page: PageId) -> Self {
        let fonts: Box<dyn FontResolver + 'a> = match backend.fonts(page) {
            Ok(fonts) => fonts,
            Err(e) => {
                log::warn!("Fonts unavailable, using plain decoding: {}", e);
                Box::new(PlainFonts)
            }
        };
        Self {
            backend,
            page,
            page_box: backend.page_box(page),
            fonts,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::identity(),
            line_matrix: Matrix::identity(),
            points: Vec::new(),
            segments: Vec::new(),
            current: None,
            subpath_start: None,
            inline_images: 0,
            out: PageContent::default(),
        }
    }

    /// Interpret the page's content stream.
    pub fn run(mut self) -> Result<PageContent> {
        let data = self.backend.page_content(self.page)?;
        let ops = self.backend.decode_content(&data)?;
        self.execute(&ops, 0);
        Ok(self.out)
    }

    fn execute(&mut self, ops: &[ContentOp], depth: usize) {
        for op in ops {
            match op.operator.as_str() {
                // Graphics state
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(saved) = self.stack.pop() {
                        self.state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = op.numbers(6) {
                        let m = Matrix::new(m[0], m[1], m[2], m[3], m[4], m[5]);
                        self.state.ctm = m.then(&self.state.ctm);
                    }
                }

                // Text objects and state
                "BT" => {
                    self.text_matrix = Matrix::identity();
                    self.line_matrix = Matrix::identity();
                }
                "ET" => {}
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        self.state.text.font_name = self
                            .fonts
                            .base_font(name)
                            .unwrap_or_else(|| String::from_utf8_lossy(name).to_string());
                        self.state.text.font = name.clone();
                    }
                    if let Some(size) = op.number(1) {
                        self.state.text.size = size;
                    }
                }
                "Tc" => self.state.text.char_spacing = op.number(0).unwrap_or(0.0),
                "Tw" => self.state.text.word_spacing = op.number(0).unwrap_or(0.0),
                "Tz" => self.state.text.horizontal_scale = op.number(0).unwrap_or(100.0) / 100.0,
                "TL" => self.state.text.leading = op.number(0).unwrap_or(0.0),
                "Ts" => self.state.text.rise = op.number(0).unwrap_or(0.0),
                "Td" => {
                    if let Some(t) = op.numbers(2) {
                        self.move_line(t[0], t[1]);
                    }
                }
                "TD" => {
                    if let Some(t) = op.numbers(2) {
                        self.state.text.leading = -t[1];
                        self.move_line(t[0], t[1]);
                    }
                }
                "Tm" => {
                    if let Some(m) = op.numbers(6) {
                        self.line_matrix = Matrix::new(m[0], m[1], m[2], m[3], m[4], m[5]);
                        self.text_matrix = self.line_matrix;
                    }
                }
                "T*" => self.next_line(),

                // Text showing
                "Tj" => {
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        self.show_text(&[PdfValue::Str(bytes.clone())]);
                    }
                }
                "TJ" => {
                    if let Some(PdfValue::Array(items)) = op.operands.first() {
                        self.show_text(items);
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        self.show_text(&[PdfValue::Str(bytes.clone())]);
                    }
                }
                "\"" => {
                    if let Some(w) = op.number(0) {
                        self.state.text.word_spacing = w;
                    }
                    if let Some(c) = op.number(1) {
                        self.state.text.char_spacing = c;
                    }
                    self.next_line();
                    if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                        self.show_text(&[PdfValue::Str(bytes.clone())]);
                    }
                }

                // Path construction
                "m" => {
                    if let Some(p) = op.numbers(2) {
                        let pt = self.to_device(p[0], p[1]);
                        self.points.push(pt);
                        self.current = Some(pt);
                        self.subpath_start = Some(pt);
                    }
                }
                "l" => {
                    if let Some(p) = op.numbers(2) {
                        let pt = self.to_device(p[0], p[1]);
                        self.line_to(pt);
                    }
                }
                "c" => {
                    if let Some(p) = op.numbers(6) {
                        self.curve_to(&[(p[0], p[1]), (p[2], p[3]), (p[4], p[5])]);
                    }
                }
                "v" | "y" => {
                    if let Some(p) = op.numbers(4) {
                        self.curve_to(&[(p[0], p[1]), (p[2], p[3])]);
                    }
                }
                "h" => self.close_subpath(),
                "re" => {
                    if let Some(r) = op.numbers(4) {
                        self.rectangle(r[0], r[1], r[2], r[3]);
                    }
                }

                // Path painting
                "S" | "f" | "F" | "f*" | "B" | "B*" => self.paint(),
                "s" | "b" | "b*" => {
                    self.close_subpath();
                    self.paint();
                }
                "n" => self.clear_path(),

                // External objects
                "Do" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        self.draw_xobject(name, depth);
                    }
                }
                "BI" => {
                    self.inline_images += 1;
                    let ref_id = u32::MAX - self.inline_images;
                    self.place_image(ref_id, 0, 0);
                }
                _ => {}
            }
        }
    }

    // -- text -------------------------------------------------------------

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.state.text.leading != 0.0 {
            self.state.text.leading
        } else {
            self.state.text.size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    /// Show strings and kerning adjustments as one run.
    fn show_text(&mut self, items: &[PdfValue]) {
        let text_state = self.state.text.clone();
        let start = self.text_matrix;
        let mut combined = String::new();

        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let decoded = self.fonts.decode(&text_state.font, bytes);
                    let tx = self.advance(&text_state, bytes, &decoded);
                    combined.push_str(&decoded);
                    self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
                }
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let adjustment = get_number_from_value(item).unwrap_or(0.0);
                    let tx = -adjustment / 1000.0 * text_state.size * text_state.horizontal_scale;
                    self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
                    if -adjustment > TJ_SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(' ')
                    {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }

        if combined.trim().is_empty() {
            return;
        }

        let rendering = Matrix::translation(0.0, text_state.rise);
        let origin = rendering.then(&start).then(&self.state.ctm);
        let end = rendering.then(&self.text_matrix).then(&self.state.ctm);
        let (x0, y0) = origin.apply(0.0, 0.0);
        let (x1, _) = end.apply(0.0, 0.0);
        let font_size = text_state.size * origin.vertical_scale();
        let (left, baseline) = self.to_page(x0.min(x1), y0);

        self.out.runs.push(TextRun {
            text: combined,
            x: left,
            baseline,
            width: (x1 - x0).abs(),
            font_size,
            font_name: text_state.font_name.clone(),
        });
    }

    /// Horizontal displacement in text space for one string operand.
    fn advance(&self, ts: &TextState, bytes: &[u8], decoded: &str) -> f32 {
        let spaces = bytes.iter().filter(|&&b| b == b' ').count() as f32;
        let glyphs = match self.fonts.advance(&ts.font, bytes) {
            Some(width) => width / 1000.0 * ts.size,
            None => decoded.chars().count() as f32 * AVERAGE_GLYPH_WIDTH * ts.size,
        };
        let count = decoded.chars().count() as f32;
        (glyphs + ts.char_spacing * count + ts.word_spacing * spaces) * ts.horizontal_scale
    }

    // -- paths ------------------------------------------------------------

    fn to_device(&self, x: f32, y: f32) -> (f32, f32) {
        self.state.ctm.apply(x, y)
    }

    /// User space to top-left page space.
    fn to_page(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.page_box.x0, self.page_box.y1 - y)
    }

    fn line_to(&mut self, pt: (f32, f32)) {
        if let Some(from) = self.current {
            self.segments.push(Segment {
                x1: from.0,
                y1: from.1,
                x2: pt.0,
                y2: pt.1,
            });
        }
        self.points.push(pt);
        self.current = Some(pt);
        if self.subpath_start.is_none() {
            self.subpath_start = Some(pt);
        }
    }

    fn curve_to(&mut self, controls: &[(f32, f32)]) {
        for &(x, y) in controls {
            let pt = self.to_device(x, y);
            self.points.push(pt);
            self.current = Some(pt);
        }
    }

    fn close_subpath(&mut self) {
        if let (Some(from), Some(to)) = (self.current, self.subpath_start) {
            if from != to {
                self.segments.push(Segment {
                    x1: from.0,
                    y1: from.1,
                    x2: to.0,
                    y2: to.1,
                });
            }
            self.current = Some(to);
        }
    }

    fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let corners = [
            self.to_device(x, y),
            self.to_device(x + w, y),
            self.to_device(x + w, y + h),
            self.to_device(x, y + h),
        ];
        for i in 0..4 {
            let (a, b) = (corners[i], corners[(i + 1) % 4]);
            self.segments.push(Segment {
                x1: a.0,
                y1: a.1,
                x2: b.0,
                y2: b.1,
            });
        }
        self.points.extend_from_slice(&corners);
        self.current = Some(corners[0]);
        self.subpath_start = Some(corners[0]);
    }

    fn paint(&mut self) {
        let points: Vec<(f32, f32)> = self
            .points
            .iter()
            .map(|&(x, y)| self.to_page(x, y))
            .collect();
        if let Some(bbox) = BBox::from_points(&points) {
            let segments = self
                .segments
                .iter()
                .map(|s| {
                    let (x1, y1) = self.to_page(s.x1, s.y1);
                    let (x2, y2) = self.to_page(s.x2, s.y2);
                    Segment { x1, y1, x2, y2 }
                })
                .collect();
            self.out.paths.push(PathShape { bbox, segments });
        }
        self.clear_path();
    }

    fn clear_path(&mut self) {
        self.points.clear();
        self.segments.clear();
        self.current = None;
        self.subpath_start = None;
    }

    // -- XObjects ---------------------------------------------------------

    fn draw_xobject(&mut self, name: &[u8], depth: usize) {
        match self.backend.xobject(self.page, name) {
            Some(XObject::Image { id, width, height }) => self.place_image(id, width, height),
            Some(XObject::Form { content, matrix }) => {
                if depth >= MAX_FORM_DEPTH {
                    log::debug!("Form XObject nesting limit reached, skipping");
                    return;
                }
                let ops = match self.backend.decode_content(&content) {
                    Ok(ops) => ops,
                    Err(e) => {
                        log::debug!("Skipping undecodable form XObject: {}", e);
                        return;
                    }
                };
                self.stack.push(self.state.clone());
                self.state.ctm = Matrix::from_array(matrix).then(&self.state.ctm);
                self.execute(&ops, depth + 1);
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            None => {}
        }
    }

    /// Images occupy the unit square mapped through the CTM.
    fn place_image(&mut self, ref_id: u32, width: u32, height: u32) {
        let corners: Vec<(f32, f32)> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| {
                let (dx, dy) = self.to_device(x, y);
                self.to_page(dx, dy)
            })
            .collect();
        if let Some(bbox) = BBox::from_points(&corners) {
            self.out.images.push(ImagePlacement {
                bbox,
                ref_id,
                width,
                height,
            });
        }
    }
}

//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from content interpretation.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::TocEntry;

use super::outline;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Nesting limit when walking inherited page attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// A value from a PDF content stream operand.
#[derive(Debug, Clone)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// Numeric operand at `index`.
    pub fn number(&self, index: usize) -> Option<f32> {
        self.operands.get(index).and_then(get_number_from_value)
    }

    /// All operands as numbers, or `None` if fewer than `n` numeric operands exist.
    pub fn numbers(&self, n: usize) -> Option<Vec<f32>> {
        if self.operands.len() < n {
            return None;
        }
        self.operands[..n].iter().map(get_number_from_value).collect()
    }
}

/// Page boundary in PDF user space (y grows upward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageBox {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// US Letter, used when a page declares no usable MediaBox.
    pub fn letter() -> Self {
        Self {
            x0: 0.0,
            y0: 0.0,
            x1: 612.0,
            y1: 792.0,
        }
    }
}

/// An external object referenced by a `Do` operator.
#[derive(Debug, Clone)]
pub enum XObject {
    /// Raster image stream
    Image { id: u32, width: u32, height: u32 },
    /// Form XObject with its decoded content and form matrix
    Form { content: Vec<u8>, matrix: [f32; 6] },
}

/// Per-page font access: text decoding and glyph advance widths.
pub trait FontResolver {
    /// Decode a string operand shown with `font`.
    fn decode(&self, font: &[u8], bytes: &[u8]) -> String;

    /// Sum of glyph advances for `bytes` in thousandths of an em, if the font declares widths.
    fn advance(&self, font: &[u8], bytes: &[u8]) -> Option<f32>;

    /// Base font name, e.g. "Helvetica-Bold".
    fn base_font(&self, font: &[u8]) -> Option<String>;
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, page boxes, fonts, content stream
/// decoding, XObject lookup and the outline without exposing concrete PDF
/// library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return the page's MediaBox, following inheritance.
    fn page_box(&self, page: PageId) -> PageBox;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Font access for one page.
    fn fonts<'a>(&'a self, page: PageId) -> Result<Box<dyn FontResolver + 'a>>;

    /// Resolve a named XObject in the page's resources.
    fn xobject(&self, page: PageId, name: &[u8]) -> Option<XObject>;

    /// Flattened document outline in depth-first order.
    fn outline(&self) -> Result<Vec<TocEntry>>;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Self::checked(doc)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Self::checked(doc)
    }

    fn checked(doc: LopdfDocument) -> Result<Self> {
        // Documents lopdf could not decrypt fail at load time with `Error::Encrypted`;
        // the rest (empty user password) are readable.
        if doc.is_encrypted() {
            log::debug!("Document is encrypted with an empty user password");
        }
        if doc.get_pages().is_empty() {
            return Err(Error::PdfParse("document has no pages".to_string()));
        }
        Ok(Self { doc })
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Follow a reference to its target object.
    pub(crate) fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        let mut current = obj;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            match current {
                Object::Reference(id) => match self.doc.get_object(*id) {
                    Ok(target) => current = target,
                    Err(_) => return current,
                },
                _ => return current,
            }
        }
        current
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj) {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, walking up the page tree for inherited keys.
    fn inherited<'a>(&'a self, page: PageId, key: &[u8]) -> Option<&'a Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            let parent = dict.get(b"Parent").ok()?;
            dict = self.resolve_dict(parent)?;
        }
        None
    }

    fn page_resources(&self, page: PageId) -> Option<&Dictionary> {
        self.inherited(page, b"Resources")
            .and_then(|r| self.resolve_dict(r))
    }

    fn number(&self, obj: &Object) -> Option<f32> {
        match self.resolve(obj) {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_box(&self, page: PageId) -> PageBox {
        let values: Option<Vec<f32>> = self
            .inherited(page, b"MediaBox")
            .and_then(|obj| match self.resolve(obj) {
                Object::Array(arr) if arr.len() >= 4 => {
                    arr.iter().take(4).map(|o| self.number(o)).collect()
                }
                _ => None,
            });

        match values {
            Some(v) if (v[2] - v[0]).abs() > 1.0 && (v[3] - v[1]).abs() > 1.0 => PageBox {
                x0: v[0].min(v[2]),
                y0: v[1].min(v[3]),
                x1: v[0].max(v[2]),
                y1: v[1].max(v[3]),
            },
            _ => PageBox::letter(),
        }
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            // A page without content is blank, not broken.
            Err(_) => return Ok(Vec::new()),
        };

        match self.resolve(contents) {
            Object::Stream(s) => s
                .decompressed_content()
                .or_else(|_| Ok(s.content.clone()))
                .map_err(|e: lopdf::Error| Error::PdfParse(e.to_string())),
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Object::Stream(s) = self.resolve(obj) {
                        match s.decompressed_content() {
                            Ok(data) => content.extend_from_slice(&data),
                            Err(_) => content.extend_from_slice(&s.content),
                        }
                        content.push(b'\n');
                    }
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content = lopdf::content::Content::decode(data)
            .map_err(|e| Error::ContentStream(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn fonts<'a>(&'a self, page: PageId) -> Result<Box<dyn FontResolver + 'a>> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let widths = fonts
            .iter()
            .map(|(name, dict)| (name.clone(), self.font_widths(dict)))
            .collect();

        Ok(Box::new(LopdfFonts {
            backend: self,
            fonts,
            widths,
        }))
    }

    fn xobject(&self, page: PageId, name: &[u8]) -> Option<XObject> {
        let resources = self.page_resources(page)?;
        let xobjects = self.resolve_dict(resources.get(b"XObject").ok()?)?;
        let reference = xobjects.get(name).ok()?;
        let id = reference.as_reference().ok().map(|(num, _)| num).unwrap_or(0);

        let stream = match self.resolve(reference) {
            Object::Stream(s) => s,
            _ => return None,
        };
        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name_str().ok())
            .unwrap_or("");

        match subtype {
            "Image" => {
                let dim = |key: &[u8]| {
                    stream
                        .dict
                        .get(key)
                        .ok()
                        .and_then(|v| self.number(v))
                        .map(|v| v.max(0.0) as u32)
                        .unwrap_or(0)
                };
                Some(XObject::Image {
                    id,
                    width: dim(b"Width"),
                    height: dim(b"Height"),
                })
            }
            "Form" => {
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let mut matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                if let Some(Object::Array(arr)) = stream.dict.get(b"Matrix").ok().map(|m| self.resolve(m)) {
                    for (slot, value) in matrix.iter_mut().zip(arr.iter()) {
                        if let Some(v) = self.number(value) {
                            *slot = v;
                        }
                    }
                }
                Some(XObject::Form { content, matrix })
            }
            _ => None,
        }
    }

    fn outline(&self) -> Result<Vec<TocEntry>> {
        outline::extract_outline(self)
    }
}

/// Declared glyph widths of a simple font.
#[derive(Debug, Clone, Default)]
struct FontWidths {
    first_char: u32,
    widths: Vec<f32>,
    missing: f32,
    two_byte: bool,
}

impl LopdfBackend {
    fn font_widths(&self, font: &Dictionary) -> FontWidths {
        let two_byte = font
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name_str().ok())
            .map(|s| s == "Type0")
            .unwrap_or(false);

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|v| self.number(v))
            .map(|v| v.max(0.0) as u32)
            .unwrap_or(0);

        let widths = match font.get(b"Widths").ok().map(|w| self.resolve(w)) {
            Some(Object::Array(arr)) => arr
                .iter()
                .map(|w| self.number(w).unwrap_or(0.0))
                .collect(),
            _ => Vec::new(),
        };

        let missing = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| self.resolve_dict(d))
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|v| self.number(v))
            .unwrap_or(0.0);

        FontWidths {
            first_char,
            widths,
            missing,
            two_byte,
        }
    }
}

/// [`FontResolver`] over a page's lopdf font dictionaries.
struct LopdfFonts<'a> {
    backend: &'a LopdfBackend,
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    widths: BTreeMap<Vec<u8>, FontWidths>,
}

impl FontResolver for LopdfFonts<'_> {
    fn decode(&self, font: &[u8], bytes: &[u8]) -> String {
        if let Some(font_dict) = self.fonts.get(font) {
            if let Ok(enc) = font_dict.get_font_encoding(&self.backend.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn advance(&self, font: &[u8], bytes: &[u8]) -> Option<f32> {
        let widths = self.widths.get(font)?;
        if widths.two_byte || widths.widths.is_empty() {
            return None;
        }
        let total = bytes
            .iter()
            .map(|&b| {
                (b as u32)
                    .checked_sub(widths.first_char)
                    .and_then(|i| widths.widths.get(i as usize).copied())
                    .unwrap_or(widths.missing)
            })
            .sum();
        Some(total)
    }

    fn base_font(&self, font: &[u8]) -> Option<String> {
        self.fonts
            .get(font)
            .and_then(|d| d.get(b"BaseFont").ok())
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

/// Helper: an object id's page number in a page map.
pub(crate) fn page_number_of(pages: &BTreeMap<u32, PageId>, id: ObjectId) -> Option<u32> {
    pages
        .iter()
        .find(|(_, page_id)| **page_id == id)
        .map(|(num, _)| *num)
}

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::LayoutConfig;
use crate::error::{OutlineError, Result};
use crate::fonts::{standard_font, StandardFont};
use crate::logging::OUTLINE_PARSE;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// One run of glyphs shown by a single text-showing operator.
///
/// `bbox` is `(x0, y0, x1, y1)` in top-down page coordinates: `y0` is the top
/// edge and grows towards the bottom of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub font_name: String,
    pub font_size: f32,
    pub bbox: (f32, f32, f32, f32),
    /// Runs sharing a baseline on a page share a line group.
    pub line_id: u32,
}

impl fmt::Display for TextRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" {:?} {}pt {} (line {})",
            self.text, self.bbox, self.font_size, self.font_name, self.line_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// 1-based page number.
    pub number: u32,
    pub width: f32,
    pub height: f32,
    pub runs: Vec<TextRun>,
}

/// Everything the line reconstructor needs from a PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub pages: Vec<RawPage>,
}

impl RawDocument {
    pub fn run_count(&self) -> usize {
        self.pages.iter().map(|p| p.runs.len()).sum()
    }
}

pub fn load_pdf<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    Document::load(path).map_err(|e| {
        OutlineError::Extraction(format!("Failed to open PDF {}: {}", path.display(), e))
    })
}

pub fn load_pdf_mem(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes)
        .map_err(|e| OutlineError::Extraction(format!("Failed to open PDF: {}", e)))
}

pub fn read_document(bytes: &[u8], config: &LayoutConfig) -> Result<RawDocument> {
    let doc = load_pdf_mem(bytes)?;
    get_pdf_runs(&doc, config)
}

/// Interpret every page's content stream and collect its text runs.
pub fn get_pdf_runs(doc: &Document, config: &LayoutConfig) -> Result<RawDocument> {
    let mut pages = Vec::new();
    for (page_num, page_id) in doc.get_pages() {
        let page = get_page_runs(doc, page_num, page_id, config).map_err(|e| {
            OutlineError::Extraction(format!(
                "Failed to extract text from page {page_num} id={page_id:?}: {e}"
            ))
        })?;
        debug!(
            target: OUTLINE_PARSE,
            page = page_num,
            runs = page.runs.len(),
            "Read page content"
        );
        pages.push(page);
    }
    let raw = RawDocument { pages };
    debug!(
        target: OUTLINE_PARSE,
        pages = raw.pages.len(),
        runs = raw.run_count(),
        "Read document"
    );
    Ok(raw)
}

#[derive(Clone, Debug)]
struct GraphicsState {
    ctm: [f32; 6],
    text_state: TextState,
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            ctm: IDENTITY,
            text_state: TextState::default(),
        }
    }
}

#[derive(Clone, Debug)]
struct TextState {
    text_matrix: [f32; 6],      // Tm
    text_line_matrix: [f32; 6], // Tlm
    font_key: Option<Vec<u8>>,
    font_size: f32,
    character_spacing: f32,  // Tc
    word_spacing: f32,       // Tw
    horizontal_scaling: f32, // Tz, as a fraction
    leading: f32,            // TL
    rise: f32,               // Ts
}

impl Default for TextState {
    fn default() -> Self {
        TextState {
            text_matrix: IDENTITY,
            text_line_matrix: IDENTITY,
            font_key: None,
            font_size: 0.0,
            character_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

impl TextState {
    fn begin_text(&mut self) {
        self.text_matrix = IDENTITY;
        self.text_line_matrix = IDENTITY;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.text_matrix = multiply_matrices(&translate_matrix(tx, ty), &self.text_line_matrix);
        self.text_line_matrix = self.text_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = multiply_matrices(&translate_matrix(tx, 0.0), &self.text_matrix);
    }
}

/// Font data resolved once per page.
struct PageFont<'a> {
    base_font: String,
    encoding: Option<Encoding<'a>>,
    first_char: i64,
    widths: Vec<f32>,
    /// Built-in metrics for standard fonts shipped without `/Widths`.
    standard: Option<StandardFont>,
}

impl PageFont<'_> {
    fn glyph_width(&self, code: u8) -> f32 {
        let idx = code as i64 - self.first_char;
        let explicit = usize::try_from(idx)
            .ok()
            .and_then(|i| self.widths.get(i).copied())
            .filter(|w| *w > 0.0);
        explicit
            .or_else(|| self.standard.and_then(|font| font.width(code)))
            .unwrap_or(DEFAULT_GLYPH_WIDTH)
    }

    fn decode(&self, bytes: &[u8]) -> String {
        self.encoding
            .as_ref()
            .and_then(|enc| Document::decode_text(enc, bytes).ok())
            .unwrap_or_else(|| decode_text_simple(bytes))
    }
}

/// Per-page collector that assigns line groups as runs are emitted.
struct RunCollector<'c> {
    page_height: f32,
    origin: (f32, f32),
    config: &'c LayoutConfig,
    runs: Vec<TextRun>,
    line_id: u32,
    last_baseline: Option<f32>,
}

impl RunCollector<'_> {
    fn push(&mut self, text: String, font_name: String, font_size: f32, x0: f32, x1: f32, y: f32) {
        if text.is_empty() {
            return;
        }
        let x0 = x0 - self.origin.0;
        let x1 = x1 - self.origin.0;
        let baseline = self.page_height - (y - self.origin.1);

        match self.last_baseline {
            Some(prev) if (prev - baseline).abs() < self.config.line_join_threshold => {}
            Some(_) => self.line_id += 1,
            None => {}
        }
        self.last_baseline = Some(baseline);

        let run = TextRun {
            text,
            font_name,
            font_size,
            bbox: (x0.min(x1), baseline - font_size, x0.max(x1), baseline),
            line_id: self.line_id,
        };
        trace!(target: OUTLINE_PARSE, "{}", run);
        self.runs.push(run);
    }
}

fn get_page_runs(
    doc: &Document,
    page_number: u32,
    page_id: ObjectId,
    config: &LayoutConfig,
) -> Result<RawPage> {
    let media_box = page_media_box(doc, page_id);
    let width = (media_box[2] - media_box[0]).abs();
    let height = (media_box[3] - media_box[1]).abs();

    let fonts = doc.get_page_fonts(page_id)?;
    let page_fonts: BTreeMap<Vec<u8>, PageFont> = fonts
        .iter()
        .map(|(name, dict)| (name.clone(), resolve_font(doc, dict)))
        .collect();

    let content = doc.get_and_decode_page_content(page_id)?;

    let mut collector = RunCollector {
        page_height: height,
        origin: (media_box[0].min(media_box[2]), media_box[1].min(media_box[3])),
        config,
        runs: Vec::new(),
        line_id: 0,
        last_baseline: None,
    };
    let mut gs_stack = vec![GraphicsState::default()];

    for op in &content.operations {
        handle_operator(&mut gs_stack, op, &page_fonts, &mut collector);
    }

    Ok(RawPage {
        number: page_number,
        width,
        height,
        runs: collector.runs,
    })
}

fn resolve_font<'a>(doc: &'a Document, dict: &'a Dictionary) -> PageFont<'a> {
    let base_font = dict
        .get(b"BaseFont")
        .and_then(Object::as_name)
        .map(|name| sanitize_font_name(&String::from_utf8_lossy(name)).to_string())
        .unwrap_or_default();

    let encoding = match dict.get_font_encoding(doc) {
        Ok(enc) => Some(enc),
        Err(e) => {
            warn!(target: OUTLINE_PARSE, font = %base_font, "Unsupported font encoding: {}", e);
            None
        }
    };

    let first_char = dict
        .get(b"FirstChar")
        .and_then(Object::as_i64)
        .unwrap_or(0);
    let widths = dict
        .get(b"Widths")
        .ok()
        .map(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        })
        .and_then(|obj| obj.as_array().ok())
        .map(|arr| arr.iter().map(operand_as_float).collect())
        .unwrap_or_default();

    let standard = standard_font(&base_font);
    PageFont {
        base_font,
        encoding,
        first_char,
        widths,
        standard,
    }
}

/// Look up MediaBox on the page or the nearest ancestor that carries one.
fn page_media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let mut current = doc.get_dictionary(page_id).ok();
    while let Some(dict) = current {
        if let Ok(arr) = dict.get(b"MediaBox").and_then(Object::as_array) {
            let mut media_box = [0.0; 4];
            for (i, obj) in arr.iter().take(4).enumerate() {
                media_box[i] = operand_as_float(obj);
            }
            return media_box;
        }
        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    DEFAULT_MEDIA_BOX
}

fn handle_operator(
    gs_stack: &mut Vec<GraphicsState>,
    op: &Operation,
    fonts: &BTreeMap<Vec<u8>, PageFont>,
    collector: &mut RunCollector,
) {
    match op.operator.as_str() {
        "q" => {
            if let Some(current) = gs_stack.last() {
                gs_stack.push(current.clone());
            }
            return;
        }
        "Q" => {
            if gs_stack.len() > 1 {
                gs_stack.pop();
            }
            return;
        }
        _ => {}
    }

    let Some(gs) = gs_stack.last_mut() else {
        return;
    };
    let ts = &mut gs.text_state;

    match op.operator.as_str() {
        "cm" => {
            let matrix = matrix_from_operands(op);
            gs.ctm = multiply_matrices(&matrix, &gs.ctm);
        }
        "BT" => ts.begin_text(),
        "Tf" => {
            if let (Some(Object::Name(name)), Some(size)) =
                (op.operands.first(), op.operands.get(1))
            {
                ts.font_key = Some(name.clone());
                ts.font_size = operand_as_float(size);
            }
        }
        "Tc" => ts.character_spacing = first_float(op),
        "Tw" => ts.word_spacing = first_float(op),
        "Tz" => ts.horizontal_scaling = first_float(op) / 100.0,
        "TL" => ts.leading = first_float(op),
        "Ts" => ts.rise = first_float(op),
        "Tm" => {
            let m = matrix_from_operands(op);
            ts.text_matrix = m;
            ts.text_line_matrix = m;
        }
        "Td" | "TD" => {
            if let (Some(tx), Some(ty)) = (op.operands.first(), op.operands.get(1)) {
                let (tx, ty) = (operand_as_float(tx), operand_as_float(ty));
                if op.operator == "TD" {
                    ts.leading = -ty;
                }
                ts.move_line(tx, ty);
            }
        }
        "T*" => ts.next_line(),
        "Tj" | "TJ" => show_text(gs, &op.operands, fonts, collector),
        "'" => {
            gs.text_state.next_line();
            show_text(gs, &op.operands, fonts, collector);
        }
        "\"" => {
            if op.operands.len() >= 3 {
                gs.text_state.word_spacing = operand_as_float(&op.operands[0]);
                gs.text_state.character_spacing = operand_as_float(&op.operands[1]);
                gs.text_state.next_line();
                show_text(gs, &op.operands[2..], fonts, collector);
            }
        }
        _ => {}
    }
}

fn show_text(
    gs: &mut GraphicsState,
    operands: &[Object],
    fonts: &BTreeMap<Vec<u8>, PageFont>,
    collector: &mut RunCollector,
) {
    let ctm = gs.ctm;
    let ts = &mut gs.text_state;
    let Some(font) = ts.font_key.as_ref().and_then(|key| fonts.get(key)) else {
        return;
    };

    let start = multiply_matrices(&ts.text_matrix, &ctm);
    let scale = (start[2] * start[2] + start[3] * start[3]).sqrt();
    let effective_size = round2(ts.font_size * if scale > 0.0 { scale } else { 1.0 });
    let (x0, y) = (start[4] + ts.rise * start[2], start[5] + ts.rise * start[3]);

    let mut text = String::new();
    let kerning_space_threshold = collector.config.kerning_space_threshold;
    show_operands(ts, font, operands, &mut text, kerning_space_threshold);

    let end = multiply_matrices(&ts.text_matrix, &ctm);
    collector.push(
        text,
        font.base_font.clone(),
        effective_size,
        x0,
        end[4],
        y,
    );
}

fn show_operands(
    ts: &mut TextState,
    font: &PageFont,
    operands: &[Object],
    text: &mut String,
    kerning_space_threshold: f32,
) {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => {
                text.push_str(&font.decode(bytes));
                let mut tx = 0.0;
                for &code in bytes {
                    let mut advance = font.glyph_width(code) / 1000.0 * ts.font_size
                        + ts.character_spacing;
                    if code == b' ' {
                        advance += ts.word_spacing;
                    }
                    tx += advance * ts.horizontal_scaling;
                }
                ts.advance(tx);
            }
            Object::Integer(_) | Object::Real(_) => {
                let adjustment = operand_as_float(operand);
                ts.advance(-adjustment / 1000.0 * ts.font_size * ts.horizontal_scaling);
                if -adjustment > kerning_space_threshold && !text.ends_with(' ') {
                    text.push(' ');
                }
            }
            Object::Array(items) => {
                show_operands(ts, font, items, text, kerning_space_threshold);
            }
            _ => {}
        }
    }
}

/// Strip the subset tag (`ABCDEF+`) from a PostScript font name.
pub fn sanitize_font_name(raw_name: &str) -> &str {
    match raw_name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => {
            rest
        }
        _ => raw_name,
    }
}

/// Best-effort decoding for fonts lopdf has no encoding for.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let code_units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

pub(crate) fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

fn first_float(op: &Operation) -> f32 {
    op.operands.first().map(operand_as_float).unwrap_or(0.0)
}

fn matrix_from_operands(op: &Operation) -> [f32; 6] {
    op.operands
        .iter()
        .map(operand_as_float)
        .collect::<Vec<f32>>()
        .try_into()
        .unwrap_or(IDENTITY)
}

fn operand_as_float(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(f) => *f,
        _ => 0.0,
    }
}

pub fn multiply_matrices(a: &[f32; 6], b: &[f32; 6]) -> [f32; 6] {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

pub fn translate_matrix(x: f32, y: f32) -> [f32; 6] {
    [1.0, 0.0, 0.0, 1.0, x, y]
}

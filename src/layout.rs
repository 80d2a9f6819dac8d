use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::logging::OUTLINE_LAYOUT;
use crate::parse::{round2, RawDocument, TextRun};

/// Lines shorter than this (after trimming) carry no structural signal.
pub const MIN_LINE_CHARS: usize = 2;

/// Represents a single line of text on the page after grouping runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLine {
    pub text: String,
    pub page_number: u32,
    pub max_font_size: f32,
    pub dominant_font_name: String,
    pub is_bold: bool,
    /// Left edge of the line's bounding box.
    pub origin_x: f32,
    /// Top edge of the line's bounding box, growing downwards.
    pub origin_y: f32,
    /// A bounding box for the entire line (x_min, y_min, x_max, y_max).
    pub bbox: (f32, f32, f32, f32),
}

impl TextLine {
    /// Construct a TextLine from the runs of one line group.
    pub fn from_runs(page_number: u32, mut runs: Vec<&TextRun>, config: &LayoutConfig) -> Self {
        runs.sort_by(|a, b| a.bbox.0.total_cmp(&b.bbox.0));

        let mut line_min_x = f32::MAX;
        let mut line_min_y = f32::MAX;
        let mut line_max_x = f32::MIN;
        let mut line_max_y = f32::MIN;
        let mut combined_text = String::new();
        let mut dominant: Option<&TextRun> = None;

        for (i, run) in runs.iter().enumerate() {
            line_min_x = line_min_x.min(run.bbox.0);
            line_min_y = line_min_y.min(run.bbox.1);
            line_max_x = line_max_x.max(run.bbox.2);
            line_max_y = line_max_y.max(run.bbox.3);

            if i > 0 {
                let prev = runs[i - 1];
                let gap = run.bbox.0 - prev.bbox.2;
                let needs_space = gap > config.word_gap_ratio * run.font_size.max(prev.font_size)
                    && !combined_text.ends_with(char::is_whitespace)
                    && !run.text.starts_with(char::is_whitespace);
                if needs_space {
                    combined_text.push(' ');
                }
            }
            combined_text.push_str(&run.text);

            if dominant.map_or(true, |d| run.font_size > d.font_size) {
                dominant = Some(run);
            }
        }

        let is_bold = runs.iter().any(|r| is_bold_font(&r.font_name));
        let (max_font_size, dominant_font_name) = dominant
            .map(|r| (round2(r.font_size), r.font_name.clone()))
            .unwrap_or_default();

        TextLine {
            text: combined_text.trim().to_string(),
            page_number,
            max_font_size,
            dominant_font_name,
            is_bold,
            origin_x: line_min_x,
            origin_y: line_min_y,
            bbox: (line_min_x, line_min_y, line_max_x, line_max_y),
        }
    }
}

pub fn is_bold_font(font_name: &str) -> bool {
    let lower = font_name.to_lowercase();
    lower.contains("bold") || lower.contains("black")
}

/// Surviving lines of one page, top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLines {
    pub page_number: u32,
    pub width: f32,
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineSet {
    pub pages: Vec<PageLines>,
    pub median_font_size: f32,
}

impl LineSet {
    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }

    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.pages.iter().flat_map(|p| p.lines.iter())
    }
}

/// Median of every run's font size in the document, before any line is
/// discarded. `None` when the document has no runs at all.
pub fn median_font_size(doc: &RawDocument) -> Option<f32> {
    let mut sizes: Vec<f32> = doc
        .pages
        .iter()
        .flat_map(|p| p.runs.iter())
        .map(|r| round2(r.font_size))
        .collect();
    if sizes.is_empty() {
        return None;
    }
    sizes.sort_by(|a, b| a.total_cmp(b));
    let mid = sizes.len() / 2;
    Some(if sizes.len() % 2 == 0 {
        (sizes[mid - 1] + sizes[mid]) / 2.0
    } else {
        sizes[mid]
    })
}

/// Group runs into lines per page and compute the document median font size.
pub fn reconstruct_lines(doc: &RawDocument, config: &LayoutConfig) -> LineSet {
    let Some(median) = median_font_size(doc) else {
        debug!(target: OUTLINE_LAYOUT, "Document has no text runs");
        return LineSet::default();
    };

    let mut pages = Vec::with_capacity(doc.pages.len());
    for page in &doc.pages {
        // Line groups in order of first appearance.
        let mut order: Vec<u32> = Vec::new();
        let mut groups: BTreeMap<u32, Vec<&TextRun>> = BTreeMap::new();
        for run in &page.runs {
            groups
                .entry(run.line_id)
                .or_insert_with(|| {
                    order.push(run.line_id);
                    Vec::new()
                })
                .push(run);
        }

        let mut lines: Vec<TextLine> = order
            .iter()
            .filter_map(|id| groups.remove(id))
            .map(|runs| TextLine::from_runs(page.number, runs, config))
            .filter(|line| line.text.chars().count() >= MIN_LINE_CHARS)
            .collect();

        // Stable: equal origins keep content-stream order.
        lines.sort_by(|a, b| a.origin_y.total_cmp(&b.origin_y));

        debug!(
            target: OUTLINE_LAYOUT,
            page = page.number,
            groups = order.len(),
            lines = lines.len(),
            "Reconstructed lines"
        );

        pages.push(PageLines {
            page_number: page.number,
            width: page.width,
            lines,
        });
    }

    LineSet {
        pages,
        median_font_size: median,
    }
}

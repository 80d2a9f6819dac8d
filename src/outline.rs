use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classify::{ClassifiedLine, Role};
use crate::config::HeuristicConfig;

pub const UNTITLED: &str = "Untitled Document";
pub const EMPTY_TITLE: &str = "Empty or unreadable PDF";
pub const EMPTY_ERROR: &str = "No text content found in PDF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: Role,
    pub text: String,
    pub page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub total_pages: u32,
    pub total_text_lines: usize,
    pub outline_items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

/// The outline of one document, as handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
    pub metadata: Metadata,
    /// Set only when the document had no text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentResult {
    /// Result for a document without a single surviving line.
    pub fn empty() -> Self {
        DocumentResult {
            title: EMPTY_TITLE.to_string(),
            outline: Vec::new(),
            metadata: Metadata::default(),
            error: Some(EMPTY_ERROR.to_string()),
        }
    }

    pub fn is_empty_document(&self) -> bool {
        self.error.is_some()
    }
}

/// Reduce classified lines to a title and an ordered, deduplicated outline.
pub fn assemble(lines: &[ClassifiedLine], config: &HeuristicConfig) -> DocumentResult {
    if lines.is_empty() {
        return DocumentResult::empty();
    }

    // Without a Title line the first H1 in reading order stands in, even
    // when the same text appeared earlier under another heading level.
    let title_line = lines
        .iter()
        .find(|l| l.role == Role::Title)
        .or_else(|| lines.iter().find(|l| l.role == Role::H1));
    let title = match title_line {
        Some(line) => line.text().trim().to_string(),
        None => synthesize_title(lines, config).unwrap_or_else(|| UNTITLED.to_string()),
    };
    let title_text = title_line.map(|_| title.as_str());

    let mut seen: HashSet<&str> = HashSet::new();
    let mut outline: Vec<OutlineEntry> = Vec::new();
    for line in lines.iter().filter(|l| l.role.is_heading()) {
        let text = line.text().trim();
        if title_text == Some(text) || !seen.insert(text) {
            continue;
        }
        outline.push(OutlineEntry {
            level: line.role,
            text: text.to_string(),
            page: line.page_number(),
        });
    }

    outline.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then_with(|| a.level.label().cmp(b.level.label()))
    });

    let metadata = Metadata {
        total_pages: lines.iter().map(|l| l.page_number()).max().unwrap_or(0),
        total_text_lines: lines.len(),
        outline_items: outline.len(),
        ..Metadata::default()
    };

    DocumentResult {
        title,
        outline,
        metadata,
        error: None,
    }
}

/// Join the first two meaningful lines near the top of the document.
fn synthesize_title(lines: &[ClassifiedLine], config: &HeuristicConfig) -> Option<String> {
    let meaningful: Vec<&str> = lines
        .iter()
        .take(config.title_scan_lines)
        .map(|l| l.text().trim())
        .filter(|t| {
            t.chars().count() > config.meaningful_line_min_chars && !config.is_boilerplate(t)
        })
        .take(2)
        .collect();
    if meaningful.is_empty() {
        None
    } else {
        Some(meaningful.join(" "))
    }
}

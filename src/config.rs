//! Tunable thresholds for every pipeline stage.
//!
//! None of these values are derived from first principles. They were tuned
//! empirically against a small set of documents and are exposed here so they
//! can be overridden from a JSON file without touching the rules themselves.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OutlineError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    pub layout: LayoutConfig,
    pub features: FeatureConfig,
    pub heuristics: HeuristicConfig,
}

impl OutlineConfig {
    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let config: OutlineConfig = serde_json::from_str(&raw)
            .map_err(|e| OutlineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let h = &self.heuristics;
        if h.min_heading_len > h.max_heading_len {
            return Err(OutlineError::Config(format!(
                "min_heading_len ({}) exceeds max_heading_len ({})",
                h.min_heading_len, h.max_heading_len
            )));
        }
        if h.min_words > h.max_words {
            return Err(OutlineError::Config(format!(
                "min_words ({}) exceeds max_words ({})",
                h.min_words, h.max_words
            )));
        }
        if self.layout.line_join_threshold < 0.0 {
            return Err(OutlineError::Config(
                "line_join_threshold must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Knobs for turning content-stream runs into lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Runs whose baselines differ by less than this share a line group.
    pub line_join_threshold: f32,
    /// Gap between two runs, as a fraction of font size, that implies a space.
    pub word_gap_ratio: f32,
    /// TJ kerning adjustment (thousandths of an em) treated as a word break.
    pub kerning_space_threshold: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            line_join_threshold: 3.0,
            word_gap_ratio: 0.15,
            kerning_space_threshold: 200.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// `space_before` reported for the first line of every page.
    pub first_line_gap: f32,
    /// Max distance of the left edge from a quarter of the page width for
    /// `is_centered`. This approximates "not flush-left", not true centering.
    pub centered_tolerance: f32,
    /// `is_likely_heading` size cutoff, relative to the median font size.
    pub likely_heading_ratio: f32,
    /// `is_likely_heading` vertical gap cutoff, in page units.
    pub likely_heading_gap: f32,
    /// `is_likely_heading` word limit for colon-terminated lines.
    pub likely_heading_max_words: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            first_line_gap: 30.0,
            centered_tolerance: 50.0,
            likely_heading_ratio: 1.1,
            likely_heading_gap: 15.0,
            likely_heading_max_words: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// "Large font": `size_ratio` at or above this multiple of the median.
    pub large_font_ratio: f32,
    /// "Large gap": `space_before` above this multiple of the median size.
    pub large_gap_ratio: f32,
    pub page_number_max_digits: usize,
    pub near_empty_max_chars: usize,
    pub short_word_max_chars: usize,
    pub boilerplate_prefixes: Vec<String>,
    pub title_min_chars: usize,
    /// Title candidates must be among this many leading lines of page 1.
    pub title_max_line_index: usize,
    pub min_heading_len: usize,
    pub max_heading_len: usize,
    pub min_words: usize,
    pub max_words: usize,
    pub h2_numbered_min_words: usize,
    pub h3_min_dots: usize,
    pub h3_min_words: usize,
    pub h3_phrases: Vec<String>,
    pub h4_prefix: String,
    pub h4_min_words: usize,
    /// Synthesized titles only consider lines longer than this.
    pub meaningful_line_min_chars: usize,
    pub title_scan_lines: usize,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        HeuristicConfig {
            large_font_ratio: 1.2,
            large_gap_ratio: 1.5,
            page_number_max_digits: 3,
            near_empty_max_chars: 2,
            short_word_max_chars: 8,
            boilerplate_prefixes: ["copyright", "version", "page", "©", "www.", "http"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            title_min_chars: 20,
            title_max_line_index: 3,
            min_heading_len: 5,
            max_heading_len: 200,
            min_words: 1,
            max_words: 20,
            h2_numbered_min_words: 3,
            h3_min_dots: 2,
            h3_min_words: 2,
            h3_phrases: ["for each", "timeline", "result", "phase"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            h4_prefix: "For each".to_string(),
            h4_min_words: 3,
            meaningful_line_min_chars: 10,
            title_scan_lines: 10,
        }
    }
}

impl HeuristicConfig {
    pub fn is_boilerplate(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        self.boilerplate_prefixes
            .iter()
            .any(|prefix| lower.starts_with(prefix.as_str()))
    }
}

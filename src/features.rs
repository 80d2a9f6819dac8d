use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::FeatureConfig;
use crate::error::OutlineError;
use crate::layout::{LineSet, TextLine};

pub static NUMBERING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\s+").unwrap());

/// Stable names of every feature a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    SizeRatio,
    IsBold,
    Indentation,
    IsCentered,
    SpaceBefore,
    WordCount,
    HasNumbering,
    TextLength,
    IsUppercase,
    StartsWithCapital,
    EndsWithColon,
    IsLikelyHeading,
    RelativeFontSize,
}

/// The full schema in record order.
pub const FEATURE_KEYS: [FeatureKey; 13] = [
    FeatureKey::SizeRatio,
    FeatureKey::IsBold,
    FeatureKey::Indentation,
    FeatureKey::IsCentered,
    FeatureKey::SpaceBefore,
    FeatureKey::WordCount,
    FeatureKey::HasNumbering,
    FeatureKey::TextLength,
    FeatureKey::IsUppercase,
    FeatureKey::StartsWithCapital,
    FeatureKey::EndsWithColon,
    FeatureKey::IsLikelyHeading,
    FeatureKey::RelativeFontSize,
];

impl FeatureKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::SizeRatio => "size_ratio",
            FeatureKey::IsBold => "is_bold",
            FeatureKey::Indentation => "indentation",
            FeatureKey::IsCentered => "is_centered",
            FeatureKey::SpaceBefore => "space_before",
            FeatureKey::WordCount => "word_count",
            FeatureKey::HasNumbering => "has_numbering",
            FeatureKey::TextLength => "text_length",
            FeatureKey::IsUppercase => "is_uppercase",
            FeatureKey::StartsWithCapital => "starts_with_capital",
            FeatureKey::EndsWithColon => "ends_with_colon",
            FeatureKey::IsLikelyHeading => "is_likely_heading",
            FeatureKey::RelativeFontSize => "relative_font_size",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = OutlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FEATURE_KEYS
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| OutlineError::Model(format!("unknown feature key '{}'", s)))
    }
}

/// Typographic, geometric and lexical description of one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub size_ratio: f32,
    pub is_bold: bool,
    pub indentation: f32,
    pub is_centered: bool,
    pub space_before: f32,
    pub word_count: usize,
    pub has_numbering: bool,
    pub text_length: usize,
    pub is_uppercase: bool,
    pub starts_with_capital: bool,
    pub ends_with_colon: bool,
    pub is_likely_heading: bool,
    pub relative_font_size: f32,
}

impl FeatureRecord {
    /// Numeric value of a feature, booleans as 0/1.
    pub fn get(&self, key: FeatureKey) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match key {
            FeatureKey::SizeRatio => self.size_ratio as f64,
            FeatureKey::IsBold => flag(self.is_bold),
            FeatureKey::Indentation => self.indentation as f64,
            FeatureKey::IsCentered => flag(self.is_centered),
            FeatureKey::SpaceBefore => self.space_before as f64,
            FeatureKey::WordCount => self.word_count as f64,
            FeatureKey::HasNumbering => flag(self.has_numbering),
            FeatureKey::TextLength => self.text_length as f64,
            FeatureKey::IsUppercase => flag(self.is_uppercase),
            FeatureKey::StartsWithCapital => flag(self.starts_with_capital),
            FeatureKey::EndsWithColon => flag(self.ends_with_colon),
            FeatureKey::IsLikelyHeading => flag(self.is_likely_heading),
            FeatureKey::RelativeFontSize => self.relative_font_size as f64,
        }
    }

    /// Project into a numeric vector in the given key order.
    pub fn to_vector(&self, keys: &[FeatureKey]) -> Vec<f64> {
        keys.iter().map(|k| self.get(*k)).collect()
    }
}

/// A line together with its feature record and document position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedLine {
    /// Position among all surviving lines of the document.
    pub index: usize,
    pub line: TextLine,
    pub features: FeatureRecord,
    /// Median font size of the whole document.
    pub median_font_size: f32,
}

impl FeaturedLine {
    pub fn text(&self) -> &str {
        &self.line.text
    }

    pub fn page_number(&self) -> u32 {
        self.line.page_number
    }
}

pub fn has_numbering(text: &str) -> bool {
    NUMBERING.is_match(text)
}

/// Number of dot separators in a leading section number, e.g. 2 for
/// "1.2.3 Scope". `None` when the line is not numbered.
pub fn numbering_dots(text: &str) -> Option<usize> {
    NUMBERING
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().matches('.').count())
}

/// At least one cased character and no lowercase ones.
pub fn is_uppercase(text: &str) -> bool {
    let mut has_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

pub fn compute_features(lines: &LineSet, config: &FeatureConfig) -> Vec<FeaturedLine> {
    let median = lines.median_font_size;
    let mut featured = Vec::with_capacity(lines.line_count());

    for page in &lines.pages {
        let mut prev_y: Option<f32> = None;
        for line in &page.lines {
            let space_before = match prev_y {
                Some(y) => line.origin_y - y,
                None => config.first_line_gap,
            };
            prev_y = Some(line.origin_y);

            let features = line_features(line, space_before, median, page.width, config);
            featured.push(FeaturedLine {
                index: featured.len(),
                line: line.clone(),
                features,
                median_font_size: median,
            });
        }
    }

    featured
}

fn line_features(
    line: &TextLine,
    space_before: f32,
    median: f32,
    page_width: f32,
    config: &FeatureConfig,
) -> FeatureRecord {
    let text = line.text.as_str();
    let size = line.max_font_size;
    let word_count = text.split_whitespace().count();
    let numbered = has_numbering(text);
    let uppercase = is_uppercase(text);
    let ends_with_colon = text.trim_end().ends_with(':');

    let is_likely_heading = size > median * config.likely_heading_ratio
        || line.is_bold
        || space_before > config.likely_heading_gap
        || numbered
        || uppercase
        || (word_count < config.likely_heading_max_words && ends_with_colon);

    FeatureRecord {
        size_ratio: if median > 0.0 { size / median } else { 1.0 },
        is_bold: line.is_bold,
        indentation: line.origin_x,
        is_centered: (line.origin_x - page_width / 4.0).abs() < config.centered_tolerance,
        space_before,
        word_count,
        has_numbering: numbered,
        text_length: text.chars().count(),
        is_uppercase: uppercase,
        starts_with_capital: text.chars().next().is_some_and(char::is_uppercase),
        ends_with_colon,
        is_likely_heading,
        relative_font_size: size,
    }
}

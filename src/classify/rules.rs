//! Ordered decision list that decides the final role of a line.
//!
//! Rules are evaluated top to bottom and the first match wins. The BodyText
//! exclusions come first because the learned model has no lexical knowledge
//! and reliably mistakes running headers, footers and fragments for
//! structure. Every threshold is document-relative or comes from
//! [`HeuristicConfig`].

use crate::classify::Role;
use crate::config::HeuristicConfig;
use crate::features::{numbering_dots, FeaturedLine};

/// Everything a rule may look at.
pub struct RuleContext<'a> {
    pub line: &'a FeaturedLine,
    pub config: &'a HeuristicConfig,
}

impl RuleContext<'_> {
    fn text(&self) -> &str {
        self.line.text()
    }

    fn char_count(&self) -> usize {
        self.line.features.text_length
    }

    fn words(&self) -> usize {
        self.line.features.word_count
    }

    fn bold(&self) -> bool {
        self.line.features.is_bold
    }

    fn numbered(&self) -> bool {
        self.line.features.has_numbering
    }

    fn colon(&self) -> bool {
        self.line.features.ends_with_colon
    }

    fn boilerplate(&self) -> bool {
        self.config.is_boilerplate(self.text())
    }

    fn large_font(&self) -> bool {
        self.line.features.size_ratio >= self.config.large_font_ratio
    }

    fn large_gap(&self) -> bool {
        self.line.features.space_before > self.line.median_font_size * self.config.large_gap_ratio
    }

    fn reasonable_length(&self) -> bool {
        (self.config.min_heading_len..=self.config.max_heading_len).contains(&self.char_count())
    }

    fn reasonable_words(&self) -> bool {
        (self.config.min_words..=self.config.max_words).contains(&self.words())
    }
}

pub struct Rule {
    pub name: &'static str,
    pub role: Role,
    pub applies: fn(&RuleContext) -> bool,
}

pub static RULES: &[Rule] = &[
    // BodyText exclusions
    Rule {
        name: "page_number",
        role: Role::BodyText,
        applies: |c| {
            let t = c.text();
            !t.is_empty()
                && t.chars().count() <= c.config.page_number_max_digits
                && t.chars().all(|ch| ch.is_ascii_digit())
        },
    },
    Rule {
        name: "near_empty",
        role: Role::BodyText,
        applies: |c| c.text().chars().count() <= c.config.near_empty_max_chars,
    },
    Rule {
        name: "boilerplate",
        role: Role::BodyText,
        applies: |c| c.boilerplate(),
    },
    Rule {
        name: "dangling_hyphen",
        role: Role::BodyText,
        applies: |c| c.text().ends_with('-') || c.text().ends_with('\u{2013}'),
    },
    Rule {
        name: "short_single_word",
        role: Role::BodyText,
        applies: |c| c.words() == 1 && c.char_count() < c.config.short_word_max_chars,
    },
    Rule {
        name: "lowercase_fragment",
        role: Role::BodyText,
        applies: |c| c.text().chars().next().is_some_and(char::is_lowercase) && !c.numbered(),
    },
    // Title
    Rule {
        name: "title",
        role: Role::Title,
        applies: |c| {
            c.line.page_number() == 1
                && c.line.index < c.config.title_max_line_index
                && c.char_count() > c.config.title_min_chars
                && (c.large_font() || c.bold())
                && c.text().contains(':')
                && !c.boilerplate()
        },
    },
    // H1
    Rule {
        name: "h1_large_bold",
        role: Role::H1,
        applies: |c| c.large_font() && c.bold() && c.reasonable_words(),
    },
    Rule {
        name: "h1_appendix",
        role: Role::H1,
        applies: |c| c.text().to_lowercase().starts_with("appendix") && c.bold(),
    },
    Rule {
        name: "h1_uppercase_gap",
        role: Role::H1,
        applies: |c| c.line.features.is_uppercase && c.reasonable_words() && c.large_gap(),
    },
    // H2
    Rule {
        name: "h2_bold_gap",
        role: Role::H2,
        applies: |c| {
            c.bold() && c.large_gap() && c.reasonable_length() && (c.colon() || c.numbered())
        },
    },
    Rule {
        name: "h2_numbered_bold",
        role: Role::H2,
        applies: |c| c.numbered() && c.bold() && c.words() >= c.config.h2_numbered_min_words,
    },
    // H3
    Rule {
        name: "h3_deep_numbering",
        role: Role::H3,
        applies: |c| {
            numbering_dots(c.text()).is_some_and(|dots| dots >= c.config.h3_min_dots)
                && c.words() >= c.config.h3_min_words
        },
    },
    Rule {
        name: "h3_phrase",
        role: Role::H3,
        applies: |c| {
            let lower = c.text().to_lowercase();
            c.colon()
                && c.reasonable_length()
                && !c.text().starts_with(c.config.h4_prefix.as_str())
                && c.config
                    .h3_phrases
                    .iter()
                    .any(|p| lower.contains(&p.to_lowercase()))
        },
    },
    // H4
    Rule {
        name: "h4_for_each",
        role: Role::H4,
        applies: |c| {
            c.text().starts_with(c.config.h4_prefix.as_str())
                && c.colon()
                && c.words() >= c.config.h4_min_words
        },
    },
];

pub const DEFAULT_RULE: &str = "default";

/// First matching rule's name and role, or BodyText.
pub fn evaluate(line: &FeaturedLine, config: &HeuristicConfig) -> (&'static str, Role) {
    let ctx = RuleContext { line, config };
    RULES
        .iter()
        .find(|rule| (rule.applies)(&ctx))
        .map(|rule| (rule.name, rule.role))
        .unwrap_or((DEFAULT_RULE, Role::BodyText))
}

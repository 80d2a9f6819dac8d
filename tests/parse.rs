pub mod setup;

use crate::setup::{
    create_test_pdf, create_test_pdf_bytes, create_test_pdf_with_config, Line, PdfConfig,
};
use pdf_outline::config::{LayoutConfig, OutlineConfig};
use pdf_outline::layout::reconstruct_lines;
use pdf_outline::parse::{load_pdf, read_document};
use pdf_outline::OutlineError;

#[test]
fn test_load_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("example.pdf");
    create_test_pdf_with_config(&PdfConfig::default(), &path).expect("Failed to create test PDF");

    let result = load_pdf(&path);
    assert!(result.is_ok(), "Should successfully load the test PDF");
}

#[test]
fn test_load_missing_pdf_is_extraction_error() {
    let result = load_pdf("tests/does-not-exist.pdf");
    assert!(matches!(result, Err(OutlineError::Extraction(_))));
}

#[test]
fn test_read_runs() {
    let raw = read_document(&create_test_pdf(), &LayoutConfig::default()).unwrap();

    assert_eq!(raw.pages.len(), 2);
    assert_eq!(raw.pages[0].number, 1);
    assert_eq!(raw.pages[0].width, 612.0);
    assert_eq!(raw.pages[0].height, 792.0);

    let texts: Vec<&str> = raw.pages[0].runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Annual Report: Regional Library Board",
            "Introduction",
            "This report describes the programs of the board.",
            "Each branch contributed figures for the year.",
            "Figures are unaudited unless stated otherwise.",
            "1.1 Scope of Services",
            "1.1.1 Staff training plans",
            "Training was delivered at every branch.",
        ]
    );

    let title = &raw.pages[0].runs[0];
    assert_eq!(title.font_name, "Helvetica-Bold");
    assert_eq!(title.font_size, 24.0);
    // Baseline 720 in user space is 72 from the top of a 792pt page.
    assert_eq!(title.bbox.3, 72.0);
    assert_eq!(title.bbox.1, 48.0);
    assert_eq!(title.bbox.0, 72.0);

    let body = &raw.pages[0].runs[2];
    assert_eq!(body.font_name, "Helvetica");
    assert_eq!(body.font_size, 10.0);
}

#[test]
fn test_runs_on_separate_baselines_get_separate_lines() {
    let raw = read_document(&create_test_pdf(), &LayoutConfig::default()).unwrap();
    let ids: Vec<u32> = raw.pages[0].runs.iter().map(|r| r.line_id).collect();
    let mut deduped = ids.clone();
    deduped.dedup();
    assert_eq!(ids, deduped, "no two runs should share a line");
}

#[test]
fn test_runs_on_one_baseline_join() {
    let config = PdfConfig {
        pages: vec![vec![
            Line::new("Chapter", 14.0, true, 700.0),
            Line::new("Twelve", 14.0, true, 700.5).at(140.0),
            Line::body("Body text below the split heading.", 680.0),
        ]],
        ..PdfConfig::default()
    };
    let raw = read_document(&create_test_pdf_bytes(&config), &LayoutConfig::default()).unwrap();
    assert_eq!(raw.pages[0].runs[0].line_id, raw.pages[0].runs[1].line_id);
    assert_ne!(raw.pages[0].runs[1].line_id, raw.pages[0].runs[2].line_id);
}

#[test]
fn test_reconstructed_lines() {
    let raw = read_document(&create_test_pdf(), &LayoutConfig::default()).unwrap();
    let config = OutlineConfig::default();
    let lines = reconstruct_lines(&raw, &config.layout);

    assert_eq!(lines.median_font_size, 10.0);
    // The lone page number is too short to keep.
    assert_eq!(lines.pages[1].lines.len(), 3);
    assert_eq!(lines.line_count(), 11);

    let intro = &lines.pages[0].lines[1];
    assert_eq!(intro.text, "Introduction");
    assert!(intro.is_bold);
    assert_eq!(intro.max_font_size, 16.0);
    assert_eq!(intro.dominant_font_name, "Helvetica-Bold");

    for page in &lines.pages {
        assert!(page
            .lines
            .windows(2)
            .all(|w| w[0].origin_y <= w[1].origin_y));
    }
}

#[test]
fn test_words_drawn_separately_keep_their_space() {
    // Helvetica "Illinois" at 12pt is 33.34pt wide; "Office" starts one space later.
    // "Sub" is 21.35pt wide and "heading" abuts it.
    let config = PdfConfig {
        pages: vec![vec![
            Line::new("Illinois", 12.0, false, 700.0).at(72.0),
            Line::new("Office", 12.0, false, 700.0).at(108.6),
            Line::new("Sub", 12.0, false, 680.0).at(72.0),
            Line::new("heading", 12.0, false, 680.0).at(93.35),
        ]],
        ..PdfConfig::default()
    };
    let raw = read_document(&create_test_pdf_bytes(&config), &LayoutConfig::default()).unwrap();
    let lines = reconstruct_lines(&raw, &LayoutConfig::default());
    let texts: Vec<&str> = lines.lines().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["Illinois Office", "Subheading"]);

    let illinois = &raw.pages[0].runs[0];
    assert!((illinois.bbox.2 - 105.34).abs() < 0.01);
}

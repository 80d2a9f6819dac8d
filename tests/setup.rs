#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::dictionary;
use lopdf::{Document, Object, Stream};

use pdf_outline::classify::RoleModel;
use pdf_outline::features::{FeatureKey, FEATURE_KEYS};
use pdf_outline::{OutlineError, Role};

/// One run of text placed on a page, drawn by its own `Tj`.
pub struct Line {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    /// Left edge; the page's left margin when unset.
    pub x: Option<f32>,
    /// Baseline, in PDF user space (grows upwards).
    pub y: f32,
}

impl Line {
    pub fn new(text: &str, size: f32, bold: bool, y: f32) -> Self {
        Line {
            text: text.to_string(),
            size,
            bold,
            x: None,
            y,
        }
    }

    /// A run starting at `x` instead of the left margin.
    pub fn at(mut self, x: f32) -> Self {
        self.x = Some(x);
        self
    }

    pub fn body(text: &str, y: f32) -> Self {
        Line::new(text, 10.0, false, y)
    }
}

pub struct PdfConfig {
    pub pages: Vec<Vec<Line>>,
    pub font_name: String,
    pub bold_font_name: String,
    pub left_margin: f32,
}

impl Default for PdfConfig {
    /// A two-page report with a title, numbered sections and body text.
    fn default() -> Self {
        PdfConfig {
            pages: vec![
                vec![
                    Line::new("Annual Report: Regional Library Board", 24.0, true, 720.0),
                    Line::new("Introduction", 16.0, true, 680.0),
                    Line::body("This report describes the programs of the board.", 660.0),
                    Line::body("Each branch contributed figures for the year.", 646.0),
                    Line::body("Figures are unaudited unless stated otherwise.", 632.0),
                    Line::new("1.1 Scope of Services", 11.0, true, 600.0),
                    Line::body("1.1.1 Staff training plans", 580.0),
                    Line::body("Training was delivered at every branch.", 566.0),
                ],
                vec![
                    Line::new("Financial Summary", 16.0, true, 720.0),
                    Line::body("Spending remained within the approved budget.", 700.0),
                    Line::body("Capital projects were deferred to next year.", 686.0),
                    Line::body("3", 60.0),
                ],
            ],
            font_name: "Helvetica".to_string(),
            bold_font_name: "Helvetica-Bold".to_string(),
            left_margin: 72.0,
        }
    }
}

pub fn create_test_pdf_bytes(config: &PdfConfig) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => config.font_name.clone(),
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => config.bold_font_name.clone(),
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in &config.pages {
        let mut operations = vec![];
        for line in lines {
            let font = if line.bold { "F2" } else { "F1" };
            operations.extend(vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![font.into(), line.size.into()]),
                Operation::new(
                    "Td",
                    vec![line.x.unwrap_or(config.left_margin).into(), line.y.into()],
                ),
                Operation::new("Tj", vec![Object::string_literal(line.text.clone())]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn create_test_pdf_with_config(config: &PdfConfig, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, create_test_pdf_bytes(config))
}

pub fn create_test_pdf() -> Vec<u8> {
    create_test_pdf_bytes(&PdfConfig::default())
}

/// Predicts the same role for every line.
pub struct ConstantModel(pub Role);

impl RoleModel for ConstantModel {
    fn feature_keys(&self) -> &[FeatureKey] {
        &FEATURE_KEYS
    }

    fn predict(&self, _features: &[f64]) -> pdf_outline::Result<Role> {
        Ok(self.0)
    }
}

/// Fails on every prediction.
pub struct BrokenModel;

impl RoleModel for BrokenModel {
    fn feature_keys(&self) -> &[FeatureKey] {
        &FEATURE_KEYS
    }

    fn predict(&self, _features: &[f64]) -> pdf_outline::Result<Role> {
        Err(OutlineError::Model("model exploded".to_string()))
    }
}

pub fn body_text_model() -> Arc<dyn RoleModel> {
    Arc::new(ConstantModel(Role::BodyText))
}

#[test]
fn test_create_test_pdf() {
    let bytes = create_test_pdf();
    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

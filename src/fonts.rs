//! Glyph widths for the standard 14 fonts, which PDFs may reference without
//! embedding a `/Widths` array.
//!
//! Widths are in thousandths of an em for codes 32..=126. Oblique and italic
//! faces reuse the upright tables.

const FIRST_CODE: u8 = 32;
const LAST_CODE: u8 = 126;

#[rustfmt::skip]
static HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 222, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    222, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 278, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    278, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
static TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 333, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
static TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 333, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

const COURIER_WIDTH: u16 = 600;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Widths {
    Fixed(u16),
    Table(&'static [u16; 95]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardFont {
    pub name: &'static str,
    widths: Widths,
}

impl StandardFont {
    /// Width of `code` in thousandths of an em, when the table covers it.
    pub fn width(&self, code: u8) -> Option<f32> {
        if !(FIRST_CODE..=LAST_CODE).contains(&code) {
            return None;
        }
        let width = match self.widths {
            Widths::Fixed(w) => w,
            Widths::Table(table) => table[(code - FIRST_CODE) as usize],
        };
        Some(width as f32)
    }
}

/// Match a base font name, including common Arial/Times New Roman/Courier New
/// aliases, to its standard font metrics.
pub fn standard_font(base_font: &str) -> Option<StandardFont> {
    let mut key: String = base_font
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .replace(',', "-")
        .to_ascii_lowercase();
    if let Some(stripped) = key.strip_suffix("mt") {
        key = stripped.to_string();
    }
    let key = key.replace("ps-", "-");
    let key = key.strip_suffix("ps").unwrap_or(key.as_str());

    let (family, style) = key.split_once('-').unwrap_or((key, ""));
    let bold = style.contains("bold");

    let (name, widths) = match (family, bold) {
        ("helvetica" | "arial", false) => ("Helvetica", Widths::Table(&HELVETICA)),
        ("helvetica" | "arial", true) => ("Helvetica-Bold", Widths::Table(&HELVETICA_BOLD)),
        ("times" | "timesnewroman", false) => ("Times-Roman", Widths::Table(&TIMES_ROMAN)),
        ("times" | "timesnewroman", true) => ("Times-Bold", Widths::Table(&TIMES_BOLD)),
        ("courier" | "couriernew", false) => ("Courier", Widths::Fixed(COURIER_WIDTH)),
        ("courier" | "couriernew", true) => ("Courier-Bold", Widths::Fixed(COURIER_WIDTH)),
        _ => return None,
    };
    Some(StandardFont { name, widths })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_width(font: &StandardFont, text: &str) -> f32 {
        text.bytes().filter_map(|b| font.width(b)).sum()
    }

    #[test]
    fn resolves_base_names_and_aliases() {
        let names = [
            ("Helvetica", "Helvetica"),
            ("Helvetica-BoldOblique", "Helvetica-Bold"),
            ("ArialMT", "Helvetica"),
            ("Arial,Bold", "Helvetica-Bold"),
            ("Arial-BoldMT", "Helvetica-Bold"),
            ("Times-Roman", "Times-Roman"),
            ("TimesNewRomanPS-BoldMT", "Times-Bold"),
            ("TimesNewRomanPSMT", "Times-Roman"),
            ("Courier-Oblique", "Courier"),
        ];
        for (base, expected) in names {
            assert_eq!(standard_font(base).map(|f| f.name), Some(expected), "{}", base);
        }
        assert_eq!(standard_font("Garamond"), None);
        assert_eq!(standard_font("Symbol"), None);
    }

    #[test]
    fn proportional_widths() {
        let helvetica = standard_font("Helvetica").unwrap();
        assert_eq!(helvetica.width(b' '), Some(278.0));
        assert_eq!(helvetica.width(b'i'), Some(222.0));
        assert_eq!(helvetica.width(b'W'), Some(944.0));
        assert_eq!(helvetica.width(b'~'), Some(584.0));
        assert_eq!(helvetica.width(200), None);
        assert_eq!(text_width(&helvetica, "Illinois"), 2778.0);

        let courier = standard_font("Courier").unwrap();
        assert_eq!(text_width(&courier, "iiii"), 2400.0);
    }
}

//! Text overlay baked into a page's content stream

use crate::error::PdfEditError;
use crate::overlay::{append_content, register_resource};
use crate::page_tree::{media_box, page_id_at};
use crate::style::{parse_hex_color, TextStyle};
use crate::{load_document, save_document};
use lopdf::content::Operation;
use lopdf::{dictionary, Dictionary, Object, StringFormat};
use serde::{Deserialize, Serialize};

/// Leading as a multiple of the font size
const LINE_HEIGHT_FACTOR: f32 = 1.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    /// Text to draw; `\n` starts a new line
    pub text: String,
    /// Baseline origin of the first line, in points from the MediaBox origin
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Counter-clockwise rotation in degrees
    #[serde(default)]
    pub rotation: f32,
}

fn default_opacity() -> f32 {
    1.0
}

impl TextConfig {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            style: TextStyle::default(),
            opacity: default_opacity(),
            rotation: 0.0,
        }
    }

    fn validate(&self) -> Result<(), PdfEditError> {
        if self.text.trim().is_empty() {
            return Err(PdfEditError::InvalidParameter("Text is empty".into()));
        }
        if !(self.style.font_size.is_finite() && self.style.font_size > 0.0) {
            return Err(PdfEditError::InvalidParameter(format!(
                "Font size must be positive, got {}",
                self.style.font_size
            )));
        }
        if !(self.opacity.is_finite() && (0.0..=1.0).contains(&self.opacity)) {
            return Err(PdfEditError::InvalidParameter(format!(
                "Opacity must be within 0..=1, got {}",
                self.opacity
            )));
        }
        if !(self.x.is_finite() && self.y.is_finite() && self.rotation.is_finite()) {
            return Err(PdfEditError::InvalidParameter(
                "Position and rotation must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// WinAnsiEncoding code for `c`. Matches Latin-1 except in 0x80..=0x9F.
fn win_ansi(c: char) -> Option<u8> {
    let code = match c {
        '\u{0000}'..='\u{007F}' | '\u{00A0}'..='\u{00FF}' => {
            return u8::try_from(u32::from(c)).ok()
        }
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '•' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(code)
}

/// Encode for a WinAnsi standard font; unmapped characters become '?'
fn encode_line(line: &str) -> Vec<u8> {
    line.chars().map(|c| win_ansi(c).unwrap_or(b'?')).collect()
}

fn font_resource(style: &TextStyle) -> Dictionary {
    let mut font = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(style.pdf_font_name().as_bytes().to_vec()),
    };
    if !style.is_symbolic() {
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    }
    font
}

/// Draw `config.text` on the page at `index` (0-based)
pub fn add_page_text(
    bytes: &[u8],
    index: usize,
    config: &TextConfig,
) -> Result<Vec<u8>, PdfEditError> {
    config.validate()?;
    let (r, g, b) = parse_hex_color(&config.style.color)?;

    let mut doc = load_document(bytes)?;
    let page_id = page_id_at(&doc, index)?;
    let [x0, y0, _, _] = media_box(&doc, page_id);

    let font_name = register_resource(
        &mut doc,
        page_id,
        b"Font",
        "PeF",
        Object::Dictionary(font_resource(&config.style)),
    )?;

    let mut ops = vec![Operation::new("q", vec![])];

    if config.opacity < 1.0 {
        let gs_name = register_resource(
            &mut doc,
            page_id,
            b"ExtGState",
            "PeGs",
            Object::Dictionary(dictionary! {
                "Type" => "ExtGState",
                "ca" => Object::Real(config.opacity),
            }),
        )?;
        ops.push(Operation::new("gs", vec![Object::Name(gs_name.into_bytes())]));
    }

    let size = config.style.font_size;
    let (sin, cos) = config.rotation.to_radians().sin_cos();
    ops.extend([
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font_name.into_bytes()), Object::Real(size)],
        ),
        Operation::new("TL", vec![Object::Real(size * LINE_HEIGHT_FACTOR)]),
        Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
        Operation::new(
            "Tm",
            vec![
                Object::Real(cos),
                Object::Real(sin),
                Object::Real(-sin),
                Object::Real(cos),
                Object::Real(x0 + config.x),
                Object::Real(y0 + config.y),
            ],
        ),
    ]);

    for (i, line) in config.text.lines().enumerate() {
        if i > 0 {
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_line(line), StringFormat::Literal)],
        ));
    }

    ops.extend([Operation::new("ET", vec![]), Operation::new("Q", vec![])]);

    append_content(&mut doc, page_id, ops)?;
    save_document(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_tree::page_order;
    use crate::test_support::{create_test_pdf, page_labels};
    use lopdf::content::Content;
    use lopdf::Document;

    fn shown_strings(bytes: &[u8], index: usize) -> Vec<Vec<u8>> {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = page_order(&doc)[index];
        let content = doc.get_page_content(page_id).unwrap();
        Content::decode(&content)
            .unwrap()
            .operations
            .into_iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    fn page_fonts(bytes: &[u8], index: usize) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = page_order(&doc)[index];
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        resources
            .get(b"Font")
            .unwrap()
            .as_dict()
            .unwrap()
            .iter()
            .map(|(_, font)| {
                let base = font.as_dict().unwrap().get(b"BaseFont").unwrap();
                String::from_utf8_lossy(base.as_name().unwrap()).into_owned()
            })
            .collect()
    }

    #[test]
    fn test_add_text_appends_after_existing_content() {
        let pdf = create_test_pdf(2, "Txt");
        let config = TextConfig::new("CONFIDENTIAL", 72.0, 72.0);

        let result = add_page_text(&pdf, 1, &config).unwrap();

        assert_eq!(
            shown_strings(&result, 1),
            vec![b"Txt-Page-2".to_vec(), b"CONFIDENTIAL".to_vec()]
        );
        assert_eq!(shown_strings(&result, 0), vec![b"Txt-Page-1".to_vec()]);
        assert_eq!(page_labels(&result), vec!["Txt-Page-1", "Txt-Page-2"]);
    }

    #[test]
    fn test_multiline_text_uses_next_line_operator() {
        let pdf = create_test_pdf(1, "Lines");
        let config = TextConfig::new("first\nsecond\nthird", 50.0, 700.0);

        let result = add_page_text(&pdf, 0, &config).unwrap();

        let strings = shown_strings(&result, 0);
        assert_eq!(&strings[1..], &[b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);
    }

    #[test]
    fn test_font_follows_style() {
        let pdf = create_test_pdf(1, "Font");
        let mut config = TextConfig::new("Bold serif", 50.0, 50.0);
        config.style.font_name = Some("Georgia".into());
        config.style.is_bold = true;

        let result = add_page_text(&pdf, 0, &config).unwrap();

        assert_eq!(page_fonts(&result, 0), vec!["Times-Bold"]);
    }

    #[test]
    fn test_non_latin_characters_are_replaced() {
        assert_eq!(encode_line("café"), b"caf\xe9".to_vec());
        assert_eq!(encode_line("日本"), b"??".to_vec());
    }

    #[test]
    fn test_win_ansi_punctuation() {
        assert_eq!(encode_line("5 €"), b"5 \x80".to_vec());
        assert_eq!(
            encode_line("\u{201C}ok\u{201D} \u{2013} it\u{2019}s"),
            b"\x93ok\x94 \x96 it\x92s".to_vec()
        );
        assert_eq!(encode_line("Œuvre™"), b"\x8Cuvre\x99".to_vec());
        // C1 controls have no WinAnsi glyph
        assert_eq!(encode_line("\u{0085}\u{0093}"), b"??".to_vec());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let pdf = create_test_pdf(1, "Invalid");

        let empty = TextConfig::new("   ", 0.0, 0.0);
        assert!(matches!(
            add_page_text(&pdf, 0, &empty),
            Err(PdfEditError::InvalidParameter(_))
        ));

        let mut tiny = TextConfig::new("x", 0.0, 0.0);
        tiny.style.font_size = 0.0;
        assert!(matches!(
            add_page_text(&pdf, 0, &tiny),
            Err(PdfEditError::InvalidParameter(_))
        ));

        let mut bad_color = TextConfig::new("x", 0.0, 0.0);
        bad_color.style.color = "red".into();
        assert!(matches!(
            add_page_text(&pdf, 0, &bad_color),
            Err(PdfEditError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_page_out_of_range() {
        let pdf = create_test_pdf(1, "Oob");
        let config = TextConfig::new("x", 0.0, 0.0);
        assert!(matches!(
            add_page_text(&pdf, 5, &config),
            Err(PdfEditError::PageOutOfRange {
                index: 5,
                page_count: 1
            })
        ));
    }
}

//! Text styling and color parsing shared by the overlay operations

use crate::error::PdfEditError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: String,
    /// Font family hint such as "serif", "Arial" or "Courier New".
    /// Mapped onto the PDF standard 14 fonts.
    #[serde(default)]
    pub font_name: Option<String>,
    #[serde(default)]
    pub is_italic: bool,
    #[serde(default)]
    pub is_bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            color: "#000000".to_string(),
            font_name: None,
            is_italic: false,
            is_bold: false,
        }
    }
}

/// Standard font families the overlay can select from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Times,
    Helvetica,
    Courier,
    Symbol,
    ZapfDingbats,
}

impl TextStyle {
    /// Base font name among the standard 14 fonts.
    /// Bold or italic words in `font_name` count the same as the flags.
    pub fn pdf_font_name(&self) -> &'static str {
        let hint = self
            .font_name
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        let bold = self.is_bold || hint.contains("bold");
        let italic = self.is_italic || hint.contains("italic") || hint.contains("oblique");

        match (family_for(&hint), bold, italic) {
            (Family::Times, true, true) => "Times-BoldItalic",
            (Family::Times, true, false) => "Times-Bold",
            (Family::Times, false, true) => "Times-Italic",
            (Family::Times, false, false) => "Times-Roman",
            (Family::Helvetica, true, true) => "Helvetica-BoldOblique",
            (Family::Helvetica, true, false) => "Helvetica-Bold",
            (Family::Helvetica, false, true) => "Helvetica-Oblique",
            (Family::Helvetica, false, false) => "Helvetica",
            (Family::Courier, true, true) => "Courier-BoldOblique",
            (Family::Courier, true, false) => "Courier-Bold",
            (Family::Courier, false, true) => "Courier-Oblique",
            (Family::Courier, false, false) => "Courier",
            (Family::Symbol, _, _) => "Symbol",
            (Family::ZapfDingbats, _, _) => "ZapfDingbats",
        }
    }

    /// Symbolic fonts carry their own encoding
    pub fn is_symbolic(&self) -> bool {
        matches!(self.pdf_font_name(), "Symbol" | "ZapfDingbats")
    }
}

fn family_for(hint: &str) -> Family {
    match hint {
        "serif" => return Family::Times,
        "sans-serif" | "cursive" | "fantasy" => return Family::Helvetica,
        "monospace" => return Family::Courier,
        _ => {}
    }

    if hint.contains("symbol") {
        Family::Symbol
    } else if hint.contains("zapf") || hint.contains("dingbat") {
        Family::ZapfDingbats
    } else if ["times", "georgia", "garamond"]
        .iter()
        .any(|name| hint.contains(name))
    {
        Family::Times
    } else if ["courier", "mono", "consolas", "monaco"]
        .iter()
        .any(|name| hint.contains(name))
    {
        Family::Courier
    } else {
        Family::Helvetica
    }
}

/// Parse "#RRGGBB", "RRGGBB" or "#RGB" into RGB components in 0..=1
pub fn parse_hex_color(color: &str) -> Result<(f32, f32, f32), PdfEditError> {
    let hex = color.trim().trim_start_matches('#');
    let invalid = || PdfEditError::InvalidParameter(format!("Invalid color: {:?}", color));

    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(invalid()),
    };

    let channel = |range: std::ops::Range<usize>| {
        expanded
            .get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .map(|value| value as f32 / 255.0)
            .ok_or_else(invalid)
    };

    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

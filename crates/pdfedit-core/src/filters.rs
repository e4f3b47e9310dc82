//! Per-page visual filters and borders
//!
//! Filters are baked into the page as full-page fills composited with PDF
//! blend modes, drawn after the existing content:
//!
//! | Filter | Fill | Blend mode |
//! |---|---|---|
//! | grayscale | mid gray | `Saturation` |
//! | sepia | sepia tone | `Color` |
//! | invert | white | `Difference` |
//! | brightness > 0 | white | `Normal` |
//! | brightness < 0 | black | `Normal` |
//! | tint | tint color | `Multiply` |
//!
//! The filter strength becomes the fill alpha (`/ca`).

use crate::error::PdfEditError;
use crate::overlay::{append_content, register_resource};
use crate::page_tree::{media_box, page_id_at};
use crate::style::parse_hex_color;
use crate::{load_document, save_document};
use lopdf::content::Operation;
use lopdf::{dictionary, Object};
use serde::{Deserialize, Serialize};

const SEPIA_TONE: (f32, f32, f32) = (0.44, 0.26, 0.08);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageFilter {
    /// Desaturation strength, 0..=1
    pub grayscale: f32,
    /// Sepia strength, 0..=1
    pub sepia: f32,
    pub invert: bool,
    /// -1 (black) ..= 1 (white)
    pub brightness: f32,
    pub tint: Option<Tint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tint {
    pub color: String,
    /// 0..=1
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    /// Stroke width in points; 0 draws nothing
    pub width: f32,
    pub color: String,
    pub style: BorderStyle,
    /// Distance from the page edge to the outer edge of the stroke, in points
    pub inset: f32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: 2.0,
            color: "#000000".to_string(),
            style: BorderStyle::Solid,
            inset: 0.0,
        }
    }
}

struct FillLayer {
    rgb: (f32, f32, f32),
    alpha: f32,
    blend: &'static str,
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), PdfEditError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PdfEditError::InvalidParameter(format!(
            "{} must be within {}..={}, got {}",
            name, min, max, value
        )))
    }
}

impl PageFilter {
    pub fn is_identity(&self) -> bool {
        self.grayscale == 0.0
            && self.sepia == 0.0
            && !self.invert
            && self.brightness == 0.0
            && self.tint.as_ref().map_or(true, |t| t.strength == 0.0)
    }

    fn layers(&self) -> Result<Vec<FillLayer>, PdfEditError> {
        check_range("grayscale", self.grayscale, 0.0, 1.0)?;
        check_range("sepia", self.sepia, 0.0, 1.0)?;
        check_range("brightness", self.brightness, -1.0, 1.0)?;

        let mut layers = Vec::new();
        if self.grayscale > 0.0 {
            layers.push(FillLayer {
                rgb: (0.5, 0.5, 0.5),
                alpha: self.grayscale,
                blend: "Saturation",
            });
        }
        if self.sepia > 0.0 {
            layers.push(FillLayer {
                rgb: SEPIA_TONE,
                alpha: self.sepia,
                blend: "Color",
            });
        }
        if self.invert {
            layers.push(FillLayer {
                rgb: (1.0, 1.0, 1.0),
                alpha: 1.0,
                blend: "Difference",
            });
        }
        if self.brightness != 0.0 {
            let level = if self.brightness > 0.0 { 1.0 } else { 0.0 };
            layers.push(FillLayer {
                rgb: (level, level, level),
                alpha: self.brightness.abs(),
                blend: "Normal",
            });
        }
        if let Some(tint) = &self.tint {
            check_range("tint strength", tint.strength, 0.0, 1.0)?;
            let rgb = parse_hex_color(&tint.color)?;
            if tint.strength > 0.0 {
                layers.push(FillLayer {
                    rgb,
                    alpha: tint.strength,
                    blend: "Multiply",
                });
            }
        }

        Ok(layers)
    }
}

impl BorderConfig {
    pub fn is_visible(&self) -> bool {
        self.width > 0.0
    }

    /// Checks width, inset and color. A zero width is valid and draws nothing.
    pub fn validate(&self) -> Result<(), PdfEditError> {
        check_range("border width", self.width, 0.0, f32::MAX)?;
        check_range("border inset", self.inset, 0.0, f32::MAX)?;
        parse_hex_color(&self.color).map(|_| ())
    }

    fn operations(&self, page: [f32; 4]) -> Result<Vec<Operation>, PdfEditError> {
        self.validate()?;
        let (r, g, b) = parse_hex_color(&self.color)?;

        // Stroke is centered on the path
        let offset = self.inset + self.width / 2.0;
        let [x0, y0, x1, y1] = page;
        let (width, height) = (x1 - x0 - 2.0 * offset, y1 - y0 - 2.0 * offset);
        if width <= 0.0 || height <= 0.0 {
            return Err(PdfEditError::InvalidParameter(format!(
                "Border inset {} and width {} leave no room on the page",
                self.inset, self.width
            )));
        }

        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new("w", vec![Object::Real(self.width)]),
            Operation::new(
                "RG",
                vec![Object::Real(r), Object::Real(g), Object::Real(b)],
            ),
        ];
        match self.style {
            BorderStyle::Solid => {}
            BorderStyle::Dashed => ops.push(Operation::new(
                "d",
                vec![
                    Object::Array(vec![
                        Object::Real(self.width * 3.0),
                        Object::Real(self.width * 2.0),
                    ]),
                    Object::Integer(0),
                ],
            )),
            BorderStyle::Dotted => {
                ops.push(Operation::new("J", vec![Object::Integer(1)]));
                ops.push(Operation::new(
                    "d",
                    vec![
                        Object::Array(vec![Object::Integer(0), Object::Real(self.width * 2.0)]),
                        Object::Integer(0),
                    ],
                ));
            }
        }
        ops.extend([
            Operation::new(
                "re",
                vec![
                    Object::Real(x0 + offset),
                    Object::Real(y0 + offset),
                    Object::Real(width),
                    Object::Real(height),
                ],
            ),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(ops)
    }
}

/// Bake `filter` and an optional border into the page at `index` (0-based)
pub fn apply_page_filters(
    bytes: &[u8],
    index: usize,
    filter: &PageFilter,
    border: Option<&BorderConfig>,
) -> Result<Vec<u8>, PdfEditError> {
    let mut doc = load_document(bytes)?;
    let page_id = page_id_at(&doc, index)?;

    let layers = filter.layers()?;
    if let Some(border) = border {
        border.validate()?;
    }
    let border = border.filter(|b| b.is_visible());
    if layers.is_empty() && border.is_none() {
        return Ok(bytes.to_vec());
    }

    let [x0, y0, x1, y1] = media_box(&doc, page_id);
    let mut ops = Vec::new();

    for layer in layers {
        let gs_name = register_resource(
            &mut doc,
            page_id,
            b"ExtGState",
            "PeGs",
            Object::Dictionary(dictionary! {
                "Type" => "ExtGState",
                "ca" => Object::Real(layer.alpha),
                "BM" => Object::Name(layer.blend.as_bytes().to_vec()),
            }),
        )?;
        let (r, g, b) = layer.rgb;
        ops.extend([
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs_name.into_bytes())]),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new(
                "re",
                vec![
                    Object::Real(x0),
                    Object::Real(y0),
                    Object::Real(x1 - x0),
                    Object::Real(y1 - y0),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    if let Some(border) = border {
        ops.extend(border.operations([x0, y0, x1, y1])?);
    }

    append_content(&mut doc, page_id, ops)?;
    save_document(doc)
}

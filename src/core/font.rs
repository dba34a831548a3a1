//! Font registration and metrics.
//!
//! A [`FontFace`] is loaded once before any rendering starts and is read-only
//! afterwards. Text is drawn as a simple PDF font in WinAnsi encoding, so the
//! face keeps one advance width per code point 32..=255 and measures strings
//! exactly the way a PDF viewer lays them out: no kerning, unmappable
//! characters drawn as `?`.

use crate::domain::ports::TextMeasure;
use crate::utils::error::{AssetKind, CertError, Result};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use rusttype::{Font, Scale};
use std::path::Path;

const FIRST_CODE: u8 = 32;
const LAST_CODE: u8 = 255;
const CODE_COUNT: usize = (LAST_CODE - FIRST_CODE) as usize + 1;

/// Unicode values of WinAnsi codes 0x80..=0x9F; `None` where undefined.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// Helvetica advance widths for ASCII 32..=126, from the standard AFM.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' .. '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0' .. '?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@' .. 'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P' .. '_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`' .. 'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p' .. '~'
];

const HELVETICA_DEFAULT_WIDTH: u16 = 556;

/// Map a character to its WinAnsi byte.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u32 as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|&mapped| mapped == Some(c))
            .map(|i| 0x80 + i as u8),
    }
}

fn win_ansi_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as char),
        0x80..=0x9F => WIN_ANSI_HIGH[(code - 0x80) as usize],
        _ => None,
    }
}

/// Encode text for a `Tj` operand. Whitespace becomes a plain space.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            if c.is_whitespace() {
                b' '
            } else {
                win_ansi_byte(c).unwrap_or(b'?')
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
enum FontProgram {
    /// One of the PDF standard fonts; viewers supply the glyphs.
    Standard { base_font: &'static str },
    TrueType(TrueTypeProgram),
}

#[derive(Debug, Clone)]
struct TrueTypeProgram {
    data: Vec<u8>,
    ascent: f32,
    descent: f32,
    cap_height: f32,
    bbox: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct FontFace {
    face_name: String,
    /// Advance widths in 1/1000 em for codes `FIRST_CODE..=LAST_CODE`.
    widths: Vec<u16>,
    program: FontProgram,
}

impl FontFace {
    /// Load a TrueType/OpenType file and register it under `face_name`.
    pub fn load<P: AsRef<Path>>(path: P, face_name: &str) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                CertError::MissingAsset {
                    kind: AssetKind::Font,
                    path: path.to_path_buf(),
                }
            }
            _ => CertError::IoError(e),
        })?;

        let face = Self::from_bytes(data, face_name).map_err(|message| CertError::FontError {
            path: path.to_path_buf(),
            message,
        })?;

        tracing::debug!(
            "Registered font '{}' from {} ({} glyph widths)",
            face.face_name,
            path.display(),
            face.widths.len()
        );
        Ok(face)
    }

    pub fn from_bytes(data: Vec<u8>, face_name: &str) -> std::result::Result<Self, String> {
        let font = Font::try_from_vec(data.clone())
            .ok_or_else(|| "not a TrueType or OpenType font".to_string())?;

        let units_per_em = f32::from(font.units_per_em());
        if units_per_em <= 0.0 {
            return Err("font reports zero units per em".to_string());
        }

        // rusttype scales relative to ascent - descent; rescale so that
        // one unit of advance equals 1/1000 em.
        let unscaled = font.v_metrics_unscaled();
        let line_height = unscaled.ascent - unscaled.descent;
        if line_height <= 0.0 {
            return Err("font has no vertical extent".to_string());
        }
        let scale = Scale::uniform(1000.0 * line_height / units_per_em);

        let mut widths = Vec::with_capacity(CODE_COUNT);
        let mut bbox = [0.0f32; 4];
        for code in FIRST_CODE..=LAST_CODE {
            let Some(c) = win_ansi_char(code) else {
                widths.push(0);
                continue;
            };
            let glyph = font.glyph(c).scaled(scale);
            widths.push(glyph.h_metrics().advance_width.round().max(0.0) as u16);

            if let Some(rect) = glyph.exact_bounding_box() {
                // rusttype's y axis points down
                bbox[0] = bbox[0].min(rect.min.x);
                bbox[1] = bbox[1].min(-rect.max.y);
                bbox[2] = bbox[2].max(rect.max.x);
                bbox[3] = bbox[3].max(-rect.min.y);
            }
        }

        let ascent = unscaled.ascent * 1000.0 / units_per_em;
        let descent = unscaled.descent * 1000.0 / units_per_em;
        let cap_height = font
            .glyph('H')
            .scaled(scale)
            .exact_bounding_box()
            .map(|rect| -rect.min.y)
            .unwrap_or(ascent);

        Ok(Self {
            face_name: face_name.to_string(),
            widths,
            program: FontProgram::TrueType(TrueTypeProgram {
                data,
                ascent,
                descent,
                cap_height,
                bbox,
            }),
        })
    }

    /// Standard Helvetica. Needs no font file; non-ASCII widths are approximate.
    pub fn helvetica() -> Self {
        let widths = (FIRST_CODE..=LAST_CODE)
            .map(|code| match code {
                0x20..=0x7E => HELVETICA_ASCII[(code - 0x20) as usize],
                0xA0 => HELVETICA_ASCII[0],
                _ => HELVETICA_DEFAULT_WIDTH,
            })
            .collect();

        Self {
            face_name: "Helvetica".to_string(),
            widths,
            program: FontProgram::Standard {
                base_font: "Helvetica",
            },
        }
    }

    pub fn face_name(&self) -> &str {
        &self.face_name
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.program, FontProgram::TrueType(_))
    }

    fn code_width(&self, code: u8) -> u16 {
        if code < FIRST_CODE {
            return 0;
        }
        self.widths[(code - FIRST_CODE) as usize]
    }

    /// PostScript-safe BaseFont name derived from the face name.
    fn base_font_name(&self) -> String {
        let name: String = self
            .face_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        if name.is_empty() {
            "CertFont".to_string()
        } else {
            name
        }
    }

    /// Add this font to `doc` as a simple WinAnsi font and return its id.
    pub fn add_to_document(&self, doc: &mut Document) -> ObjectId {
        let widths: Vec<Object> = self
            .widths
            .iter()
            .map(|&w| Object::Integer(i64::from(w)))
            .collect();

        match &self.program {
            FontProgram::Standard { base_font } => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => *base_font,
                "Encoding" => "WinAnsiEncoding",
            }),
            FontProgram::TrueType(program) => {
                let base_font = self.base_font_name();
                let font_file_id = doc.add_object(Stream::new(
                    dictionary! { "Length1" => program.data.len() as i64 },
                    program.data.clone(),
                ));
                let descriptor_id = doc.add_object(dictionary! {
                    "Type" => "FontDescriptor",
                    "FontName" => Object::Name(base_font.clone().into_bytes()),
                    "Flags" => 32,
                    "FontBBox" => program.bbox.iter().map(|&v| Object::Real(v)).collect::<Vec<_>>(),
                    "ItalicAngle" => 0,
                    "Ascent" => Object::Real(program.ascent),
                    "Descent" => Object::Real(program.descent),
                    "CapHeight" => Object::Real(program.cap_height),
                    "StemV" => 80,
                    "FontFile2" => font_file_id,
                });
                doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "TrueType",
                    "BaseFont" => Object::Name(base_font.into_bytes()),
                    "FirstChar" => i64::from(FIRST_CODE),
                    "LastChar" => i64::from(LAST_CODE),
                    "Widths" => widths,
                    "FontDescriptor" => descriptor_id,
                    "Encoding" => "WinAnsiEncoding",
                })
            }
        }
    }
}

impl TextMeasure for FontFace {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|code| u32::from(self.code_width(code)))
            .sum();
        units as f32 * size / 1000.0
    }
}

//! Font-aware decoding of PDF string operands.

use std::collections::HashMap;

use lazy_static::lazy_static;
use lopdf::{Dictionary, Document, Object};
use regex::Regex;
use tracing::trace;

lazy_static! {
    static ref BFCHAR_BLOCK: Regex = Regex::new(r"(?s)beginbfchar(.*?)endbfchar").unwrap();
    static ref BFRANGE_BLOCK: Regex = Regex::new(r"(?s)beginbfrange(.*?)endbfrange").unwrap();
    static ref BFCHAR_PAIR: Regex =
        Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]*)>").unwrap();
    static ref BFRANGE_ENTRY: Regex = Regex::new(
        r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(?:<([0-9A-Fa-f]*)>|\[([^\]]*)\])"
    ).unwrap();
    static ref HEX_STRING: Regex = Regex::new(r"<([0-9A-Fa-f]*)>").unwrap();
}

/// One decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Unicode text for the code (may be empty or several chars).
    pub text: String,
    /// Advance width in text space units (1.0 = font size).
    pub width: f32,
    /// Single-byte code 32, which receives word spacing.
    pub is_space: bool,
}

/// Character code to Unicode mapping parsed from a `ToUnicode` CMap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicode {
    map: HashMap<u32, String>,
    code_bytes: Option<usize>,
}

impl ToUnicode {
    /// Parse the `bfchar` and `bfrange` sections of a CMap program.
    pub fn parse(cmap: &str) -> Self {
        let mut result = ToUnicode::default();

        for block in BFCHAR_BLOCK.captures_iter(cmap) {
            for pair in BFCHAR_PAIR.captures_iter(&block[1]) {
                let Some(code) = parse_hex(&pair[1]) else { continue };
                result.note_width(&pair[1]);
                result.map.insert(code, utf16_hex_to_string(&pair[2]));
            }
        }

        for block in BFRANGE_BLOCK.captures_iter(cmap) {
            for entry in BFRANGE_ENTRY.captures_iter(&block[1]) {
                let (Some(lo), Some(hi)) = (parse_hex(&entry[1]), parse_hex(&entry[2])) else {
                    continue;
                };
                if hi < lo || hi - lo > 0xFFFF {
                    continue;
                }
                result.note_width(&entry[1]);

                if let Some(start) = entry.get(3) {
                    let base: Vec<u16> = hex_to_u16s(start.as_str());
                    for (offset, code) in (lo..=hi).enumerate() {
                        let mut units = base.clone();
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(offset as u16);
                        }
                        result.map.insert(code, String::from_utf16_lossy(&units));
                    }
                } else if let Some(list) = entry.get(4) {
                    let targets: Vec<String> = HEX_STRING
                        .captures_iter(list.as_str())
                        .map(|c| utf16_hex_to_string(&c[1]))
                        .collect();
                    for (code, text) in (lo..=hi).zip(targets) {
                        result.map.insert(code, text);
                    }
                }
            }
        }

        result
    }

    fn note_width(&mut self, hex: &str) {
        if self.code_bytes.is_none() {
            self.code_bytes = Some(hex.len().div_ceil(2).max(1));
        }
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Decodes string operands for one font resource.
#[derive(Debug, Clone)]
pub struct FontDecoder {
    two_byte: bool,
    to_unicode: Option<ToUnicode>,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
}

impl FontDecoder {
    /// Decoder for text with no font information.
    pub fn fallback(default_width: f32) -> Self {
        Self {
            two_byte: false,
            to_unicode: None,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width,
        }
    }

    /// Build a decoder from a font dictionary.
    pub fn from_dict(doc: &Document, font: &Dictionary, default_width: f32) -> Self {
        let mut decoder = Self::fallback(default_width);

        let subtype = font.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        decoder.two_byte = subtype == Some(b"Type0".as_slice());

        decoder.to_unicode = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, obj)| match obj {
                Object::Stream(stream) => {
                    let data = stream
                        .decompressed_content()
                        .unwrap_or_else(|_| stream.content.clone());
                    Some(ToUnicode::parse(&String::from_utf8_lossy(&data)))
                }
                _ => None,
            })
            .filter(|cmap| !cmap.is_empty());

        if let Some(cmap) = &decoder.to_unicode {
            trace!("Font ToUnicode with {} mappings", cmap.len());
            if let Some(bytes) = cmap.code_bytes {
                decoder.two_byte = bytes >= 2;
            }
        }

        if decoder.two_byte {
            decoder.load_cid_widths(doc, font);
        } else {
            decoder.first_char = font
                .get(b"FirstChar")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0)
                .max(0) as u32;
            decoder.widths = font
                .get(b"Widths")
                .ok()
                .and_then(|o| doc.dereference(o).ok())
                .and_then(|(_, o)| o.as_array().ok())
                .map(|arr| arr.iter().map(|w| as_number(w) / 1000.0).collect())
                .unwrap_or_default();
        }

        decoder
    }

    fn load_cid_widths(&mut self, doc: &Document, font: &Dictionary) {
        let descendant = font
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_dict().ok());

        let Some(descendant) = descendant else { return };

        if let Ok(dw) = descendant.get(b"DW") {
            self.default_width = as_number(dw) / 1000.0;
        } else {
            self.default_width = 1.0;
        }

        let Some(w) = descendant
            .get(b"W")
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_array().ok())
        else {
            return;
        };

        // [c [w1 w2 ...]] or [c_first c_last w]
        let mut i = 0;
        while i < w.len() {
            let first = as_number(&w[i]) as u32;
            match w.get(i + 1).map(|o| doc.dereference(o).map(|(_, o)| o)) {
                Some(Ok(Object::Array(list))) => {
                    for (offset, width) in list.iter().enumerate() {
                        self.cid_widths.insert(first.saturating_add(offset as u32), as_number(width) / 1000.0);
                    }
                    i += 2;
                }
                Some(Ok(last)) if i + 2 < w.len() => {
                    let last = as_number(last) as u32;
                    let width = as_number(&w[i + 2]) / 1000.0;
                    for code in first..=last.min(first.saturating_add(0xFFFF)) {
                        self.cid_widths.insert(code, width);
                    }
                    i += 3;
                }
                _ => break,
            }
        }
    }

    /// Split a string operand into glyphs.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        if !self.two_byte && self.to_unicode.is_none() && bytes.starts_with(&[0xFE, 0xFF]) {
            // UTF-16BE text string
            let units: Vec<u16> = bytes[2..]
                .chunks(2)
                .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]))
                .collect();
            return String::from_utf16_lossy(&units)
                .chars()
                .map(|ch| Glyph {
                    text: ch.to_string(),
                    width: self.default_width,
                    is_space: ch == ' ',
                })
                .collect();
        }

        let step = if self.two_byte { 2 } else { 1 };
        bytes
            .chunks(step)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                let text = match &self.to_unicode {
                    Some(cmap) => cmap
                        .get(code)
                        .map(str::to_string)
                        .unwrap_or_else(|| self.fallback_text(code)),
                    None => self.fallback_text(code),
                };
                Glyph {
                    text,
                    width: self.width_of(code),
                    is_space: step == 1 && code == 32,
                }
            })
            .collect()
    }

    fn fallback_text(&self, code: u32) -> String {
        if self.two_byte {
            return String::new();
        }
        // WinAnsi and Latin-1 agree on the printable range used in tables
        match code {
            0x92 => "'".to_string(),
            0x93 | 0x94 => "\"".to_string(),
            0x96 => "–".to_string(),
            0x97 => "—".to_string(),
            0x80 => "€".to_string(),
            _ => char::from_u32(code)
                .filter(|c| !c.is_control())
                .map(|c| c.to_string())
                .unwrap_or_default(),
        }
    }

    fn width_of(&self, code: u32) -> f32 {
        if self.two_byte {
            return self.cid_widths.get(&code).copied().unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }
}

/// Numeric value of an integer or real object.
pub fn as_number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r as f32,
        _ => 0.0,
    }
}

fn parse_hex(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex, 16).ok()
}

fn hex_to_u16s(hex: &str) -> Vec<u16> {
    hex.as_bytes()
        .chunks(4)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .filter_map(|s| u16::from_str_radix(s, 16).ok())
        .collect()
}

fn utf16_hex_to_string(hex: &str) -> String {
    String::from_utf16_lossy(&hex_to_u16s(hex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use lopdf::dictionary;

    const CMAP: &str = r#"
/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0011> <002E>
endbfchar
2 beginbfrange
<0024> <0026> <0041>
<0030> <0031> [<0061> <0062>]
endbfrange
endcmap
"#;

    #[test]
    fn test_parse_to_unicode() {
        let cmap = ToUnicode::parse(CMAP);
        assert_eq!(cmap.code_bytes, Some(2));
        assert_eq!(cmap.get(0x0003), Some(" "));
        assert_eq!(cmap.get(0x0011), Some("."));
        assert_eq!(cmap.get(0x0024), Some("A"));
        assert_eq!(cmap.get(0x0026), Some("C"));
        assert_eq!(cmap.get(0x0031), Some("b"));
        assert_eq!(cmap.get(0x0040), None);
        assert_eq!(cmap.len(), 7);
    }

    #[test]
    fn test_decode_two_byte_codes() {
        let decoder = FontDecoder {
            two_byte: true,
            to_unicode: Some(ToUnicode::parse(CMAP)),
            ..FontDecoder::fallback(0.5)
        };
        let glyphs = decoder.decode(&[0x00, 0x24, 0x00, 0x03, 0x00, 0x25, 0x00, 0x11]);
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(text, "A B.");
        assert!(glyphs.iter().all(|g| !g.is_space));
    }

    #[test]
    fn test_decode_single_byte_fallback() {
        let decoder = FontDecoder {
            first_char: 32,
            widths: vec![0.25, 0.0, 0.5],
            ..FontDecoder::fallback(0.6)
        };
        let glyphs = decoder.decode(b" !\"R");
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(text, " !\"R");
        assert!(glyphs[0].is_space);
        assert_eq!(glyphs[0].width, 0.25);
        // Zero width falls back to the default
        assert_eq!(glyphs[1].width, 0.6);
        assert_eq!(glyphs[2].width, 0.5);
        assert_eq!(glyphs[3].width, 0.6);
    }

    fn type0_font(w: Vec<Object>) -> Dictionary {
        lopdf::dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Dictionary(lopdf::dictionary! {
                "Subtype" => "CIDFontType2",
                "DW" => Object::Integer(700),
                "W" => w,
            })],
        }
    }

    #[test]
    fn test_cid_widths_from_w_array() {
        let doc = Document::with_version("1.5");
        let font = type0_font(vec![
            Object::Integer(1),
            Object::Array(vec![Object::Integer(500), Object::Integer(600)]),
            Object::Integer(10),
            Object::Integer(12),
            Object::Integer(250),
        ]);

        let decoder = FontDecoder::from_dict(&doc, &font, 0.5);
        assert!(decoder.two_byte);
        assert_eq!(decoder.width_of(2), 0.6);
        assert_eq!(decoder.width_of(11), 0.25);
        assert_eq!(decoder.width_of(99), 0.7);
    }

    #[test]
    fn test_cid_widths_near_code_limit() {
        let doc = Document::with_version("1.5");
        let font = type0_font(vec![
            Object::Integer(i64::from(u32::MAX)),
            Object::Array(vec![Object::Integer(500), Object::Integer(600)]),
        ]);

        let decoder = FontDecoder::from_dict(&doc, &font, 0.5);
        assert_eq!(decoder.width_of(u32::MAX), 0.6);
    }

    #[test]
    fn test_decode_utf16_text_string() {
        let decoder = FontDecoder::fallback(0.5);
        let glyphs = decoder.decode(&[0xFE, 0xFF, 0x00, 0x52, 0x00, 0x31]);
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(text, "R1");
    }
}

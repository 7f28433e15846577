//! Content stream interpretation into positioned text fragments.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::Result;
use super::fonts::{FontDecoder, as_number};
use crate::models::config::ScanConfig;

/// A run of text drawn at one position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Left edge in page space.
    pub x: f32,
    /// Baseline in page space (origin at the bottom).
    pub y: f32,
    /// Advance width in page space.
    pub width: f32,
    /// Effective font size in page space.
    pub font_size: f32,
    pub text: String,
}

impl TextFragment {
    pub fn x1(&self) -> f32 {
        self.x + self.width
    }
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    pub fn translate(tx: f32, ty: f32) -> Self {
        Matrix { e: tx, f: ty, ..Self::IDENTITY }
    }

    fn from_operands(ops: &[Object]) -> Option<Self> {
        if ops.len() < 6 {
            return None;
        }
        Some(Matrix {
            a: as_number(&ops[0]),
            b: as_number(&ops[1]),
            c: as_number(&ops[2]),
            d: as_number(&ops[3]),
            e: as_number(&ops[4]),
            f: as_number(&ops[5]),
        })
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.a + y * self.c + self.e, x * self.b + y * self.d + self.f)
    }

    fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

#[derive(Debug, Clone)]
struct TextState {
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
    font: Option<Vec<u8>>,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
            font_size: 0.0,
        }
    }
}

/// Extract positioned text from one page.
pub fn page_fragments(doc: &Document, page_id: ObjectId, config: &ScanConfig) -> Result<Vec<TextFragment>> {
    let data = doc.get_page_content(page_id)?;
    let content = Content::decode(&data)?;
    let fonts = page_fonts(doc, page_id, config.char_width);
    let fallback = FontDecoder::fallback(config.char_width);

    let mut interpreter = Interpreter {
        fonts: &fonts,
        fallback: &fallback,
        ctm: Matrix::IDENTITY,
        stack: Vec::new(),
        state: TextState::default(),
        tm: Matrix::IDENTITY,
        tlm: Matrix::IDENTITY,
        fragments: Vec::new(),
    };

    for op in &content.operations {
        interpreter.execute(&op.operator, &op.operands);
    }

    debug!(
        "Page object {:?}: {} operations, {} text fragments",
        page_id,
        content.operations.len(),
        interpreter.fragments.len()
    );
    Ok(interpreter.fragments)
}

struct Interpreter<'a> {
    fonts: &'a HashMap<Vec<u8>, FontDecoder>,
    fallback: &'a FontDecoder,
    ctm: Matrix,
    stack: Vec<(Matrix, TextState)>,
    state: TextState,
    tm: Matrix,
    tlm: Matrix,
    fragments: Vec<TextFragment>,
}

impl Interpreter<'_> {
    fn execute(&mut self, operator: &str, ops: &[Object]) {
        match operator {
            "q" => self.stack.push((self.ctm, self.state.clone())),
            "Q" => {
                if let Some((ctm, state)) = self.stack.pop() {
                    self.ctm = ctm;
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(ops) {
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let [name, size, ..] = ops {
                    self.state.font = name.as_name().ok().map(<[u8]>::to_vec);
                    self.state.font_size = as_number(size);
                }
            }
            "Tc" => self.state.char_spacing = first_number(ops),
            "Tw" => self.state.word_spacing = first_number(ops),
            "Tz" => self.state.horizontal_scaling = first_number(ops) / 100.0,
            "TL" => self.state.leading = first_number(ops),
            "Ts" => self.state.rise = first_number(ops),
            "Td" => {
                if let [tx, ty, ..] = ops {
                    self.move_line(as_number(tx), as_number(ty));
                }
            }
            "TD" => {
                if let [tx, ty, ..] = ops {
                    let ty = as_number(ty);
                    self.state.leading = -ty;
                    self.move_line(as_number(tx), ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(ops) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = ops.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = ops.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let [aw, ac, Object::String(bytes, _), ..] = ops {
                    self.state.word_spacing = as_number(aw);
                    self.state.char_spacing = as_number(ac);
                    self.next_line();
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Ok(items)) = ops.first().map(Object::as_array) {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            Object::Integer(_) | Object::Real(_) => {
                                let tx = -as_number(item) / 1000.0
                                    * self.state.font_size
                                    * self.state.horizontal_scaling;
                                self.tm = Matrix::translate(tx, 0.0).then(&self.tm);
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translate(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, bytes: &[u8]) {
        let fonts = self.fonts;
        let decoder = self
            .state
            .font
            .as_ref()
            .and_then(|name| fonts.get(name))
            .unwrap_or(self.fallback);

        let state = &self.state;
        let mut text = String::new();
        let mut advance = 0.0;
        for glyph in decoder.decode(bytes) {
            let mut w = glyph.width * state.font_size + state.char_spacing;
            if glyph.is_space {
                w += state.word_spacing;
            }
            advance += w * state.horizontal_scaling;
            text.push_str(&glyph.text);
        }

        let device = self.tm.then(&self.ctm);
        let (x, y) = device.apply(0.0, state.rise);
        let font_size = state.font_size * device.vertical_scale();
        let width = advance * device.horizontal_scale();

        if !text.trim().is_empty() {
            trace!("Text {:?} at ({:.1}, {:.1}) size {:.1}", text, x, y, font_size);
            self.fragments.push(TextFragment { x, y, width, font_size, text });
        }

        self.tm = Matrix::translate(advance, 0.0).then(&self.tm);
    }
}

fn first_number(ops: &[Object]) -> f32 {
    ops.first().map(as_number).unwrap_or(0.0)
}

/// Decoders for every font resource visible on a page.
fn page_fonts(doc: &Document, page_id: ObjectId, char_width: f32) -> HashMap<Vec<u8>, FontDecoder> {
    let mut fonts = HashMap::new();

    let Some(resources) = page_resources(doc, page_id) else {
        return fonts;
    };
    let Some(font_dict) = resources
        .get(b"Font")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_dict().ok())
    else {
        return fonts;
    };

    for (name, value) in font_dict.iter() {
        if let Ok((_, Object::Dictionary(font))) = doc.dereference(value) {
            fonts.insert(name.clone(), FontDecoder::from_dict(doc, font, char_width));
        }
    }

    trace!("Page object {:?}: {} font resources", page_id, fonts.len());
    fonts
}

/// Resources dictionary for a page, inherited from the page tree when absent.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let node = doc.get_object(node_id).ok()?;
    let Object::Dictionary(dict) = node else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
            return Some(res_dict.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_matrix_then_applies_left_first() {
        let scale = Matrix { a: 2.0, d: 2.0, ..Matrix::IDENTITY };
        let shift = Matrix::translate(10.0, 5.0);

        let (x, y) = scale.then(&shift).apply(1.0, 1.0);
        assert!(approx(x, 12.0) && approx(y, 7.0));

        let (x, y) = shift.then(&scale).apply(1.0, 1.0);
        assert!(approx(x, 22.0) && approx(y, 12.0));
    }

    #[test]
    fn test_text_positioning_operators() {
        let fonts = HashMap::new();
        let fallback = FontDecoder::fallback(0.5);
        let mut interp = Interpreter {
            fonts: &fonts,
            fallback: &fallback,
            ctm: Matrix::IDENTITY,
            stack: Vec::new(),
            state: TextState::default(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            fragments: Vec::new(),
        };

        let s = |t: &str| Object::string_literal(t);
        interp.execute("BT", &[]);
        interp.execute("Tf", &[Object::Name(b"F1".to_vec()), Object::Integer(10)]);
        interp.execute("Td", &[Object::Integer(72), Object::Integer(700)]);
        interp.execute("Tj", &[s("Area")]);
        interp.execute("TL", &[Object::Integer(14)]);
        interp.execute("T*", &[]);
        interp.execute("TJ", &[Object::Array(vec![s("Du"), Object::Integer(-2000), s("rban")])]);
        interp.execute("ET", &[]);

        let f = &interp.fragments;
        assert_eq!(f.len(), 3);
        assert_eq!(f[0].text, "Area");
        assert!(approx(f[0].x, 72.0) && approx(f[0].y, 700.0));
        assert!(approx(f[0].width, 20.0));
        assert!(approx(f[1].y, 686.0));
        // 2 glyphs at 5pt, then a 20pt kerning gap
        assert!(approx(f[2].x, 72.0 + 10.0 + 20.0));
    }
}

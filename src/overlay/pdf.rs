//! PDF building blocks shared by the overlay variants

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::OverlayError;

/// Resource name of the fixed-advance overlay font
pub(crate) const OVERLAY_FONT: &str = "OcrF";

/// Resource name of the zero-opacity graphics state
pub(crate) const INVISIBLE_STATE: &str = "OcrGS";

/// Courier advance width as a fraction of the font size
pub(crate) const COURIER_ADVANCE: f64 = 0.6;

/// Text render mode that neither fills nor strokes
const RENDER_INVISIBLE: i64 = 3;

pub(crate) fn standard_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

pub(crate) fn invisible_state() -> Dictionary {
    dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(0.0),
        "CA" => Object::Real(0.0),
    }
}

pub(crate) fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Numeric value of an integer or real object
pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Encode text for a WinAnsi simple font. Unmappable characters become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u8,
            '\t' | '\n' | '\r' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8a,
            '‹' => 0x8b,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9a,
            '›' => 0x9b,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            _ => b'?',
        })
        .collect()
}

pub(crate) fn text_operand(text: &str) -> Object {
    Object::String(encode_win_ansi(text), StringFormat::Literal)
}

/// One run of invisible text positioned at (x, y) in page space
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InvisibleRun {
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub text: String,
}

/// Content stream drawing `runs` invisibly with the overlay font and state
pub(crate) fn invisible_text_content(runs: &[InvisibleRun]) -> Result<Vec<u8>, OverlayError> {
    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![INVISIBLE_STATE.into()]),
        Operation::new("BT", vec![]),
        Operation::new("Tr", vec![Object::Integer(RENDER_INVISIBLE)]),
    ];

    for run in runs {
        operations.push(Operation::new(
            "Tf",
            vec![OVERLAY_FONT.into(), real(run.font_size)],
        ));
        operations.push(Operation::new(
            "Tm",
            vec![1.into(), 0.into(), 0.into(), 1.into(), real(run.x), real(run.y)],
        ));
        operations.push(Operation::new("Tj", vec![text_operand(&run.text)]));
    }

    operations.push(Operation::new("ET", vec![]));
    operations.push(Operation::new("Q", vec![]));

    Ok(Content { operations }.encode()?)
}

/// Builds a new document page by page
pub(crate) struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.doc.add_object(object)
    }

    pub fn add_page(
        &mut self,
        width: f64,
        height: f64,
        resources: Dictionary,
        content: Vec<u8>,
    ) -> ObjectId {
        let mut stream = Stream::new(dictionary! {}, content);
        if let Err(e) = stream.compress() {
            tracing::debug!(error = %e, "Content stream left uncompressed");
        }
        let content_id = self.doc.add_object(stream);

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), real(width), real(height)],
            "Resources" => resources,
            "Contents" => content_id,
        });
        self.kids.push(Object::Reference(page_id));
        page_id
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn finish(mut self) -> Result<Vec<u8>, OverlayError> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => Object::Integer(count),
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        save(&mut self.doc)
    }
}

pub(crate) fn save(doc: &mut Document) -> Result<Vec<u8>, OverlayError> {
    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| OverlayError::Write(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Total: 42"), b"Total: 42".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(encode_win_ansi("“quoted” – €5"), vec![0x93, b'q', b'u', b'o', b't', b'e', b'd', 0x94, b' ', 0x96, b' ', 0x80, b'5']);
        assert_eq!(encode_win_ansi("漢\t"), vec![b'?', b' ']);
    }

    #[test]
    fn test_invisible_content_uses_render_mode_three() {
        let content = invisible_text_content(&[InvisibleRun {
            x: 10.0,
            y: 20.0,
            font_size: 12.0,
            text: "Hello (World)".to_string(),
        }])
        .unwrap();

        let decoded = Content::decode(&content).unwrap();
        let ops: Vec<&str> = decoded.operations.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(ops, vec!["q", "gs", "BT", "Tr", "Tf", "Tm", "Tj", "ET", "Q"]);
        assert_eq!(decoded.operations[3].operands, vec![Object::Integer(3)]);
        assert_eq!(
            decoded.operations[6].operands,
            vec![Object::String(b"Hello (World)".to_vec(), StringFormat::Literal)]
        );
    }

    #[test]
    fn test_builder_produces_loadable_document() {
        let mut builder = PdfBuilder::new();
        let font = builder.add_object(standard_font("Helvetica"));
        builder.add_page(100.0, 200.0, dictionary! { "Font" => dictionary! { "F1" => font } }, b"q Q".to_vec());
        builder.add_page(100.0, 200.0, Dictionary::new(), b"q Q".to_vec());
        assert_eq!(builder.page_count(), 2);

        let bytes = builder.finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}

//! Document fixtures shared by unit tests

use std::io::Cursor;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

/// One page of a fixture document
struct FixturePage {
    width: f32,
    height: f32,
    content: Vec<u8>,
    font: bool,
    image: Option<Stream>,
}

impl FixturePage {
    fn new(width: f32, height: f32, content: Vec<u8>) -> Self {
        Self {
            width,
            height,
            content,
            font: false,
            image: None,
        }
    }
}

fn build(pages: Vec<FixturePage>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = pages.iter().any(|p| p.font).then(|| {
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        })
    });

    let mut kids = Vec::new();
    for fixture in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, fixture.content));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(fixture.width),
                Object::Real(fixture.height),
            ],
            "Contents" => content_id,
        };

        let font = font_id.filter(|_| fixture.font);
        if font.is_some() || fixture.image.is_some() {
            let mut resources = lopdf::Dictionary::new();
            if let Some(font_id) = font {
                resources.set("Font", dictionary! { "F1" => font_id });
            }
            if let Some(image) = fixture.image {
                let image_id = doc.add_object(image);
                resources.set("XObject", dictionary! { "Im0" => image_id });
            }
            page.set("Resources", resources);
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Single US Letter page with one visible text line per entry
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
        operations.push(Operation::new(
            "Td",
            vec![72.into(), Object::Integer(720 - 16 * i as i64)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(line.as_bytes().to_vec(), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations }.encode().unwrap();
    let mut page = FixturePage::new(612.0, 792.0, content);
    page.font = true;
    build(vec![page])
}

/// Pages that only paint a grey rectangle, as a scanner would paint an image
pub fn scanned_pdf(pages: usize, width: f32, height: f32) -> Vec<u8> {
    let page = |_| {
        let content = format!("0.9 g 0 0 {width} {height} re f").into_bytes();
        FixturePage::new(width, height, content)
    };
    build((0..pages).map(page).collect())
}

/// US Letter page painting one uncompressed DCT image of `size` noisy
/// bytes. Operator-like byte pairs (` Tj `, ` BT `) are planted every
/// kilobyte, as they turn up in real compressed scans.
pub fn scanned_image_pdf(size: usize) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    let mut data: Vec<u8> = (0..size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    for (i, chunk) in data.chunks_mut(1024).enumerate() {
        if chunk.len() >= 4 {
            let marker: &[u8; 4] = if i % 2 == 0 { b" Tj " } else { b" BT " };
            chunk[..4].copy_from_slice(marker);
        }
    }

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1700,
            "Height" => 2200,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        data,
    )
    .with_compression(false);

    let content = b"q 612 0 0 792 0 0 cm /Im0 Do Q".to_vec();
    let mut page = FixturePage::new(612.0, 792.0, content);
    page.image = Some(image);
    build(vec![page])
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([240, 240, 240]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 200, 200]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)
        .unwrap();
    out
}

/// Text-showing operands of every page, in content order
pub fn shown_text(pdf: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let data = doc.get_page_content(page_id).unwrap();
            Content::decode(&data)
                .unwrap()
                .operations
                .into_iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match op.operands.first() {
                    Some(Object::String(bytes, _)) => {
                        Some(String::from_utf8_lossy(bytes).into_owned())
                    }
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// Operators of every page, in content order
pub fn operators(pdf: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let data = doc.get_page_content(page_id).unwrap();
            Content::decode(&data)
                .unwrap()
                .operations
                .into_iter()
                .map(|op| op.operator)
                .collect()
        })
        .collect()
}

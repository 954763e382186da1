//! Image-backed overlay
//!
//! One page at the image's native pixel size with the image as background.
//! Each recognized line is drawn invisibly in Courier: the font size is the
//! line height and every inter-word gap becomes as many spaces as fit into
//! it, so glyph positions track the visible words.

use lopdf::{dictionary, Object, Stream};

use super::pdf::{self, InvisibleRun, PdfBuilder, COURIER_ADVANCE, INVISIBLE_STATE, OVERLAY_FONT};
use super::OverlayError;
use crate::geometry::Extent;
use crate::layout::{Line, Page};

const IMAGE_NAME: &str = "Im0";

#[derive(Debug, Clone)]
pub struct ImageOverlay {
    /// Baseline offset above the box bottom, as a fraction of the font size
    descent_fraction: f64,
}

impl Default for ImageOverlay {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl ImageOverlay {
    pub fn new(descent_fraction: f64) -> Self {
        Self { descent_fraction }
    }

    /// Compose a one-page document from an image and its recognized page
    pub fn compose(&self, image: &[u8], page: &Page) -> Result<Vec<u8>, OverlayError> {
        let mut builder = PdfBuilder::new();
        let (image_stream, width, height) = image_xobject(image)?;
        let image_id = builder.add_object(image_stream);
        let font_id = builder.add_object(pdf::standard_font("Courier"));
        let state_id = builder.add_object(pdf::invisible_state());

        // Recognizer coordinates may come from a resampled copy of the image
        let (scale_x, scale_y) = match page.dimensions() {
            Some((w, h)) => (width / w, height / h),
            None => (1.0, 1.0),
        };

        let runs: Vec<InvisibleRun> = page
            .lines
            .iter()
            .filter_map(|line| self.line_run(line, height, scale_x, scale_y))
            .collect();

        let mut content = format!("q {} 0 0 {} 0 0 cm /{} Do Q\n", width, height, IMAGE_NAME).into_bytes();
        if !runs.is_empty() {
            content.extend(pdf::invisible_text_content(&runs)?);
        }

        let resources = dictionary! {
            "XObject" => dictionary! { IMAGE_NAME => image_id },
            "Font" => dictionary! { OVERLAY_FONT => font_id },
            "ExtGState" => dictionary! { INVISIBLE_STATE => state_id },
        };
        builder.add_page(width, height, resources, content);

        tracing::debug!(lines = runs.len(), width, height, "Composed image-backed overlay");
        builder.finish()
    }

    /// Invisible run for one line, or `None` when it has no text or geometry
    fn line_run(&self, line: &Line, page_height: f64, scale_x: f64, scale_y: f64) -> Option<InvisibleRun> {
        let extent = line.extent()?;
        let font_size = extent.height * scale_y;
        if font_size <= 0.0 || !font_size.is_finite() {
            return None;
        }

        let text = spaced_line_text(line, font_size / scale_x)?;
        let baseline = extent.bottom * scale_y - self.descent_fraction * font_size;
        // Start at the first word's corner; aggregate line boxes are often padded
        let left = line.word_extent().map_or(extent.left, |words| words.left);

        Some(InvisibleRun {
            x: left * scale_x,
            y: page_height - baseline,
            font_size,
            text,
        })
    }
}

/// Line text with each gap rendered as `max(1, round(gap / advance))`
/// spaces, where `advance` is the Courier space width at `font_size`
/// (both in source pixels).
pub(crate) fn spaced_line_text(line: &Line, font_size: f64) -> Option<String> {
    let mut words: Vec<(&str, Option<Extent>)> = line
        .words
        .iter()
        .map(|w| (w.text.trim(), w.extent()))
        .filter(|(t, _)| !t.is_empty())
        .collect();

    if words.is_empty() {
        return line
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
    }

    words.sort_by(|a, b| match (a.1, b.1) {
        (Some(a), Some(b)) => a.left.total_cmp(&b.left),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let advance = COURIER_ADVANCE * font_size;
    let mut text = String::new();
    let mut previous: Option<Extent> = None;
    for (i, (token, extent)) in words.iter().enumerate() {
        if i > 0 {
            let spaces = match (previous, extent) {
                (Some(a), Some(b)) if advance > 0.0 => {
                    let count = ((b.left - a.right) / advance).round();
                    if count.is_finite() && count > 1.0 {
                        count as usize
                    } else {
                        1
                    }
                }
                _ => 1,
            };
            text.push_str(&" ".repeat(spaces));
        }
        text.push_str(token);
        previous = *extent;
    }

    Some(text)
}

/// Image XObject plus its pixel size. JPEG data is embedded as-is, anything
/// else is decoded and stored as Flate-compressed RGB.
fn image_xobject(data: &[u8]) -> Result<(Stream, f64, f64), OverlayError> {
    let format = image::guess_format(data)?;
    let decoded = image::load_from_memory(data)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(OverlayError::ImageDecode("image has no pixels".to_string()));
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(width.into()),
        "Height" => Object::Integer(height.into()),
        "BitsPerComponent" => 8,
    };

    let jpeg_color_space = match decoded.color() {
        image::ColorType::L8 => Some("DeviceGray"),
        image::ColorType::Rgb8 => Some("DeviceRGB"),
        _ => None,
    };

    let stream = match (format, jpeg_color_space) {
        (image::ImageFormat::Jpeg, Some(color_space)) => {
            dict.set("ColorSpace", color_space);
            dict.set("Filter", "DCTDecode");
            Stream::new(dict, data.to_vec()).with_compression(false)
        }
        _ => {
            dict.set("ColorSpace", "DeviceRGB");
            let mut stream = Stream::new(dict, decoded.to_rgb8().into_raw());
            stream.compress()?;
            stream
        }
    };

    Ok((stream, f64::from(width), f64::from(height)))
}

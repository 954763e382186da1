//! Document-backed overlay
//!
//! Adds an invisible text layer to the pages of an existing document.
//! Recognized coordinates (top-left origin, source pixels) are scaled onto
//! each page's MediaBox (bottom-left origin, points) and clamped so noisy
//! geometry cannot place text off the page. Existing page content is wrapped
//! in `q … Q` so its graphics state cannot leak into the overlay.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::image_backed::spaced_line_text;
use super::pdf::{self, InvisibleRun, INVISIBLE_STATE, OVERLAY_FONT};
use super::OverlayError;
use crate::geometry::Extent;
use crate::layout::Page;

/// Page size used when a page has no readable MediaBox (US Letter)
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Parent chain depth limit when resolving inherited attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Position and size of one line of overlay text in page space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
}

/// Map a line extent from source pixels onto a target page.
///
/// `source` is the recognized page size, if known; without it the scale is 1.
pub fn place_line(
    extent: &Extent,
    source: Option<(f64, f64)>,
    target: (f64, f64),
    margin: f64,
) -> Placement {
    let (target_w, target_h) = target;
    let (scale_x, scale_y) = match source {
        Some((w, h)) if w > 0.0 && h > 0.0 => (target_w / w, target_h / h),
        _ => (1.0, 1.0),
    };

    let scaled_left = extent.left * scale_x;
    let scaled_top = extent.top * scale_y;
    let scaled_height = extent.height * scale_y;
    let pdf_y = target_h - scaled_top - scaled_height;

    Placement {
        x: clamp(scaled_left, 0.0, target_w - margin),
        y: clamp(pdf_y, margin, target_h - margin),
        font_size: scaled_height,
    }
}

/// Clamp that tolerates an empty range (tiny pages) by preferring `min`
fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}

#[derive(Debug, Clone)]
pub struct DocumentOverlay {
    /// Distance kept from the page edges
    margin: f64,
}

impl Default for DocumentOverlay {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl DocumentOverlay {
    pub fn new(margin: f64) -> Self {
        Self { margin }
    }

    /// Overlay recognized pages onto the document's pages in order. Returns
    /// the new document and its page count.
    pub fn compose(&self, document: &[u8], pages: &[Page]) -> Result<(Vec<u8>, usize), OverlayError> {
        let mut doc = Document::load_mem(document)?;
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        if page_ids.is_empty() {
            return Err(OverlayError::OverlayTargetUnsupported(
                "document has no pages".to_string(),
            ));
        }

        let font_id = doc.add_object(pdf::standard_font("Courier"));
        let state_id = doc.add_object(pdf::invisible_state());

        let mut overlaid = 0;
        for (page_id, page) in page_ids.iter().zip(pages) {
            let media_box = media_box(&doc, *page_id);
            let runs = self.page_runs(page, media_box);
            if runs.is_empty() {
                continue;
            }

            let content = pdf::invisible_text_content(&runs)?;
            attach_overlay(&mut doc, *page_id, font_id, state_id, content)?;
            overlaid += 1;
        }

        if pages.len() != page_ids.len() {
            tracing::debug!(
                document_pages = page_ids.len(),
                recognized_pages = pages.len(),
                "Page counts differ, overlaying the common prefix"
            );
        }
        tracing::debug!(overlaid, "Composed document-backed overlay");

        let bytes = pdf::save(&mut doc)?;
        Ok((bytes, page_ids.len()))
    }

    fn page_runs(&self, page: &Page, media_box: [f64; 4]) -> Vec<InvisibleRun> {
        let [x0, y0, x1, y1] = media_box;
        let target = (x1 - x0, y1 - y0);
        let source = page.dimensions();

        page.lines
            .iter()
            .filter_map(|line| {
                let extent = line.extent()?;
                let placement = place_line(&extent, source, target, self.margin);
                if placement.font_size <= 0.0 || !placement.font_size.is_finite() {
                    return None;
                }

                let scale_x = source.map_or(1.0, |(w, _)| target.0 / w);
                let text = spaced_line_text(line, placement.font_size / scale_x)?;
                Some(InvisibleRun {
                    x: x0 + placement.x,
                    y: y0 + placement.y,
                    font_size: placement.font_size,
                    text,
                })
            })
            .collect()
    }
}

/// Follow a reference one level
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object, OverlayError> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Attribute of a page, inherited through the page tree when absent
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value).ok();
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let parsed = inherited(doc, page_id, b"MediaBox")
        .and_then(|o| o.as_array().ok())
        .and_then(|values| {
            let numbers: Vec<f64> = values
                .iter()
                .filter_map(|v| resolve(doc, v).ok().and_then(pdf::number))
                .collect();
            match numbers.as_slice() {
                [a, b, c, d] => Some([a.min(*c), b.min(*d), a.max(*c), b.max(*d)]),
                _ => None,
            }
        })
        .filter(|[x0, y0, x1, y1]| x1 - x0 > 0.0 && y1 - y0 > 0.0);

    parsed.unwrap_or_else(|| {
        tracing::debug!(?page_id, "No usable MediaBox, assuming US Letter");
        DEFAULT_MEDIA_BOX
    })
}

/// Copy of a dictionary that may be stored inline or by reference
fn owned_dict(doc: &Document, object: Option<&Object>) -> Result<Dictionary, OverlayError> {
    match object {
        None => Ok(Dictionary::new()),
        Some(object) => Ok(resolve(doc, object)?.as_dict()?.clone()),
    }
}

/// Name not yet used in a resource category
fn unused_name(category: &Dictionary, base: &str) -> String {
    let mut name = base.to_string();
    let mut n = 1;
    while category.has(name.as_bytes()) {
        name = format!("{}{}", base, n);
        n += 1;
    }
    name
}

/// Merge overlay resources into the page and append the overlay content
fn attach_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    state_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), OverlayError> {
    let mut resources = owned_dict(doc, inherited(doc, page_id, b"Resources"))?;
    let mut fonts = owned_dict(doc, resources.get(b"Font").ok())?;
    let mut states = owned_dict(doc, resources.get(b"ExtGState").ok())?;

    // Existing resources may already use the overlay names
    let font_name = unused_name(&fonts, OVERLAY_FONT);
    let state_name = unused_name(&states, INVISIBLE_STATE);
    let content = if font_name == OVERLAY_FONT && state_name == INVISIBLE_STATE {
        content
    } else {
        rename_resources(&content, &font_name, &state_name)?
    };

    fonts.set(font_name, font_id);
    states.set(state_name, state_id);
    resources.set("Font", fonts);
    resources.set("ExtGState", states);

    let page = doc.get_object(page_id)?.as_dict()?;
    let mut contents: Vec<Object> = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(items)) => items.clone(),
        Ok(_) => {
            return Err(OverlayError::OverlayTargetUnsupported(
                "page contents are neither a stream reference nor an array".to_string(),
            ))
        }
        Err(_) => Vec::new(),
    };

    let open_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let mut closing = b"\nQ\n".to_vec();
    closing.extend(content);
    let overlay_id = doc.add_object(Stream::new(dictionary! {}, closing));

    contents.insert(0, Object::Reference(open_id));
    contents.push(Object::Reference(overlay_id));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", resources);
    page.set("Contents", contents);
    Ok(())
}

/// Rewrite overlay resource names in generated content
fn rename_resources(content: &[u8], font_name: &str, state_name: &str) -> Result<Vec<u8>, OverlayError> {
    let mut decoded = lopdf::content::Content::decode(content)?;
    for operation in &mut decoded.operations {
        let replacement = match operation.operator.as_str() {
            "Tf" => font_name,
            "gs" => state_name,
            _ => continue,
        };
        if let Some(first) = operation.operands.first_mut() {
            *first = Object::Name(replacement.as_bytes().to_vec());
        }
    }
    Ok(decoded.encode()?)
}

//! The per-certificate overlay and its merge onto a template page.
//!
//! An [`Overlay`] collects drawing operations in the template's coordinate
//! space. Merging turns it into a Form XObject with its own resources and
//! paints it after the page's existing content, which is wrapped in `q`/`Q`
//! so the template cannot leak graphics state into the overlay.

use crate::core::font::{encode_win_ansi, FontFace};
use crate::domain::ports::TextMeasure;
use crate::utils::error::{CertError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

/// US Letter, used when neither the page nor its ancestors set a MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

const FONT_RESOURCE: &str = "F1";
const IMAGE_RESOURCE: &str = "Im1";

/// A decoded image, flattened onto white, ready to embed as DeviceRGB.
#[derive(Debug, Clone)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbImage {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let decoded = image::open(path)?;
        Ok(Self::from_dynamic(&decoded))
    }

    pub fn from_dynamic(decoded: &image::DynamicImage) -> Self {
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);

        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = f32::from(a) / 255.0;
            for channel in [r, g, b] {
                let blended = f32::from(channel) * alpha + 255.0 * (1.0 - alpha);
                pixels.push(blended.round() as u8);
            }
        }

        Self {
            width,
            height,
            pixels,
        }
    }
}

struct PlacedImage {
    image: RgbImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// Drawing surface sized to one template page.
pub struct Overlay<'a> {
    media_box: [f32; 4],
    font: Option<&'a FontFace>,
    text_operations: Vec<Operation>,
    image: Option<PlacedImage>,
}

impl<'a> Overlay<'a> {
    pub fn new(media_box: [f32; 4]) -> Self {
        Self {
            media_box,
            font: None,
            text_operations: Vec::new(),
            image: None,
        }
    }

    pub fn media_box(&self) -> [f32; 4] {
        self.media_box
    }

    /// Draw `text` with its horizontal center on `center_x` and its baseline on `baseline_y`.
    pub fn draw_centred_text(
        &mut self,
        font: &'a FontFace,
        size: f32,
        color: [f32; 3],
        center_x: f32,
        baseline_y: f32,
        text: &str,
    ) {
        let x = center_x - font.text_width(text, size) / 2.0;
        self.font = Some(font);
        self.text_operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), size.into()],
            ),
            Operation::new("rg", color.iter().map(|&c| Object::Real(c)).collect()),
            Operation::new("Td", vec![x.into(), baseline_y.into()]),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Draw `image` stretched into the box with lower-left corner `(x, y)`.
    pub fn draw_image(&mut self, image: RgbImage, x: f32, y: f32, width: f32, height: f32) {
        self.image = Some(PlacedImage {
            image,
            x,
            y,
            width,
            height,
        });
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    fn operations(&self) -> Vec<Operation> {
        let mut operations = self.text_operations.clone();
        if let Some(placed) = &self.image {
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        placed.width.into(),
                        0.into(),
                        0.into(),
                        placed.height.into(),
                        placed.x.into(),
                        placed.y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ]);
        }
        operations
    }

    /// Finish the overlay as a self-contained Form XObject inside `doc`.
    fn into_form_xobject(self, doc: &mut Document) -> Result<ObjectId> {
        let content = Content {
            operations: self.operations(),
        }
        .encode()?;

        let mut resources = Dictionary::new();
        if let Some(font) = self.font {
            let font_id = font.add_to_document(doc);
            resources.set("Font", dictionary! { FONT_RESOURCE => font_id });
        }
        if let Some(placed) = self.image {
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(placed.image.width),
                    "Height" => i64::from(placed.image.height),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                placed.image.pixels,
            ));
            resources.set("XObject", dictionary! { IMAGE_RESOURCE => image_id });
        }

        let bbox: Vec<Object> = self.media_box.iter().map(|&v| Object::Real(v)).collect();
        Ok(doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => bbox,
                "Resources" => resources,
            },
            content,
        )))
    }

    /// Paint this overlay on top of `page_id`'s existing content.
    pub fn merge_onto(self, doc: &mut Document, page_id: ObjectId) -> Result<()> {
        let form_id = self.into_form_xobject(doc)?;

        let mut resources = page_resources(doc, page_id)?;
        let mut xobjects = match resources.get(b"XObject") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(id)) => doc.get_dictionary(*id)?.clone(),
            _ => Dictionary::new(),
        };
        let overlay_name = unused_resource_name(&xobjects, "CertOverlay");
        xobjects.set(overlay_name.clone(), form_id);
        resources.set("XObject", xobjects);

        let mut contents = vec![Object::Reference(
            doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
        )];
        contents.extend(page_contents(doc, page_id)?);
        let paint = Content {
            operations: vec![
                Operation::new("Q", vec![]),
                Operation::new("q", vec![]),
                Operation::new("Do", vec![Object::Name(overlay_name.into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        }
        .encode()?;
        contents.push(Object::Reference(
            doc.add_object(Stream::new(Dictionary::new(), paint)),
        ));

        let page = doc.get_dictionary_mut(page_id)?;
        page.set("Resources", resources);
        page.set("Contents", contents);
        Ok(())
    }
}

fn resolve(doc: &Document, object: &Object) -> Result<Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?.clone()),
        other => Ok(other.clone()),
    }
}

/// Look up `key` on the page, falling back to the page tree's ancestors.
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
    let mut current = page_id;
    // Bounded walk; a malformed tree could loop through Parent.
    for _ in 0..64 {
        let node = doc.get_dictionary(current)?;
        if let Ok(value) = node.get(key) {
            return resolve(doc, value).map(Some);
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => current = parent,
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// The page's MediaBox, which defines the overlay coordinate space.
pub fn page_media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    let Some(Object::Array(values)) = inherited_attribute(doc, page_id, b"MediaBox")? else {
        return Ok(DEFAULT_MEDIA_BOX);
    };

    let numbers: Vec<f32> = values
        .iter()
        .map(|v| resolve(doc, v).ok().as_ref().and_then(number))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CertError::TemplateError {
            message: "MediaBox holds a non-numeric entry".to_string(),
        })?;

    match numbers.as_slice() {
        [x0, y0, x1, y1] => Ok([*x0, *y0, *x1, *y1]),
        _ => Err(CertError::TemplateError {
            message: format!("MediaBox has {} entries, expected 4", numbers.len()),
        }),
    }
}

/// An owned copy of the page's effective resources, including inherited ones.
fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    match inherited_attribute(doc, page_id, b"Resources")? {
        Some(Object::Dictionary(dict)) => Ok(dict),
        Some(_) => Err(CertError::TemplateError {
            message: "page Resources is not a dictionary".to_string(),
        }),
        None => Ok(Dictionary::new()),
    }
}

fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(items) => Ok(items.clone()),
            _ => Ok(vec![Object::Reference(*id)]),
        },
        Ok(Object::Array(items)) => Ok(items.clone()),
        _ => Ok(Vec::new()),
    }
}

fn unused_resource_name(dict: &Dictionary, base: &str) -> String {
    if !dict.has(base.as_bytes()) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !dict.has(candidate.as_bytes()))
        .unwrap_or_else(|| base.to_string())
}

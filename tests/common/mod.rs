#![allow(dead_code)]

use certgen::{CertificateRenderer, FontFace, RenderSettings};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Drawn by every template; its presence in an output proves the template survived the merge.
pub const TEMPLATE_MARKER: &str = "0.9 0.9 0.9 rg 20 20 802 555 re f";

/// Scratch directory with a template, a QR folder and an output folder.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        std::fs::create_dir_all(ws.qr_dir()).unwrap();
        std::fs::create_dir_all(ws.output_dir()).unwrap();
        write_template(&ws.template_path());
        ws
    }

    pub fn template_path(&self) -> PathBuf {
        self.dir.path().join("template.pdf")
    }

    pub fn qr_dir(&self) -> PathBuf {
        self.dir.path().join("qr_codes")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("certificates")
    }

    pub fn output(&self, file_name: &str) -> PathBuf {
        self.output_dir().join(file_name)
    }

    pub fn add_qr(&self, name: &str) {
        write_qr_png(&self.qr_dir().join(format!("{}.png", name)));
    }

    pub fn settings(&self) -> RenderSettings {
        RenderSettings {
            template_path: self.template_path(),
            qr_dir: self.qr_dir(),
            output_dir: self.output_dir(),
            compress: false,
            ..RenderSettings::default()
        }
    }

    pub fn renderer(&self) -> CertificateRenderer {
        CertificateRenderer::new(self.settings(), Arc::new(FontFace::helvetica()))
    }

    pub fn output_files(&self) -> Vec<String> {
        let mut files: Vec<String> = std::fs::read_dir(self.output_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        files
    }
}

/// DejaVu Serif, a real TrueType face for the embedded-font path.
pub fn serif_font_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSerif.ttf")
}

/// A one-page A4 landscape template with a filled rectangle.
pub fn write_template(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        TEMPLATE_MARKER.as_bytes().to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 842.into(), 595.into()],
        "Contents" => content_id,
        "Resources" => Dictionary::new(),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// A small black-and-white checkerboard standing in for a QR code.
pub fn write_qr_png(path: &Path) {
    let img = image::GrayImage::from_fn(21, 21, |x, y| {
        if (x + y) % 2 == 0 {
            image::Luma([0u8])
        } else {
            image::Luma([255u8])
        }
    });
    img.save(path).unwrap();
}

/// Number of image XObjects in the saved document.
pub fn image_count(path: &Path) -> usize {
    let doc = Document::load(path).unwrap();
    doc.objects
        .values()
        .filter_map(|object| object.as_stream().ok())
        .filter(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|name| name == b"Image")
                .unwrap_or(false)
        })
        .count()
}

/// Concatenated content of the first page plus every Form XObject.
pub fn all_content(path: &Path) -> String {
    let doc = Document::load(path).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let mut content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();
    for object in doc.objects.values() {
        if let Ok(stream) = object.as_stream() {
            let is_form = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|name| name == b"Form")
                .unwrap_or(false);
            if is_form {
                content.push_str(&String::from_utf8_lossy(&stream.content));
            }
        }
    }
    content
}

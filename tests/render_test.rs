mod common;

use certgen::core::font::FontFace;
use certgen::core::font_fit::MIN_FONT_SIZE;
use certgen::core::TextMeasure;
use certgen::{CertError, CertificateRenderer, NamingMode, RenderSettings};
use common::{all_content, image_count, serif_font_path, Workspace, TEMPLATE_MARKER};
use lopdf::Object;
use std::sync::Arc;

#[test]
fn test_new_name_produces_single_pdf() {
    let ws = Workspace::new();
    let certificate = ws.renderer().render("  alice smith ").unwrap();

    assert_eq!(certificate.name, "Alice Smith");
    assert_eq!(certificate.path, ws.output("Alice Smith.pdf"));
    assert_eq!(certificate.font_size, 23.0);
    assert_eq!(ws.output_files(), vec!["Alice Smith.pdf"]);

    let content = all_content(&certificate.path);
    assert!(content.contains(TEMPLATE_MARKER));
    assert!(content.contains("(Alice Smith) Tj"));
}

#[test]
fn test_second_render_of_same_name_gets_suffix() {
    let ws = Workspace::new();
    let renderer = ws.renderer();

    let first = renderer.render("Bob Jones").unwrap();
    let first_bytes = std::fs::read(&first.path).unwrap();
    let second = renderer.render("bob jones").unwrap();

    assert_eq!(first.path, ws.output("Bob Jones.pdf"));
    assert_eq!(second.path, ws.output("Bob Jones_1.pdf"));
    assert_eq!(std::fs::read(&first.path).unwrap(), first_bytes);
    assert_eq!(ws.output_files(), vec!["Bob Jones.pdf", "Bob Jones_1.pdf"]);
}

#[test]
fn test_claim_mode_also_suffixes_sequential_duplicates() {
    let ws = Workspace::new();
    let settings = RenderSettings {
        naming: NamingMode::Claim,
        ..ws.settings()
    };
    let renderer = CertificateRenderer::new(settings, Arc::new(FontFace::helvetica()));

    renderer.render("Carol").unwrap();
    renderer.render("Carol").unwrap();
    renderer.render("Carol").unwrap();

    assert_eq!(ws.output_files(), vec!["Carol.pdf", "Carol_1.pdf", "Carol_2.pdf"]);
}

#[test]
fn test_qr_image_is_embedded_when_present() {
    let ws = Workspace::new();
    ws.add_qr("Alice Smith");
    let renderer = ws.renderer();

    let with_qr = renderer.render("alice smith").unwrap();
    let without_qr = renderer.render("bob jones").unwrap();

    assert!(with_qr.qr_embedded);
    assert!(!without_qr.qr_embedded);
    assert_eq!(image_count(&with_qr.path), 1);
    assert_eq!(image_count(&without_qr.path), 0);

    let content = all_content(&with_qr.path);
    assert!(content.contains("/Im1 Do"));
    assert!(!all_content(&without_qr.path).contains("/Im1 Do"));
}

#[test]
fn test_overflowing_name_still_renders_at_floor() {
    let ws = Workspace::new();
    let name = "Wolfgang ".repeat(20);
    let certificate = ws.renderer().render(&name).unwrap();

    assert_eq!(certificate.font_size, MIN_FONT_SIZE);
    assert!(FontFace::helvetica().text_width(&certificate.name, MIN_FONT_SIZE) > 500.0);
    assert!(certificate.path.exists());
}

#[test]
fn test_long_name_is_shrunk_to_fit() {
    let ws = Workspace::new();
    let certificate = ws
        .renderer()
        .render("Maximilian Alexander Featherstonehaugh-Cholmondeley Of Westminster")
        .unwrap();

    assert!(certificate.font_size < 23.0);
    assert!(certificate.font_size >= MIN_FONT_SIZE);
    assert!(FontFace::helvetica().text_width(&certificate.name, certificate.font_size) <= 500.0);
}

#[test]
fn test_missing_template_fails_with_name() {
    let ws = Workspace::new();
    std::fs::remove_file(ws.template_path()).unwrap();

    let err = ws.renderer().render("dave").unwrap_err();
    assert_eq!(err.failed_name(), Some("Dave"));
    match err {
        CertError::RenderFailure { source, .. } => {
            assert!(matches!(*source, CertError::MissingAsset { .. }))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_corrupt_qr_image_is_a_render_failure() {
    let ws = Workspace::new();
    std::fs::write(ws.qr_dir().join("Erin.png"), b"definitely not a png").unwrap();

    let err = ws.renderer().render("erin").unwrap_err();
    assert_eq!(err.failed_name(), Some("Erin"));
}

#[test]
fn test_unwritable_output_directory_is_a_render_failure() {
    let ws = Workspace::new();
    let settings = RenderSettings {
        output_dir: ws.dir.path().join("missing").join("nested"),
        ..ws.settings()
    };
    let renderer = CertificateRenderer::new(settings, Arc::new(FontFace::helvetica()));

    let err = renderer.render("frank").unwrap_err();
    assert!(matches!(err, CertError::RenderFailure { .. }));
    assert_eq!(err.failed_name(), Some("Frank"));
}

#[test]
fn test_compressed_output_is_still_readable() {
    let ws = Workspace::new();
    let settings = RenderSettings {
        compress: true,
        ..ws.settings()
    };
    let renderer = CertificateRenderer::new(settings, Arc::new(FontFace::helvetica()));
    ws.add_qr("Grace");

    let certificate = renderer.render("grace").unwrap();
    let doc = lopdf::Document::load(&certificate.path).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    assert_eq!(image_count(&certificate.path), 1);
}

#[test]
fn test_names_that_leave_the_output_directory_are_rejected() {
    let ws = Workspace::new();
    let renderer = ws.renderer();

    for raw in ["../escaped", "/tmp/x", "a/b", ".."] {
        let err = renderer.render(raw).unwrap_err();
        match err {
            CertError::RenderFailure { source, .. } => {
                assert!(matches!(*source, CertError::InvalidName { .. }), "{raw}")
            }
            other => panic!("unexpected error for {raw}: {other}"),
        }
    }

    assert!(ws.output_files().is_empty());
    assert!(!ws.dir.path().join("Escaped.pdf").exists());
}

#[test]
fn test_embedded_truetype_font_renders() {
    let ws = Workspace::new();
    let font = FontFace::load(serif_font_path(), "DejaVu Serif").unwrap();
    let renderer = CertificateRenderer::new(ws.settings(), Arc::new(font));

    let certificate = renderer.render("alice smith").unwrap();
    assert_eq!(certificate.font_size, 23.0);

    let doc = lopdf::Document::load(&certificate.path).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    let font = doc
        .objects
        .values()
        .filter_map(|object| object.as_dict().ok())
        .find(|dict| {
            dict.get(b"Type").and_then(Object::as_name).ok() == Some(b"Font".as_slice())
        })
        .expect("font dictionary");
    assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"TrueType");

    let descriptor_id = font.get(b"FontDescriptor").unwrap().as_reference().unwrap();
    let descriptor = doc.get_dictionary(descriptor_id).unwrap();
    assert!(descriptor.get(b"FontFile2").is_ok());
    assert!(all_content(&certificate.path).contains("(Alice Smith) Tj"));
}

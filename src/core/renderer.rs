use crate::core::font::FontFace;
use crate::core::font_fit::fit_font_size;
use crate::core::naming::{check_file_stem, normalize_name, NamingMode, OutputTarget};
use crate::core::overlay::{page_media_box, Overlay, RgbImage};
use crate::domain::model::RenderedCertificate;
use crate::utils::error::{AssetKind, CertError, Result};
use lopdf::Document;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fixed layout and locations for one batch. Cloned into every worker.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub template_path: PathBuf,
    pub qr_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Horizontal center and baseline of the name.
    pub name_anchor: (f32, f32),
    pub max_name_width: f32,
    pub font_size: f32,
    /// RGB in 0.0..=1.0.
    pub font_color: [f32; 3],
    /// Lower-left corner of the QR image.
    pub qr_position: (f32, f32),
    pub qr_size: (f32, f32),
    pub naming: NamingMode,
    pub compress: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("./template.pdf"),
            qr_dir: PathBuf::from("./qr_codes"),
            output_dir: PathBuf::from("certificates"),
            name_anchor: (410.0, 225.0),
            max_name_width: 500.0,
            font_size: 23.0,
            font_color: [17.0 / 255.0, 74.0 / 255.0, 156.0 / 255.0],
            qr_position: (230.0, 35.0),
            qr_size: (75.0, 75.0),
            naming: NamingMode::CheckThenWrite,
            compress: true,
        }
    }
}

/// Loads the template and picks its first page, dropping any others.
pub fn load_template(path: &Path) -> Result<(Document, lopdf::ObjectId)> {
    if !path.is_file() {
        return Err(CertError::MissingAsset {
            kind: AssetKind::Template,
            path: path.to_path_buf(),
        });
    }
    let mut doc = Document::load(path)?;

    let pages = doc.get_pages();
    let page_count = pages.len() as u32;
    let Some(first_page) = pages.values().next().copied() else {
        return Err(CertError::TemplateError {
            message: format!("{} has no pages", path.display()),
        });
    };

    if page_count > 1 {
        tracing::debug!(
            "Template {} has {} pages, using only the first",
            path.display(),
            page_count
        );
        let extra: Vec<u32> = (2..=page_count).collect();
        doc.delete_pages(&extra);
    }

    Ok((doc, first_page))
}

/// Renders one certificate per call. Holds no mutable state, so one
/// renderer may serve many threads.
#[derive(Debug, Clone)]
pub struct CertificateRenderer {
    settings: RenderSettings,
    font: Arc<FontFace>,
}

impl CertificateRenderer {
    pub fn new(settings: RenderSettings, font: Arc<FontFace>) -> Self {
        Self { settings, font }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn qr_path_for(&self, name: &str) -> PathBuf {
        self.settings.qr_dir.join(format!("{}.png", name))
    }

    /// Normalize `raw_name` and write its certificate.
    ///
    /// Every failure comes back as [`CertError::RenderFailure`] carrying the
    /// normalized name. A missing QR image is only a warning.
    pub fn render(&self, raw_name: &str) -> Result<RenderedCertificate> {
        let name = normalize_name(raw_name);
        let _span = tracing::info_span!("certificate", name = %name).entered();

        self.render_normalized(&name)
            .map_err(|e| CertError::render_failure(name.clone(), e))
    }

    fn render_normalized(&self, name: &str) -> Result<RenderedCertificate> {
        check_file_stem(name)?;
        let settings = &self.settings;
        let target = OutputTarget::reserve(&settings.output_dir, name, settings.naming)?;
        tracing::debug!("Output path resolved to {}", target.path().display());

        let (mut doc, page_id) = load_template(&settings.template_path)?;
        let media_box = page_media_box(&doc, page_id)?;

        let mut overlay = Overlay::new(media_box);
        let font_size = fit_font_size(
            self.font.as_ref(),
            name,
            settings.max_name_width,
            settings.font_size,
        );
        if font_size < settings.font_size {
            tracing::debug!("Shrunk font from {} to {}", settings.font_size, font_size);
        }
        let (center_x, baseline_y) = settings.name_anchor;
        overlay.draw_centred_text(
            &self.font,
            font_size,
            settings.font_color,
            center_x,
            baseline_y,
            name,
        );

        let qr_path = self.qr_path_for(name);
        if qr_path.is_file() {
            let qr = RgbImage::load(&qr_path)?;
            let (x, y) = settings.qr_position;
            let (width, height) = settings.qr_size;
            overlay.draw_image(qr, x, y, width, height);
        } else {
            tracing::warn!("QR code not found for {} ({})", name, qr_path.display());
        }
        let qr_embedded = overlay.has_image();

        overlay.merge_onto(&mut doc, page_id)?;
        if settings.compress {
            doc.compress();
        }

        let (path, file) = target.into_file()?;
        let mut writer = BufWriter::new(file);
        doc.save_to(&mut writer)?;
        writer.flush()?;

        tracing::debug!("Wrote {}", path.display());
        Ok(RenderedCertificate {
            name: name.to_string(),
            path,
            qr_embedded,
            font_size,
        })
    }
}

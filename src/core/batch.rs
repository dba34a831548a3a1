//! Fans names out over a bounded pool of blocking workers.
//!
//! Each task renders one name on its own copy of the template; the only
//! shared state is the immutable [`CertificateRenderer`]. Results are
//! collected in completion order, and a failed or panicked task is reported
//! against its name without disturbing the rest of the batch.

use crate::core::font::FontFace;
use crate::core::naming::normalize_name;
use crate::core::renderer::{load_template, CertificateRenderer, RenderSettings};
use crate::domain::model::{BatchReport, FailedCertificate, RenderedCertificate};
use crate::utils::error::{AssetKind, CertError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Where the name font comes from.
#[derive(Debug, Clone)]
pub enum FontSource {
    File { path: PathBuf, face_name: String },
    /// Built-in Helvetica metrics; nothing is embedded.
    Helvetica,
}

/// Read the newline-delimited names list, skipping blank lines.
pub fn read_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CertError::MissingAsset {
            kind: AssetKind::NamesList,
            path: path.to_path_buf(),
        },
        _ => CertError::IoError(e),
    })?;

    let names: Vec<String> = content
        .trim_start_matches('\u{feff}')
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            if line.trim().is_empty() {
                tracing::debug!("Skipping blank line {} in {}", index + 1, path.display());
                None
            } else {
                Some(line.to_string())
            }
        })
        .collect();

    Ok(names)
}

/// Everything that must hold before a single worker starts: a loadable
/// template, a decodable font, and an output directory.
pub fn preflight(settings: RenderSettings, font: FontSource) -> Result<CertificateRenderer> {
    load_template(&settings.template_path)?;

    let face = match font {
        FontSource::File { path, face_name } => FontFace::load(&path, &face_name)?,
        FontSource::Helvetica => FontFace::helvetica(),
    };

    std::fs::create_dir_all(&settings.output_dir)?;
    if !settings.qr_dir.is_dir() {
        tracing::warn!(
            "QR directory {} does not exist; certificates will have no QR codes",
            settings.qr_dir.display()
        );
    }

    tracing::info!(
        "Pre-flight OK: template {}, font '{}', output {}",
        settings.template_path.display(),
        face.face_name(),
        settings.output_dir.display()
    );
    Ok(CertificateRenderer::new(settings, Arc::new(face)))
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub struct BatchCoordinator {
    renderer: Arc<CertificateRenderer>,
    workers: usize,
    show_progress: bool,
}

impl BatchCoordinator {
    pub fn new(renderer: CertificateRenderer, workers: usize) -> Self {
        Self {
            renderer: Arc::new(renderer),
            workers: workers.max(1),
            show_progress: false,
        }
    }

    /// Print `[processed/total]` lines to stdout as renders complete.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub async fn run(&self, names: Vec<String>) -> BatchReport {
        let started_at = chrono::Utc::now();
        let clock = Instant::now();
        let total = names.len();
        tracing::info!(
            "Generating certificates for {} people with {} workers",
            total,
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for raw_name in names {
            let renderer = Arc::clone(&self.renderer);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move { render_one(renderer, semaphore, raw_name).await });
        }

        let mut rendered = Vec::with_capacity(total);
        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                Err(CertError::TaskFailed {
                    name: "<unknown>".to_string(),
                    message: e.to_string(),
                })
            });

            let processed = rendered.len() + failed.len() + 1;
            self.report_progress(&progress_line(processed, total, &outcome));

            match outcome {
                Ok(certificate) => {
                    tracing::debug!("Rendered {}", certificate.path.display());
                    rendered.push(certificate);
                }
                Err(e) => {
                    let name = e.failed_name().unwrap_or("<unknown>").to_string();
                    tracing::error!("❌ {}", e);
                    failed.push(FailedCertificate {
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }

        if self.show_progress && total > 0 {
            println!();
        }

        let report = BatchReport {
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            total,
            rendered,
            failed,
        };
        tracing::info!(
            "Batch finished: {} rendered, {} failed, {} without QR in {} ms",
            report.rendered.len(),
            report.failed.len(),
            report.missing_qr_count(),
            report.elapsed_ms
        );
        report
    }

    fn report_progress(&self, line: &str) {
        if !self.show_progress {
            return;
        }
        let mut stdout = std::io::stdout().lock();
        // best effort: progress never fails a render
        let _ = write!(stdout, "\r{}", line);
        let _ = stdout.flush();
    }
}

/// One progress entry; every finished name advances the counter.
fn progress_line(
    processed: usize,
    total: usize,
    outcome: &Result<RenderedCertificate>,
) -> String {
    match outcome {
        Ok(certificate) => {
            let file_name = certificate
                .path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| certificate.name.clone());
            format!("[{}/{}] Processed: {}", processed, total, file_name)
        }
        Err(e) => format!(
            "[{}/{}] Failed: {}",
            processed,
            total,
            e.failed_name().unwrap_or("<unknown>")
        ),
    }
}

async fn render_one(
    renderer: Arc<CertificateRenderer>,
    semaphore: Arc<Semaphore>,
    raw_name: String,
) -> Result<RenderedCertificate> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| CertError::TaskFailed {
            name: normalize_name(&raw_name),
            message: e.to_string(),
        })?;

    let name_for_task = raw_name.clone();
    match tokio::task::spawn_blocking(move || renderer.render(&name_for_task)).await {
        Ok(result) => result,
        Err(e) => Err(CertError::TaskFailed {
            name: normalize_name(&raw_name),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_names_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("\u{feff}alice smith\n\n  \nBob Jones\r\nalice smith\n".as_bytes())
            .unwrap();

        let names = read_names(file.path()).unwrap();
        assert_eq!(names, vec!["alice smith", "Bob Jones", "alice smith"]);
    }

    #[test]
    fn test_read_names_missing_file() {
        let err = read_names("/nonexistent/names.txt").unwrap_err();
        assert!(matches!(
            err,
            CertError::MissingAsset {
                kind: AssetKind::NamesList,
                ..
            }
        ));
    }

    #[test]
    fn test_preflight_rejects_missing_template() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = RenderSettings {
            template_path: dir.path().join("missing.pdf"),
            output_dir: dir.path().join("out"),
            ..RenderSettings::default()
        };

        let err = preflight(settings, FontSource::Helvetica).unwrap_err();
        assert!(err.is_preflight());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_workers_never_zero() {
        let renderer = CertificateRenderer::new(
            RenderSettings::default(),
            Arc::new(FontFace::helvetica()),
        );
        assert_eq!(BatchCoordinator::new(renderer, 0).workers(), 1);
        assert!(default_workers() >= 1);
    }

    #[test]
    fn test_progress_counts_failures_too() {
        let rendered: Result<RenderedCertificate> = Ok(RenderedCertificate {
            name: "Alice Smith".to_string(),
            path: PathBuf::from("certificates/Alice Smith_1.pdf"),
            qr_embedded: true,
            font_size: 23.0,
        });
        let failed: Result<RenderedCertificate> = Err(CertError::render_failure(
            "Bob Jones",
            CertError::TemplateError {
                message: "no pages".to_string(),
            },
        ));

        assert_eq!(
            progress_line(1, 2, &rendered),
            "[1/2] Processed: Alice Smith_1.pdf"
        );
        assert_eq!(progress_line(2, 2, &failed), "[2/2] Failed: Bob Jones");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let renderer = CertificateRenderer::new(
            RenderSettings::default(),
            Arc::new(FontFace::helvetica()),
        );
        let report = BatchCoordinator::new(renderer, 2).run(Vec::new()).await;
        assert_eq!(report.total, 0);
        assert!(report.is_complete_success());
    }
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    PdfError(#[from] lopdf::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Missing {kind} asset: {}", .path.display())]
    MissingAsset { kind: AssetKind, path: PathBuf },

    #[error("Cannot decode font {}: {message}", .path.display())]
    FontError { path: PathBuf, message: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Template error: {message}")]
    TemplateError { message: String },

    #[error("Failed to render certificate for '{name}': {source}")]
    RenderFailure {
        name: String,
        #[source]
        source: Box<CertError>,
    },

    #[error("Worker task for '{name}' did not complete: {message}")]
    TaskFailed { name: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Template,
    Font,
    NamesList,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AssetKind::Template => "template",
            AssetKind::Font => "font",
            AssetKind::NamesList => "names list",
        };
        f.write_str(label)
    }
}

impl CertError {
    pub fn render_failure(name: impl Into<String>, source: CertError) -> Self {
        CertError::RenderFailure {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Name of the person whose certificate failed, for per-name errors.
    pub fn failed_name(&self) -> Option<&str> {
        match self {
            CertError::RenderFailure { name, .. } | CertError::TaskFailed { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// True for errors that must stop the batch before any worker starts.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            CertError::MissingAsset { .. }
                | CertError::FontError { .. }
                | CertError::ConfigError { .. }
                | CertError::InvalidConfigValueError { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CertError::MissingAsset { kind, path } => format!(
                "Check that the {} file exists and is readable: {}",
                kind,
                path.display()
            ),
            CertError::FontError { .. } => {
                "Use a TrueType (.ttf) or OpenType (.otf) font file".to_string()
            }
            CertError::TemplateError { .. } | CertError::PdfError(_) => {
                "Make sure the template is a valid single-page PDF".to_string()
            }
            CertError::InvalidName { .. } => {
                "Remove path separators and '..' from the names list entry".to_string()
            }
            CertError::ImageError(_) => {
                "Regenerate the QR image as a valid PNG file".to_string()
            }
            CertError::RenderFailure { source, .. } => source.recovery_suggestion(),
            CertError::IoError(_) => {
                "Check disk space and permissions of the output directory".to_string()
            }
            CertError::ConfigError { .. } | CertError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line flags".to_string()
            }
            CertError::TaskFailed { .. } => "Re-run the batch for the failed names".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_failure_keeps_name_and_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CertError::render_failure("Alice Smith", CertError::from(io));

        assert_eq!(err.failed_name(), Some("Alice Smith"));
        assert!(!err.is_preflight());
        assert!(err.to_string().contains("Alice Smith"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_missing_asset_is_preflight() {
        let err = CertError::MissingAsset {
            kind: AssetKind::Template,
            path: PathBuf::from("template.pdf"),
        };
        assert!(err.is_preflight());
        assert_eq!(err.to_string(), "Missing template asset: template.pdf");
        assert!(err.recovery_suggestion().contains("template.pdf"));
    }
}

use crate::core::batch::{default_workers, FontSource};
use crate::core::font_fit::MIN_FONT_SIZE;
use crate::core::naming::NamingMode;
use crate::core::renderer::RenderSettings;
use crate::utils::error::{CertError, Result};
use crate::utils::validation::{
    validate_extension, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CertConfig {
    pub assets: AssetsConfig,
    pub layout: LayoutConfig,
    pub output: OutputConfig,
    pub batch: BatchConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub template_path: String,
    pub font_path: String,
    /// Logical face name the font is registered under.
    pub font_name: String,
    pub qr_dir: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            template_path: "./template.pdf".to_string(),
            font_path: "./Monotype Corsiva/Monotype-Corsiva-Regular.ttf".to_string(),
            font_name: "Monotype Corsiva".to_string(),
            qr_dir: "./qr_codes".to_string(),
        }
    }
}

/// All coordinates are PDF points in the template page's space.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub name_x: f32,
    pub name_y: f32,
    pub max_name_width: f32,
    pub font_size: f32,
    /// 0-255 per channel.
    pub font_color: [u8; 3],
    pub qr_x: f32,
    pub qr_y: f32,
    pub qr_width: f32,
    pub qr_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            name_x: 410.0,
            name_y: 225.0,
            max_name_width: 500.0,
            font_size: 23.0,
            font_color: [17, 74, 156],
            qr_x: 230.0,
            qr_y: 35.0,
            qr_width: 75.0,
            qr_height: 75.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub naming: NamingMode,
    pub compress: bool,
    /// Optional JSON batch report.
    pub report_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "certificates".to_string(),
            naming: NamingMode::CheckThenWrite,
            compress: true,
            report_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub names_file: String,
    /// Defaults to the number of available cores.
    pub workers: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            names_file: "./names.txt".to_string(),
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

const MAX_FONT_SIZE: f32 = 500.0;
const MAX_WORKERS: usize = 1024;

impl CertConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CertError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CertError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| CertError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn workers(&self) -> usize {
        self.batch.workers.unwrap_or_else(default_workers)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn names_file(&self) -> &Path {
        Path::new(&self.batch.names_file)
    }

    pub fn font_source(&self) -> FontSource {
        FontSource::File {
            path: PathBuf::from(&self.assets.font_path),
            face_name: self.assets.font_name.clone(),
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        let layout = &self.layout;
        RenderSettings {
            template_path: PathBuf::from(&self.assets.template_path),
            qr_dir: PathBuf::from(&self.assets.qr_dir),
            output_dir: PathBuf::from(&self.output.dir),
            name_anchor: (layout.name_x, layout.name_y),
            max_name_width: layout.max_name_width,
            font_size: layout.font_size,
            font_color: layout.font_color.map(|c| f32::from(c) / 255.0),
            qr_position: (layout.qr_x, layout.qr_y),
            qr_size: (layout.qr_width, layout.qr_height),
            naming: self.output.naming,
            compress: self.output.compress,
        }
    }
}

impl Validate for CertConfig {
    fn validate(&self) -> Result<()> {
        validate_path("assets.template_path", &self.assets.template_path)?;
        validate_extension("assets.template_path", &self.assets.template_path, &["pdf"])?;
        validate_path("assets.font_path", &self.assets.font_path)?;
        validate_extension("assets.font_path", &self.assets.font_path, &["ttf", "otf"])?;
        validate_non_empty_string("assets.font_name", &self.assets.font_name)?;
        validate_path("assets.qr_dir", &self.assets.qr_dir)?;
        validate_path("output.dir", &self.output.dir)?;
        validate_path("batch.names_file", &self.batch.names_file)?;
        if let Some(report) = &self.output.report_path {
            validate_path("output.report_path", report)?;
        }

        let layout = &self.layout;
        validate_range("layout.font_size", layout.font_size, MIN_FONT_SIZE, MAX_FONT_SIZE)?;
        if layout.font_size.fract() != 0.0 {
            return Err(CertError::InvalidConfigValueError {
                field: "layout.font_size".to_string(),
                value: layout.font_size.to_string(),
                reason: "Font size must be a whole number".to_string(),
            });
        }
        validate_range("layout.max_name_width", layout.max_name_width, 1.0, 14_400.0)?;
        validate_range("layout.qr_width", layout.qr_width, 1.0, 14_400.0)?;
        validate_range("layout.qr_height", layout.qr_height, 1.0, 14_400.0)?;
        for (field, value) in [
            ("layout.name_x", layout.name_x),
            ("layout.name_y", layout.name_y),
            ("layout.qr_x", layout.qr_x),
            ("layout.qr_y", layout.qr_y),
        ] {
            if !value.is_finite() {
                return Err(CertError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "Coordinate must be a finite number".to_string(),
                });
            }
        }

        if let Some(workers) = self.batch.workers {
            validate_positive_number("batch.workers", workers, 1)?;
            validate_range("batch.workers", workers, 1, MAX_WORKERS)?;
        }

        Ok(())
    }
}

use crate::config::toml_config::CertConfig;
use crate::core::naming::NamingMode;
use crate::utils::error::Result;
use clap::Parser;
use std::path::Path;

#[derive(Debug, Clone, Parser)]
#[command(name = "certgen")]
#[command(about = "Generate one certificate PDF per name from a template")]
pub struct CliArgs {
    /// TOML configuration file; built-in defaults apply when absent
    #[arg(short, long)]
    pub config: Option<String>,

    /// Newline-delimited list of names
    #[arg(long)]
    pub names: Option<String>,

    /// Single-page PDF template
    #[arg(long)]
    pub template: Option<String>,

    /// TrueType/OpenType font for the names
    #[arg(long)]
    pub font: Option<String>,

    /// Face name the font is registered under
    #[arg(long)]
    pub font_name: Option<String>,

    /// Directory holding <Name>.png QR images
    #[arg(long)]
    pub qr_dir: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Reserve output files atomically so duplicate names never overwrite each other
    #[arg(long)]
    pub claim: bool,

    /// Write a JSON report of the batch to this file
    #[arg(long)]
    pub report: Option<String>,

    /// Suppress the progress counter
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Log CPU and memory usage
    #[arg(long)]
    pub monitor: bool,

    /// Check configuration and assets without rendering
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Load the config file (if any) and apply command line overrides.
    pub fn resolve_config(&self) -> Result<CertConfig> {
        let mut config = match &self.config {
            Some(path) => CertConfig::from_file(Path::new(path))?,
            None => CertConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut CertConfig) {
        if let Some(names) = &self.names {
            config.batch.names_file = names.clone();
        }
        if let Some(template) = &self.template {
            config.assets.template_path = template.clone();
        }
        if let Some(font) = &self.font {
            config.assets.font_path = font.clone();
        }
        if let Some(font_name) = &self.font_name {
            config.assets.font_name = font_name.clone();
        }
        if let Some(qr_dir) = &self.qr_dir {
            config.assets.qr_dir = qr_dir.clone();
        }
        if let Some(output) = &self.output {
            config.output.dir = output.clone();
        }
        if let Some(workers) = self.workers {
            config.batch.workers = Some(workers);
        }
        if self.claim {
            config.output.naming = NamingMode::Claim;
        }
        if let Some(report) = &self.report {
            config.output.report_path = Some(report.clone());
        }
    }

    pub fn monitor_enabled(&self, config: &CertConfig) -> bool {
        self.monitor || config.monitoring_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = CliArgs::parse_from([
            "certgen",
            "--names",
            "guests.txt",
            "--output",
            "out",
            "--workers",
            "3",
            "--claim",
        ]);

        let config = args.resolve_config().unwrap();
        assert_eq!(config.batch.names_file, "guests.txt");
        assert_eq!(config.output.dir, "out");
        assert_eq!(config.workers(), 3);
        assert_eq!(config.output.naming, NamingMode::Claim);
        // untouched values keep their defaults
        assert_eq!(config.assets.template_path, "./template.pdf");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = CliArgs::parse_from(["certgen", "--config", "/nonexistent/certgen.toml"]);
        assert!(args.resolve_config().is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A finished certificate written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedCertificate {
    pub name: String,
    pub path: PathBuf,
    pub qr_embedded: bool,
    pub font_size: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedCertificate {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub elapsed_ms: u64,
    pub total: usize,
    pub rendered: Vec<RenderedCertificate>,
    pub failed: Vec<FailedCertificate>,
}

impl BatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.rendered.len() == self.total
    }

    pub fn missing_qr_count(&self) -> usize {
        self.rendered.iter().filter(|c| !c.qr_embedded).count()
    }
}

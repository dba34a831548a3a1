pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::CertConfig;

pub use core::batch::{preflight, read_names, BatchCoordinator, FontSource};
pub use core::font::FontFace;
pub use core::font_fit::{fit_font_size, MIN_FONT_SIZE};
pub use core::naming::{normalize_name, NamingMode};
pub use core::renderer::{CertificateRenderer, RenderSettings};
pub use domain::model::{BatchReport, RenderedCertificate};
pub use utils::error::{CertError, Result};

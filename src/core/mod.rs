pub mod batch;
pub mod font;
pub mod font_fit;
pub mod naming;
pub mod overlay;
pub mod renderer;

pub use crate::domain::model::{BatchReport, RenderedCertificate};
pub use crate::domain::ports::TextMeasure;
pub use crate::utils::error::Result;

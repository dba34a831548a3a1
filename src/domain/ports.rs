/// Measures rendered text width, in points, for a font at a given size.
///
/// Implementations must be monotonically non-decreasing in `size` for any
/// fixed `text`; the font-fit search relies on it.
pub trait TextMeasure: Send + Sync {
    fn text_width(&self, text: &str, size: f32) -> f32;
}

use crate::domain::ports::TextMeasure;

/// Smallest font size the fit search will return.
pub const MIN_FONT_SIZE: f32 = 10.0;

/// Largest size, stepping down one unit at a time from `initial_size`, at
/// which `text` is no wider than `max_width`.
///
/// Stops at [`MIN_FONT_SIZE`] even if the text still overflows there.
/// A fractional starting size above the floor is rounded down first; one at
/// or below the floor is returned unchanged.
pub fn fit_font_size<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    max_width: f32,
    initial_size: f32,
) -> f32 {
    if initial_size <= MIN_FONT_SIZE {
        return initial_size;
    }
    let mut size = initial_size.floor();
    while size > MIN_FONT_SIZE && measure.text_width(text, size) > max_width {
        size = (size - 1.0).max(MIN_FONT_SIZE);
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::font::FontFace;

    /// Every character is `advance` em wide.
    struct Monospace {
        advance: f32,
    }

    impl TextMeasure for Monospace {
        fn text_width(&self, text: &str, size: f32) -> f32 {
            text.chars().count() as f32 * self.advance * size
        }
    }

    #[test]
    fn test_short_text_keeps_initial_size() {
        let mono = Monospace { advance: 0.5 };
        assert_eq!(fit_font_size(&mono, "Bob", 500.0, 23.0), 23.0);
    }

    #[test]
    fn test_empty_text_keeps_initial_size() {
        let mono = Monospace { advance: 100.0 };
        assert_eq!(fit_font_size(&mono, "", 1.0, 23.0), 23.0);
    }

    #[test]
    fn test_steps_down_to_largest_fitting_size() {
        // 40 chars * 0.5 em = 20 em; 20 * 15 = 300 fits, 20 * 16 = 320 does not
        let mono = Monospace { advance: 0.5 };
        let text = "x".repeat(40);
        assert_eq!(fit_font_size(&mono, &text, 300.0, 23.0), 15.0);
    }

    #[test]
    fn test_overflowing_text_returns_floor() {
        let mono = Monospace { advance: 1.0 };
        let text = "w".repeat(200);
        assert_eq!(fit_font_size(&mono, &text, 500.0, 23.0), MIN_FONT_SIZE);
    }

    #[test]
    fn test_initial_size_below_floor_is_untouched() {
        let mono = Monospace { advance: 1.0 };
        assert_eq!(fit_font_size(&mono, "wide text", 1.0, 8.0), 8.0);
    }

    #[test]
    fn test_fractional_initial_size_is_rounded_down() {
        let mono = Monospace { advance: 0.5 };
        assert_eq!(fit_font_size(&mono, "Bob", 500.0, 23.5), 23.0);
        assert_eq!(fit_font_size(&mono, "Bob", 500.0, 10.5), MIN_FONT_SIZE);

        // 40 chars * 0.5 em: 15 fits 300, 16 does not
        let text = "x".repeat(40);
        assert_eq!(fit_font_size(&mono, &text, 300.0, 16.7), 15.0);
    }

    #[test]
    fn test_fit_bounds_hold_for_helvetica() {
        let face = FontFace::helvetica();
        let very_wide = "W".repeat(120);
        let names = [
            "",
            "Al",
            "Alice Smith",
            "Maximilian Alexander Featherstonehaugh-Cholmondeley",
            very_wide.as_str(),
        ];

        for name in names {
            let size = fit_font_size(&face, name, 500.0, 23.0);
            assert!((MIN_FONT_SIZE..=23.0).contains(&size), "{name}: {size}");
            assert!(
                face.text_width(name, size) <= 500.0 || size == MIN_FONT_SIZE,
                "{name} overflows at {size}"
            );
            if size < 23.0 {
                // one size larger would not have fit
                assert!(face.text_width(name, size + 1.0) > 500.0);
            }
        }
    }
}

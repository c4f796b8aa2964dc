use unicode_width::UnicodeWidthStr;

/// Measures the pixel width a label needs when painted.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> i32;
}

/// Fixed-pitch measurement: display columns times a cell width, plus padding
/// on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCellMeasure {
    pub char_width: i32,
    pub padding: i32,
}

impl CharCellMeasure {
    pub fn new(char_width: i32, padding: i32) -> Self {
        Self { char_width, padding }
    }
}

impl TextMeasure for CharCellMeasure {
    fn text_width(&self, text: &str) -> i32 {
        let columns = i32::try_from(text.width()).unwrap_or(i32::MAX);
        columns.saturating_mul(self.char_width).saturating_add(2 * self.padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_cell_measure() {
        let measure = CharCellMeasure::new(7, 5);
        assert_eq!(measure.text_width(""), 10);
        assert_eq!(measure.text_width("Person"), 6 * 7 + 10);
        // Wide glyphs occupy two columns
        assert_eq!(measure.text_width("日本"), 4 * 7 + 10);
    }
}

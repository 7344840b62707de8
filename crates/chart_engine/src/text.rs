//! Text measurement hook
//!
//! The layout passes size the title, legend and axis bands from measured
//! label text. Hosts plug in their shaping backend; the heuristic measurer
//! keeps layout usable without one.

use crate::geometry::Size;
use serde::{Deserialize, Serialize};

/// Font description handed to the measurer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    /// Size in logical units
    pub size: f64,
    pub bold: bool,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f64) -> Self {
        Self {
            family: family.into(),
            size,
            bold: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new("sans-serif", 10.0)
    }
}

/// Measures the unrotated extent of a single line of text
pub trait TextMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Size;
}

/// Average-glyph-width approximation
///
/// Width is 0.6em per character (0.66em when bold), height is 1.2em.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Size {
        if text.is_empty() {
            return Size::default();
        }
        let glyph = if font.bold { 0.66 } else { 0.6 };
        Size::new(
            text.chars().count() as f64 * font.size * glyph,
            font.size * 1.2,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_measure() {
        let font = FontSpec::new("sans-serif", 10.0);
        let size = HeuristicTextMeasurer.measure("abcd", &font);
        assert!((size.width - 24.0).abs() < 1e-9);
        assert!((size.height - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_is_zero_size() {
        let size = HeuristicTextMeasurer.measure("", &FontSpec::default());
        assert_eq!(size, Size::default());
    }

    #[test]
    fn test_bold_is_wider() {
        let plain = FontSpec::new("serif", 12.0);
        let bold = plain.clone().bold();
        let a = HeuristicTextMeasurer.measure("Revenue", &plain);
        let b = HeuristicTextMeasurer.measure("Revenue", &bold);
        assert!(b.width > a.width);
    }
}

//! Data label placement
//!
//! Each data element exposes an anchor: the bar rect with its growth
//! direction, a point with its marker radius, or a slice on its bisector.
//! Labels are pushed away from the anchor along the relevant normal by half
//! the rotated text box plus the label padding.

use crate::format::{NumberFormatter, GENERAL_FORMAT};
use crate::geometry::{LayoutPoint, LayoutRect, Size};
use crate::model::{DataLabelOptions, DataLabelPosition, SeriesId};
use crate::options::LayoutOptions;
use serde::{Deserialize, Serialize};

/// Direction in which a bar grows from its base to its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit vector in screen coordinates
    pub fn unit(&self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }

    fn is_horizontal(&self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// Where a data label hangs from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LabelAnchor {
    Bar {
        rect: LayoutRect,
        direction: Direction,
    },
    Point {
        center: LayoutPoint,
        radius: f64,
    },
    Slice {
        center: LayoutPoint,
        inner_radius: f64,
        outer_radius: f64,
        mid_angle: f64,
    },
}

/// A positioned data label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLabelLayout {
    pub series: SeriesId,
    /// Index of the data point in its series
    pub point: usize,
    pub text: String,
    pub bounds: LayoutRect,
}

/// Values a label may show
#[derive(Debug, Clone, Default)]
pub struct LabelContent<'a> {
    pub series_name: &'a str,
    pub category: Option<&'a str>,
    pub value: Option<f64>,
    /// Share of the series total (circular kinds)
    pub percent: Option<f64>,
    /// Format of the source cell
    pub point_format: Option<&'a str>,
    /// Format of the value axis
    pub axis_format: Option<&'a str>,
}

/// Places and formats data labels
pub struct DataLabelPositioner<'a> {
    options: &'a LayoutOptions,
}

impl<'a> DataLabelPositioner<'a> {
    pub fn new(options: &'a LayoutOptions) -> Self {
        Self { options }
    }

    /// Bounds of a label of `text_size` rotated by `rotation` degrees
    pub fn label_rect(
        &self,
        anchor: &LabelAnchor,
        text_size: Size,
        rotation: f64,
        position: DataLabelPosition,
    ) -> LayoutRect {
        let size = text_size.rotated(rotation);
        let pad = self.options.label_padding;
        let center = match *anchor {
            LabelAnchor::Bar { rect, direction } => {
                let (dx, dy) = direction.unit();
                let half = if direction.is_horizontal() {
                    size.width / 2.0
                } else {
                    size.height / 2.0
                };
                let c = rect.center();
                let half_len = if direction.is_horizontal() {
                    rect.width / 2.0
                } else {
                    rect.height / 2.0
                };
                let tip = LayoutPoint::new(c.x + dx * half_len, c.y + dy * half_len);
                let base = LayoutPoint::new(c.x - dx * half_len, c.y - dy * half_len);
                let shift = |p: LayoutPoint, amount: f64| {
                    LayoutPoint::new(p.x + dx * amount, p.y + dy * amount)
                };
                match position {
                    DataLabelPosition::Center => c,
                    DataLabelPosition::End => shift(tip, -(half + pad)),
                    DataLabelPosition::BehindEnd => shift(tip, half + pad),
                    DataLabelPosition::Start => shift(base, half + pad),
                    DataLabelPosition::BeforeStart => shift(base, -(half + pad)),
                }
            }
            LabelAnchor::Point { center, radius } => {
                let (nx, ny, half) = match position {
                    DataLabelPosition::Center => (0.0, 0.0, 0.0),
                    DataLabelPosition::BeforeStart => (-1.0, 0.0, size.width / 2.0),
                    DataLabelPosition::BehindEnd => (1.0, 0.0, size.width / 2.0),
                    DataLabelPosition::Start => (0.0, 1.0, size.height / 2.0),
                    DataLabelPosition::End => (0.0, -1.0, size.height / 2.0),
                };
                let offset = if position == DataLabelPosition::Center {
                    0.0
                } else {
                    radius + pad + half
                };
                LayoutPoint::new(center.x + nx * offset, center.y + ny * offset)
            }
            LabelAnchor::Slice {
                center,
                inner_radius,
                outer_radius,
                mid_angle,
            } => {
                let half = size.half_extent_along(mid_angle);
                let radius = match position {
                    DataLabelPosition::Center => (inner_radius + outer_radius) / 2.0,
                    DataLabelPosition::Start => inner_radius + half + pad,
                    DataLabelPosition::End => outer_radius - half - pad,
                    DataLabelPosition::BehindEnd => outer_radius + half + pad,
                    DataLabelPosition::BeforeStart => (inner_radius - half - pad).max(0.0),
                };
                center.polar(radius, mid_angle)
            }
        };
        LayoutRect::centered(center, size)
    }

    /// Join the enabled label parts with ", "
    pub fn label_text(
        &self,
        formatter: &dyn NumberFormatter,
        options: &DataLabelOptions,
        content: &LabelContent<'_>,
    ) -> String {
        let mut parts: Vec<String> = Vec::new();
        if options.show_series_name && !content.series_name.is_empty() {
            parts.push(content.series_name.to_string());
        }
        if options.show_category {
            if let Some(category) = content.category.filter(|c| !c.is_empty()) {
                parts.push(category.to_string());
            }
        }
        if options.show_value {
            if let Some(value) = content.value {
                let format = options
                    .number_format
                    .as_deref()
                    .or(content.point_format)
                    .or(content.axis_format)
                    .unwrap_or(GENERAL_FORMAT);
                parts.push(formatter.format_number(format, value, &self.options.locale));
            }
        }
        if options.show_percent {
            if let Some(percent) = content.percent {
                parts.push(formatter.format_number("0%", percent, &self.options.locale));
            }
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::BasicNumberFormatter;

    fn positioner_options() -> LayoutOptions {
        LayoutOptions {
            label_padding: 2.0,
            ..LayoutOptions::default()
        }
    }

    #[test]
    fn test_bar_positions() {
        let options = positioner_options();
        let positioner = DataLabelPositioner::new(&options);
        // Column from y=100 (base) up to y=20 (tip)
        let anchor = LabelAnchor::Bar {
            rect: LayoutRect::new(10.0, 20.0, 20.0, 80.0),
            direction: Direction::Up,
        };
        let text = Size::new(16.0, 10.0);

        let end = positioner.label_rect(&anchor, text, 0.0, DataLabelPosition::End);
        assert_eq!(end.y, 22.0);
        let behind = positioner.label_rect(&anchor, text, 0.0, DataLabelPosition::BehindEnd);
        assert_eq!(behind.bottom(), 18.0);
        let start = positioner.label_rect(&anchor, text, 0.0, DataLabelPosition::Start);
        assert_eq!(start.bottom(), 98.0);
        let before = positioner.label_rect(&anchor, text, 0.0, DataLabelPosition::BeforeStart);
        assert_eq!(before.y, 102.0);
        let center = positioner.label_rect(&anchor, text, 0.0, DataLabelPosition::Center);
        assert_eq!(center.center(), LayoutPoint::new(20.0, 60.0));
    }

    #[test]
    fn test_point_positions_clear_the_marker() {
        let options = positioner_options();
        let positioner = DataLabelPositioner::new(&options);
        let anchor = LabelAnchor::Point {
            center: LayoutPoint::new(50.0, 50.0),
            radius: 4.0,
        };
        let text = Size::new(20.0, 10.0);

        let above = positioner.label_rect(&anchor, text, 0.0, DataLabelPosition::End);
        assert_eq!(above.bottom(), 44.0);
        let right = positioner.label_rect(&anchor, text, 0.0, DataLabelPosition::BehindEnd);
        assert_eq!(right.x, 56.0);
        let left = positioner.label_rect(&anchor, text, 0.0, DataLabelPosition::BeforeStart);
        assert_eq!(left.right(), 44.0);
    }

    #[test]
    fn test_rotated_label_uses_rotated_extent() {
        let options = positioner_options();
        let positioner = DataLabelPositioner::new(&options);
        let anchor = LabelAnchor::Point {
            center: LayoutPoint::new(50.0, 50.0),
            radius: 0.0,
        };
        let rect =
            positioner.label_rect(&anchor, Size::new(30.0, 10.0), 90.0, DataLabelPosition::End);
        assert!((rect.height - 30.0).abs() < 1e-9);
        assert!((rect.bottom() - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_slice_outside_end() {
        let options = positioner_options();
        let positioner = DataLabelPositioner::new(&options);
        let anchor = LabelAnchor::Slice {
            center: LayoutPoint::new(0.0, 0.0),
            inner_radius: 0.0,
            outer_radius: 100.0,
            mid_angle: 0.0,
        };
        let size = Size::new(20.0, 10.0);
        let rect = positioner.label_rect(&anchor, size, 0.0, DataLabelPosition::BehindEnd);
        assert!((rect.x - 102.0).abs() < 1e-9);
        let inner = positioner.label_rect(&anchor, size, 0.0, DataLabelPosition::BeforeStart);
        assert_eq!(inner.center(), LayoutPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_label_text_parts() {
        let options = LayoutOptions::default();
        let positioner = DataLabelPositioner::new(&options);
        let label_options = DataLabelOptions {
            show_series_name: true,
            show_category: true,
            show_percent: true,
            ..DataLabelOptions::default()
        };
        let content = LabelContent {
            series_name: "Sales",
            category: Some("Q1"),
            value: Some(1234.5),
            percent: Some(0.25),
            point_format: Some("#,##0.0"),
            axis_format: Some("0"),
        };
        let text = positioner.label_text(&BasicNumberFormatter, &label_options, &content);
        assert_eq!(text, "Sales, Q1, 1,234.5, 25%");
    }

    #[test]
    fn test_label_text_falls_back_to_general() {
        let options = LayoutOptions::default();
        let positioner = DataLabelPositioner::new(&options);
        let content = LabelContent {
            value: Some(2.5),
            ..LabelContent::default()
        };
        let text =
            positioner.label_text(&BasicNumberFormatter, &DataLabelOptions::default(), &content);
        assert_eq!(text, "2.5");
    }
}

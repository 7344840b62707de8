//! Series data access
//!
//! Values live outside the chart model; series carry an opaque `data_ref`
//! that the host's [`DataSource`] resolves point by point.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound on points read from one series
pub const MAX_SERIES_POINTS: usize = 100_000;

/// A single data point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// X value (scatter, bubble, time axes)
    pub x: Option<f64>,
    /// Y value
    pub y: Option<f64>,
    /// Bubble size
    pub c: Option<f64>,
    /// Category label
    pub label: Option<String>,
    /// Number format of the source cell for x
    pub format_x: Option<String>,
    /// Number format of the source cell for y
    pub format_y: Option<String>,
}

impl DataPoint {
    pub fn new(y: f64) -> Self {
        Self {
            y: Some(y),
            ..Default::default()
        }
    }

    /// A point with no value (an empty cell)
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn bubble(x: f64, y: f64, size: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            c: Some(size),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format_y = Some(format.into());
        self
    }

    /// Drop NaN and infinite values so comparisons stay total
    fn sanitized(mut self) -> Self {
        self.x = self.x.filter(|v| v.is_finite());
        self.y = self.y.filter(|v| v.is_finite());
        self.c = self.c.filter(|v| v.is_finite());
        self
    }
}

/// Supplies series values by reference and index
pub trait DataSource {
    /// The point at `index`, or `None` past the end of the series
    fn point(&self, data_ref: &str, index: usize) -> Option<DataPoint>;
}

/// In-memory data source keyed by data reference
#[derive(Debug, Clone, Default)]
pub struct VecDataSource {
    series: HashMap<String, Vec<DataPoint>>,
}

impl VecDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store points under a reference, replacing any previous ones
    pub fn insert(&mut self, data_ref: impl Into<String>, points: Vec<DataPoint>) {
        self.series.insert(data_ref.into(), points);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_points(mut self, data_ref: impl Into<String>, points: Vec<DataPoint>) -> Self {
        self.insert(data_ref, points);
        self
    }

    /// Store plain y values
    pub fn with_values(self, data_ref: impl Into<String>, values: &[f64]) -> Self {
        let points = values.iter().map(|&v| DataPoint::new(v)).collect();
        self.with_points(data_ref, points)
    }

    /// Store y values with category labels
    pub fn with_categories(
        self,
        data_ref: impl Into<String>,
        categories: &[&str],
        values: &[f64],
    ) -> Self {
        let points = categories
            .iter()
            .zip(values)
            .map(|(label, &v)| DataPoint::new(v).with_label(*label))
            .collect();
        self.with_points(data_ref, points)
    }
}

impl DataSource for VecDataSource {
    fn point(&self, data_ref: &str, index: usize) -> Option<DataPoint> {
        self.series.get(data_ref)?.get(index).cloned()
    }
}

/// Read every point of a series, treating non-finite values as missing
pub fn collect_points(source: &dyn DataSource, data_ref: &str) -> Vec<DataPoint> {
    let mut points = Vec::new();
    while points.len() < MAX_SERIES_POINTS {
        match source.point(data_ref, points.len()) {
            Some(point) => points.push(point.sanitized()),
            None => break,
        }
    }
    points
}

/// Value range seen on one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataExtent {
    pub min: f64,
    pub max: f64,
    /// Number of values folded in
    pub count: usize,
    /// Category axes: number of category slots
    pub slots: usize,
    /// Category axes: slots where no series has a value
    pub empty_slots: usize,
}

impl Default for DataExtent {
    fn default() -> Self {
        Self::empty()
    }
}

impl DataExtent {
    pub fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
            slots: 0,
            empty_slots: 0,
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut extent = Self::empty();
        for value in values {
            extent.include(value);
        }
        extent
    }

    /// Fold in a value; non-finite values are ignored
    pub fn include(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Slot count left after dropping empty slots
    pub fn visible_slots(&self, hide_empty: bool) -> usize {
        if hide_empty {
            self.slots.saturating_sub(self.empty_slots)
        } else {
            self.slots
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_source_ends_with_none() {
        let source = VecDataSource::new().with_values("a", &[1.0, 2.0]);
        assert_eq!(source.point("a", 1), Some(DataPoint::new(2.0)));
        assert_eq!(source.point("a", 2), None);
        assert_eq!(source.point("missing", 0), None);
    }

    #[test]
    fn test_collect_points_drops_nan() {
        let source = VecDataSource::new().with_values("a", &[1.0, f64::NAN, 3.0]);
        let points = collect_points(&source, "a");
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].y, None);
    }

    #[test]
    fn test_extent() {
        let extent = DataExtent::from_values([3.0, -1.0, f64::NAN, 7.5]);
        assert_eq!(extent.min, -1.0);
        assert_eq!(extent.max, 7.5);
        assert_eq!(extent.count, 3);
        assert!(DataExtent::empty().is_empty());
    }

    #[test]
    fn test_visible_slots() {
        let extent = DataExtent {
            slots: 6,
            empty_slots: 2,
            ..DataExtent::empty()
        };
        assert_eq!(extent.visible_slots(true), 4);
        assert_eq!(extent.visible_slots(false), 6);
    }
}

//! Layout configuration
//!
//! Every tunable used by the layout passes, the geometry mapper, the hit
//! tester and the label positioner. Hosts usually start from
//! `LayoutOptions::default()` and override a few fields, or load a partial
//! JSON document where missing fields keep their defaults.

use crate::error::{ChartError, ChartResult};
use crate::text::FontSpec;
use serde::{Deserialize, Serialize};

/// Layout options shared by all chart kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Font for the chart title
    pub title_font: FontSpec,
    /// Font for legend entries
    pub legend_font: FontSpec,
    /// Font for axis tick labels and axis titles
    pub axis_font: FontSpec,
    /// Font for data labels
    pub label_font: FontSpec,
    /// Padding around the chart
    pub padding: f64,
    /// Gap between the title/legend/axis bands and the plot
    pub spacing: f64,
    /// Tick mark length outside the plot
    pub tick_length: f64,
    /// Size of the legend color box
    pub legend_symbol_size: f64,
    /// Height of a legend entry row
    pub legend_entry_height: f64,
    /// Minimum pixels per major tick when picking a tick count
    pub min_tick_spacing: f64,
    /// Minimum pixels per label on time axes
    pub min_time_label_spacing: f64,
    /// Gap between bar groups, as a fraction of one bar width
    pub gap_width: f64,
    /// Pie diameter as a fraction of the smaller plot dimension
    pub pie_size: f64,
    /// Doughnut hole as a fraction of the outer radius
    pub doughnut_hole: f64,
    /// Largest bubble radius as a fraction of the smaller plot dimension
    pub bubble_scale: f64,
    /// Marker radius for line and scatter points
    pub marker_radius: f64,
    /// First slice angle in radians (screen orientation, -PI/2 is 12 o'clock)
    pub start_angle: f64,
    /// Last slice angle in radians; `None` means a full circle
    pub end_angle: Option<f64>,
    /// Maximum pointer distance for stroke hits
    pub hit_tolerance: f64,
    /// Angular resolution for slice hit polygons, in degrees
    pub arc_sample_step_deg: f64,
    /// Gap between a data label and its anchor
    pub label_padding: f64,
    /// Margin of the fallback plot rect used without a text measurer, as a
    /// fraction of the viewport
    pub fallback_margin: f64,
    /// Locale tag passed through to the formatter
    pub locale: String,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            title_font: FontSpec::new("sans-serif", 18.0).bold(),
            legend_font: FontSpec::new("sans-serif", 11.0),
            axis_font: FontSpec::new("sans-serif", 12.0),
            label_font: FontSpec::new("sans-serif", 10.0),
            padding: 10.0,
            spacing: 5.0,
            tick_length: 4.0,
            legend_symbol_size: 12.0,
            legend_entry_height: 20.0,
            min_tick_spacing: 50.0,
            min_time_label_spacing: 80.0,
            gap_width: 1.5,
            pie_size: 0.9,
            doughnut_hole: 0.5,
            bubble_scale: 0.25,
            marker_radius: 4.0,
            start_angle: -std::f64::consts::FRAC_PI_2,
            end_angle: None,
            hit_tolerance: 4.0,
            arc_sample_step_deg: 2.0,
            label_padding: 3.0,
            fallback_margin: 0.1,
            locale: "en-US".to_string(),
        }
    }
}

impl LayoutOptions {
    /// Create the default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> ChartResult<Self> {
        let options: LayoutOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Resolved end angle of circular charts
    pub fn resolved_end_angle(&self) -> f64 {
        self.end_angle
            .unwrap_or(self.start_angle + std::f64::consts::TAU)
    }

    /// Check value ranges that would break the geometry
    pub fn validate(&self) -> ChartResult<()> {
        let non_negative = [
            ("padding", self.padding),
            ("spacing", self.spacing),
            ("tick_length", self.tick_length),
            ("gap_width", self.gap_width),
            ("marker_radius", self.marker_radius),
            ("hit_tolerance", self.hit_tolerance),
            ("label_padding", self.label_padding),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ChartError::InvalidOptions(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let positive = [
            ("min_tick_spacing", self.min_tick_spacing),
            ("min_time_label_spacing", self.min_time_label_spacing),
            ("arc_sample_step_deg", self.arc_sample_step_deg),
            ("legend_entry_height", self.legend_entry_height),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ChartError::InvalidOptions(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let fractions = [
            ("pie_size", self.pie_size),
            ("doughnut_hole", self.doughnut_hole),
            ("bubble_scale", self.bubble_scale),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ChartError::InvalidOptions(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(0.0..0.5).contains(&self.fallback_margin) {
            return Err(ChartError::InvalidOptions(format!(
                "fallback_margin must be within [0, 0.5), got {}",
                self.fallback_margin
            )));
        }

        let sweep = self.resolved_end_angle() - self.start_angle;
        if !sweep.is_finite() || sweep <= 0.0 || sweep > std::f64::consts::TAU + 1e-9 {
            return Err(ChartError::InvalidOptions(format!(
                "end_angle must lie within one turn after start_angle, got sweep {}",
                sweep
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LayoutOptions::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = LayoutOptions::from_json(r#"{"padding": 4.0, "gap_width": 0.5}"#).unwrap();
        assert_eq!(options.padding, 4.0);
        assert_eq!(options.gap_width, 0.5);
        assert_eq!(options.marker_radius, LayoutOptions::default().marker_radius);
    }

    #[test]
    fn test_invalid_json_values_rejected() {
        let err = LayoutOptions::from_json(r#"{"doughnut_hole": 1.5}"#).unwrap_err();
        assert!(matches!(err, ChartError::InvalidOptions(_)));

        let err = LayoutOptions::from_json(r#"{"padding": "wide"}"#).unwrap_err();
        assert!(matches!(err, ChartError::Serialization(_)));
    }

    #[test]
    fn test_full_circle_end_angle() {
        let options = LayoutOptions::default();
        let sweep = options.resolved_end_angle() - options.start_angle;
        assert!((sweep - std::f64::consts::TAU).abs() < 1e-12);
    }
}

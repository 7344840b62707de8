//! Axis auto-scaling
//!
//! Turns a data extent and the pixel length of an axis into human-friendly
//! bounds, a major step and a default label format. Explicit and zoom bounds
//! are honoured per bound; only auto bounds are padded out to the step.

use crate::data::DataExtent;
use crate::model::{Axis, AxisKind};
use crate::options::LayoutOptions;
use crate::time_scale::{TimeStep, TimeUnit};
use serde::{Deserialize, Serialize};

/// Most ticks a single axis will produce
pub const MAX_TICKS: usize = 1001;

/// Values at or below zero are clamped to this on logarithmic axes
pub const LOG_EPSILON: f64 = 1e-10;

/// Bounds and step requested by the axis descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleRequest {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

/// Where a resolved bound came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundSource {
    Auto,
    Zoom,
    Explicit,
}

/// One resolved axis end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBound {
    pub value: f64,
    pub source: BoundSource,
}

impl ResolvedBound {
    pub fn is_auto(&self) -> bool {
        self.source == BoundSource::Auto
    }
}

fn resolve_bound(auto: f64, zoom: Option<f64>, explicit: Option<f64>) -> ResolvedBound {
    let finite = |v: Option<f64>| v.filter(|v| v.is_finite());
    if let Some(value) = finite(explicit) {
        ResolvedBound {
            value,
            source: BoundSource::Explicit,
        }
    } else if let Some(value) = finite(zoom) {
        ResolvedBound {
            value,
            source: BoundSource::Zoom,
        }
    } else {
        ResolvedBound {
            value: auto,
            source: BoundSource::Auto,
        }
    }
}

/// Pick each bound independently: explicit, then zoom, then auto
pub fn resolve_bounds(
    auto: (f64, f64),
    zoom: (Option<f64>, Option<f64>),
    explicit: (Option<f64>, Option<f64>),
) -> (ResolvedBound, ResolvedBound) {
    (
        resolve_bound(auto.0, zoom.0, explicit.0),
        resolve_bound(auto.1, zoom.1, explicit.1),
    )
}

/// Round a raw step to the nearest of 1, 2, 5 or 10 times a power of ten
pub fn nice_step(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized < 1.5 {
        1.0
    } else if normalized < 3.5 {
        2.0
    } else if normalized < 7.5 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Number of decimals needed to print multiples of `step`
pub fn step_decimals(step: f64) -> usize {
    if !step.is_finite() || step <= 0.0 || step >= 1.0 {
        return 0;
    }
    // Start at the leading significant digit, then take digits until the
    // remainder is noise relative to the scaled step
    let mut decimals = ((-step.log10() - 1e-9).ceil().max(0.0) as usize).min(MAX_DECIMALS);
    let mut scaled = step * 10f64.powi(decimals as i32);
    while decimals < MAX_DECIMALS && (scaled - scaled.round()).abs() > 1e-9 * scaled {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}

const MAX_DECIMALS: usize = 320;

/// Number format matching a step's precision, e.g. "0.00" for 0.25
pub fn decimal_format(step: f64) -> String {
    match step_decimals(step) {
        0 => "0".to_string(),
        n => format!("0.{}", "0".repeat(n)),
    }
}

/// Snap a value to the precision of the step to remove float noise
fn snap(value: f64, step: f64) -> f64 {
    let factor = 10f64.powi(step_decimals(step) as i32 + 2);
    let snapped = (value * factor).round() / factor;
    if snapped.is_finite() && (snapped - value).abs() <= step * 1e-3 {
        snapped
    } else {
        value
    }
}

/// A resolved axis scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisScale {
    pub kind: AxisKind,
    pub min: f64,
    pub max: f64,
    /// Additive step; a multiplicative factor on logarithmic axes; days on time axes
    pub step: f64,
    /// Default label format
    pub format: String,
    /// Calendar step of time axes
    pub time_step: Option<TimeStep>,
}

impl AxisScale {
    /// Granularity of time axes
    pub fn time_unit(&self) -> Option<TimeUnit> {
        self.time_step.map(|step| step.unit)
    }

    /// Major tick values from min to max, at most [`MAX_TICKS`]
    pub fn ticks(&self) -> Vec<f64> {
        match self.kind {
            AxisKind::Logarithmic => {
                let mut ticks = Vec::new();
                let mut value = self.min;
                while value <= self.max * (1.0 + 1e-9) && ticks.len() < MAX_TICKS {
                    ticks.push(value);
                    value *= self.step;
                }
                ticks
            }
            AxisKind::Time if self.time_step.is_some() => self
                .time_step
                .map(|step| step.ticks(self.min, self.max, MAX_TICKS))
                .unwrap_or_default(),
            _ => {
                let count = ((self.max - self.min) / self.step + 1e-9).floor();
                let count = if count.is_finite() && count >= 0.0 {
                    (count as usize).min(MAX_TICKS - 1)
                } else {
                    0
                };
                (0..=count)
                    .map(|i| snap(self.min + i as f64 * self.step, self.step))
                    .collect()
            }
        }
    }
}

/// Computes axis scales from data extents
#[derive(Debug, Clone, Copy)]
pub struct AxisScaleCalculator {
    min_tick_spacing: f64,
    min_time_label_spacing: f64,
}

impl Default for AxisScaleCalculator {
    fn default() -> Self {
        Self::new(&LayoutOptions::default())
    }
}

impl AxisScaleCalculator {
    pub fn new(options: &LayoutOptions) -> Self {
        Self {
            min_tick_spacing: options.min_tick_spacing,
            min_time_label_spacing: options.min_time_label_spacing,
        }
    }

    /// Preferred number of major intervals for an axis of this length
    pub fn target_ticks(&self, pixel_span: f64) -> f64 {
        let target = pixel_span / self.min_tick_spacing;
        if target.is_finite() {
            target.clamp(2.0, 10.0)
        } else {
            2.0
        }
    }

    /// Scale an axis over its data extent
    pub fn auto_scale(
        &self,
        axis: &Axis,
        requested: &ScaleRequest,
        extent: &DataExtent,
        pixel_span: f64,
    ) -> AxisScale {
        let zoom = (axis.zoom_min, axis.zoom_max);
        let scale = match axis.kind {
            AxisKind::Linear => self.linear(requested, zoom, extent, pixel_span),
            AxisKind::Logarithmic => {
                self.logarithmic(axis.log_base, requested, zoom, extent, pixel_span)
            }
            AxisKind::Time => self.time(requested, zoom, extent, pixel_span),
            AxisKind::Category => self.category(
                requested,
                zoom,
                extent.visible_slots(axis.hide_empty_categories),
                axis.between_ticks,
                pixel_span,
            ),
        };
        tracing::trace!(
            target: "chart_engine::scale",
            axis = %axis.name,
            kind = ?axis.kind,
            min = scale.min,
            max = scale.max,
            step = scale.step,
            "axis scaled"
        );
        scale
    }

    /// Auto range of a value axis before padding
    fn auto_range(extent: &DataExtent) -> (f64, f64) {
        if extent.is_empty() {
            return (0.0, 100.0);
        }
        let (mut lo, mut hi) = (extent.min, extent.max);
        if lo == hi {
            if lo == 0.0 {
                hi = 1.0;
            } else {
                let pad = lo.abs() / 2.0;
                lo -= pad;
                hi += pad;
            }
        }
        (lo, hi)
    }

    fn linear(
        &self,
        requested: &ScaleRequest,
        zoom: (Option<f64>, Option<f64>),
        extent: &DataExtent,
        pixel_span: f64,
    ) -> AxisScale {
        let (mut lo, mut hi) = Self::auto_range(extent);
        if lo > 0.0 && lo < hi * 5.0 / 6.0 {
            lo = 0.0;
        } else if hi < 0.0 && hi > lo * 5.0 / 6.0 {
            hi = 0.0;
        }

        let (min, max) = resolve_bounds((lo, hi), zoom, (requested.min, requested.max));
        let (mut min_v, mut max_v) = (min.value, max.value);
        if max_v <= min_v {
            // A pinned bound crossed the other end; keep the auto range width
            let width = (hi - lo).max(f64::MIN_POSITIVE);
            if max.is_auto() {
                max_v = min_v + width;
            } else if min.is_auto() {
                min_v = max_v - width;
            }
        }

        let target = self.target_ticks(pixel_span);
        let mut step = match requested.step.filter(|s| s.is_finite() && *s > 0.0) {
            Some(step) => step,
            None if max_v > min_v => nice_step((max_v - min_v) / target),
            None => nice_step(min_v.abs().max(1.0) / target),
        };
        while (max_v - min_v) / step > 1000.0 {
            step *= 10.0;
        }

        if min.is_auto() {
            min_v = snap((min_v / step).floor() * step, step);
        }
        if max.is_auto() {
            max_v = snap((max_v / step).ceil() * step, step);
        }
        if max_v <= min_v {
            max_v = min_v + step;
        }

        AxisScale {
            kind: AxisKind::Linear,
            min: min_v,
            max: max_v,
            step,
            format: decimal_format(step),
            time_step: None,
        }
    }

    fn category(
        &self,
        requested: &ScaleRequest,
        zoom: (Option<f64>, Option<f64>),
        slots: usize,
        between_ticks: bool,
        pixel_span: f64,
    ) -> AxisScale {
        let auto_max = if slots <= 1 {
            1.0
        } else if between_ticks {
            slots as f64
        } else {
            (slots - 1) as f64
        };
        let (min, max) = resolve_bounds((0.0, auto_max), zoom, (requested.min, requested.max));
        let min_v = min.value.floor();
        let mut max_v = max.value.ceil();
        if max_v <= min_v {
            max_v = min_v + 1.0;
        }

        let target = self.target_ticks(pixel_span);
        let step = match requested.step.filter(|s| s.is_finite() && *s > 0.0) {
            Some(step) => step.round().max(1.0),
            None => nice_step((max_v - min_v) / target).ceil().max(1.0),
        };

        AxisScale {
            kind: AxisKind::Category,
            min: min_v,
            max: max_v,
            step,
            format: "0".to_string(),
            time_step: None,
        }
    }

    fn logarithmic(
        &self,
        base: f64,
        requested: &ScaleRequest,
        zoom: (Option<f64>, Option<f64>),
        extent: &DataExtent,
        pixel_span: f64,
    ) -> AxisScale {
        let base = if base.is_finite() && base > 1.0 { base } else { 10.0 };
        let log = |v: f64| {
            let exponent = v.max(LOG_EPSILON).log(base);
            if (exponent - exponent.round()).abs() < 1e-9 {
                exponent.round()
            } else {
                exponent
            }
        };

        let (lo, hi) = if extent.is_empty() {
            (1.0, base * base)
        } else {
            (extent.min.max(LOG_EPSILON), extent.max.max(LOG_EPSILON))
        };
        let clamp = |v: Option<f64>| v.map(|v| v.max(LOG_EPSILON));
        let (min, max) = resolve_bounds(
            (lo, hi),
            (clamp(zoom.0), clamp(zoom.1)),
            (clamp(requested.min), clamp(requested.max)),
        );

        let mut min_v = if min.is_auto() {
            base.powf(log(min.value).floor())
        } else {
            min.value
        };
        let mut max_v = if max.is_auto() {
            base.powf(log(max.value).ceil())
        } else {
            max.value
        };
        if max_v <= min_v {
            if max.is_auto() || !min.is_auto() {
                max_v = min_v * base;
            } else {
                min_v = max_v / base;
            }
        }

        let decades = (log(max_v) - log(min_v)).max(1.0);
        let step = match requested.step.filter(|s| s.is_finite() && *s > 1.0) {
            Some(step) => step,
            None => {
                let target = self.target_ticks(pixel_span);
                base.powf((decades / target).ceil().max(1.0))
            }
        };

        AxisScale {
            kind: AxisKind::Logarithmic,
            min: min_v,
            max: max_v,
            step,
            format: if min_v < 1.0 {
                crate::format::GENERAL_FORMAT.to_string()
            } else {
                "0".to_string()
            },
            time_step: None,
        }
    }

    fn time(
        &self,
        requested: &ScaleRequest,
        zoom: (Option<f64>, Option<f64>),
        extent: &DataExtent,
        pixel_span: f64,
    ) -> AxisScale {
        let (lo, hi) = if extent.is_empty() {
            (0.0, 100.0)
        } else if extent.min == extent.max {
            (extent.min, extent.min + 1.0)
        } else {
            (extent.min, extent.max)
        };
        let (min, max) = resolve_bounds((lo, hi), zoom, (requested.min, requested.max));
        let (mut min_v, mut max_v) = (min.value, max.value);
        if max_v <= min_v {
            if max.is_auto() {
                max_v = min_v + (hi - lo);
            } else if min.is_auto() {
                min_v = max_v - (hi - lo);
            } else {
                max_v = min_v + 1.0;
            }
        }

        if let Some(step) = requested.step.filter(|s| s.is_finite() && *s > 0.0) {
            let unit = if step >= 1.0 {
                TimeUnit::Day
            } else if step >= TimeUnit::Hour.approx_days() {
                TimeUnit::Hour
            } else if step >= TimeUnit::Minute.approx_days() {
                TimeUnit::Minute
            } else if step >= TimeUnit::Second.approx_days() {
                TimeUnit::Second
            } else {
                TimeUnit::Millisecond
            };
            return AxisScale {
                kind: AxisKind::Time,
                min: min_v,
                max: max_v.max(min_v + step),
                step,
                format: unit.default_format().to_string(),
                time_step: None,
            };
        }

        let max_labels = (pixel_span / self.min_time_label_spacing).floor();
        let time_step = TimeStep::choose(max_v - min_v, max_labels);
        if min.is_auto() {
            min_v = time_step.floor(min_v);
        }
        if max.is_auto() {
            max_v = time_step.ceil(max_v);
        }
        if max_v <= min_v {
            max_v = min_v + time_step.days();
        }

        AxisScale {
            kind: AxisKind::Time,
            min: min_v,
            max: max_v,
            step: time_step.days(),
            format: time_step.unit.default_format().to_string(),
            time_step: Some(time_step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AxisRole;

    fn value_axis() -> Axis {
        Axis::new("y", AxisKind::Linear, AxisRole::Y)
    }

    fn scale(axis: &Axis, values: &[f64], span: f64) -> AxisScale {
        AxisScaleCalculator::default().auto_scale(
            axis,
            &axis.requested(),
            &DataExtent::from_values(values.iter().copied()),
            span,
        )
    }

    #[test]
    fn test_nice_step() {
        assert_eq!(nice_step(9.7), 10.0);
        assert_eq!(nice_step(3.0), 2.0);
        assert_eq!(nice_step(4.0), 5.0);
        assert_eq!(nice_step(0.013), 0.01);
        assert_eq!(nice_step(0.0), 1.0);
    }

    #[test]
    fn test_linear_zero_to_97() {
        let s = scale(&value_axis(), &[0.0, 97.0], 1000.0);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.step, 10.0);
        assert_eq!(s.max, 100.0);
        assert_eq!(s.format, "0");
    }

    #[test]
    fn test_linear_expands_to_zero() {
        let s = scale(&value_axis(), &[10.0, 100.0], 500.0);
        assert_eq!(s.min, 0.0);

        let s = scale(&value_axis(), &[90.0, 100.0], 500.0);
        assert!(s.min > 0.0);

        let s = scale(&value_axis(), &[-100.0, -10.0], 500.0);
        assert_eq!(s.max, 0.0);
    }

    #[test]
    fn test_degenerate_extents() {
        let s = scale(&value_axis(), &[], 500.0);
        assert_eq!((s.min, s.max), (0.0, 100.0));

        let s = scale(&value_axis(), &[0.0], 500.0);
        assert_eq!(s.min, 0.0);
        assert!(s.max >= 1.0);

        let s = scale(&value_axis(), &[-4.0], 500.0);
        assert!(s.min <= -6.0 && s.max >= -2.0);
    }

    #[test]
    fn test_explicit_beats_zoom_per_bound() {
        let axis = value_axis()
            .with_bounds(Some(5.0), None)
            .with_zoom(Some(20.0), Some(60.0));
        let s = scale(&axis, &[0.0, 97.0], 1000.0);
        assert_eq!(s.min, 5.0);
        assert_eq!(s.max, 60.0);

        let (min, max) = resolve_bounds((0.0, 1.0), (None, Some(2.0)), (None, None));
        assert_eq!(min.source, BoundSource::Auto);
        assert_eq!(max.source, BoundSource::Zoom);
    }

    #[test]
    fn test_inverted_explicit_bounds() {
        let axis = value_axis().with_bounds(Some(50.0), Some(10.0)).with_step(5.0);
        let s = scale(&axis, &[0.0, 97.0], 1000.0);
        assert_eq!(s.min, 50.0);
        assert_eq!(s.max, 55.0);
    }

    #[test]
    fn test_explicit_step_is_widened() {
        let axis = value_axis().with_step(0.001);
        let s = scale(&axis, &[0.0, 100.0], 1000.0);
        assert!((s.max - s.min) / s.step <= 1000.0);
    }

    #[test]
    fn test_small_step_format() {
        let s = scale(&value_axis(), &[0.0, 0.97], 1000.0);
        assert!((s.step - 0.1).abs() < 1e-12);
        assert_eq!(s.format, "0.0");
        assert_eq!(s.ticks().len(), 11);
        assert_eq!(s.ticks()[3], 0.3);
    }

    #[test]
    fn test_step_decimals() {
        assert_eq!(step_decimals(2.0), 0);
        assert_eq!(step_decimals(0.25), 2);
        assert_eq!(step_decimals(0.001), 3);
        assert_eq!(step_decimals(5e-11), 11);
        assert_eq!(decimal_format(0.5), "0.0");
    }

    #[test]
    fn test_tiny_range_keeps_precision() {
        let s = scale(&value_axis(), &[0.0, 5e-10], 1000.0);
        assert_eq!(s.min, 0.0);
        assert!(s.max >= 5e-10, "max {}", s.max);
        assert!(s.step > 0.0 && s.step < 5e-10);
        assert!(step_decimals(s.step) >= 10, "format {}", s.format);

        let ticks = s.ticks();
        assert!(ticks.len() >= 3);
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_time_axis_beyond_calendar() {
        let axis = Axis::new("x", AxisKind::Time, AxisRole::X);
        let s = scale(&axis, &[1e12, 1e12 + 0.5], 800.0);
        assert!(s.min <= 1e12 && s.max >= 1e12 + 0.5);
        let ticks = s.ticks();
        assert!(!ticks.is_empty());
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_category_ranges() {
        let axis = Axis::new("x", AxisKind::Category, AxisRole::X);
        let calc = AxisScaleCalculator::default();
        let extent = DataExtent {
            slots: 5,
            ..DataExtent::empty()
        };
        let s = calc.auto_scale(&axis, &axis.requested(), &extent, 500.0);
        assert_eq!((s.min, s.max), (0.0, 5.0));
        assert!(s.step >= 1.0);

        let on_ticks = axis.clone().on_ticks();
        let s = calc.auto_scale(&on_ticks, &on_ticks.requested(), &extent, 500.0);
        assert_eq!((s.min, s.max), (0.0, 4.0));

        let one = DataExtent {
            slots: 1,
            ..DataExtent::empty()
        };
        let s = calc.auto_scale(&on_ticks, &on_ticks.requested(), &one, 500.0);
        assert_eq!((s.min, s.max), (0.0, 1.0));
    }

    #[test]
    fn test_log_decades() {
        let axis = Axis::new("y", AxisKind::Logarithmic, AxisRole::Y);
        let s = scale(&axis, &[3.0, 4500.0], 500.0);
        assert_eq!(s.min, 1.0);
        assert!((s.max - 10_000.0).abs() < 1e-6);
        assert!((s.step - 10.0).abs() < 1e-9);
        assert_eq!(s.ticks().len(), 5);

        let s = scale(&axis, &[-5.0, 100.0], 500.0);
        assert!(s.min > 0.0);
    }

    #[test]
    fn test_time_axis_months() {
        let axis = Axis::new("x", AxisKind::Time, AxisRole::X);
        // 2024-01-15 .. 2024-06-10 across 800px, at most 10 labels
        let s = scale(&axis, &[45306.0, 45453.0], 800.0);
        assert_eq!(s.time_unit(), Some(TimeUnit::Month));
        assert_eq!(s.format, "mmm yyyy");
        // Aligned to 2024-01-01 and 2024-07-01
        assert_eq!(s.min, 45292.0);
        assert_eq!(s.max, 45474.0);
        assert_eq!(s.ticks().len(), 7);
    }
}

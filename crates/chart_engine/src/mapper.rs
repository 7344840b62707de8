//! Series geometry
//!
//! Maps data values through resolved axis scales into plot coordinates and
//! builds the drawable shapes for each chart kind: bar rects, line runs,
//! area polygons, markers, bubbles, pie slices and funnel rows.

use crate::data::DataPoint;
use crate::geometry::{LayoutPoint, LayoutRect};
use crate::labels::{Direction, LabelAnchor};
use crate::model::{AxisKind, SeriesId, SeriesKind};
use crate::options::LayoutOptions;
use crate::scale::{AxisScale, LOG_EPSILON};
use serde::{Deserialize, Serialize};

/// Running base and optional total for a stacked value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackValue {
    /// Sum of earlier same-sign values at this index
    pub base: f64,
    /// Absolute sum at this index (relative stacking only)
    pub total: Option<f64>,
}

impl StackValue {
    /// Stacked position of a value
    pub fn apply(&self, value: f64) -> f64 {
        let stacked = self.base + value;
        match self.total {
            Some(total) if total > 0.0 => (stacked / total).clamp(-1.0, 1.0),
            Some(_) => 0.0,
            None => stacked,
        }
    }
}

/// Per-index running sums of one stack group
///
/// Members are the group's visible series in z-order.
#[derive(Debug, Clone, Default)]
pub struct StackTable {
    values: Vec<Vec<Option<f64>>>,
    totals: Vec<f64>,
}

impl StackTable {
    pub fn build(members: Vec<Vec<Option<f64>>>) -> Self {
        let len = members.iter().map(Vec::len).max().unwrap_or(0);
        let totals = (0..len)
            .map(|i| {
                members
                    .iter()
                    .filter_map(|values| values.get(i).copied().flatten())
                    .map(f64::abs)
                    .sum()
            })
            .collect();
        Self {
            values: members,
            totals,
        }
    }

    /// Stack state for `member` at `index`, or `None` when it has no value there
    pub fn value(&self, member: usize, index: usize, relative: bool) -> Option<StackValue> {
        let own = self.values.get(member)?.get(index).copied().flatten()?;
        let positive = own >= 0.0;
        let base = self.values[..member]
            .iter()
            .filter_map(|values| values.get(index).copied().flatten())
            .filter(|v| (*v >= 0.0) == positive)
            .sum();
        let total = relative.then(|| self.totals.get(index).copied().unwrap_or(0.0));
        Some(StackValue { base, total })
    }

    /// Stacked extent at every index: (lowest negative sum, highest positive sum)
    pub fn extent(&self, relative: bool) -> Vec<(f64, f64)> {
        self.totals
            .iter()
            .enumerate()
            .map(|(i, total)| {
                let (mut neg, mut pos) = (0.0f64, 0.0f64);
                for values in &self.values {
                    match values.get(i).copied().flatten() {
                        Some(v) if v >= 0.0 => pos += v,
                        Some(v) => neg += v,
                        None => {}
                    }
                }
                if relative && *total > 0.0 {
                    (neg / total, pos / total)
                } else {
                    (neg, pos)
                }
            })
            .collect()
    }
}

/// Mapping from axis values to normalized positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTransform {
    pub scale: AxisScale,
    pub invert: bool,
    pub between_ticks: bool,
    /// The axis runs along the plot's height
    pub vertical: bool,
    /// Category axes hiding empty slots: original index to compacted slot
    pub category_slots: Option<Vec<Option<usize>>>,
}

impl AxisTransform {
    /// Normalize a value to [0, 1] over the axis range
    ///
    /// Out-of-range values land outside [0, 1]. Hidden categories map to NaN.
    pub fn scale_to_axis(&self, value: f64, stack: Option<StackValue>, is_grid_line: bool) -> f64 {
        let scale = &self.scale;
        let mut value = match stack {
            Some(stack) => stack.apply(value),
            None => value,
        };
        let normalized = match scale.kind {
            AxisKind::Logarithmic => {
                let lo = scale.min.max(LOG_EPSILON).ln();
                let hi = scale.max.max(LOG_EPSILON).ln();
                (value.max(LOG_EPSILON).ln() - lo) / (hi - lo)
            }
            AxisKind::Category => {
                if let Some(slots) = &self.category_slots {
                    if !is_grid_line {
                        value = match slots.get(value.max(0.0) as usize).copied().flatten() {
                            Some(slot) => slot as f64,
                            None => return f64::NAN,
                        };
                    }
                }
                if self.between_ticks && !is_grid_line {
                    value += 0.5;
                }
                (value - scale.min) / (scale.max - scale.min)
            }
            AxisKind::Linear | AxisKind::Time => (value - scale.min) / (scale.max - scale.min),
        };
        if self.invert {
            1.0 - normalized
        } else {
            normalized
        }
    }

    /// Normalized position of a tick label
    ///
    /// Category tick values are already compacted slots, so no slot mapping applies.
    pub fn tick_position(&self, value: f64) -> f64 {
        match self.scale.kind {
            AxisKind::Category => {
                let offset = if self.between_ticks { 0.5 } else { 0.0 };
                let n = (value + offset - self.scale.min) / (self.scale.max - self.scale.min);
                if self.invert {
                    1.0 - n
                } else {
                    n
                }
            }
            _ => self.scale_to_axis(value, None, false),
        }
    }

    /// Normalized position of zero clamped into the axis range
    pub fn crossing(&self) -> f64 {
        let origin = match self.scale.kind {
            AxisKind::Logarithmic => self.scale.min,
            _ => 0.0f64.clamp(self.scale.min, self.scale.max),
        };
        self.scale_to_axis(origin, None, true)
    }

    /// Pixel coordinate along this axis: x for horizontal axes, y for vertical
    pub fn to_pixel(&self, plot: &LayoutRect, normalized: f64) -> f64 {
        if self.vertical {
            plot.bottom() - normalized * plot.height
        } else {
            plot.x + normalized * plot.width
        }
    }

    /// Pixel length of one category unit
    pub fn unit_length(&self, plot: &LayoutRect) -> f64 {
        let extent = if self.vertical { plot.height } else { plot.width };
        let span = self.scale.max - self.scale.min;
        if span > 0.0 {
            extent / span
        } else {
            extent
        }
    }

    /// Screen sign of increasing normalized values along this axis
    fn pixel_sign(&self) -> f64 {
        if self.vertical {
            -1.0
        } else {
            1.0
        }
    }
}

/// Plot position of a normalized (category, value) pair
pub fn to_plot(
    plot: &LayoutRect,
    horizontal_category: bool,
    n_cat: f64,
    n_val: f64,
) -> LayoutPoint {
    if horizontal_category {
        LayoutPoint::new(plot.x + n_cat * plot.width, plot.bottom() - n_val * plot.height)
    } else {
        LayoutPoint::new(plot.x + n_val * plot.width, plot.bottom() - n_cat * plot.height)
    }
}

/// Drawable shape of one data point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ElementShape {
    Rect(LayoutRect),
    Marker {
        center: LayoutPoint,
        radius: f64,
    },
    Slice {
        center: LayoutPoint,
        inner_radius: f64,
        outer_radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
}

/// One data point's geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataElement {
    /// Index of the point in its series
    pub index: usize,
    pub value: f64,
    pub shape: ElementShape,
    pub anchor: LabelAnchor,
}

/// A vertex of a line run with its point index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexedPoint {
    pub index: usize,
    pub point: LayoutPoint,
}

/// Geometry of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesGeometry {
    pub series: SeriesId,
    pub kind: SeriesKind,
    pub elements: Vec<DataElement>,
    /// Connected stroke runs, split at missing values
    pub lines: Vec<Vec<IndexedPoint>>,
    /// Closed area fill
    pub fill: Option<Vec<LayoutPoint>>,
}

impl SeriesGeometry {
    pub fn new(series: SeriesId, kind: SeriesKind) -> Self {
        Self {
            series,
            kind,
            elements: Vec::new(),
            lines: Vec::new(),
            fill: None,
        }
    }
}

/// Slot of a series within its bar cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarSlot {
    pub index: usize,
    pub count: usize,
}

/// Stack membership of a series
#[derive(Debug, Clone, Copy)]
pub struct StackRef<'a> {
    pub table: &'a StackTable,
    pub member: usize,
    pub relative: bool,
}

impl StackRef<'_> {
    fn value(&self, index: usize) -> Option<StackValue> {
        self.table.value(self.member, index, self.relative)
    }
}

/// Ring of a doughnut (pies use a single ring with no hole)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ring {
    pub index: usize,
    pub count: usize,
}

/// Hi-lo line at one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HiLoLine {
    pub index: usize,
    pub start: LayoutPoint,
    pub end: LayoutPoint,
}

/// Up-down bar at one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpDownBar {
    pub index: usize,
    pub rect: LayoutRect,
    /// Last series above the first
    pub up: bool,
}

/// Chart-wide decorations of line charts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartAdditions {
    pub hi_lo_lines: Vec<HiLoLine>,
    pub up_down_bars: Vec<UpDownBar>,
}

/// Builds series geometry inside a plot rect
pub struct SeriesGeometryMapper<'a> {
    options: &'a LayoutOptions,
    plot: LayoutRect,
}

impl<'a> SeriesGeometryMapper<'a> {
    pub fn new(options: &'a LayoutOptions, plot: LayoutRect) -> Self {
        Self { options, plot }
    }

    /// Position of a point on the category (X) axis
    fn category_value(x: &AxisTransform, point: &DataPoint, index: usize) -> f64 {
        match x.scale.kind {
            AxisKind::Category => index as f64,
            _ => point.x.unwrap_or(index as f64 + 1.0),
        }
    }

    /// Plot point from normalized values on the X and Y transforms
    fn plot_point(&self, x: &AxisTransform, nx: f64, ny: f64) -> LayoutPoint {
        to_plot(&self.plot, !x.vertical, nx, ny)
    }

    /// Pixel width of one category along the X axis
    fn category_width(&self, x: &AxisTransform, point_count: usize) -> f64 {
        match x.scale.kind {
            AxisKind::Category => x.unit_length(&self.plot),
            _ => {
                let extent = if x.vertical {
                    self.plot.height
                } else {
                    self.plot.width
                };
                extent / point_count.max(1) as f64
            }
        }
    }

    /// Bars and columns
    pub fn bars(
        &self,
        series: SeriesId,
        kind: SeriesKind,
        points: &[DataPoint],
        x: &AxisTransform,
        y: &AxisTransform,
        slot: BarSlot,
        stack: Option<StackRef<'_>>,
    ) -> SeriesGeometry {
        let mut geometry = SeriesGeometry::new(series, kind);
        let category_width = self.category_width(x, points.len());
        let count = slot.count.max(1) as f64;
        let bar_width = category_width / (count + self.options.gap_width);
        let offset = (-count / 2.0 + slot.index as f64) * bar_width;

        for (index, point) in points.iter().enumerate() {
            let Some(value) = point.y else { continue };
            let n_cat = x.scale_to_axis(Self::category_value(x, point, index), None, false);
            if !n_cat.is_finite() || !(0.0..=1.0).contains(&n_cat) {
                continue;
            }
            let (n_start, n_end) = match stack.and_then(|s| s.value(index)) {
                Some(stack) => (
                    y.scale_to_axis(0.0, Some(stack), false),
                    y.scale_to_axis(value, Some(stack), false),
                ),
                None => (y.crossing(), y.scale_to_axis(value, None, false)),
            };
            if !n_start.is_finite() || !n_end.is_finite() {
                continue;
            }
            let n_start = n_start.clamp(0.0, 1.0);
            let n_end = n_end.clamp(0.0, 1.0);

            let center = x.to_pixel(&self.plot, n_cat);
            let sign = x.pixel_sign();
            let cat_a = center + sign * offset;
            let cat_b = center + sign * (offset + bar_width);
            let val_start = y.to_pixel(&self.plot, n_start);
            let val_end = y.to_pixel(&self.plot, n_end);

            let (rect, direction) = if x.vertical {
                let rect = LayoutRect::from_corners(
                    LayoutPoint::new(val_start, cat_a),
                    LayoutPoint::new(val_end, cat_b),
                );
                let direction = if val_end >= val_start {
                    Direction::Right
                } else {
                    Direction::Left
                };
                (rect, direction)
            } else {
                let rect = LayoutRect::from_corners(
                    LayoutPoint::new(cat_a, val_start),
                    LayoutPoint::new(cat_b, val_end),
                );
                let direction = if val_end <= val_start {
                    Direction::Up
                } else {
                    Direction::Down
                };
                (rect, direction)
            };

            geometry.elements.push(DataElement {
                index,
                value,
                shape: ElementShape::Rect(rect),
                anchor: LabelAnchor::Bar { rect, direction },
            });
        }
        geometry
    }

    /// Lines, profiles and scatter points
    ///
    /// Missing values break the stroke into separate runs.
    pub fn points(
        &self,
        series: SeriesId,
        kind: SeriesKind,
        points: &[DataPoint],
        x: &AxisTransform,
        y: &AxisTransform,
        stack: Option<StackRef<'_>>,
    ) -> SeriesGeometry {
        let mut geometry = SeriesGeometry::new(series, kind);
        let radius = self.options.marker_radius;
        let mut run: Vec<IndexedPoint> = Vec::new();

        for (index, point) in points.iter().enumerate() {
            let mapped = point.y.and_then(|value| {
                let nx = x.scale_to_axis(Self::category_value(x, point, index), None, false);
                let ny = match stack {
                    Some(stack) => y.scale_to_axis(value, Some(stack.value(index)?), false),
                    None => y.scale_to_axis(value, None, false),
                };
                (nx.is_finite() && ny.is_finite()).then(|| (value, self.plot_point(x, nx, ny)))
            });
            let Some((value, center)) = mapped else {
                if run.len() > 1 {
                    geometry.lines.push(std::mem::take(&mut run));
                } else {
                    run.clear();
                }
                continue;
            };

            run.push(IndexedPoint {
                index,
                point: center,
            });
            geometry.elements.push(DataElement {
                index,
                value,
                shape: ElementShape::Marker { center, radius },
                anchor: LabelAnchor::Point { center, radius },
            });
        }
        if run.len() > 1 {
            geometry.lines.push(run);
        }
        geometry
    }

    /// Bubbles sized by the point's `c` value against the largest size
    pub fn bubbles(
        &self,
        series: SeriesId,
        points: &[DataPoint],
        x: &AxisTransform,
        y: &AxisTransform,
        capacity: f64,
    ) -> SeriesGeometry {
        let mut geometry = SeriesGeometry::new(series, SeriesKind::Bubble);
        let max_radius = self.options.bubble_scale * self.plot.width.min(self.plot.height);

        for (index, point) in points.iter().enumerate() {
            let (Some(value), Some(size)) = (point.y, point.c) else {
                continue;
            };
            let nx = x.scale_to_axis(Self::category_value(x, point, index), None, false);
            let ny = y.scale_to_axis(value, None, false);
            if !nx.is_finite() || !ny.is_finite() {
                continue;
            }
            let radius = if capacity > 0.0 {
                ((size.abs() / capacity).sqrt() * max_radius).min(max_radius)
            } else {
                0.0
            };
            let center = self.plot_point(x, nx, ny);
            geometry.elements.push(DataElement {
                index,
                value,
                shape: ElementShape::Marker { center, radius },
                anchor: LabelAnchor::Point { center, radius },
            });
        }
        geometry
    }

    /// Area fill between the series and its base
    ///
    /// The base is the stack below, or the axis crossing when unstacked.
    /// Missing values count as zero.
    pub fn area(
        &self,
        series: SeriesId,
        points: &[DataPoint],
        x: &AxisTransform,
        y: &AxisTransform,
        stack: Option<StackRef<'_>>,
    ) -> SeriesGeometry {
        let mut geometry = SeriesGeometry::new(series, SeriesKind::Area);
        let mut top: Vec<IndexedPoint> = Vec::new();
        let mut base: Vec<LayoutPoint> = Vec::new();

        for (index, point) in points.iter().enumerate() {
            let value = point.y.unwrap_or(0.0);
            let nx = x.scale_to_axis(Self::category_value(x, point, index), None, false);
            if !nx.is_finite() {
                continue;
            }
            let (n_top, n_base) = match stack.and_then(|s| s.value(index)) {
                Some(sv) => (
                    y.scale_to_axis(value, Some(sv), false),
                    y.scale_to_axis(0.0, Some(sv), false),
                ),
                None => (y.scale_to_axis(value, None, false), y.crossing()),
            };
            let center = self.plot_point(x, nx, n_top);
            top.push(IndexedPoint {
                index,
                point: center,
            });
            base.push(self.plot_point(x, nx, n_base));
            geometry.elements.push(DataElement {
                index,
                value,
                shape: ElementShape::Marker {
                    center,
                    radius: 0.0,
                },
                anchor: LabelAnchor::Point {
                    center,
                    radius: 0.0,
                },
            });
        }

        if top.len() > 1 {
            geometry.fill = Some(area_polygon(
                top.iter().map(|p| p.point).collect(),
                &base,
            ));
            geometry.lines.push(top);
        }
        geometry
    }

    /// Pie slices or one doughnut ring
    pub fn slices(
        &self,
        series: SeriesId,
        kind: SeriesKind,
        points: &[DataPoint],
        ring: Ring,
        explosion: f64,
    ) -> SeriesGeometry {
        let mut geometry = SeriesGeometry::new(series, kind);
        let values: Vec<f64> = points.iter().map(|p| p.y.unwrap_or(0.0).abs()).collect();
        let total: f64 = values.iter().sum();
        if total <= 0.0 {
            return geometry;
        }

        let outer = self.plot.width.min(self.plot.height) / 2.0 * self.options.pie_size;
        let hole = match kind {
            SeriesKind::Doughnut => outer * self.options.doughnut_hole,
            _ => 0.0,
        };
        let thickness = (outer - hole) / ring.count.max(1) as f64;
        let inner_radius = hole + thickness * ring.index as f64;
        let outer_radius = inner_radius + thickness;

        let center = self.plot.center();
        let start = self.options.start_angle;
        let end = self.options.resolved_end_angle();
        let sweep = end - start;
        let last = values.iter().rposition(|v| *v > 0.0);

        let mut cumulative = 0.0;
        for (index, &value) in values.iter().enumerate() {
            if value <= 0.0 {
                continue;
            }
            let start_angle = start + sweep * cumulative / total;
            cumulative += value;
            let end_angle = if Some(index) == last {
                end
            } else {
                start + sweep * cumulative / total
            };
            let mid_angle = (start_angle + end_angle) / 2.0;
            let slice_center = if explosion > 0.0 {
                center.polar(explosion * outer_radius, mid_angle)
            } else {
                center
            };
            geometry.elements.push(DataElement {
                index,
                value: points[index].y.unwrap_or(0.0),
                shape: ElementShape::Slice {
                    center: slice_center,
                    inner_radius,
                    outer_radius,
                    start_angle,
                    end_angle,
                },
                anchor: LabelAnchor::Slice {
                    center: slice_center,
                    inner_radius,
                    outer_radius,
                    mid_angle,
                },
            });
        }
        geometry
    }

    /// Funnel rows stacked top to bottom in category order
    pub fn funnel(&self, series: SeriesId, points: &[DataPoint]) -> SeriesGeometry {
        let mut geometry = SeriesGeometry::new(series, SeriesKind::Funnel);
        if points.is_empty() {
            return geometry;
        }
        let largest = points
            .iter()
            .filter_map(|p| p.y)
            .map(f64::abs)
            .fold(0.0, f64::max);
        let row_height = self.plot.height / points.len() as f64;
        let bar_height = row_height / (1.0 + self.options.gap_width);

        for (index, point) in points.iter().enumerate() {
            let Some(value) = point.y else { continue };
            let fraction = if largest > 0.0 {
                value.abs() / largest
            } else {
                0.0
            };
            let width = self.plot.width * fraction;
            let row_center = self.plot.y + row_height * (index as f64 + 0.5);
            let rect = LayoutRect::new(
                self.plot.center_x() - width / 2.0,
                row_center - bar_height / 2.0,
                width,
                bar_height,
            );
            geometry.elements.push(DataElement {
                index,
                value,
                shape: ElementShape::Rect(rect),
                anchor: LabelAnchor::Bar {
                    rect,
                    direction: Direction::Right,
                },
            });
        }
        geometry
    }

    /// Hi-lo lines and up-down bars across line series sharing one X axis
    pub fn additions(
        &self,
        lines: &[&SeriesGeometry],
        x: &AxisTransform,
        hi_lo: bool,
        up_down: bool,
    ) -> ChartAdditions {
        let mut additions = ChartAdditions::default();
        if lines.is_empty() || !(hi_lo || up_down) {
            return additions;
        }
        let count = lines
            .iter()
            .filter_map(|g| g.elements.iter().map(|e| e.index).max())
            .max()
            .map_or(0, |max| max + 1);
        let bar_width = self.category_width(x, count) / 2.0;

        let marker = |geometry: &SeriesGeometry, index: usize| {
            geometry
                .elements
                .iter()
                .find(|e| e.index == index)
                .and_then(|e| match e.shape {
                    ElementShape::Marker { center, .. } => Some((e.value, center)),
                    _ => None,
                })
        };

        for index in 0..count {
            let present: Vec<(f64, LayoutPoint)> =
                lines.iter().filter_map(|g| marker(g, index)).collect();
            if hi_lo && present.len() > 1 {
                let low = present.iter().copied().reduce(|a, b| if b.0 < a.0 { b } else { a });
                let high = present.iter().copied().reduce(|a, b| if b.0 > a.0 { b } else { a });
                if let (Some(low), Some(high)) = (low, high) {
                    additions.hi_lo_lines.push(HiLoLine {
                        index,
                        start: low.1,
                        end: high.1,
                    });
                }
            }
            if up_down && lines.len() > 1 {
                let first = lines.first().and_then(|g| marker(g, index));
                let last = lines.last().and_then(|g| marker(g, index));
                if let (Some((first_value, a)), Some((last_value, b))) = (first, last) {
                    let rect = if x.vertical {
                        LayoutRect::from_corners(
                            LayoutPoint::new(a.x, a.y - bar_width / 2.0),
                            LayoutPoint::new(b.x, b.y + bar_width / 2.0),
                        )
                    } else {
                        LayoutRect::from_corners(
                            LayoutPoint::new(a.x - bar_width / 2.0, a.y),
                            LayoutPoint::new(b.x + bar_width / 2.0, b.y),
                        )
                    };
                    additions.up_down_bars.push(UpDownBar {
                        index,
                        rect,
                        up: last_value > first_value,
                    });
                }
            }
        }
        additions
    }
}

/// Closed fill polygon from a top edge and its base, walked back in reverse
pub fn area_polygon(top: Vec<LayoutPoint>, base: &[LayoutPoint]) -> Vec<LayoutPoint> {
    let mut polygon = top;
    polygon.extend(base.iter().rev().copied());
    polygon
}

//! Chart layout calculations
//!
//! This module handles calculating the layout of chart elements
//! including the plot area, title, legend, axes, and data points.
//!
//! Space is handed out in sequential passes that only ever shrink the plot:
//! title, legend, axis titles, tick labels and finally label overhang. Series
//! geometry, chart additions and data labels are computed against the final
//! plot rect.

use crate::data::{collect_points, DataExtent, DataPoint, DataSource};
use crate::format::{BasicNumberFormatter, NumberFormatter, GENERAL_FORMAT};
use crate::geometry::{LayoutPoint, LayoutRect, Size};
use crate::labels::{DataLabelLayout, DataLabelPositioner, LabelContent};
use crate::mapper::{
    AxisTransform, BarSlot, ChartAdditions, Ring, SeriesGeometry,
    SeriesGeometryMapper, StackRef, StackTable,
};
use crate::model::*;
use crate::options::LayoutOptions;
use crate::scale::{AxisScale, AxisScaleCalculator};
use crate::text::{FontSpec, HeuristicTextMeasurer, TextMeasurer};
use serde::{Deserialize, Serialize};

const LAYOUT_TARGET: &str = "chart_engine::layout";

/// Layout for axis tick marks and labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTickLayout {
    pub value: f64,
    /// Pixel position along the axis
    pub position: f64,
    pub label: String,
    pub label_bounds: LayoutRect,
}

/// A gridline across the plot area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLineLayout {
    pub start: LayoutPoint,
    pub end: LayoutPoint,
}

/// Bounds and text of a title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleLayout {
    pub bounds: LayoutRect,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AxisOrientation {
    Horizontal,
    Vertical,
}

/// Layout for a complete axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisLayout {
    pub axis: AxisId,
    pub align: AxisAlign,
    pub orientation: AxisOrientation,
    pub visible: bool,
    pub transform: AxisTransform,
    /// Band holding the tick marks and labels
    pub bounds: LayoutRect,
    pub line_start: LayoutPoint,
    pub line_end: LayoutPoint,
    pub ticks: Vec<AxisTickLayout>,
    pub gridlines: Vec<GridLineLayout>,
    pub title: Option<TitleLayout>,
}

impl AxisLayout {
    pub fn scale(&self) -> &AxisScale {
        &self.transform.scale
    }
}

/// Layout for a legend entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntryLayout {
    pub bounds: LayoutRect,
    pub symbol: LayoutRect,
    pub text_position: LayoutPoint,
    pub text: String,
    /// Series shown by this entry
    pub series: Option<SeriesId>,
    /// Category shown by this entry (circular charts)
    pub point: Option<usize>,
}

/// Layout for the legend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendLayout {
    pub bounds: LayoutRect,
    pub entries: Vec<LegendEntryLayout>,
}

/// Position of a host button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordanceLayout {
    pub name: String,
    pub bounds: LayoutRect,
}

/// Complete layout for a chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    /// Total bounds of the chart
    pub bounds: LayoutRect,
    /// Plot area bounds
    pub plot_area: LayoutRect,
    pub title: Option<TitleLayout>,
    pub legend: Option<LegendLayout>,
    /// One entry per chart axis, in declaration order
    pub axes: Vec<AxisLayout>,
    /// Visible series geometry in z-order
    pub series: Vec<SeriesGeometry>,
    pub additions: ChartAdditions,
    pub data_labels: Vec<DataLabelLayout>,
    pub affordances: Vec<AffordanceLayout>,
}

impl ChartLayout {
    pub fn axis(&self, id: AxisId) -> Option<&AxisLayout> {
        self.axes.get(id.index())
    }

    pub fn series_geometry(&self, id: SeriesId) -> Option<&SeriesGeometry> {
        self.series.iter().find(|g| g.series == id)
    }
}

/// Visible series with its points
struct SeriesData<'c> {
    id: SeriesId,
    series: &'c Series,
    axes: Option<(AxisId, AxisId)>,
    points: Vec<DataPoint>,
}

/// Everything learned about one axis from the data
#[derive(Default)]
struct AxisData {
    extent: DataExtent,
    percent: bool,
    /// Category labels by compacted slot
    categories: Vec<String>,
    slots: Option<Vec<Option<usize>>>,
}

/// Visible series sharing kind family, axes and stacking mode
struct StackGroup {
    family: KindFamily,
    axes: (AxisId, AxisId),
    relative: bool,
    members: Vec<SeriesId>,
    table: StackTable,
}

/// Reserved band of one axis during the passes
#[derive(Default, Clone, Copy)]
struct AxisBand {
    thickness: f64,
    offset: f64,
    /// Outer coordinate and thickness of the title strip
    title_strip: Option<(f64, f64)>,
    title_size: Size,
}

/// Layout calculator for charts
pub struct ChartLayoutCalculator {
    options: LayoutOptions,
    measurer: Option<Box<dyn TextMeasurer>>,
    formatter: Box<dyn NumberFormatter>,
}

impl Default for ChartLayoutCalculator {
    fn default() -> Self {
        Self {
            options: LayoutOptions::default(),
            measurer: Some(Box::new(HeuristicTextMeasurer)),
            formatter: Box::new(BasicNumberFormatter),
        }
    }
}

impl ChartLayoutCalculator {
    /// Create a new layout calculator
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_measurer(mut self, measurer: impl TextMeasurer + 'static) -> Self {
        self.measurer = Some(Box::new(measurer));
        self
    }

    /// Drop the measurer; layout falls back to a fixed-margin plot rect
    pub fn without_measurer(mut self) -> Self {
        self.measurer = None;
        self
    }

    pub fn with_formatter(mut self, formatter: impl NumberFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    fn measure(&self, text: &str, font: &FontSpec) -> Size {
        self.measurer
            .as_ref()
            .map(|m| m.measure(text, font))
            .unwrap_or_default()
    }

    fn format(&self, format: &str, value: f64) -> String {
        self.formatter
            .format_number(format, value, &self.options.locale)
    }

    /// Calculate the complete layout for a chart
    pub fn calculate(&self, chart: &Chart, data: &dyn DataSource, viewport: Size) -> ChartLayout {
        let bounds = LayoutRect::new(0.0, 0.0, viewport.width, viewport.height);
        let mut layout = ChartLayout {
            bounds,
            plot_area: LayoutRect::default(),
            ..Default::default()
        };
        if !(viewport.width > 0.0 && viewport.height > 0.0) {
            tracing::debug!(
                target: LAYOUT_TARGET,
                chart = %chart.id,
                width = viewport.width,
                height = viewport.height,
                "empty viewport"
            );
            layout.bounds = LayoutRect::default();
            return layout;
        }

        let series = collect_series(chart, data);
        let groups = build_stack_groups(&series);
        let axis_data = scan_axes(chart, &series, &groups);
        let cartesian = series.is_empty() || series.iter().any(|s| s.series.kind.uses_axes());

        let calculator = AxisScaleCalculator::new(&self.options);
        let transforms: Vec<AxisTransform> = chart
            .axes()
            .zip(&axis_data)
            .map(|((_, axis), info)| {
                let vertical = axis.align.is_vertical();
                let span = if vertical {
                    viewport.height
                } else {
                    viewport.width
                };
                let mut scale = calculator.auto_scale(axis, &axis.requested(), &info.extent, span);
                if info.percent && axis.kind == AxisKind::Linear {
                    scale.format = "0%".to_string();
                }
                AxisTransform {
                    scale,
                    invert: axis.invert,
                    between_ticks: axis.kind == AxisKind::Category && axis.between_ticks,
                    vertical,
                    category_slots: info.slots.clone(),
                }
            })
            .collect();

        layout.affordances = self.place_affordances(chart, bounds);

        // Tick labels per axis: (value, text, rotated size)
        let labels: Vec<Vec<(f64, String, Size)>> = chart
            .axes()
            .zip(&transforms)
            .zip(&axis_data)
            .map(|(((_, axis), transform), info)| {
                if !(cartesian && axis.visible) {
                    return Vec::new();
                }
                self.tick_labels(axis, &transform.scale, info)
                    .into_iter()
                    .map(|(value, text)| {
                        let size = self
                            .measure(&text, &self.options.axis_font)
                            .rotated(axis.label_rotation);
                        (value, text, size)
                    })
                    .collect()
            })
            .collect();

        let mut bands = vec![AxisBand::default(); chart.axis_count()];
        let plot = match self.measurer {
            Some(_) => self.run_passes(
                chart,
                &series,
                cartesian,
                &transforms,
                &labels,
                &mut bands,
                &mut layout,
            ),
            None => {
                let margin = self.options.fallback_margin;
                let (mx, my) = (bounds.width * margin, bounds.height * margin);
                tracing::debug!(
                    target: LAYOUT_TARGET,
                    chart = %chart.id,
                    "no text measurer, using fallback plot rect"
                );
                bounds.inset_sides(my, mx, my, mx)
            }
        };
        layout.plot_area = plot;

        layout.axes = chart
            .axes()
            .zip(transforms)
            .zip(labels)
            .zip(&bands)
            .map(|((((id, axis), transform), labels), band)| {
                self.axis_layout(id, axis, transform, labels, band, cartesian, &plot)
            })
            .collect();

        layout.series = self.build_series(&series, &groups, &layout.axes, &plot);
        layout.additions = self.build_additions(chart, &layout);
        layout.data_labels = self.build_data_labels(chart, &series, &axis_data, &layout);

        tracing::debug!(
            target: LAYOUT_TARGET,
            chart = %chart.id,
            plot_x = plot.x,
            plot_y = plot.y,
            plot_width = plot.width,
            plot_height = plot.height,
            axes = layout.axes.len(),
            series = layout.series.len(),
            labels = layout.data_labels.len(),
            "layout complete"
        );
        layout
    }

    /// Title, legend, axis title, tick label and overhang passes
    #[allow(clippy::too_many_arguments)]
    fn run_passes(
        &self,
        chart: &Chart,
        series: &[SeriesData<'_>],
        cartesian: bool,
        transforms: &[AxisTransform],
        labels: &[Vec<(f64, String, Size)>],
        bands: &mut [AxisBand],
        layout: &mut ChartLayout,
    ) -> LayoutRect {
        let spacing = self.options.spacing;
        let outer = layout.bounds.inset(self.options.padding);
        let mut available = outer;

        if let Some(title) = chart
            .title
            .as_ref()
            .filter(|t| t.visible && !t.text.is_empty())
        {
            let size = self
                .measure(&title.text, &self.options.title_font)
                .rotated(title.rotation);
            let side = match title.position {
                TitlePosition::Top => AxisAlign::Top,
                TitlePosition::Bottom => AxisAlign::Bottom,
                TitlePosition::Left => AxisAlign::Left,
                TitlePosition::Right => AxisAlign::Right,
            };
            let bounds = match side {
                AxisAlign::Top => LayoutRect::new(
                    available.center_x() - size.width / 2.0,
                    available.y,
                    size.width,
                    size.height,
                ),
                AxisAlign::Bottom => LayoutRect::new(
                    available.center_x() - size.width / 2.0,
                    available.bottom() - size.height,
                    size.width,
                    size.height,
                ),
                AxisAlign::Left => LayoutRect::new(
                    available.x,
                    available.center_y() - size.height / 2.0,
                    size.width,
                    size.height,
                ),
                AxisAlign::Right => LayoutRect::new(
                    available.right() - size.width,
                    available.center_y() - size.height / 2.0,
                    size.width,
                    size.height,
                ),
            };
            let thickness = if side.is_vertical() {
                size.width
            } else {
                size.height
            };
            available = shrink(available, side, thickness + spacing);
            layout.title = Some(TitleLayout {
                bounds,
                text: title.text.clone(),
            });
            tracing::debug!(target: LAYOUT_TARGET, thickness, "title placed");
        }

        if let Some(legend) = chart.legend.as_ref().filter(|l| l.visible) {
            if let Some(legend_layout) = self.legend_layout(series, legend, &available) {
                let side = legend_side(legend.position);
                let thickness = if side.is_vertical() {
                    legend_layout.bounds.width
                } else {
                    legend_layout.bounds.height
                };
                available = shrink(available, side, thickness + spacing);
                tracing::debug!(
                    target: LAYOUT_TARGET,
                    entries = legend_layout.entries.len(),
                    thickness,
                    "legend placed"
                );
                layout.legend = Some(legend_layout);
            }
        }

        if !cartesian {
            return available;
        }

        for ((_, axis), band) in chart.axes().zip(bands.iter_mut()) {
            let Some(title) = axis.title.as_ref().filter(|t| axis.visible && !t.is_empty()) else {
                continue;
            };
            let side = axis.align;
            let rotation = if side.is_vertical() { 90.0 } else { 0.0 };
            let size = self.measure(title, &self.options.axis_font).rotated(rotation);
            let thickness = if side.is_vertical() {
                size.width
            } else {
                size.height
            };
            let outer_edge = match side {
                AxisAlign::Left => available.x,
                AxisAlign::Right => available.right() - thickness,
                AxisAlign::Top => available.y,
                AxisAlign::Bottom => available.bottom() - thickness,
            };
            band.title_strip = Some((outer_edge, thickness));
            band.title_size = size;
            available = shrink(available, side, thickness + spacing);
        }

        let mut side_totals = [0.0f64; 4];
        for (((_, axis), band), labels) in chart.axes().zip(bands.iter_mut()).zip(labels) {
            if !axis.visible {
                continue;
            }
            let extent = labels
                .iter()
                .map(|(_, _, size)| {
                    if axis.align.is_vertical() {
                        size.width
                    } else {
                        size.height
                    }
                })
                .fold(0.0, f64::max);
            let thickness = self.options.tick_length + extent;
            let total = &mut side_totals[side_index(axis.align)];
            band.offset = *total;
            band.thickness = thickness;
            *total += thickness;
            available = shrink(available, axis.align, thickness);
        }
        tracing::debug!(
            target: LAYOUT_TARGET,
            top = side_totals[0],
            bottom = side_totals[1],
            left = side_totals[2],
            right = side_totals[3],
            "axis bands reserved"
        );

        // Overhang of the outermost tick labels
        let (mut top, mut right, mut bottom, mut left) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for (((_, axis), transform), labels) in chart.axes().zip(transforms).zip(labels) {
            if !axis.visible {
                continue;
            }
            let ends = [labels.first(), labels.last()];
            for (value, _, size) in ends.into_iter().flatten() {
                let n = transform.tick_position(*value);
                if !n.is_finite() {
                    continue;
                }
                let center = transform.to_pixel(&available, n);
                if transform.vertical {
                    top = top.max(outer.y - (center - size.height / 2.0));
                    bottom = bottom.max(center + size.height / 2.0 - outer.bottom());
                } else {
                    left = left.max(outer.x - (center - size.width / 2.0));
                    right = right.max(center + size.width / 2.0 - outer.right());
                }
            }
        }
        available.inset_sides(top, right, bottom, left)
    }

    fn legend_layout(
        &self,
        series: &[SeriesData<'_>],
        legend: &Legend,
        available: &LayoutRect,
    ) -> Option<LegendLayout> {
        let entries = self.legend_entries(series);
        if entries.is_empty() {
            return None;
        }
        let font = &self.options.legend_font;
        let symbol = self.options.legend_symbol_size;
        let row = self.options.legend_entry_height;
        let spacing = self.options.spacing;
        let widths: Vec<f64> = entries
            .iter()
            .map(|(text, _, _)| self.measure(text, font).width)
            .collect();

        let side = legend_side(legend.position);
        let mut layouts = Vec::with_capacity(entries.len());
        let bounds = if side.is_vertical() {
            let max_width = widths.iter().copied().fold(0.0, f64::max);
            let width = spacing + symbol + spacing + max_width + spacing;
            let height = row * entries.len() as f64;
            let x = match side {
                AxisAlign::Left => available.x,
                _ => available.right() - width,
            };
            let y = (available.center_y() - height / 2.0).max(available.y);
            for (i, (text, series, point)) in entries.into_iter().enumerate() {
                let row_y = y + row * i as f64;
                layouts.push(LegendEntryLayout {
                    bounds: LayoutRect::new(x, row_y, width, row),
                    symbol: LayoutRect::new(
                        x + spacing,
                        row_y + (row - symbol) / 2.0,
                        symbol,
                        symbol,
                    ),
                    text_position: LayoutPoint::new(x + spacing * 2.0 + symbol, row_y + row / 2.0),
                    text,
                    series,
                    point,
                });
            }
            LayoutRect::new(x, y, width, height)
        } else {
            let entry_widths: Vec<f64> = widths
                .iter()
                .map(|w| spacing + symbol + spacing + w + spacing)
                .collect();
            let total: f64 = entry_widths.iter().sum();
            let x = (available.center_x() - total / 2.0).max(available.x);
            let y = match side {
                AxisAlign::Top => available.y,
                _ => available.bottom() - row,
            };
            let mut cursor = x;
            for ((text, series, point), width) in entries.into_iter().zip(entry_widths) {
                layouts.push(LegendEntryLayout {
                    bounds: LayoutRect::new(cursor, y, width, row),
                    symbol: LayoutRect::new(
                        cursor + spacing,
                        y + (row - symbol) / 2.0,
                        symbol,
                        symbol,
                    ),
                    text_position: LayoutPoint::new(cursor + spacing * 2.0 + symbol, y + row / 2.0),
                    text,
                    series,
                    point,
                });
                cursor += width;
            }
            LayoutRect::new(x, y, total, row)
        };
        Some(LegendLayout {
            bounds,
            entries: layouts,
        })
    }

    /// Series names, or the categories of the first circular series when
    /// every visible series is circular
    fn legend_entries(
        &self,
        series: &[SeriesData<'_>],
    ) -> Vec<(String, Option<SeriesId>, Option<usize>)> {
        let all_circular =
            !series.is_empty() && series.iter().all(|s| s.series.kind.is_circular());
        if all_circular {
            let first = &series[0];
            return first
                .points
                .iter()
                .enumerate()
                .map(|(i, point)| {
                    let text = point
                        .label
                        .clone()
                        .unwrap_or_else(|| self.format(GENERAL_FORMAT, (i + 1) as f64));
                    (text, Some(first.id), Some(i))
                })
                .collect();
        }
        series
            .iter()
            .map(|s| (s.series.name.clone(), Some(s.id), None))
            .collect()
    }

    /// Values and texts of an axis's tick labels
    fn tick_labels(&self, axis: &Axis, scale: &AxisScale, info: &AxisData) -> Vec<(f64, String)> {
        let ticks = scale.ticks();
        if axis.kind == AxisKind::Category {
            return ticks
                .into_iter()
                .filter(|v| !axis.between_ticks || *v < scale.max - 1e-9)
                .map(|v| {
                    let text = info
                        .categories
                        .get(v.max(0.0) as usize)
                        .filter(|label| !label.is_empty())
                        .cloned()
                        .unwrap_or_else(|| self.format(GENERAL_FORMAT, v + 1.0));
                    (v, text)
                })
                .collect();
        }
        let format = axis.number_format.as_deref().unwrap_or(&scale.format);
        ticks
            .into_iter()
            .map(|v| (v, self.format(format, v)))
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn axis_layout(
        &self,
        id: AxisId,
        axis: &Axis,
        transform: AxisTransform,
        labels: Vec<(f64, String, Size)>,
        band: &AxisBand,
        cartesian: bool,
        plot: &LayoutRect,
    ) -> AxisLayout {
        let side = axis.align;
        let (offset, thickness) = (band.offset, band.thickness);
        let bounds = match side {
            AxisAlign::Left => {
                LayoutRect::new(plot.x - offset - thickness, plot.y, thickness, plot.height)
            }
            AxisAlign::Right => {
                LayoutRect::new(plot.right() + offset, plot.y, thickness, plot.height)
            }
            AxisAlign::Top => {
                LayoutRect::new(plot.x, plot.y - offset - thickness, plot.width, thickness)
            }
            AxisAlign::Bottom => {
                LayoutRect::new(plot.x, plot.bottom() + offset, plot.width, thickness)
            }
        };
        let (line_start, line_end) = match side {
            AxisAlign::Left => {
                let x = plot.x - offset;
                (LayoutPoint::new(x, plot.y), LayoutPoint::new(x, plot.bottom()))
            }
            AxisAlign::Right => {
                let x = plot.right() + offset;
                (LayoutPoint::new(x, plot.y), LayoutPoint::new(x, plot.bottom()))
            }
            AxisAlign::Top => {
                let y = plot.y - offset;
                (LayoutPoint::new(plot.x, y), LayoutPoint::new(plot.right(), y))
            }
            AxisAlign::Bottom => {
                let y = plot.bottom() + offset;
                (LayoutPoint::new(plot.x, y), LayoutPoint::new(plot.right(), y))
            }
        };

        let tick = self.options.tick_length;
        let ticks = labels
            .into_iter()
            .filter_map(|(value, label, size)| {
                let n = transform.tick_position(value);
                if !(n.is_finite() && (-1e-9..=1.0 + 1e-9).contains(&n)) {
                    return None;
                }
                let position = transform.to_pixel(plot, n);
                let (half_width, half_height) = (size.width / 2.0, size.height / 2.0);
                let center = match side {
                    AxisAlign::Left => {
                        LayoutPoint::new(line_start.x - tick - half_width, position)
                    }
                    AxisAlign::Right => {
                        LayoutPoint::new(line_start.x + tick + half_width, position)
                    }
                    AxisAlign::Top => {
                        LayoutPoint::new(position, line_start.y - tick - half_height)
                    }
                    AxisAlign::Bottom => {
                        LayoutPoint::new(position, line_start.y + tick + half_height)
                    }
                };
                Some(AxisTickLayout {
                    value,
                    position,
                    label,
                    label_bounds: LayoutRect::centered(center, size),
                })
            })
            .collect();

        let gridlines = if cartesian && axis.major_gridlines {
            transform
                .scale
                .ticks()
                .into_iter()
                .filter_map(|value| {
                    let n = transform.scale_to_axis(value, None, true);
                    if !(n.is_finite() && (-1e-9..=1.0 + 1e-9).contains(&n)) {
                        return None;
                    }
                    let p = transform.to_pixel(plot, n);
                    Some(if transform.vertical {
                        GridLineLayout {
                            start: LayoutPoint::new(plot.x, p),
                            end: LayoutPoint::new(plot.right(), p),
                        }
                    } else {
                        GridLineLayout {
                            start: LayoutPoint::new(p, plot.y),
                            end: LayoutPoint::new(p, plot.bottom()),
                        }
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        let title = match (band.title_strip, axis.title.as_ref()) {
            (Some((edge, strip)), Some(text)) => {
                let size = band.title_size;
                let bounds = if side.is_vertical() {
                    LayoutRect::new(edge, plot.center_y() - size.height / 2.0, strip, size.height)
                } else {
                    LayoutRect::new(plot.center_x() - size.width / 2.0, edge, size.width, strip)
                };
                Some(TitleLayout {
                    bounds,
                    text: text.clone(),
                })
            }
            _ => None,
        };

        AxisLayout {
            axis: id,
            align: side,
            orientation: if side.is_vertical() {
                AxisOrientation::Vertical
            } else {
                AxisOrientation::Horizontal
            },
            visible: cartesian && axis.visible,
            transform,
            bounds,
            line_start,
            line_end,
            ticks,
            gridlines,
            title,
        }
    }

    fn place_affordances(&self, chart: &Chart, bounds: LayoutRect) -> Vec<AffordanceLayout> {
        let mut cursor = bounds.right() - self.options.padding;
        let top = bounds.y + self.options.padding;
        chart
            .affordances
            .iter()
            .map(|affordance| {
                let rect = LayoutRect::new(
                    cursor - affordance.size.width,
                    top,
                    affordance.size.width,
                    affordance.size.height,
                );
                cursor = rect.x - self.options.spacing;
                AffordanceLayout {
                    name: affordance.name.clone(),
                    bounds: rect,
                }
            })
            .collect()
    }

    fn build_series(
        &self,
        series: &[SeriesData<'_>],
        groups: &[StackGroup],
        axes: &[AxisLayout],
        plot: &LayoutRect,
    ) -> Vec<SeriesGeometry> {
        let mapper = SeriesGeometryMapper::new(&self.options, *plot);
        let slots = bar_slots(series, groups);
        let bubble_capacity = series
            .iter()
            .filter(|s| s.series.kind == SeriesKind::Bubble)
            .flat_map(|s| s.points.iter().filter_map(|p| p.c))
            .map(f64::abs)
            .fold(0.0, f64::max);
        let ring_count = series
            .iter()
            .filter(|s| s.series.kind == SeriesKind::Doughnut)
            .count();
        let first_pie = series
            .iter()
            .find(|s| s.series.kind == SeriesKind::Pie)
            .map(|s| s.id);
        let first_funnel = series
            .iter()
            .find(|s| s.series.kind == SeriesKind::Funnel)
            .map(|s| s.id);

        let mut ring_index = 0;
        let mut geometries = Vec::new();
        for (position, s) in series.iter().enumerate() {
            let kind = s.series.kind;
            let geometry = match kind.family() {
                KindFamily::Slices => {
                    if kind == SeriesKind::Pie {
                        if first_pie != Some(s.id) {
                            continue;
                        }
                        let ring = Ring { index: 0, count: 1 };
                        mapper.slices(s.id, kind, &s.points, ring, s.series.explosion)
                    } else {
                        let ring = Ring {
                            index: ring_index,
                            count: ring_count,
                        };
                        ring_index += 1;
                        mapper.slices(s.id, kind, &s.points, ring, s.series.explosion)
                    }
                }
                KindFamily::Funnel => {
                    if first_funnel != Some(s.id) {
                        continue;
                    }
                    mapper.funnel(s.id, &s.points)
                }
                _ => {
                    let Some((x_id, y_id)) = s.axes else {
                        tracing::debug!(
                            target: LAYOUT_TARGET,
                            series = %s.series.name,
                            "series has no axes"
                        );
                        continue;
                    };
                    let (Some(x), Some(y)) = (axes.get(x_id.index()), axes.get(y_id.index())) else {
                        continue;
                    };
                    let (x, y) = (&x.transform, &y.transform);
                    let stack = stack_ref(groups, s.id);
                    match kind.family() {
                        KindFamily::Bars => {
                            let slot = slots[position].unwrap_or(BarSlot { index: 0, count: 1 });
                            mapper.bars(s.id, kind, &s.points, x, y, slot, stack)
                        }
                        KindFamily::Areas => mapper.area(s.id, &s.points, x, y, stack),
                        KindFamily::Bubbles => {
                            mapper.bubbles(s.id, &s.points, x, y, bubble_capacity)
                        }
                        _ => mapper.points(s.id, kind, &s.points, x, y, stack),
                    }
                }
            };
            geometries.push(geometry);
        }
        geometries
    }

    fn build_additions(&self, chart: &Chart, layout: &ChartLayout) -> ChartAdditions {
        if !(chart.hi_lo_lines || chart.up_down_bars) {
            return ChartAdditions::default();
        }
        let lines: Vec<(&SeriesGeometry, AxisId)> = layout
            .series
            .iter()
            .filter(|g| g.kind == SeriesKind::Line)
            .filter_map(|g| {
                let series = chart.series(g.series)?;
                let (x, _) = chart.series_axes(series)?;
                Some((g, x))
            })
            .collect();
        let Some(&(_, x_id)) = lines.first() else {
            return ChartAdditions::default();
        };
        let Some(x) = layout.axis(x_id) else {
            return ChartAdditions::default();
        };
        let shared: Vec<&SeriesGeometry> = lines
            .iter()
            .filter(|(_, x)| *x == x_id)
            .map(|(g, _)| *g)
            .collect();
        SeriesGeometryMapper::new(&self.options, layout.plot_area).additions(
            &shared,
            &x.transform,
            chart.hi_lo_lines,
            chart.up_down_bars,
        )
    }

    fn build_data_labels(
        &self,
        chart: &Chart,
        series: &[SeriesData<'_>],
        axis_data: &[AxisData],
        layout: &ChartLayout,
    ) -> Vec<DataLabelLayout> {
        let positioner = DataLabelPositioner::new(&self.options);
        let mut labels = Vec::new();
        for geometry in &layout.series {
            let Some(s) = series.iter().find(|s| s.id == geometry.series) else {
                continue;
            };
            let Some(options) = s.series.data_labels.as_ref() else {
                continue;
            };
            let kind = s.series.kind;
            let position = options.position.unwrap_or(kind.default_label_position());
            let total: f64 = geometry.elements.iter().map(|e| e.value.abs()).sum();
            let categories = s.axes.and_then(|(x, _)| axis_data.get(x.index()));
            let axis_format = s.axes.and_then(|(_, y)| {
                let axis = chart.axis(y)?;
                Some(axis.number_format.clone().unwrap_or_else(|| {
                    layout
                        .axis(y)
                        .map(|a| a.scale().format.clone())
                        .unwrap_or_default()
                }))
            });

            for element in &geometry.elements {
                let point = &s.points[element.index];
                let category = point.label.as_deref().or_else(|| {
                    let info = categories?;
                    let slot = match &info.slots {
                        Some(slots) => slots.get(element.index).copied().flatten()?,
                        None => element.index,
                    };
                    info.categories.get(slot).map(String::as_str)
                });
                let content = LabelContent {
                    series_name: &s.series.name,
                    category,
                    value: Some(element.value),
                    percent: (kind.is_circular() && total > 0.0)
                        .then(|| element.value.abs() / total),
                    point_format: point.format_y.as_deref(),
                    axis_format: axis_format.as_deref().filter(|f| !f.is_empty()),
                };
                let text = positioner.label_text(self.formatter.as_ref(), options, &content);
                if text.is_empty() {
                    continue;
                }
                let size = self.measure(&text, &self.options.label_font);
                labels.push(DataLabelLayout {
                    series: geometry.series,
                    point: element.index,
                    text,
                    bounds: positioner.label_rect(
                        &element.anchor,
                        size,
                        options.rotation,
                        position,
                    ),
                });
            }
        }
        labels
    }
}

fn side_index(side: AxisAlign) -> usize {
    match side {
        AxisAlign::Top => 0,
        AxisAlign::Bottom => 1,
        AxisAlign::Left => 2,
        AxisAlign::Right => 3,
    }
}

fn legend_side(position: LegendPosition) -> AxisAlign {
    match position {
        LegendPosition::Top => AxisAlign::Top,
        LegendPosition::Bottom => AxisAlign::Bottom,
        LegendPosition::Left => AxisAlign::Left,
        LegendPosition::Right => AxisAlign::Right,
    }
}

/// Take `amount` off one side of a rect
fn shrink(rect: LayoutRect, side: AxisAlign, amount: f64) -> LayoutRect {
    match side {
        AxisAlign::Top => rect.inset_sides(amount, 0.0, 0.0, 0.0),
        AxisAlign::Bottom => rect.inset_sides(0.0, 0.0, amount, 0.0),
        AxisAlign::Left => rect.inset_sides(0.0, 0.0, 0.0, amount),
        AxisAlign::Right => rect.inset_sides(0.0, amount, 0.0, 0.0),
    }
}

fn collect_series<'c>(chart: &'c Chart, data: &dyn DataSource) -> Vec<SeriesData<'c>> {
    chart
        .series_iter()
        .filter(|(_, series)| series.visible)
        .map(|(id, series)| SeriesData {
            id,
            series,
            axes: if series.kind.uses_axes() {
                chart.series_axes(series)
            } else {
                None
            },
            points: collect_points(data, &series.data_ref),
        })
        .collect()
}

fn build_stack_groups(series: &[SeriesData<'_>]) -> Vec<StackGroup> {
    let mut groups: Vec<StackGroup> = Vec::new();
    let mut values: Vec<Vec<Vec<Option<f64>>>> = Vec::new();
    for s in series {
        let stacking = s.series.effective_stacking();
        let Some(axes) = s.axes else { continue };
        if stacking == Stacking::None {
            continue;
        }
        let family = s.series.kind.family();
        let relative = stacking == Stacking::Relative;
        let member_values: Vec<Option<f64>> = s
            .points
            .iter()
            .map(|p| match family {
                KindFamily::Areas => p.y.or(Some(0.0)),
                _ => p.y,
            })
            .collect();
        match groups
            .iter()
            .position(|g| g.family == family && g.axes == axes && g.relative == relative)
        {
            Some(i) => {
                groups[i].members.push(s.id);
                values[i].push(member_values);
            }
            None => {
                groups.push(StackGroup {
                    family,
                    axes,
                    relative,
                    members: vec![s.id],
                    table: StackTable::default(),
                });
                values.push(vec![member_values]);
            }
        }
    }
    for (group, members) in groups.iter_mut().zip(values) {
        group.table = StackTable::build(members);
    }
    groups
}

fn stack_ref(groups: &[StackGroup], id: SeriesId) -> Option<StackRef<'_>> {
    groups.iter().find_map(|group| {
        let member = group.members.iter().position(|m| *m == id)?;
        Some(StackRef {
            table: &group.table,
            member,
            relative: group.relative,
        })
    })
}

/// Cluster slot of every bar series; stacked groups share one slot
fn bar_slots(series: &[SeriesData<'_>], groups: &[StackGroup]) -> Vec<Option<BarSlot>> {
    // (kind, x axis) -> slot keys in order; a key is a group index or a series position
    let mut clusters: Vec<((SeriesKind, AxisId), Vec<(bool, usize)>)> = Vec::new();
    let mut assigned: Vec<Option<((SeriesKind, AxisId), usize)>> = vec![None; series.len()];
    for (position, s) in series.iter().enumerate() {
        if s.series.kind.family() != KindFamily::Bars {
            continue;
        }
        let Some((x, _)) = s.axes else { continue };
        let key_id = (s.series.kind, x);
        let slot_key = match groups.iter().position(|g| g.members.contains(&s.id)) {
            Some(group) => (true, group),
            None => (false, position),
        };
        let cluster = match clusters.iter().position(|(k, _)| *k == key_id) {
            Some(i) => i,
            None => {
                clusters.push((key_id, Vec::new()));
                clusters.len() - 1
            }
        };
        let keys = &mut clusters[cluster].1;
        let index = match keys.iter().position(|k| *k == slot_key) {
            Some(i) => i,
            None => {
                keys.push(slot_key);
                keys.len() - 1
            }
        };
        assigned[position] = Some((key_id, index));
    }
    assigned
        .into_iter()
        .map(|slot| {
            let (key, index) = slot?;
            let count = clusters.iter().find(|(k, _)| *k == key)?.1.len();
            Some(BarSlot { index, count })
        })
        .collect()
}

/// Extents, category labels and empty slots for every axis
fn scan_axes(chart: &Chart, series: &[SeriesData<'_>], groups: &[StackGroup]) -> Vec<AxisData> {
    let mut data: Vec<AxisData> = (0..chart.axis_count()).map(|_| AxisData::default()).collect();
    let mut filled: Vec<Vec<bool>> = vec![Vec::new(); chart.axis_count()];
    let mut labels: Vec<Vec<Option<String>>> = vec![Vec::new(); chart.axis_count()];

    for s in series {
        let Some((x_id, y_id)) = s.axes else { continue };
        let (Some(x_axis), Some(_)) = (chart.axis(x_id), chart.axis(y_id)) else {
            continue;
        };
        let x = x_id.index();
        if x_axis.kind == AxisKind::Category {
            let slots = &mut filled[x];
            if slots.len() < s.points.len() {
                slots.resize(s.points.len(), false);
                labels[x].resize(s.points.len(), None);
            }
            for (i, point) in s.points.iter().enumerate() {
                slots[i] |= point.y.is_some();
                if labels[x][i].is_none() {
                    labels[x][i] = point.label.clone();
                }
            }
        } else {
            for (i, point) in s.points.iter().enumerate() {
                if point.y.is_some() {
                    data[x].extent.include(point.x.unwrap_or(i as f64 + 1.0));
                }
            }
        }

        let stacked = groups.iter().any(|g| g.members.contains(&s.id));
        if !stacked {
            let extent = &mut data[y_id.index()].extent;
            for point in &s.points {
                if let Some(y) = point.y {
                    extent.include(y);
                }
            }
        }
    }

    for group in groups {
        let info = &mut data[group.axes.1.index()];
        for (low, high) in group.table.extent(group.relative) {
            info.extent.include(low);
            info.extent.include(high);
        }
        info.percent |= group.relative;
    }

    for ((id, axis), (slots, names)) in chart.axes().zip(filled.into_iter().zip(labels)) {
        if axis.kind != AxisKind::Category {
            continue;
        }
        let info = &mut data[id.index()];
        info.extent.slots = slots.len();
        info.extent.empty_slots = slots.iter().filter(|f| !**f).count();
        if axis.hide_empty_categories && info.extent.empty_slots > 0 {
            let mut next = 0;
            let map: Vec<Option<usize>> = slots
                .iter()
                .map(|f| {
                    f.then(|| {
                        next += 1;
                        next - 1
                    })
                })
                .collect();
            info.categories = names
                .into_iter()
                .zip(&slots)
                .filter(|(_, f)| **f)
                .map(|(name, _)| name.unwrap_or_default())
                .collect();
            info.slots = Some(map);
        } else {
            info.categories = names.into_iter().map(Option::unwrap_or_default).collect();
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecDataSource;
    use crate::mapper::ElementShape;

    fn column_chart() -> (Chart, VecDataSource) {
        let mut chart = Chart::with_default_axes("test").with_title("Sales");
        chart.add_series(Series::new("Series 1", SeriesKind::Column, "s1"));
        let data =
            VecDataSource::new().with_categories("s1", &["Q1", "Q2", "Q3"], &[10.0, 20.0, 30.0]);
        (chart, data)
    }

    #[test]
    fn test_calculate_bar_chart_layout() {
        let (chart, data) = column_chart();
        let calculator = ChartLayoutCalculator::new();
        let layout = calculator.calculate(&chart, &data, Size::new(400.0, 300.0));

        assert_eq!(layout.series.len(), 1);
        assert_eq!(layout.series[0].elements.len(), 3);
        assert!(layout.title.is_some());
        assert!(layout.plot_area.width > 0.0 && layout.plot_area.height > 0.0);
    }

    #[test]
    fn test_calculate_line_chart_layout() {
        let mut chart = Chart::with_default_axes("test");
        chart.add_series(Series::new("Line", SeriesKind::Line, "l"));
        let data = VecDataSource::new().with_values("l", &[5.0, 15.0, 10.0, 20.0]);

        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(400.0, 300.0));

        let line = &layout.series[0];
        assert_eq!(line.elements.len(), 4);
        assert_eq!(line.lines.len(), 1);
        assert_eq!(line.lines[0].len(), 4);
    }

    #[test]
    fn test_calculate_pie_chart_layout() {
        let mut chart = Chart::with_default_axes("test").with_legend(LegendPosition::Right);
        chart.add_series(Series::new("Pie", SeriesKind::Pie, "p"));
        let data = VecDataSource::new().with_categories("p", &["A", "B", "C"], &[25.0, 50.0, 25.0]);

        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(400.0, 300.0));

        assert_eq!(layout.series[0].elements.len(), 3);
        assert!(layout.axes.iter().all(|a| !a.visible && a.ticks.is_empty()));
        let legend = layout.legend.unwrap();
        let texts: Vec<&str> = legend.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_stacked_columns_share_a_slot() {
        let mut chart = Chart::with_default_axes("test");
        chart.add_series(
            Series::new("A", SeriesKind::Column, "a").with_stacking(Stacking::Stacked),
        );
        chart.add_series(
            Series::new("B", SeriesKind::Column, "b").with_stacking(Stacking::Stacked),
        );
        let data = VecDataSource::new()
            .with_values("a", &[10.0, 20.0])
            .with_values("b", &[5.0, 5.0]);

        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(400.0, 300.0));

        let rect = |s: usize, i: usize| match layout.series[s].elements[i].shape {
            ElementShape::Rect(rect) => rect,
            _ => panic!("expected rect"),
        };
        assert!((rect(0, 0).x - rect(1, 0).x).abs() < 1e-9);
        assert!((rect(1, 0).bottom() - rect(0, 0).y).abs() < 1e-9);
        // Stacked totals reach 25, so the value axis covers them
        assert!(layout.axes[1].scale().max >= 25.0);
    }

    #[test]
    fn test_relative_stacking_uses_percent_axis() {
        let mut chart = Chart::with_default_axes("test");
        chart.add_series(
            Series::new("A", SeriesKind::Column, "a").with_stacking(Stacking::Relative),
        );
        chart.add_series(
            Series::new("B", SeriesKind::Column, "b").with_stacking(Stacking::Relative),
        );
        let data = VecDataSource::new()
            .with_values("a", &[1.0, 3.0])
            .with_values("b", &[3.0, 1.0]);

        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(400.0, 300.0));

        let y = &layout.axes[1];
        assert_eq!(y.scale().format, "0%");
        assert!(y.scale().max <= 1.0 + 1e-9);
        assert!(y.ticks.iter().any(|t| t.label == "100%"));
    }

    #[test]
    fn test_title_and_legend_shrink_plot() {
        let (chart, data) = column_chart();
        let calculator = ChartLayoutCalculator::new();
        let plain = calculator.calculate(&chart, &data, Size::new(400.0, 300.0));
        let legend_chart = chart.clone().with_legend(LegendPosition::Bottom);
        let with_legend = calculator.calculate(&legend_chart, &data, Size::new(400.0, 300.0));

        assert!(with_legend.plot_area.height < plain.plot_area.height);
        let legend = with_legend.legend.unwrap();
        assert!(legend.bounds.y >= with_legend.plot_area.bottom());
        assert!(plain.title.unwrap().bounds.bottom() <= plain.plot_area.y);
    }

    #[test]
    fn test_axis_labels_sit_outside_plot() {
        let (chart, data) = column_chart();
        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(400.0, 300.0));

        let x = &layout.axes[0];
        let labels: Vec<&str> = x.ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Q1", "Q2", "Q3"]);
        for tick in &x.ticks {
            assert!(tick.label_bounds.y >= layout.plot_area.bottom());
        }
        let y = &layout.axes[1];
        for tick in &y.ticks {
            assert!(tick.label_bounds.right() <= layout.plot_area.x);
        }
        assert!(!y.gridlines.is_empty());
    }

    #[test]
    fn test_axes_on_same_side_stack_outward() {
        let mut chart = Chart::with_default_axes("test");
        chart
            .add_axis(Axis::new("y2", AxisKind::Linear, AxisRole::Y).with_gridlines(false))
            .unwrap();
        chart.add_series(Series::new("A", SeriesKind::Line, "a"));
        chart.add_series(Series::new("B", SeriesKind::Line, "b").with_axes("x", "y2"));
        let data = VecDataSource::new()
            .with_values("a", &[1.0, 2.0])
            .with_values("b", &[1000.0, 2000.0]);

        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(600.0, 300.0));

        let inner = &layout.axes[1];
        let outer = &layout.axes[2];
        assert!((inner.bounds.right() - layout.plot_area.x).abs() < 1e-9);
        assert!(outer.bounds.right() <= inner.bounds.x + 1e-9);
    }

    #[test]
    fn test_fallback_without_measurer() {
        let (chart, data) = column_chart();
        let layout = ChartLayoutCalculator::new()
            .without_measurer()
            .calculate(&chart, &data, Size::new(400.0, 300.0));

        assert_eq!(layout.plot_area, LayoutRect::new(40.0, 30.0, 320.0, 240.0));
        assert!(layout.title.is_none());
        assert_eq!(layout.series[0].elements.len(), 3);
    }

    #[test]
    fn test_zero_viewport() {
        let (chart, data) = column_chart();
        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(0.0, 300.0));
        assert_eq!(layout, ChartLayout::default());
    }

    #[test]
    fn test_hidden_series_excluded() {
        let mut chart = Chart::with_default_axes("test");
        chart.add_series(Series::new("A", SeriesKind::Column, "a"));
        let hidden = chart.add_series(Series::new("B", SeriesKind::Column, "b").hidden());
        let data = VecDataSource::new()
            .with_values("a", &[1.0])
            .with_values("b", &[1000.0]);

        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(400.0, 300.0));

        assert!(layout.series_geometry(hidden).is_none());
        assert!(layout.axes[1].scale().max < 1000.0);
    }

    #[test]
    fn test_hidden_empty_categories() {
        let mut chart = Chart::new("test");
        chart
            .add_axis(Axis::new("x", AxisKind::Category, AxisRole::X).hiding_empty_categories())
            .unwrap();
        chart.add_axis(Axis::new("y", AxisKind::Linear, AxisRole::Y)).unwrap();
        chart.add_series(Series::new("A", SeriesKind::Column, "a"));
        let data = VecDataSource::new().with_points(
            "a",
            vec![
                DataPoint::new(1.0).with_label("Mon"),
                DataPoint::missing().with_label("Tue"),
                DataPoint::new(3.0).with_label("Wed"),
            ],
        );

        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(400.0, 300.0));

        let x = &layout.axes[0];
        assert_eq!(x.scale().max, 2.0);
        let labels: Vec<&str> = x.ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Mon", "Wed"]);
        assert_eq!(layout.series[0].elements.len(), 2);
    }

    #[test]
    fn test_data_labels_follow_elements() {
        let mut chart = Chart::with_default_axes("test");
        chart.add_series(
            Series::new("A", SeriesKind::Column, "a").with_data_labels(DataLabelOptions::default()),
        );
        let data = VecDataSource::new().with_values("a", &[10.0, 20.0]);

        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(400.0, 300.0));

        assert_eq!(layout.data_labels.len(), 2);
        assert_eq!(layout.data_labels[1].text, "20");
        let ElementShape::Rect(bar) = layout.series[0].elements[1].shape else {
            panic!("expected rect");
        };
        assert!(bar.contains(layout.data_labels[1].bounds.center()));
    }

    #[test]
    fn test_affordances_top_right() {
        let (mut chart, data) = column_chart();
        chart.affordances = vec![
            Affordance {
                name: "filter".to_string(),
                size: Size::new(20.0, 20.0),
            },
            Affordance {
                name: "edit".to_string(),
                size: Size::new(20.0, 20.0),
            },
        ];
        let layout = ChartLayoutCalculator::new().calculate(&chart, &data, Size::new(400.0, 300.0));

        assert_eq!(layout.affordances[0].bounds, LayoutRect::new(370.0, 10.0, 20.0, 20.0));
        assert_eq!(layout.affordances[1].bounds, LayoutRect::new(345.0, 10.0, 20.0, 20.0));
    }
}

//! Chart model types
//!
//! A chart owns its axes and series in two arenas addressed by stable
//! integer ids. Series reference axes by name, as the host document does;
//! names are resolved through an index map, falling back to the first axis
//! with the matching role when a name is unknown.

use crate::error::{ChartError, ChartResult};
use crate::geometry::Size;
use crate::scale::ScaleRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable identifier of an axis within its chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AxisId(pub u32);

impl AxisId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Stable identifier of a series within its chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId(pub u32);

impl SeriesId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A complete chart description
#[derive(Debug, Clone)]
pub struct Chart {
    /// Unique identifier for this chart
    pub id: String,
    /// Optional chart title
    pub title: Option<ChartTitle>,
    /// Optional legend configuration
    pub legend: Option<Legend>,
    /// Draw hi-lo lines across the visible line series
    pub hi_lo_lines: bool,
    /// Draw up-down bars between the first and last visible line series
    pub up_down_bars: bool,
    /// Host buttons placed in the top-right corner (filter, edit, ...)
    pub affordances: Vec<Affordance>,
    axes: Vec<Axis>,
    series: Vec<Series>,
    axis_names: HashMap<String, AxisId>,
}

impl Chart {
    /// Create an empty chart with the given ID
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            legend: None,
            hi_lo_lines: false,
            up_down_bars: false,
            affordances: Vec::new(),
            axes: Vec::new(),
            series: Vec::new(),
            axis_names: HashMap::new(),
        }
    }

    /// Create a chart with a category X axis named "x" and a linear Y axis named "y"
    pub fn with_default_axes(id: impl Into<String>) -> Self {
        Self::with_default_axes_for(id, SeriesKind::Column)
    }

    /// Default axes placed for a chart kind
    ///
    /// Bar and profile charts run their category axis down the left side,
    /// which is what turns bars horizontal.
    pub fn with_default_axes_for(id: impl Into<String>, kind: SeriesKind) -> Self {
        let (x_align, y_align) = kind.default_alignment();
        let mut chart = Self::new(id);
        chart
            .axes
            .push(Axis::new("x", AxisKind::Category, AxisRole::X).with_align(x_align));
        chart
            .axes
            .push(Axis::new("y", AxisKind::Linear, AxisRole::Y).with_align(y_align));
        chart.axis_names.insert("x".to_string(), AxisId(0));
        chart.axis_names.insert("y".to_string(), AxisId(1));
        chart
    }

    /// Set the chart title
    pub fn with_title(mut self, text: impl Into<String>) -> Self {
        self.title = Some(ChartTitle::new(text));
        self
    }

    /// Set the legend
    pub fn with_legend(mut self, position: LegendPosition) -> Self {
        self.legend = Some(Legend {
            position,
            visible: true,
        });
        self
    }

    /// Register an axis; names must be unique within the chart
    pub fn add_axis(&mut self, axis: Axis) -> ChartResult<AxisId> {
        if self.axis_names.contains_key(&axis.name) {
            return Err(ChartError::DuplicateAxis(axis.name));
        }
        let id = AxisId(self.axes.len() as u32);
        self.axis_names.insert(axis.name.clone(), id);
        self.axes.push(axis);
        Ok(id)
    }

    /// Add a data series
    pub fn add_series(&mut self, series: Series) -> SeriesId {
        let id = SeriesId(self.series.len() as u32);
        self.series.push(series);
        id
    }

    pub fn axis(&self, id: AxisId) -> Option<&Axis> {
        self.axes.get(id.index())
    }

    /// Mutable access for axis edits (zoom, explicit bounds, ...)
    ///
    /// The name is not editable here since it keys the index map.
    pub fn axis_mut(&mut self, id: AxisId) -> Option<AxisEdit<'_>> {
        self.axes.get_mut(id.index()).map(AxisEdit)
    }

    /// Axes in declaration order with their ids
    pub fn axes(&self) -> impl Iterator<Item = (AxisId, &Axis)> {
        self.axes
            .iter()
            .enumerate()
            .map(|(i, axis)| (AxisId(i as u32), axis))
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn axis_by_name(&self, name: &str) -> Option<AxisId> {
        self.axis_names.get(name).copied()
    }

    pub fn series(&self, id: SeriesId) -> Option<&Series> {
        self.series.get(id.index())
    }

    pub fn series_mut(&mut self, id: SeriesId) -> ChartResult<&mut Series> {
        self.series
            .get_mut(id.index())
            .ok_or(ChartError::UnknownSeries(id.0))
    }

    /// Series in z-order (first drawn first) with their ids
    pub fn series_iter(&self) -> impl Iterator<Item = (SeriesId, &Series)> {
        self.series
            .iter()
            .enumerate()
            .map(|(i, series)| (SeriesId(i as u32), series))
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Show or hide a series
    pub fn set_series_visible(&mut self, id: SeriesId, visible: bool) -> ChartResult<()> {
        self.series_mut(id)?.visible = visible;
        Ok(())
    }

    /// Resolve an axis name for the given role
    ///
    /// Unknown names, or names bound to an axis of the other role, fall back
    /// to the first axis with the requested role.
    pub fn resolve_axis(&self, name: &str, role: AxisRole) -> Option<AxisId> {
        if let Some(id) = self.axis_by_name(name) {
            if self.axes[id.index()].role == role {
                return Some(id);
            }
        }
        self.axes()
            .find(|(_, axis)| axis.role == role)
            .map(|(id, _)| id)
    }

    /// X and Y axes of a series, if the chart has axes of both roles
    pub fn series_axes(&self, series: &Series) -> Option<(AxisId, AxisId)> {
        let x = self.resolve_axis(&series.x_axis, AxisRole::X)?;
        let y = self.resolve_axis(&series.y_axis, AxisRole::Y)?;
        Some((x, y))
    }
}

/// Mutable view of an axis that keeps its name fixed
pub struct AxisEdit<'a>(&'a mut Axis);

impl std::ops::Deref for AxisEdit<'_> {
    type Target = Axis;

    fn deref(&self) -> &Axis {
        self.0
    }
}

impl AxisEdit<'_> {
    pub fn set_zoom(&mut self, min: Option<f64>, max: Option<f64>) {
        self.0.zoom_min = min;
        self.0.zoom_max = max;
    }

    pub fn set_explicit_bounds(&mut self, min: Option<f64>, max: Option<f64>) {
        self.0.explicit_min = min;
        self.0.explicit_max = max;
    }

    pub fn set_explicit_step(&mut self, step: Option<f64>) {
        self.0.explicit_step = step;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.0.visible = visible;
    }

    pub fn set_kind(&mut self, kind: AxisKind) {
        self.0.kind = kind;
    }

    pub fn set_align(&mut self, align: AxisAlign) {
        self.0.align = align;
    }

    pub fn set_invert(&mut self, invert: bool) {
        self.0.invert = invert;
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.0.title = title;
    }

    pub fn set_label_rotation(&mut self, degrees: f64) {
        self.0.label_rotation = degrees;
    }
}

/// Scale type of an axis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AxisKind {
    Linear,
    Logarithmic,
    Time,
    Category,
}

/// Which coordinate of a data point the axis carries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AxisRole {
    X,
    Y,
}

/// Side of the plot an axis is drawn on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AxisAlign {
    Top,
    Bottom,
    Left,
    Right,
}

impl AxisAlign {
    /// Whether the axis runs vertically along the plot
    pub fn is_vertical(&self) -> bool {
        matches!(self, AxisAlign::Left | AxisAlign::Right)
    }
}

/// Configuration for a single axis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub kind: AxisKind,
    pub role: AxisRole,
    pub align: AxisAlign,
    /// Reverse axis direction
    pub invert: bool,
    pub explicit_min: Option<f64>,
    pub explicit_max: Option<f64>,
    pub explicit_step: Option<f64>,
    pub zoom_min: Option<f64>,
    pub zoom_max: Option<f64>,
    /// Axis title
    pub title: Option<String>,
    pub visible: bool,
    /// Number format for tick labels (None = derived from the scale)
    pub number_format: Option<String>,
    /// Tick label rotation in degrees
    pub label_rotation: f64,
    /// Category axes: data points sit between tick marks
    pub between_ticks: bool,
    /// Category axes: drop slots where no series has a value
    pub hide_empty_categories: bool,
    /// Logarithmic axes: log base
    pub log_base: f64,
    /// Show major gridlines
    pub major_gridlines: bool,
}

impl Axis {
    /// Create an axis aligned bottom (X role) or left (Y role)
    pub fn new(name: impl Into<String>, kind: AxisKind, role: AxisRole) -> Self {
        Self {
            name: name.into(),
            kind,
            role,
            align: match role {
                AxisRole::X => AxisAlign::Bottom,
                AxisRole::Y => AxisAlign::Left,
            },
            invert: false,
            explicit_min: None,
            explicit_max: None,
            explicit_step: None,
            zoom_min: None,
            zoom_max: None,
            title: None,
            visible: true,
            number_format: None,
            label_rotation: 0.0,
            between_ticks: true,
            hide_empty_categories: false,
            log_base: 10.0,
            major_gridlines: role == AxisRole::Y,
        }
    }

    pub fn with_align(mut self, align: AxisAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.explicit_min = min;
        self.explicit_max = max;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.explicit_step = Some(step);
        self
    }

    pub fn with_zoom(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.zoom_min = min;
        self.zoom_max = max;
        self
    }

    pub fn with_number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = Some(format.into());
        self
    }

    pub fn with_label_rotation(mut self, degrees: f64) -> Self {
        self.label_rotation = degrees;
        self
    }

    pub fn with_gridlines(mut self, enabled: bool) -> Self {
        self.major_gridlines = enabled;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn on_ticks(mut self) -> Self {
        self.between_ticks = false;
        self
    }

    pub fn hiding_empty_categories(mut self) -> Self {
        self.hide_empty_categories = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Explicitly requested bounds and step
    pub fn requested(&self) -> ScaleRequest {
        ScaleRequest {
            min: self.explicit_min,
            max: self.explicit_max,
            step: self.explicit_step,
        }
    }
}

/// Chart kind of a series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeriesKind {
    /// Bars along a vertical category axis, see [`Chart::with_default_axes_for`]
    Bar,
    /// Vertical bars
    Column,
    Line,
    Area,
    Scatter,
    Bubble,
    Pie,
    Doughnut,
    /// Line whose category axis runs vertically
    Profile,
    Funnel,
}

/// Geometry family shared by several series kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum KindFamily {
    Bars,
    Lines,
    Areas,
    Points,
    Bubbles,
    Slices,
    Funnel,
}

impl SeriesKind {
    pub fn family(&self) -> KindFamily {
        match self {
            SeriesKind::Bar | SeriesKind::Column => KindFamily::Bars,
            SeriesKind::Line | SeriesKind::Profile => KindFamily::Lines,
            SeriesKind::Area => KindFamily::Areas,
            SeriesKind::Scatter => KindFamily::Points,
            SeriesKind::Bubble => KindFamily::Bubbles,
            SeriesKind::Pie | SeriesKind::Doughnut => KindFamily::Slices,
            SeriesKind::Funnel => KindFamily::Funnel,
        }
    }

    /// Pie and doughnut
    pub fn is_circular(&self) -> bool {
        self.family() == KindFamily::Slices
    }

    /// Kinds mapped through an X and a Y axis
    pub fn uses_axes(&self) -> bool {
        !matches!(self.family(), KindFamily::Slices | KindFamily::Funnel)
    }

    pub fn supports_stacking(&self) -> bool {
        matches!(
            self.family(),
            KindFamily::Bars | KindFamily::Lines | KindFamily::Areas
        )
    }

    /// Axis alignments a new chart of this kind starts with
    pub fn default_alignment(&self) -> (AxisAlign, AxisAlign) {
        match self {
            SeriesKind::Bar | SeriesKind::Profile => (AxisAlign::Left, AxisAlign::Bottom),
            _ => (AxisAlign::Bottom, AxisAlign::Left),
        }
    }

    /// Label position used when the label options do not set one
    pub fn default_label_position(&self) -> DataLabelPosition {
        match self.family() {
            KindFamily::Bars => DataLabelPosition::End,
            KindFamily::Lines | KindFamily::Points | KindFamily::Areas => DataLabelPosition::End,
            KindFamily::Bubbles | KindFamily::Funnel => DataLabelPosition::Center,
            KindFamily::Slices => DataLabelPosition::BehindEnd,
        }
    }
}

/// How a series accumulates with its neighbours
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Stacking {
    #[default]
    None,
    Stacked,
    /// 100% stacking: each category sums to one
    Relative,
}

/// A single data series in a chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    /// Name of the series (shown in legend)
    pub name: String,
    pub kind: SeriesKind,
    /// Key handed to the data source
    pub data_ref: String,
    pub visible: bool,
    pub x_axis: String,
    pub y_axis: String,
    pub stacking: Stacking,
    /// Optional data label configuration
    pub data_labels: Option<DataLabelOptions>,
    /// Pie/doughnut slice offset as a fraction of the radius
    pub explosion: f64,
}

impl Series {
    /// Create a visible series bound to the axes named "x" and "y"
    pub fn new(name: impl Into<String>, kind: SeriesKind, data_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            data_ref: data_ref.into(),
            visible: true,
            x_axis: "x".to_string(),
            y_axis: "y".to_string(),
            stacking: Stacking::None,
            data_labels: None,
            explosion: 0.0,
        }
    }

    pub fn with_axes(mut self, x_axis: impl Into<String>, y_axis: impl Into<String>) -> Self {
        self.x_axis = x_axis.into();
        self.y_axis = y_axis.into();
        self
    }

    pub fn with_stacking(mut self, stacking: Stacking) -> Self {
        self.stacking = stacking;
        self
    }

    /// Enable data labels
    pub fn with_data_labels(mut self, options: DataLabelOptions) -> Self {
        self.data_labels = Some(options);
        self
    }

    pub fn with_explosion(mut self, explosion: f64) -> Self {
        self.explosion = explosion;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Stacking mode that actually applies to this kind
    pub fn effective_stacking(&self) -> Stacking {
        if self.kind.supports_stacking() {
            self.stacking
        } else {
            Stacking::None
        }
    }
}

/// Options for displaying data labels on chart elements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLabelOptions {
    /// Show the value
    pub show_value: bool,
    /// Show the category name
    pub show_category: bool,
    /// Show the series name
    pub show_series_name: bool,
    /// Show as percentage (for pie charts)
    pub show_percent: bool,
    /// Number format string
    pub number_format: Option<String>,
    /// Label position; None uses the series kind's default
    pub position: Option<DataLabelPosition>,
    /// Rotation in degrees
    pub rotation: f64,
}

impl Default for DataLabelOptions {
    fn default() -> Self {
        Self {
            show_value: true,
            show_category: false,
            show_series_name: false,
            show_percent: false,
            number_format: None,
            position: None,
            rotation: 0.0,
        }
    }
}

impl DataLabelOptions {
    pub fn at(mut self, position: DataLabelPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn rotated(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }
}

/// Position of data labels relative to their anchor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataLabelPosition {
    /// Outside the start (base) of the element
    BeforeStart,
    /// Inside, next to the start
    Start,
    Center,
    /// Inside, next to the end (tip)
    End,
    /// Outside, past the end
    BehindEnd,
}

/// Chart title configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartTitle {
    /// Title text
    pub text: String,
    /// Position of the title
    pub position: TitlePosition,
    pub visible: bool,
    /// Rotation in degrees
    pub rotation: f64,
}

impl ChartTitle {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: TitlePosition::Top,
            visible: true,
            rotation: 0.0,
        }
    }
}

/// Position of the chart title
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TitlePosition {
    Top,
    Bottom,
    Left,
    Right,
}

/// Legend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Legend {
    /// Position of the legend
    pub position: LegendPosition,
    /// Whether the legend is visible
    pub visible: bool,
}

/// Position of the legend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LegendPosition {
    Top,
    Bottom,
    Left,
    Right,
}

impl Default for Legend {
    fn default() -> Self {
        Self {
            position: LegendPosition::Right,
            visible: true,
        }
    }
}

/// A host-supplied button drawn over the chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affordance {
    pub name: String,
    pub size: Size,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_builder() {
        let chart = Chart::with_default_axes("chart1")
            .with_title("Sales Data")
            .with_legend(LegendPosition::Bottom);

        assert_eq!(chart.id, "chart1");
        assert_eq!(chart.title.as_ref().unwrap().text, "Sales Data");
        assert_eq!(chart.legend.as_ref().unwrap().position, LegendPosition::Bottom);
        assert_eq!(chart.axis_count(), 2);
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let mut chart = Chart::with_default_axes("c");
        let err = chart
            .add_axis(Axis::new("y", AxisKind::Linear, AxisRole::Y))
            .unwrap_err();
        assert!(matches!(err, ChartError::DuplicateAxis(name) if name == "y"));
    }

    #[test]
    fn test_axis_name_resolution_falls_back_by_role() {
        let mut chart = Chart::with_default_axes("c");
        let y2 = chart
            .add_axis(Axis::new("y2", AxisKind::Linear, AxisRole::Y).with_align(AxisAlign::Right))
            .unwrap();

        assert_eq!(chart.resolve_axis("y2", AxisRole::Y), Some(y2));
        assert_eq!(chart.resolve_axis("missing", AxisRole::Y), Some(AxisId(1)));
        // "x" names an X axis, so a Y lookup falls back
        assert_eq!(chart.resolve_axis("x", AxisRole::Y), Some(AxisId(1)));
        assert_eq!(Chart::new("empty").resolve_axis("x", AxisRole::X), None);
    }

    #[test]
    fn test_series_visibility() {
        let mut chart = Chart::with_default_axes("c");
        let id = chart.add_series(Series::new("A", SeriesKind::Column, "a"));
        chart.set_series_visible(id, false).unwrap();
        assert!(!chart.series(id).unwrap().visible);
        assert!(chart.set_series_visible(SeriesId(9), true).is_err());
    }

    #[test]
    fn test_axis_edit_keeps_name() {
        let mut chart = Chart::with_default_axes("c");
        let mut axis = chart.axis_mut(AxisId(1)).unwrap();
        axis.set_zoom(Some(10.0), Some(20.0));
        assert_eq!(axis.name, "y");
        assert_eq!(chart.axis(AxisId(1)).unwrap().zoom_min, Some(10.0));
    }

    #[test]
    fn test_stacking_ignored_for_circular_kinds() {
        let pie = Series::new("P", SeriesKind::Pie, "p").with_stacking(Stacking::Stacked);
        assert_eq!(pie.effective_stacking(), Stacking::None);
        let col = Series::new("C", SeriesKind::Column, "c").with_stacking(Stacking::Relative);
        assert_eq!(col.effective_stacking(), Stacking::Relative);
    }

    #[test]
    fn test_kind_families() {
        assert!(SeriesKind::Doughnut.is_circular());
        assert!(!SeriesKind::Funnel.uses_axes());
        assert_eq!(SeriesKind::Profile.family(), KindFamily::Lines);
        assert_eq!(SeriesKind::Bar.default_alignment().0, AxisAlign::Left);
    }

    #[test]
    fn test_default_axes_follow_kind() {
        let bars = Chart::with_default_axes_for("c", SeriesKind::Bar);
        assert_eq!(bars.axis(AxisId(0)).unwrap().align, AxisAlign::Left);
        assert_eq!(bars.axis(AxisId(1)).unwrap().align, AxisAlign::Bottom);
        assert_eq!(bars.axis_by_name("y"), Some(AxisId(1)));

        let columns = Chart::with_default_axes("c");
        assert_eq!(columns.axis(AxisId(0)).unwrap().align, AxisAlign::Bottom);
        assert_eq!(columns.axis(AxisId(1)).unwrap().align, AxisAlign::Left);
    }
}

//! Chart engine - axis scaling, layout and hit testing for charts
//!
//! This crate provides support for:
//! - Describing charts with a strongly-typed model (axes and series in arenas)
//! - Auto-scaling linear, logarithmic, time and category axes
//! - Calculating chart layouts: title, legend, axes and plot area
//! - Mapping series data to bars, lines, areas, markers, bubbles, slices and funnel rows
//! - Positioning and formatting data labels
//! - Hit testing pointer positions against a layout
//!
//! Text measurement and number formatting are supplied by the host through
//! the [`TextMeasurer`] and [`NumberFormatter`] traits.

mod error;
mod geometry;
mod text;
mod format;
mod options;
mod time_scale;
mod data;
mod model;
mod scale;
mod mapper;
mod labels;
mod layout;

pub use error::*;
pub use geometry::*;
pub use text::*;
pub use format::*;
pub use options::*;
pub use time_scale::*;
pub use data::*;
pub use model::*;
pub use scale::*;
pub use mapper::*;
pub use labels::*;
pub use layout::*;
pub use hit_test::*;

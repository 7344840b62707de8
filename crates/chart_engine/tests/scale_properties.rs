//! Property-based invariant tests for axis scaling and stacking.
//!
//! 1. Linear scales cover integer and fractional data with a positive step and a
//!    bounded tick count.
//! 2. Category axes with N points and between-tick placement span [0, N].
//! 3. Relative stacking stays within [-1, 1].
//! 4. Explicit bounds always win over zoom and auto bounds.

use chart_engine::{
    resolve_bounds, Axis, AxisKind, AxisRole, AxisScaleCalculator, BoundSource, DataExtent,
    LayoutOptions, StackTable,
};
use proptest::prelude::*;

fn calculator() -> AxisScaleCalculator {
    AxisScaleCalculator::new(&LayoutOptions::default())
}

fn value_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        4 => (-1000i32..=1000).prop_map(|v| Some(v as f64)),
    ]
}

proptest! {
    #[test]
    fn linear_scale_covers_data(
        lo in -1_000_000i64..1_000_000,
        span in 1i64..1_000_000,
        pixels in 100.0f64..2000.0,
    ) {
        let (lo, hi) = (lo as f64, (lo + span) as f64);
        let axis = Axis::new("y", AxisKind::Linear, AxisRole::Y);
        let scale = calculator().auto_scale(
            &axis,
            &axis.requested(),
            &DataExtent::from_values([lo, hi]),
            pixels,
        );
        prop_assert!(scale.min <= lo, "min {} above data {}", scale.min, lo);
        prop_assert!(scale.max >= hi, "max {} below data {}", scale.max, hi);
        prop_assert!(scale.step > 0.0);
        prop_assert!((scale.max - scale.min) / scale.step <= 30.0 + 1e-9);
    }

    #[test]
    fn linear_scale_covers_fractional_data(
        lo in -1_000_000i64..1_000_000,
        span in 1i64..1_000_000,
        exponent in -15i32..=3,
        pixels in 100.0f64..2000.0,
    ) {
        let unit = 10f64.powi(exponent);
        let (lo, hi) = (lo as f64 * unit, (lo + span) as f64 * unit);
        let axis = Axis::new("y", AxisKind::Linear, AxisRole::Y);
        let scale = calculator().auto_scale(
            &axis,
            &axis.requested(),
            &DataExtent::from_values([lo, hi]),
            pixels,
        );
        // Bounds are snapped to the step's decimals, so allow float noise
        let slack = |v: f64| v.abs() * 1e-12 + scale.step * 1e-9;
        prop_assert!(scale.step > 0.0);
        prop_assert!(scale.min <= lo + slack(lo), "min {} above data {}", scale.min, lo);
        prop_assert!(scale.max >= hi - slack(hi), "max {} below data {}", scale.max, hi);
        prop_assert!((scale.max - scale.min) / scale.step <= 30.0 + 1e-6);
        let ticks = scale.ticks();
        prop_assert!(ticks.len() >= 2);
        prop_assert!(ticks.windows(2).all(|w| w[0] < w[1]));
    }
}

proptest! {
    #[test]
    fn category_scale_spans_point_count(count in 1usize..500, pixels in 100.0f64..2000.0) {
        let axis = Axis::new("x", AxisKind::Category, AxisRole::X);
        let extent = DataExtent {
            slots: count,
            ..DataExtent::empty()
        };
        let scale = calculator().auto_scale(&axis, &axis.requested(), &extent, pixels);
        prop_assert_eq!(scale.min, 0.0);
        prop_assert_eq!(scale.max, count as f64);
    }
}

proptest! {
    #[test]
    fn relative_stacking_is_bounded(
        members in prop::collection::vec(prop::collection::vec(value_strategy(), 1..20), 1..6),
    ) {
        let table = StackTable::build(members.clone());
        for (low, high) in table.extent(true) {
            prop_assert!((-1.0 - 1e-12..=0.0).contains(&low), "low {}", low);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&high), "high {}", high);
        }
        for (member, values) in members.iter().enumerate() {
            for (index, value) in values.iter().enumerate() {
                let Some(value) = value else { continue };
                let stack = table.value(member, index, true);
                prop_assert!(stack.is_some());
                let top = stack.map(|s| s.apply(*value)).unwrap_or(0.0);
                prop_assert!((-1.0..=1.0).contains(&top));
            }
        }
    }
}

proptest! {
    #[test]
    fn explicit_bound_wins(
        auto in -100.0f64..100.0,
        zoom in prop::option::of(-100.0f64..100.0),
        explicit in -100.0f64..100.0,
    ) {
        let (min, _) = resolve_bounds((auto, auto + 1.0), (zoom, None), (Some(explicit), None));
        prop_assert_eq!(min.value, explicit);
        prop_assert_eq!(min.source, BoundSource::Explicit);
    }
}

#[test]
fn known_step_for_zero_to_97() {
    let axis = Axis::new("y", AxisKind::Linear, AxisRole::Y);
    let scale = calculator().auto_scale(
        &axis,
        &axis.requested(),
        &DataExtent::from_values([0.0, 97.0]),
        1000.0,
    );
    assert!([10.0, 20.0, 50.0].contains(&scale.step), "step {}", scale.step);
    assert!(scale.max >= 97.0);
    let multiple = scale.max / scale.step;
    assert!((multiple - multiple.round()).abs() < 1e-9);
}

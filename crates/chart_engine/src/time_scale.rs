//! Date/time axes
//!
//! Values on time axes are spreadsheet serial days: whole days since
//! 1899-12-30 with the time of day as the fraction. Scaling picks a calendar
//! unit and a multiplier from a fixed list, aligns auto bounds to that unit
//! and walks ticks with `chrono` so months and years land on their first day.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Serial days outside this window are not representable as calendar dates
const MIN_SERIAL: f64 = -693_000.0;
const MAX_SERIAL: f64 = 2_958_465.0;

fn epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Milliseconds since the epoch, for serials inside the calendar window
fn serial_millis(serial: f64) -> Option<i64> {
    if !serial.is_finite() || !(MIN_SERIAL..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    Some((serial * MILLIS_PER_DAY).round() as i64)
}

/// Convert a serial day to a date-time, rounded to the millisecond
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let millis = serial_millis(serial)?;
    epoch()?.checked_add_signed(Duration::milliseconds(millis))
}

/// Convert a date-time to a serial day
pub fn datetime_to_serial(datetime: NaiveDateTime) -> f64 {
    epoch()
        .map(|epoch| (datetime - epoch).num_milliseconds() as f64 / MILLIS_PER_DAY)
        .unwrap_or(0.0)
}

/// Granularity of a time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl TimeUnit {
    /// Finest first
    const FINE_TO_COARSE: [TimeUnit; 7] = [
        TimeUnit::Millisecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Month,
        TimeUnit::Year,
    ];

    /// Length of one unit in days (average for months and years)
    pub fn approx_days(&self) -> f64 {
        match self {
            TimeUnit::Year => 365.25,
            TimeUnit::Month => 30.4375,
            TimeUnit::Day => 1.0,
            TimeUnit::Hour => 1.0 / 24.0,
            TimeUnit::Minute => 1.0 / 1_440.0,
            TimeUnit::Second => 1.0 / 86_400.0,
            TimeUnit::Millisecond => 1.0 / MILLIS_PER_DAY,
        }
    }

    /// Allowed tick multipliers of this unit
    pub fn multipliers(&self) -> &'static [u32] {
        match self {
            TimeUnit::Year => &[1, 2, 5, 10, 20, 50, 100, 200, 500, 1000],
            TimeUnit::Month => &[1, 2, 3, 6],
            TimeUnit::Day => &[1, 2, 7, 14],
            TimeUnit::Hour => &[1, 2, 3, 6, 12],
            TimeUnit::Minute | TimeUnit::Second => &[1, 2, 5, 10, 15, 30],
            TimeUnit::Millisecond => &[1, 2, 5, 10, 20, 50, 100, 200, 500],
        }
    }

    /// Label format used when the axis has none
    pub fn default_format(&self) -> &'static str {
        match self {
            TimeUnit::Year => "yyyy",
            TimeUnit::Month => "mmm yyyy",
            TimeUnit::Day => "dd/mm/yyyy",
            TimeUnit::Hour | TimeUnit::Minute => "hh:mm",
            TimeUnit::Second => "hh:mm:ss",
            TimeUnit::Millisecond => "hh:mm:ss.000",
        }
    }

    fn is_calendar(&self) -> bool {
        matches!(self, TimeUnit::Year | TimeUnit::Month)
    }

    /// Fixed-length units in whole milliseconds
    fn millis(&self) -> i64 {
        (self.approx_days() * MILLIS_PER_DAY).round() as i64
    }
}

/// Unit and multiplier chosen for a time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStep {
    pub unit: TimeUnit,
    pub multiple: u32,
}

impl TimeStep {
    /// Step length in days (average for calendar units)
    pub fn days(&self) -> f64 {
        self.unit.approx_days() * self.multiple as f64
    }

    /// Pick the finest step whose bucket count fits `max_labels`
    pub fn choose(range_days: f64, max_labels: f64) -> TimeStep {
        let max_labels = max_labels.max(1.0);
        for unit in TimeUnit::FINE_TO_COARSE {
            for &multiple in unit.multipliers() {
                let step = TimeStep { unit, multiple };
                if range_days / step.days() <= max_labels {
                    return step;
                }
            }
        }
        // Longer than a thousand years per label: widen by powers of ten
        let mut multiple = 1000u32;
        while range_days / (TimeUnit::Year.approx_days() * multiple as f64) > max_labels
            && multiple < 1_000_000
        {
            multiple *= 10;
        }
        TimeStep {
            unit: TimeUnit::Year,
            multiple,
        }
    }

    /// Round a serial day down to a step boundary
    pub fn floor(&self, serial: f64) -> f64 {
        self.align(serial, false)
    }

    /// Round a serial day up to a step boundary
    pub fn ceil(&self, serial: f64) -> f64 {
        self.align(serial, true)
    }

    fn align(&self, serial: f64, up: bool) -> f64 {
        if !self.unit.is_calendar() {
            let Some(millis) = serial_millis(serial) else {
                return serial;
            };
            let bucket = self.unit.millis() * self.multiple as i64;
            let floored = millis.div_euclid(bucket) * bucket;
            let aligned = if up && floored < millis {
                floored + bucket
            } else {
                floored
            };
            return aligned as f64 / MILLIS_PER_DAY;
        }

        let Some(datetime) = serial_to_datetime(serial) else {
            return serial;
        };
        let multiple = self.multiple as i32;
        let (year, month0) = match self.unit {
            TimeUnit::Year => (datetime.year() - datetime.year().rem_euclid(multiple), 0),
            _ => {
                let months = datetime.year() * 12 + datetime.month0() as i32;
                let floored = months - months.rem_euclid(multiple);
                (floored.div_euclid(12), floored.rem_euclid(12) as u32)
            }
        };
        let Some(floored) = NaiveDate::from_ymd_opt(year, month0 + 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        else {
            return serial;
        };
        let aligned = if up && floored < datetime {
            self.advance(floored, 1).unwrap_or(floored)
        } else {
            floored
        };
        datetime_to_serial(aligned)
    }

    /// Move a calendar date forward by `count` steps
    fn advance(&self, from: NaiveDateTime, count: u32) -> Option<NaiveDateTime> {
        let months = match self.unit {
            TimeUnit::Year => count.checked_mul(self.multiple)?.checked_mul(12)?,
            _ => count.checked_mul(self.multiple)?,
        };
        from.checked_add_months(Months::new(months))
    }

    /// Tick positions from `min` to `max` inclusive, at most `cap` values
    pub fn ticks(&self, min: f64, max: f64, cap: usize) -> Vec<f64> {
        let mut ticks = Vec::new();
        if self.unit.is_calendar() {
            let Some(start) = serial_to_datetime(min) else {
                return ticks;
            };
            for i in 0..cap as u32 {
                let Some(next) = self.advance(start, i) else {
                    break;
                };
                let serial = datetime_to_serial(next);
                if serial > max + 1e-9 {
                    break;
                }
                ticks.push(serial);
            }
        } else if let (Some(start), Some(end)) = (serial_millis(min), serial_millis(max)) {
            let bucket = self.unit.millis() * self.multiple as i64;
            for i in 0..cap as i64 {
                let Some(millis) = i.checked_mul(bucket).and_then(|o| start.checked_add(o)) else {
                    break;
                };
                if millis > end {
                    break;
                }
                ticks.push(millis as f64 / MILLIS_PER_DAY);
            }
        } else {
            // Outside the calendar window ticks are plain multiples of the step
            let days = self.days();
            for i in 0..cap {
                let serial = min + i as f64 * days;
                if !serial.is_finite() || serial > max || ticks.last() == Some(&serial) {
                    break;
                }
                ticks.push(serial);
            }
        }
        ticks
    }
}

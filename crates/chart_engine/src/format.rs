//! Number and date formatting hook
//!
//! Axis tick labels and data labels are turned into text through a
//! [`NumberFormatter`]. Locale-aware formatting belongs to the host;
//! [`BasicNumberFormatter`] covers the format codes the engine itself emits
//! (`General`, fixed decimals, percentages, thousands grouping and the date
//! codes attached to time axes) and ignores the locale tag.

use crate::time_scale::serial_to_datetime;
use chrono::Timelike;

/// Format code used when neither the point, the label options nor the axis carry one
pub const GENERAL_FORMAT: &str = "General";

/// Turns a value into display text
pub trait NumberFormatter {
    fn format_number(&self, format: &str, value: f64, locale: &str) -> String;
}

/// Spreadsheet-style formatter for the codes produced by auto-scaling
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicNumberFormatter;

impl NumberFormatter for BasicNumberFormatter {
    fn format_number(&self, format: &str, value: f64, _locale: &str) -> String {
        if !value.is_finite() {
            return String::new();
        }
        let format = format.trim();
        if format.is_empty() || format.eq_ignore_ascii_case(GENERAL_FORMAT) {
            return format_general(value);
        }
        if is_date_format(format) {
            return format_date(format, value);
        }
        format_numeric(format, value)
    }
}

fn format_general(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{:.9}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn is_date_format(format: &str) -> bool {
    let mut in_quotes = false;
    for c in format.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            // Letters after a digit placeholder are a unit suffix, as in `0.0 ms`
            '0' | '#' | '?' => return false,
            'y' | 'Y' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' | 'm' | 'M' => return true,
            _ => {}
        }
    }
    false
}

/// Decimal count, percent and grouping of a numeric code such as `#,##0.00%`
fn format_numeric(format: &str, value: f64) -> String {
    let percent = format.contains('%');
    let grouping = format.contains(',');
    let decimals = format
        .split_once('.')
        .map(|(_, frac)| frac.chars().take_while(|c| *c == '0' || *c == '#').count())
        .unwrap_or(0);

    let scaled = if percent { value * 100.0 } else { value };
    let mut text = format!("{:.*}", decimals, scaled);
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text.remove(0);
    }
    if grouping {
        text = group_thousands(&text);
    }
    if percent {
        text.push('%');
    }
    if let Some(end) = format.rfind(|c: char| matches!(c, '0' | '#' | '?' | '.' | ',' | '%')) {
        text.push_str(&format[end + 1..].replace('"', ""));
    }
    text
}

fn group_thousands(text: &str) -> String {
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (rest, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DateToken {
    Field(char, usize),
    Fraction(usize),
    Literal(String),
}

fn tokenize_date(format: &str) -> Vec<DateToken> {
    let chars: Vec<char> = format.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i].to_ascii_lowercase();
        match c {
            'y' | 'm' | 'd' | 'h' | 's' => {
                let start = i;
                while i < chars.len() && chars[i].to_ascii_lowercase() == c {
                    i += 1;
                }
                tokens.push(DateToken::Field(c, i - start));
            }
            '.' if i + 1 < chars.len()
                && chars[i + 1] == '0'
                && matches!(tokens.last(), Some(DateToken::Field('s', _))) =>
            {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] == '0' {
                    i += 1;
                }
                tokens.push(DateToken::Fraction(i - start));
            }
            '"' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != '"' {
                    i += 1;
                }
                tokens.push(DateToken::Literal(chars[start..i].iter().collect()));
                i += 1;
            }
            _ => {
                tokens.push(DateToken::Literal(chars[i].to_string()));
                i += 1;
            }
        }
    }
    tokens
}

/// `m` means minutes right after an hour field or right before a seconds field
fn is_minute(tokens: &[DateToken], index: usize) -> bool {
    let previous = tokens[..index].iter().rev().find_map(|t| match t {
        DateToken::Field(c, _) => Some(*c),
        _ => None,
    });
    let next = tokens[index + 1..].iter().find_map(|t| match t {
        DateToken::Field(c, _) => Some(*c),
        _ => None,
    });
    previous == Some('h') || next == Some('s')
}

fn format_date(format: &str, serial: f64) -> String {
    let Some(datetime) = serial_to_datetime(serial) else {
        return format_general(serial);
    };
    let tokens = tokenize_date(format);
    let mut out = String::new();
    for (index, token) in tokens.iter().enumerate() {
        let spec = match token {
            DateToken::Literal(text) => {
                out.push_str(text);
                continue;
            }
            DateToken::Fraction(digits) => {
                let millis = datetime.nanosecond() / 1_000_000;
                let fraction = format!("{:03}", millis);
                out.push('.');
                out.push_str(&fraction[..(*digits).min(3)]);
                continue;
            }
            DateToken::Field('y', len) => {
                if *len >= 3 {
                    "%Y"
                } else {
                    "%y"
                }
            }
            DateToken::Field('m', len) if is_minute(&tokens, index) => {
                if *len >= 2 {
                    "%M"
                } else {
                    "%-M"
                }
            }
            DateToken::Field('m', len) => match len {
                1 => "%-m",
                2 => "%m",
                3 => "%b",
                _ => "%B",
            },
            DateToken::Field('d', len) => match len {
                1 => "%-d",
                2 => "%d",
                3 => "%a",
                _ => "%A",
            },
            DateToken::Field('h', len) => {
                if *len >= 2 {
                    "%H"
                } else {
                    "%-H"
                }
            }
            DateToken::Field(_, len) => {
                if *len >= 2 {
                    "%S"
                } else {
                    "%-S"
                }
            }
        };
        out.push_str(&datetime.format(spec).to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(format: &str, value: f64) -> String {
        BasicNumberFormatter.format_number(format, value, "en-US")
    }

    #[test]
    fn test_general() {
        assert_eq!(fmt("General", 42.0), "42");
        assert_eq!(fmt("", 0.25), "0.25");
        assert_eq!(fmt("General", -1.5), "-1.5");
        assert_eq!(fmt("General", f64::NAN), "");
    }

    #[test]
    fn test_fixed_decimals() {
        assert_eq!(fmt("0", 12.6), "13");
        assert_eq!(fmt("0.00", 3.14159), "3.14");
        assert_eq!(fmt("0.0", -0.01), "0.0");
    }

    #[test]
    fn test_percent_and_grouping() {
        assert_eq!(fmt("0%", 0.25), "25%");
        assert_eq!(fmt("0.0%", -0.5), "-50.0%");
        assert_eq!(fmt("#,##0", 1234567.0), "1,234,567");
        assert_eq!(fmt("#,##0.00", -1234.5), "-1,234.50");
    }

    #[test]
    fn test_unit_suffix_is_not_a_date() {
        assert!(!is_date_format("0.0 ms"));
        assert!(!is_date_format("#,##0 days"));
        assert!(is_date_format("hh:mm:ss.000"));
        assert_eq!(fmt("0.0 ms", 12.34), "12.3 ms");
        assert_eq!(fmt("#,##0 days", 1500.0), "1,500 days");
        assert_eq!(fmt("0.00 \"kg\"", 2.5), "2.50 kg");
    }

    #[test]
    fn test_date_codes() {
        // 2024-03-05 is serial day 45356
        assert_eq!(fmt("yyyy", 45356.0), "2024");
        assert_eq!(fmt("dd/mm/yyyy", 45356.0), "05/03/2024");
        assert_eq!(fmt("mmm yyyy", 45356.0), "Mar 2024");
        assert_eq!(fmt("hh:mm", 45356.75), "18:00");
        assert_eq!(fmt("hh:mm:ss", 45356.5 + 1.0 / 86_400.0), "12:00:01");
    }

    #[test]
    fn test_minute_disambiguation() {
        let tokens = tokenize_date("hh:mm");
        assert!(is_minute(&tokens, 2));
        let tokens = tokenize_date("mm/yyyy");
        assert!(!is_minute(&tokens, 0));
    }
}

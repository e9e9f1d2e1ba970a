use chrono::{TimeZone, Utc};

use crate::series::Mode;

/// Value chip / legend text. `--` when the model has nothing to show.
pub fn format_value(value: Option<f64>, mode: Mode) -> String {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return "--".to_string();
    };
    match mode {
        Mode::Percent => format!("{}{:.1}%", if v >= 0.0 { "+" } else { "" }, v),
        Mode::Absolute => format!("${}", group_thousands(&format!("{:.2}", v))),
    }
}

pub fn format_axis_tick(value: f64, mode: Mode) -> String {
    match mode {
        Mode::Percent => format!("{:.1}%", value),
        Mode::Absolute => format!("${}", group_thousands(&format!("{}", value.round() as i64))),
    }
}

pub fn format_tooltip(value: f64, mode: Mode) -> String {
    match mode {
        Mode::Percent => format!("{:.2}%", value),
        Mode::Absolute => format!("${:.2}", value),
    }
}

/// Starting capital line in dollars, break-even line in percent.
pub fn reference_line(mode: Mode) -> f64 {
    match mode {
        Mode::Absolute => 10_000.0,
        Mode::Percent => 0.0,
    }
}

/// `MM-dd HH:mm` for the time axis.
pub fn format_axis_time(ts_ms: i64) -> String {
    Utc.timestamp_millis_opt(ts_ms)
        .single()
        .map(|t| t.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// `yyyy-MM-dd HH:mm` for tooltip headers.
pub fn format_tooltip_time(ts_ms: i64) -> String {
    Utc.timestamp_millis_opt(ts_ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Insert `,` every three digits of the integer part of a plain decimal string.
fn group_thousands(num: &str) -> String {
    let (sign, rest) = match num.strip_prefix('-') {
        Some(r) => ("-", r),
        None => ("", num),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

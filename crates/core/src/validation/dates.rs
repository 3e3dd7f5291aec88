//! Date parsing and `before`/`after` operand resolution.

use chrono::{DateTime, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::RuleError;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Parse a date or date-time string. Date-only input lands on midnight.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Resolve a `before`/`after` operand to a point in time.
///
/// Accepted, in order: `today`/`tomorrow`/`yesterday`, a relative
/// expression `±N unit` (unit ∈ day(s), month(s), year(s)) applied to
/// `now`, the current value of another field (looked up through
/// `other_field`), and finally a literal date.
pub fn resolve_operand(
    operand: &str,
    now: NaiveDateTime,
    other_field: impl Fn(&str) -> Option<String>,
) -> Result<NaiveDateTime, RuleError> {
    let operand = operand.trim();
    let today = now.date().and_time(NaiveTime::MIN);
    match operand {
        "today" => return Ok(today),
        "tomorrow" => return today.checked_add_days(Days::new(1)).ok_or_else(|| invalid(operand)),
        "yesterday" => return today.checked_sub_days(Days::new(1)).ok_or_else(|| invalid(operand)),
        _ => {}
    }

    if let Some(relative) = parse_relative(operand) {
        return relative.apply(now).ok_or_else(|| invalid(operand));
    }

    if let Some(value) = other_field(operand).filter(|v| !v.trim().is_empty()) {
        return parse_date(&value).ok_or(RuleError::InvalidDate(value));
    }

    parse_date(operand).ok_or_else(|| invalid(operand))
}

fn invalid(operand: &str) -> RuleError {
    RuleError::InvalidDate(operand.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Day,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Relative {
    forward: bool,
    amount: u32,
    unit: Unit,
}

impl Relative {
    fn apply(self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match (self.unit, self.forward) {
            (Unit::Day, true) => now.checked_add_days(Days::new(u64::from(self.amount))),
            (Unit::Day, false) => now.checked_sub_days(Days::new(u64::from(self.amount))),
            (unit, forward) => {
                let months = if unit == Unit::Year {
                    self.amount.checked_mul(12)?
                } else {
                    self.amount
                };
                if forward {
                    now.checked_add_months(Months::new(months))
                } else {
                    now.checked_sub_months(Months::new(months))
                }
            }
        }
    }
}

fn parse_relative(text: &str) -> Option<Relative> {
    let (forward, rest) = if let Some(rest) = text.strip_prefix('+') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('-') {
        (false, rest)
    } else {
        return None;
    };
    let mut parts = rest.split_whitespace();
    let amount = parts.next()?.parse::<u32>().ok()?;
    let unit = match parts.next()? {
        "day" | "days" => Unit::Day,
        "month" | "months" => Unit::Month,
        "year" | "years" => Unit::Year,
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(Relative {
        forward,
        amount,
        unit,
    })
}

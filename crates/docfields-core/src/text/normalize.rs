//! Type-aware value normalisation.

use std::str::FromStr;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use crate::schema::FieldType;

lazy_static! {
    // 2024-01-15, 2024/1/5, 2024.01.15, 2024年1月15日, optionally with a time
    static ref DATE_YMD: Regex = Regex::new(
        r"^(\d{4})\s*[-/.年]\s*(\d{1,2})\s*[-/.月]\s*(\d{1,2})\s*日?(?:[ T]\d{1,2}:\d{2}(?::\d{2})?\S*)?$"
    ).unwrap();

    // 15.01.2024, 15/01/2024, 15-01-2024
    static ref DATE_DMY: Regex = Regex::new(
        r"^(\d{1,2})[./\-](\d{1,2})[./\-](\d{4})$"
    ).unwrap();

    // One contiguous numeric run; anything around it must be digit-free
    static ref NUMERIC_RUN: Regex = Regex::new(
        r"-?\d[\d\s.,，\u{00a0}']*"
    ).unwrap();
}

/// Normalise a raw value for a field of type `field_type`.
///
/// Values that do not parse are returned trimmed.
pub fn normalize_value(field_type: FieldType, raw: &str) -> String {
    let trimmed = raw.trim();
    let normalized = match field_type {
        FieldType::Text => None,
        FieldType::Date => parse_date(trimmed).map(|d| d.format("%Y-%m-%d").to_string()),
        FieldType::Amount => parse_amount(trimmed).map(|mut d| {
            if d.scale() < 2 {
                d.rescale(2);
            }
            d.to_string()
        }),
        FieldType::Number | FieldType::Decimal => parse_amount(trimmed).map(|d| d.to_string()),
    };
    normalized.unwrap_or_else(|| trimmed.to_string())
}

/// Parse a date in one of the supported layouts.
///
/// Slashed and dotted dates are read day-first, then month-first.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    if let Some(caps) = DATE_YMD.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DATE_DMY.captures(text) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, second, first)
            .or_else(|| NaiveDate::from_ymd_opt(year, first, second));
    }

    None
}

/// Parse an amount, tolerating currency marks and grouping separators.
///
/// `1 234,56`, `1.234,56`, `1,234.56`, `￥1,234.56`, `1234.56元` all parse
/// to `1234.56`.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let mut runs = NUMERIC_RUN.find_iter(text);
    let run = runs.next()?;
    if runs.next().is_some() {
        return None;
    }

    let body: String = run
        .as_str()
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .map(|c| if c == '，' { ',' } else { c })
        .collect();

    let plain = match (body.rfind('.'), body.rfind(',')) {
        (Some(dot), Some(comma)) => {
            if dot > comma {
                body.replace(',', "")
            } else {
                body.replace('.', "").replace(',', ".")
            }
        }
        (None, Some(comma)) => {
            let decimals = body.len() - comma - 1;
            if body.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                body.replace(',', ".")
            } else {
                body.replace(',', "")
            }
        }
        (Some(_), None) if body.matches('.').count() > 1 => body.replace('.', ""),
        _ => body,
    };

    let plain = plain.trim_end_matches('.');
    Decimal::from_str(plain).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("2024/1/15"), expected);
        assert_eq!(parse_date("2024年1月15日"), expected);
        assert_eq!(parse_date("15.01.2024"), expected);
        assert_eq!(parse_date("15/01/2024"), expected);
        assert_eq!(parse_date("2024-01-15T10:30:00Z"), expected);
        // month-first when day-first is impossible
        assert_eq!(parse_date("01/15/2024"), expected);
    }

    #[test]
    fn test_parse_date_rejects_invalid() {
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("next friday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_amount() {
        let expected = Decimal::from_str("1234.56").ok();
        assert_eq!(parse_amount("1 234,56"), expected);
        assert_eq!(parse_amount("1.234,56"), expected);
        assert_eq!(parse_amount("1,234.56"), expected);
        assert_eq!(parse_amount("￥1,234.56"), expected);
        assert_eq!(parse_amount("1234.56元"), expected);
        assert_eq!(parse_amount("1234.56 PLN"), expected);
        assert_eq!(parse_amount("1,234,567"), Decimal::from_str("1234567").ok());
        assert_eq!(parse_amount("-12.5"), Decimal::from_str("-12.5").ok());
    }

    #[test]
    fn test_parse_amount_rejects_mixed_text() {
        assert_eq!(parse_amount("INV-2024-001"), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value(FieldType::Date, " 2024年1月5日 "), "2024-01-05");
        assert_eq!(normalize_value(FieldType::Amount, "￥1,000"), "1000.00");
        assert_eq!(normalize_value(FieldType::Amount, "1000.00"), "1000.00");
        assert_eq!(normalize_value(FieldType::Decimal, "1,000.5"), "1000.5");
        assert_eq!(normalize_value(FieldType::Number, "42"), "42");
        assert_eq!(normalize_value(FieldType::Text, "  ACME Ltd "), "ACME Ltd");
        assert_eq!(normalize_value(FieldType::Date, "soon"), "soon");
    }
}

// Date reading for the registration column and the payment column labels.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::config::Cell;

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y", "%d %B %Y",
    "%b %d, %Y", "%B %d, %Y",
];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
];

// Spreadsheet serial numbers above this value are past the year 9999.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// The years a spreadsheet can store as dates.
const EXCEL_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

fn in_excel_range(d: NaiveDate) -> Option<NaiveDate> {
    if EXCEL_YEARS.contains(&d.year()) {
        Some(d)
    } else {
        None
    }
}

/// Reads a cell as a date. Returns None for anything that is not a date,
/// including dates outside the years 1900 to 9999.
pub fn parse_date_cell(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => in_excel_range(*d),
        Cell::Number(x) => from_excel_serial(*x),
        Cell::Text(s) => parse_date_text(s),
        Cell::Bool(_) | Cell::Empty => None,
    }
}

/// Converts a spreadsheet serial day number (days since 1899-12-30) to a date.
/// The time of day, if any, is dropped.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch
        .checked_add_signed(Duration::days(serial.floor() as i64))
        .and_then(in_excel_range)
}

pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| parse_day_month_year(s))
        .and_then(in_excel_range)
}

// "15 Januari 2024", "1 Agustus 2023"
fn parse_day_month_year(s: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    match tokens.as_slice() {
        [day, month, year] => {
            let day: u32 = day.parse().ok()?;
            let month = month_from_name(month)?;
            let year: i32 = year.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        _ => None,
    }
}

/// The month number of an English or Indonesian month name or abbreviation.
///
/// Only whole names and their usual abbreviations are accepted: `MARKET` or
/// `DESA` are not months.
pub fn month_from_name(token: &str) -> Option<u32> {
    let t = token.trim_matches(|c: char| !c.is_alphabetic()).to_uppercase();
    let month = match t.as_str() {
        "JAN" | "JANUARY" | "JANUARI" => 1,
        "FEB" | "PEB" | "FEBRUARY" | "FEBRUARI" | "PEBRUARI" => 2,
        "MAR" | "MARCH" | "MARET" => 3,
        "APR" | "APRIL" => 4,
        "MAY" | "MEI" => 5,
        "JUN" | "JUNE" | "JUNI" => 6,
        "JUL" | "JULY" | "JULI" => 7,
        "AUG" | "AGU" | "AGS" | "AUGUST" | "AGUSTUS" => 8,
        "SEP" | "SEPT" | "SEPTEMBER" => 9,
        "OCT" | "OKT" | "OCTOBER" | "OKTOBER" => 10,
        "NOV" | "NOPEMBER" | "NOVEMBER" => 11,
        "DEC" | "DES" | "DECEMBER" | "DESEMBER" => 12,
        _ => return None,
    };
    Some(month)
}

/// Finds the month a payment column refers to, from its label.
///
/// Accepts a month name next to a four-digit year (`JAN 2024`,
/// `PEMBAYARAN MARET 2024`), `2024-03`, `03/2024` and the labels of date
/// header cells (`2024-03-01 00:00:00`). The result is the first day of that
/// month.
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = label
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|t| !t.is_empty())
        .collect();

    let year = tokens.iter().find_map(|t| parse_year(t));
    let month = tokens.iter().find_map(|t| month_from_name(t));
    if let (Some(year), Some(month)) = (year, month) {
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    tokens.iter().find_map(|t| parse_numeric_month(t))
}

fn parse_year(token: &str) -> Option<i32> {
    if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

fn parse_numeric_month(token: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = token.split(['-', '/', '.']).collect();
    let (year, month) = match parts.as_slice() {
        [a, b] if a.len() == 4 => (parse_year(a)?, b.parse::<u32>().ok()?),
        [a, b] if b.len() == 4 => (parse_year(b)?, a.parse::<u32>().ok()?),
        [a, b, day] if a.len() == 4 && day.len() <= 2 && day.parse::<u32>().is_ok() => {
            (parse_year(a)?, b.parse::<u32>().ok()?)
        }
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn text_dates() {
        assert_eq!(parse_date_text("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date_text("2024-01-15 00:00:00"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date_text("2024/02/29"), Some(ymd(2024, 2, 29)));
        assert_eq!(parse_date_text("15/01/2024"), Some(ymd(2024, 1, 15)));
        // Month first when ambiguous.
        assert_eq!(parse_date_text("01/02/2024"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_date_text("15 Januari 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date_text("3 Aug 2023"), Some(ymd(2023, 8, 3)));
    }

    #[test]
    fn malformed_dates_are_missing() {
        assert_eq!(parse_date_text(""), None);
        assert_eq!(parse_date_text("not a date"), None);
        assert_eq!(parse_date_text("2024-13-40"), None);
        assert_eq!(parse_date_cell(&Cell::Bool(true)), None);
        assert_eq!(parse_date_cell(&Cell::Empty), None);
        assert_eq!(parse_date_cell(&Cell::Number(-3.0)), None);
        assert_eq!(parse_date_cell(&Cell::Number(f64::NAN)), None);
    }

    #[test]
    fn dates_before_1900_are_missing() {
        assert_eq!(parse_date_text("1850-03-01"), None);
        assert_eq!(parse_date_text("0224-01-15"), None);
        assert_eq!(parse_date_text("1 Januari 1899"), None);
        assert_eq!(parse_date_cell(&Cell::Date(ymd(1850, 3, 1))), None);
        assert_eq!(from_excel_serial(1.0), None);
        assert_eq!(from_excel_serial(2.0), Some(ymd(1900, 1, 1)));
        assert_eq!(parse_date_text("1900-01-01"), Some(ymd(1900, 1, 1)));
    }

    #[test]
    fn serial_numbers() {
        assert_eq!(from_excel_serial(45306.0), Some(ymd(2024, 1, 15)));
        assert_eq!(from_excel_serial(45306.75), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date_cell(&Cell::Number(45292.0)), Some(ymd(2024, 1, 1)));
    }

    #[test]
    fn month_labels() {
        assert_eq!(parse_month_label("JAN 2024"), Some(ymd(2024, 1, 1)));
        assert_eq!(parse_month_label("MARET 2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_month_label("SETORAN AGUSTUS 2023"), Some(ymd(2023, 8, 1)));
        assert_eq!(parse_month_label("DES_2025"), Some(ymd(2025, 12, 1)));
        assert_eq!(parse_month_label("2024-11"), Some(ymd(2024, 11, 1)));
        assert_eq!(parse_month_label("05/2024"), Some(ymd(2024, 5, 1)));
        assert_eq!(parse_month_label("PAJAK 2024"), None);
    }

    #[test]
    fn month_labels_from_date_headers() {
        assert_eq!(parse_month_label("2024-03-01 00:00:00"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_month_label("2024-11-01"), Some(ymd(2024, 11, 1)));
        assert_eq!(parse_month_label("2024-13-01 00:00:00"), None);
    }

    #[test]
    fn words_starting_like_months() {
        assert_eq!(month_from_name("MARKET"), None);
        assert_eq!(month_from_name("DESA"), None);
        assert_eq!(month_from_name("SEPARATE"), None);
        assert_eq!(month_from_name("Sept"), Some(9));
        assert_eq!(month_from_name("Agustus"), Some(8));
        assert_eq!(parse_month_label("MARKET 2024"), None);
        assert_eq!(parse_month_label("DESA SEPARATE JAN 2024"), Some(ymd(2024, 1, 1)));
    }
}

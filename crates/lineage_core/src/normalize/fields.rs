//! Field-level mapping helpers for raw records.
//!
//! # Responsibility
//! - Canonicalize heterogeneous field names to one alias table.
//! - Convert untyped cell values into strict scalar types.
//!
//! # Invariants
//! - Helpers are pure; they never log raw values.

use crate::config::SourceFormat;
use crate::normalize::RawRecord;
use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid key regex"));
static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})([-/])(\d{1,2})([-/])(\d{1,2})(?:[T ].*)?$").expect("valid date regex")
});
static ID_LIST_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[;,|]").expect("valid id list regex"));

/// Excel serial day 0 in the 1900 date system (includes the 1900 leap bug).
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// Serial values outside this range are not plausible birth dates.
const EXCEL_SERIAL_RANGE: std::ops::RangeInclusive<i64> = 1..=2_958_465;

/// Canonical person field a raw key maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PersonField {
    Id,
    FirstName,
    LastName,
    FullName,
    BirthDate,
    Gender,
    Avatar,
    Relations,
    Parents,
    Children,
    Spouses,
}

impl PersonField {
    pub(crate) fn from_key(raw_key: &str) -> Option<Self> {
        let field = match canonical_key(raw_key).as_str() {
            "id" | "personid" | "memberid" | "uuid" => Self::Id,
            "firstname" | "givenname" | "first" => Self::FirstName,
            "lastname" | "surname" | "familyname" | "last" => Self::LastName,
            "name" | "fullname" => Self::FullName,
            "birthdate" | "dateofbirth" | "dob" | "born" | "birthday" => Self::BirthDate,
            "gender" | "sex" => Self::Gender,
            "avatar" | "avatarurl" | "photo" | "photourl" | "image" => Self::Avatar,
            "relations" | "relationships" => Self::Relations,
            "parents" | "parentids" => Self::Parents,
            "children" | "childids" => Self::Children,
            "spouse" | "spouses" | "spouseid" | "spouseids" => Self::Spouses,
            _ => return None,
        };
        Some(field)
    }
}

/// Lowercases and strips separators: `First Name`, `first_name`, `firstName`
/// all become `firstname`.
pub(crate) fn canonical_key(raw_key: &str) -> String {
    NON_ALNUM_RE
        .replace_all(&raw_key.to_ascii_lowercase(), "")
        .into_owned()
}

/// Returns the first value whose canonical key is one of `aliases`.
pub(crate) fn lookup<'a>(
    record: &'a RawRecord,
    aliases: &[&str],
) -> Option<(&'a str, &'a Value)> {
    record
        .iter()
        .find(|(key, _)| aliases.contains(&canonical_key(key).as_str()))
        .map(|(key, value)| (key.as_str(), value))
}

/// Reads a scalar as trimmed text.
///
/// `Ok(None)` means absent (null or blank). Integral numbers render without a
/// fractional part so spreadsheet ids like `12.0` become `12`.
pub(crate) fn text_value(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                return Ok(Some(integer.to_string()));
            }
            if let Some(integer) = number.as_u64() {
                return Ok(Some(integer.to_string()));
            }
            match number.as_f64() {
                Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => {
                    Ok(Some(format!("{}", float as i64)))
                }
                _ => Ok(Some(number.to_string())),
            }
        }
        Value::Bool(_) => Err("expected text, found boolean".to_string()),
        Value::Array(_) => Err("expected text, found array".to_string()),
        Value::Object(_) => Err("expected text, found object".to_string()),
    }
}

/// Parses a birth date cell.
///
/// Accepts ISO dates and datetimes, `YYYY/MM/DD`, and Excel serial numbers
/// when the source is a spreadsheet.
pub(crate) fn parse_date(value: &Value, format: SourceFormat) -> Result<Option<NaiveDate>, String> {
    if let (SourceFormat::Xlsx, Value::Number(number)) = (format, value) {
        return excel_serial_date(number).map(Some);
    }

    let Some(text) = text_value(value)? else {
        return Ok(None);
    };
    let captures = ISO_DATE_RE
        .captures(&text)
        .filter(|captures| captures[2] == captures[4])
        .ok_or_else(|| format!("unrecognized date `{text}`; expected YYYY-MM-DD"))?;

    let year: i32 = captures[1]
        .parse()
        .map_err(|_| format!("invalid year in `{text}`"))?;
    let month: u32 = captures[3]
        .parse()
        .map_err(|_| format!("invalid month in `{text}`"))?;
    let day: u32 = captures[5]
        .parse()
        .map_err(|_| format!("invalid day in `{text}`"))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| format!("date `{text}` does not exist"))
}

fn excel_serial_date(number: &serde_json::Number) -> Result<NaiveDate, String> {
    let serial = number
        .as_f64()
        .ok_or_else(|| format!("invalid spreadsheet date `{number}`"))?
        .floor() as i64;
    if !EXCEL_SERIAL_RANGE.contains(&serial) {
        return Err(format!("spreadsheet date serial `{number}` is out of range"));
    }
    let (year, month, day) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| "invalid spreadsheet epoch".to_string())?;
    epoch
        .checked_add_signed(Duration::days(serial))
        .ok_or_else(|| format!("spreadsheet date serial `{number}` is out of range"))
}

/// Splits a flattened id list cell (`"1; 2,3|4"`).
pub(crate) fn split_id_list(text: &str) -> Vec<String> {
    ID_LIST_SEPARATOR_RE
        .split(text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits `Ada Lovelace King` into (`Ada Lovelace`, `King`).
pub(crate) fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.rsplit_once(char::is_whitespace) {
        Some((first, last)) => (first.trim().to_string(), last.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

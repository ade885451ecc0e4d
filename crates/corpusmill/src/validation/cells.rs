//! Syntax of the cells of a compiled table.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::{Uuid, Version};

static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(-?\d+),(-?\d+)\)$").expect("valid regex"));

static XY_BOX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\((-?\d+),(-?\d+)\),\((-?\d+),(-?\d+)\)$").expect("valid regex")
});

// Quotes inside a value are doubled, so a lone quote always closes it.
static FTS_VECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^'\d+(?:[^']|'')*':\d+(?: '\d+(?:[^']|'')*':\d+)*$").expect("valid regex")
});

/// Expected syntax of the cells of one column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellFormat {
    /// A signed integer.
    Int,
    /// A version 4 UUID.
    Uuid,
    /// Any integer or floating-point number.
    Number,
    /// Free text.
    Text,
    /// A JSON object.
    Object,
    /// One of the declared values.
    Categorical(Vec<String>),
    /// A bit-string, of a fixed width when known.
    Bits(Option<usize>),
    /// A half-open interval `[lo,hi)`.
    Range,
    /// A box `(x1,y1),(x2,y2)`.
    XyBox,
    /// A full-text-search vector.
    FtsVector,
}

impl CellFormat {
    /// Returns true if an empty cell is a well-formed value of this format.
    pub fn accepts_empty(&self) -> bool {
        match self {
            CellFormat::Text | CellFormat::FtsVector => true,
            CellFormat::Bits(width) => width.is_none_or(|w| w == 0),
            CellFormat::Categorical(values) => values.iter().any(String::is_empty),
            _ => false,
        }
    }

    /// Check one cell, returning a description of what is wrong.
    pub fn check(&self, value: &str) -> Result<(), String> {
        match self {
            CellFormat::Int => parse_int(value).map(|_| ()),
            CellFormat::Uuid => check_uuid(value),
            CellFormat::Number => value
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("expected a number, got '{}'", value)),
            CellFormat::Text => Ok(()),
            CellFormat::Object => check_object(value),
            CellFormat::Categorical(values) => {
                if values.iter().any(|v| v == value) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not one of the declared values", value))
                }
            }
            CellFormat::Bits(width) => check_bits(value, *width),
            CellFormat::Range => check_range(value),
            CellFormat::XyBox => check_xy_box(value),
            CellFormat::FtsVector => check_fts_vector(value),
        }
    }
}

fn parse_int(value: &str) -> Result<i64, String> {
    value
        .parse::<i64>()
        .map_err(|_| format!("expected an integer, got '{}'", value))
}

fn check_uuid(value: &str) -> Result<(), String> {
    match Uuid::parse_str(value) {
        Ok(uuid) if uuid.get_version() == Some(Version::Random) => Ok(()),
        Ok(_) => Err(format!("'{}' is not a version 4 UUID", value)),
        Err(_) => Err(format!("expected a UUID, got '{}'", value)),
    }
}

fn check_object(value: &str) -> Result<(), String> {
    match serde_json::from_str::<serde_json::Value>(value) {
        Ok(serde_json::Value::Object(_)) => Ok(()),
        _ => Err(format!("expected a JSON object, got '{}'", value)),
    }
}

fn check_bits(value: &str, width: Option<usize>) -> Result<(), String> {
    if !value.chars().all(|c| c == '0' || c == '1') {
        return Err(format!("expected a bit-string, got '{}'", value));
    }
    match width {
        Some(width) if value.len() != width => Err(format!(
            "expected {} bits, got {} in '{}'",
            width,
            value.len(),
            value
        )),
        _ => Ok(()),
    }
}

fn check_range(value: &str) -> Result<(), String> {
    let bounds = RANGE
        .captures(value)
        .ok_or_else(|| format!("expected a range [lo,hi), got '{}'", value))?;
    let lo = parse_int(&bounds[1])?;
    let hi = parse_int(&bounds[2])?;
    if hi <= lo {
        return Err(format!(
            "upper bound of '{}' must be strictly greater than its lower bound",
            value
        ));
    }
    Ok(())
}

fn check_xy_box(value: &str) -> Result<(), String> {
    let corners = XY_BOX
        .captures(value)
        .ok_or_else(|| format!("expected a box (x1,y1),(x2,y2), got '{}'", value))?;
    let x1 = parse_int(&corners[1])?;
    let y1 = parse_int(&corners[2])?;
    let x2 = parse_int(&corners[3])?;
    let y2 = parse_int(&corners[4])?;
    if x2 <= x1 {
        return Err(format!("x2 must be strictly greater than x1 in '{}'", value));
    }
    if y2 <= y1 {
        return Err(format!("y2 must be strictly greater than y1 in '{}'", value));
    }
    Ok(())
}

fn check_fts_vector(value: &str) -> Result<(), String> {
    if value.is_empty() || FTS_VECTOR.is_match(value) {
        return Ok(());
    }
    let unit = value
        .split(' ')
        .find(|unit| !unit.starts_with('\'') || !unit.contains("':"))
        .unwrap_or(value);
    Err(format!(
        "malformed full-text-search vector near '{}': expected '<index><text>':<position> units with doubled quotes",
        unit
    ))
}

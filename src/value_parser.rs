use crate::schema::UnitScale;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];
const NOT_REPORTED_MARKERS: [&str; 3] = ["-", "\u{2013}", "\u{2014}"];

/// Why a raw cell could not become a number.
///
/// A failure is never the same thing as zero: "-" and "N/A" mean the statement
/// did not report the item.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ParseFailure {
    #[error("Value is empty")]
    Empty,

    #[error("Value '{raw}' marks the item as not reported")]
    NotReported { raw: String },

    #[error("Unexpected character '{found}' in value '{raw}'")]
    UnexpectedCharacter { raw: String, found: char },

    #[error("Malformed value '{raw}': {details}")]
    Malformed { raw: String, details: String },

    #[error("Value '{raw}' overflows when scaled by {multiplier}")]
    Overflow { raw: String, multiplier: Decimal },
}

/// Parses a statement cell such as `"$(1,234.50)"` into a signed decimal, applying
/// the reporting scale declared by the source document.
pub fn parse_value(raw: &str, unit_scale_hint: UnitScale) -> Result<Decimal, ParseFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseFailure::Empty);
    }

    if NOT_REPORTED_MARKERS.contains(&trimmed) || trimmed.eq_ignore_ascii_case("n/a") {
        return Err(ParseFailure::NotReported {
            raw: raw.to_string(),
        });
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    let (parenthesized, inner) = match (cleaned.strip_prefix('('), cleaned.ends_with(')')) {
        (Some(rest), true) => (true, &rest[..rest.len() - 1]),
        (None, false) => (false, cleaned.as_str()),
        _ => {
            return Err(ParseFailure::Malformed {
                raw: raw.to_string(),
                details: "unbalanced parentheses".to_string(),
            })
        }
    };

    let (signed_negative, digits) = match inner.chars().next() {
        Some('-') | Some('\u{2212}') => {
            let sign_len = inner.chars().next().map_or(0, char::len_utf8);
            (true, &inner[sign_len..])
        }
        Some('+') => (false, &inner[1..]),
        _ => (false, inner),
    };

    if parenthesized && signed_negative {
        return Err(ParseFailure::Malformed {
            raw: raw.to_string(),
            details: "both parentheses and a minus sign".to_string(),
        });
    }

    if let Some(found) = digits.chars().find(|c| !c.is_ascii_digit() && *c != '.') {
        return Err(ParseFailure::UnexpectedCharacter {
            raw: raw.to_string(),
            found,
        });
    }

    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return Err(ParseFailure::Malformed {
            raw: raw.to_string(),
            details: "no digits".to_string(),
        });
    }

    let magnitude = Decimal::from_str(digits).map_err(|e| ParseFailure::Malformed {
        raw: raw.to_string(),
        details: e.to_string(),
    })?;

    let signed = if parenthesized || signed_negative {
        -magnitude
    } else {
        magnitude
    };

    let multiplier = unit_scale_hint.multiplier();
    signed
        .checked_mul(multiplier)
        .ok_or_else(|| ParseFailure::Overflow {
            raw: raw.to_string(),
            multiplier,
        })
}

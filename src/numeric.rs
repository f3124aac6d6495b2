//! Parsing of locale-formatted numbers as they appear on the page:
//! `"128k"`, `"1.5M"`, `"$0.15 / 1M tok"`, `"2,5 s"`.

use once_cell::sync::Lazy;
use regex::Regex;

static UNIT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d[\d.,]*)\s*([km])\b").expect("valid unit regex"));
static PLAIN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number regex"));

/// Parses the first number of `input`.
///
/// A leading number followed by a `k` or `m` unit is scaled by a thousand or a million.
/// Otherwise the first number anywhere in the string is returned. A comma always
/// reads as a decimal point, so `"1,234.5k"` is 1234. Returns `None` when the
/// string holds no number at all.
pub fn parse_number(input: Option<&str>) -> Option<f64> {
    let trimmed = input?.trim();

    if let Some(caps) = UNIT_NUMBER.captures(trimmed) {
        let number = first_decimal(&caps[1].replace(',', "."))?;
        let scale = match caps[2].to_ascii_lowercase().as_str() {
            "k" => 1e3,
            _ => 1e6,
        };
        return Some(number * scale);
    }

    let dotted = trimmed.replace(',', ".");
    PLAIN_NUMBER.find(&dotted)?.as_str().parse().ok()
}

/// Parses the first plain decimal number of `input`, without unit scaling.
pub fn first_decimal(input: &str) -> Option<f64> {
    PLAIN_NUMBER.find(input)?.as_str().parse().ok()
}

//! Sized quantity strings
//!
//! Cloud Functions v2 reports memory as a Kubernetes-style quantity
//! (`"256Mi"`, `"1G"`, `"1e9"`) and timeouts as whole seconds, while endpoints
//! carry megabytes and proto duration strings (`"60s"`).

use crate::error::{Error, Result};

/// Byte multiplier for every accepted unit suffix.
/// Decimal suffixes are powers of 1000, binary suffixes powers of 1024.
const BYTES_PER_UNIT: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1_048_576.0),
    ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
];

/// Returns the number of megabytes (not mebibytes) in a quantity.
///
/// Accepts `<digits>[.<digits>]` followed by an optional unit from
/// [`BYTES_PER_UNIT`] or a bare exponent (`e9`, `E6`). No suffix means bytes.
pub fn megabytes(quantity: &str) -> Result<f64> {
    let invalid = || Error::InvalidQuantity(quantity.to_string());

    let number_len = numeric_prefix_len(quantity).ok_or_else(invalid)?;
    let (number, suffix) = quantity.split_at(number_len);
    let value: f64 = number.parse().map_err(|_| invalid())?;

    let bytes = if suffix.is_empty() {
        value
    } else if let Some(exponent) = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))
    {
        if exponent.is_empty() || !exponent.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let exponent: i32 = exponent.parse().map_err(|_| invalid())?;
        value * 10f64.powi(exponent)
    } else {
        let (_, multiplier) = BYTES_PER_UNIT
            .iter()
            .find(|(unit, _)| *unit == suffix)
            .ok_or_else(invalid)?;
        value * multiplier
    };

    Ok(bytes / 1e6)
}

/// Length of the leading `<digits>[.<digits>*]` run, if the string starts with one
fn numeric_prefix_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let int_len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if int_len == 0 {
        return None;
    }
    if bytes.get(int_len) != Some(&b'.') {
        return Some(int_len);
    }
    let frac_len = bytes[int_len + 1..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    Some(int_len + 1 + frac_len)
}

/// Formats megabytes as a quantity the API accepts
pub fn format_megabytes(mb: f64) -> String {
    format!("{}M", mb)
}

/// Parses a proto duration of whole seconds (`"60s"`)
pub fn seconds_from_duration(duration: &str) -> Result<u32> {
    duration
        .strip_suffix('s')
        .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| Error::InvalidDuration(duration.to_string()))
}

pub fn duration_from_seconds(seconds: u32) -> String {
    format!("{}s", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_units() {
        assert_eq!(megabytes("1000k").unwrap(), 1.0);
        assert_eq!(megabytes("1.5M").unwrap(), 1.5);
        assert_eq!(megabytes("1G").unwrap(), 1000.0);
        assert_eq!(megabytes("2T").unwrap(), 2_000_000.0);
    }

    #[test]
    fn test_binary_units() {
        assert_eq!(megabytes("1Ki").unwrap(), 1024.0 / 1e6);
        assert_eq!(megabytes("1Mi").unwrap(), (1u64 << 20) as f64 / 1e6);
        assert_eq!(megabytes("1Gi").unwrap(), (1u64 << 30) as f64 / 1e6);
        assert_eq!(megabytes("1Ti").unwrap(), (1u64 << 40) as f64 / 1e6);
    }

    #[test]
    fn test_no_unit_and_exponents() {
        assert_eq!(megabytes("100000").unwrap(), 0.1);
        assert_eq!(megabytes("1e9").unwrap(), 1000.0);
        assert_eq!(megabytes("1.5E6").unwrap(), 1.5);
        assert_eq!(megabytes("5.").unwrap(), 5e-6);
    }

    #[test]
    fn test_rejects_malformed_quantities() {
        let malformed = [
            "bogus", "", "M", "1.5.5", "-1M", "1m", "1Mb", "1e", "1e-3", " 1M", "1 M", ".5M",
        ];
        for bad in malformed {
            assert!(
                matches!(megabytes(bad), Err(Error::InvalidQuantity(ref q)) if q == bad),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_format_megabytes_reparses() {
        assert_eq!(format_megabytes(128.0), "128M");
        assert_eq!(format_megabytes(1.5), "1.5M");
        assert_eq!(megabytes(&format_megabytes(256.0)).unwrap(), 256.0);
    }

    #[test]
    fn test_durations() {
        assert_eq!(seconds_from_duration("15s").unwrap(), 15);
        assert_eq!(seconds_from_duration("0s").unwrap(), 0);
        assert_eq!(duration_from_seconds(540), "540s");
        for bad in ["15", "s", "1.5s", "-3s", "15m", ""] {
            assert!(matches!(seconds_from_duration(bad), Err(Error::InvalidDuration(_))));
        }
    }
}

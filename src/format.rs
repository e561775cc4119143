//! Display helpers: smallest-unit amounts, account identifiers, dates.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;

use crate::models::amount::{Amount, ParseAmountError};

/// Fractional digits of the value token (wei per ether = 10^18).
pub const TOKEN_DECIMALS: u32 = 18;

fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

/// Format wei as an ether string with `decimals` fractional digits, rounding half up.
pub fn format_wei_to_eth(wei: &Amount, decimals: u32) -> String {
    let unit = pow10(TOKEN_DECIMALS);
    let scale = pow10(decimals);
    let rounded = (wei.as_biguint() * &scale + (&unit / 2u32)) / &unit;

    let int_part = &rounded / &scale;
    if decimals == 0 {
        return int_part.to_string();
    }
    let frac_part = (&rounded % &scale).to_string();
    format!("{int_part}.{frac_part:0>width$}", width = decimals as usize)
}

/// Parse a human ether amount ("0.001", "2", ".5") into wei without any float rounding.
pub fn parse_eth_to_wei(text: &str) -> Result<Amount, ParseAmountError> {
    let trimmed = text.trim();
    let err = || ParseAmountError(text.to_string());

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(err());
    }
    if frac_part.len() > TOKEN_DECIMALS as usize {
        return Err(err());
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(err());
    }

    let digits = format!(
        "{}{:0<width$}",
        if int_part.is_empty() { "0" } else { int_part },
        frac_part,
        width = TOKEN_DECIMALS as usize
    );
    digits.parse()
}

/// Shorten an account identifier to `start...end` for display.
pub fn truncate_address(address: &str, start_chars: usize, end_chars: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= start_chars + end_chars {
        return address.to_string();
    }
    let head: String = chars[..start_chars].iter().collect();
    let tail: String = chars[chars.len() - end_chars..].iter().collect();
    format!("{head}...{tail}")
}

/// `truncate_address` with the 6/4 split used across the listings.
pub fn short_address(address: &str) -> String {
    truncate_address(address, 6, 4)
}

/// "Mar 5, 2026"
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_wei_with_rounding() {
        assert_eq!(format_wei_to_eth(&Amount::from(10_000_000_000_000_000u64), 4), "0.0100");
        assert_eq!(format_wei_to_eth(&Amount::from(1_000_000_000u64), 4), "0.0000");
        assert_eq!(format_wei_to_eth(&Amount::from(149_990_000_000_000u64), 4), "0.0001");
        assert_eq!(format_wei_to_eth(&Amount::from(150_000_000_000_000u64), 4), "0.0002");
        assert_eq!(format_wei_to_eth(&"2500000000000000000".parse().unwrap(), 2), "2.50");
        assert_eq!(format_wei_to_eth(&"2500000000000000000".parse().unwrap(), 0), "3");
    }

    #[test]
    fn parses_eth_exactly() {
        assert_eq!(parse_eth_to_wei("0.001").unwrap().to_string(), "1000000000000000");
        assert_eq!(parse_eth_to_wei("2").unwrap().to_string(), "2000000000000000000");
        assert_eq!(parse_eth_to_wei(".5").unwrap().to_string(), "500000000000000000");
        assert_eq!(
            parse_eth_to_wei("0.000000000000000001").unwrap().to_string(),
            "1"
        );
    }

    #[test]
    fn rejects_bad_eth_input() {
        for bad in ["", ".", "-1", "1.2.3", "abc", "0.0000000000000000001", "1e3"] {
            assert!(parse_eth_to_wei(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn truncates_long_addresses_only() {
        assert_eq!(
            short_address("0x1234567890123456789012345678901234567890"),
            "0x1234...7890"
        );
        assert_eq!(short_address("0xabcdef"), "0xabcdef");
        assert_eq!(truncate_address("0123456789", 6, 4), "0123456789");
        assert_eq!(truncate_address("0123456789a", 6, 4), "012345...789a");
    }

    #[test]
    fn formats_dates() {
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(format_date(&at), "Mar 5, 2026");
    }
}

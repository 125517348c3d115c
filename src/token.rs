//! Token estimation for the digest summary.
//!
//! Counts are produced by the `cl100k_base` encoding and abbreviated for
//! display. Encoder failure is non-fatal: the caller simply omits the
//! estimate from the summary.

use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;
use tracing::warn;

// Initialized once; None if the encoding tables fail to load.
static CL100K: Lazy<Option<CoreBPE>> = Lazy::new(|| tiktoken_rs::cl100k_base().ok());

/// Estimates the token count of `text` and formats it for display.
///
/// Returns `None` when the encoder is unavailable; the summary line is
/// then omitted rather than failing the run.
#[must_use]
pub fn estimate_tokens(text: &str) -> Option<String> {
    let Some(bpe) = CL100K.as_ref() else {
        warn!("Token encoder unavailable, omitting estimate");
        return None;
    };
    let total = bpe.encode_ordinary(text).len();
    Some(format_token_count(total))
}

/// Abbreviates a token count with `k`/`M` suffixes at the 1,000 and
/// 1,000,000 thresholds, one decimal place.
#[must_use]
pub fn format_token_count(count: usize) -> String {
    if count > 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count > 1_000 {
        format!("{:.1}k", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Formats a number with thousands separators for the single-file summary.
#[must_use]
pub(crate) fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut result = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_nonempty() {
        let estimate = estimate_tokens("fn main() { println!(\"hello\"); }");
        // cl100k tables ship with the crate, so this should always resolve.
        let estimate = estimate.unwrap();
        assert!(!estimate.is_empty());
    }

    #[test]
    fn test_format_token_count_plain() {
        assert_eq!(format_token_count(0), "0");
        assert_eq!(format_token_count(999), "999");
        assert_eq!(format_token_count(1_000), "1000");
    }

    #[test]
    fn test_format_token_count_thousands() {
        assert_eq!(format_token_count(1_500), "1.5k");
        assert_eq!(format_token_count(999_999), "1000.0k");
    }

    #[test]
    fn test_format_token_count_millions() {
        assert_eq!(format_token_count(2_500_000), "2.5M");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}

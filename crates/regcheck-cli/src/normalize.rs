//! # Normalize Subcommand
//!
//! Prints the canonical form of each phone number without contacting any
//! service. Useful for checking what the API will send to the bridge.

use anyhow::Result;
use clap::Args;
use regcheck_core::{NormalizationPolicy, NormalizedIdentifier, PhoneNormalizer};

/// Arguments for the `regcheck normalize` subcommand.
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Phone numbers in any formatting.
    #[arg(value_name = "NUMBER", required = true)]
    pub numbers: Vec<String>,

    /// Region prefix for numbers without one.
    #[arg(long, default_value = "55")]
    pub country_code: String,

    /// Reject numbers outside 8 to 15 digits instead of guessing.
    #[arg(long)]
    pub strict: bool,
}

impl NormalizeArgs {
    pub(crate) fn normalizer(&self) -> PhoneNormalizer {
        let policy = if self.strict {
            NormalizationPolicy::Strict
        } else {
            NormalizationPolicy::Lenient
        };
        PhoneNormalizer::new(&self.country_code, policy)
    }
}

/// Normalize every argument, keeping input order.
pub fn normalize_all(args: &NormalizeArgs) -> Vec<(String, NormalizedIdentifier)> {
    let normalizer = args.normalizer();
    args.numbers
        .iter()
        .map(|raw| (raw.clone(), normalizer.normalize_str(raw)))
        .collect()
}

/// Execute the normalize subcommand.
///
/// Returns exit code: 0 when every number normalized, 1 when any is invalid.
pub fn run_normalize(args: &NormalizeArgs) -> Result<u8> {
    let mut had_invalid = false;
    for (raw, normalized) in normalize_all(args) {
        match &normalized {
            NormalizedIdentifier::Canonical(c) => println!("{raw}\t{c}"),
            NormalizedIdentifier::Invalid { reason } => {
                had_invalid = true;
                println!("{raw}\t{normalized}\t({reason})");
            }
        }
    }
    Ok(u8::from(had_invalid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(numbers: &[&str], strict: bool) -> NormalizeArgs {
        NormalizeArgs {
            numbers: numbers.iter().map(|n| n.to_string()).collect(),
            country_code: "55".into(),
            strict,
        }
    }

    #[test]
    fn lenient_applies_prefix_rules() {
        let out = normalize_all(&args(
            &["11987654321", "+5511987654321", "011987654321"],
            false,
        ));
        for (_, normalized) in out {
            assert_eq!(normalized.as_canonical(), Some("5511987654321"));
        }
    }

    #[test]
    fn strict_marks_short_numbers_invalid() {
        let out = normalize_all(&args(&["123", "11987654321"], true));
        assert!(!out[0].1.is_valid());
        assert_eq!(out[0].1.to_string(), "N/A");
        assert!(out[1].1.is_valid());
    }

    #[test]
    fn exit_code_reflects_invalid_input() {
        assert_eq!(run_normalize(&args(&["11987654321"], true)).unwrap(), 0);
        assert_eq!(run_normalize(&args(&["1"], true)).unwrap(), 1);
    }
}

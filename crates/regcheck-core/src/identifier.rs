//! # Identifier Normalization
//!
//! Canonicalizes caller-supplied identifiers into the exact form the backing
//! services expect. Normalization is a pure, total function: it never fails
//! and never performs I/O. An identifier that cannot be canonicalized becomes
//! [`NormalizedIdentifier::Invalid`], which the checker short-circuits without
//! contacting any collaborator.
//!
//! ## Phone numbers
//!
//! 1. Strip every non-digit character.
//! 2. Drop exactly one leading `0` (trunk prefix).
//! 3. A raw value starting with `+` is already fully qualified.
//! 4. A value already starting with the region prefix is kept as is.
//! 5. Otherwise the region prefix is prepended.
//!
//! Under [`NormalizationPolicy::Strict`] the canonical result must also be
//! 8 to 15 digits long.
//!
//! ## Postal codes (CEP)
//!
//! Strip non-digits and require exactly 8 digits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::IdentifierError;

/// Sentinel rendered in place of a canonical value for invalid identifiers.
pub const INVALID_SENTINEL: &str = "N/A";

/// Shortest canonical phone number accepted by the strict policy.
const STRICT_MIN_DIGITS: usize = 8;

/// Longest canonical phone number accepted by the strict policy (E.164).
const STRICT_MAX_DIGITS: usize = 15;

/// Number of digits in a Brazilian postal code.
const POSTAL_CODE_DIGITS: usize = 8;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// An untrusted, caller-supplied identifier.
///
/// JSON request bodies may carry anything in an identifier slot. Strings are
/// kept as [`RawIdentifier::Text`]; every other JSON value (null, numbers,
/// objects, ...) is preserved verbatim as [`RawIdentifier::Malformed`] so it
/// can be echoed back in the result and normalized to invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawIdentifier {
    /// A string identifier in arbitrary formatting.
    Text(String),
    /// A non-string JSON value.
    Malformed(serde_json::Value),
}

impl RawIdentifier {
    /// Return the string form, if this identifier is a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Malformed(_) => None,
        }
    }
}

impl From<&str> for RawIdentifier {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawIdentifier {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<serde_json::Value> for RawIdentifier {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Malformed(other),
        }
    }
}

impl fmt::Display for RawIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Malformed(v) => write!(f, "{v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized output
// ---------------------------------------------------------------------------

/// Result of normalizing a [`RawIdentifier`].
///
/// Serializes as the canonical digit string, or as `"N/A"` when invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedIdentifier {
    /// Canonical digits-only identifier, ready for lookup.
    Canonical(String),
    /// The identifier cannot be looked up.
    Invalid {
        /// Human-readable reason, surfaced in the item outcome.
        reason: String,
    },
}

impl NormalizedIdentifier {
    /// Build an invalid marker with the given reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// The canonical string, if valid.
    pub fn as_canonical(&self) -> Option<&str> {
        match self {
            Self::Canonical(s) => Some(s),
            Self::Invalid { .. } => None,
        }
    }

    /// Whether normalization produced a usable identifier.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Canonical(_))
    }
}

impl fmt::Display for NormalizedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canonical(s) => f.write_str(s),
            Self::Invalid { .. } => f.write_str(INVALID_SENTINEL),
        }
    }
}

impl Serialize for NormalizedIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Canonical(s) => serializer.serialize_str(s),
            Self::Invalid { .. } => serializer.serialize_str(INVALID_SENTINEL),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Phone normalization policy.
///
/// `Lenient` always produces a canonical string and lets the registration
/// service decide validity. `Strict` additionally rejects canonical results
/// outside the 8 to 15 digit window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationPolicy {
    /// Never reject; always apply the prefix rules.
    #[default]
    Lenient,
    /// Reject canonical results outside 8 to 15 digits.
    Strict,
}

impl NormalizationPolicy {
    /// Return the lowercase name of this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lenient => "lenient",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for NormalizationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown normalization policy \"{other}\" (expected lenient or strict)"
            )),
        }
    }
}

impl fmt::Display for NormalizationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Normalizers
// ---------------------------------------------------------------------------

/// Canonicalizes raw identifiers for one backing service.
///
/// Implementations must be total and deterministic: the same input and
/// configuration always yield the same output, and no input panics.
pub trait Normalizer: Send + Sync {
    /// Normalize one raw identifier.
    fn normalize(&self, raw: &RawIdentifier) -> NormalizedIdentifier;
}

/// Phone-number normalizer for the registration service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNormalizer {
    default_region_prefix: String,
    policy: NormalizationPolicy,
}

impl PhoneNormalizer {
    /// Create a normalizer with the given region prefix (e.g. `"55"`).
    ///
    /// Non-digit characters in the prefix are ignored, so `"+55"` and `"55"`
    /// are equivalent.
    pub fn new(default_region_prefix: &str, policy: NormalizationPolicy) -> Self {
        Self {
            default_region_prefix: digits_only(default_region_prefix),
            policy,
        }
    }

    /// Return a normalizer using a per-request prefix override.
    ///
    /// `None` or an override without digits keeps the default prefix.
    pub fn with_prefix(&self, prefix: Option<&str>) -> Self {
        match prefix.map(digits_only) {
            Some(p) if !p.is_empty() => Self {
                default_region_prefix: p,
                policy: self.policy,
            },
            _ => self.clone(),
        }
    }

    /// The region prefix applied to unqualified numbers.
    pub fn region_prefix(&self) -> &str {
        &self.default_region_prefix
    }

    /// The active normalization policy.
    pub fn policy(&self) -> NormalizationPolicy {
        self.policy
    }

    /// Normalize a phone number given as a string.
    pub fn normalize_str(&self, raw: &str) -> NormalizedIdentifier {
        let mut digits = digits_only(raw);
        if digits.starts_with('0') {
            digits.remove(0);
        }

        let canonical = if raw.starts_with('+') || digits.starts_with(&self.default_region_prefix)
        {
            digits
        } else {
            format!("{}{digits}", self.default_region_prefix)
        };

        if self.policy == NormalizationPolicy::Strict
            && !(STRICT_MIN_DIGITS..=STRICT_MAX_DIGITS).contains(&canonical.len())
        {
            return NormalizedIdentifier::invalid(format!(
                "phone number must have {STRICT_MIN_DIGITS} to {STRICT_MAX_DIGITS} digits"
            ));
        }

        NormalizedIdentifier::Canonical(canonical)
    }
}

impl Normalizer for PhoneNormalizer {
    fn normalize(&self, raw: &RawIdentifier) -> NormalizedIdentifier {
        match raw {
            RawIdentifier::Text(s) => self.normalize_str(s),
            RawIdentifier::Malformed(_) => NormalizedIdentifier::invalid(NON_STRING_REASON),
        }
    }
}

/// Brazilian postal code (CEP) normalizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostalNormalizer;

impl PostalNormalizer {
    /// Reason attached to postal codes without exactly 8 digits.
    pub const LENGTH_REASON: &'static str = "must have 8 digits";

    /// Normalize a postal code given as a string.
    pub fn normalize_str(&self, raw: &str) -> NormalizedIdentifier {
        let digits = digits_only(raw);
        if digits.len() == POSTAL_CODE_DIGITS {
            NormalizedIdentifier::Canonical(digits)
        } else {
            NormalizedIdentifier::invalid(Self::LENGTH_REASON)
        }
    }
}

impl Normalizer for PostalNormalizer {
    fn normalize(&self, raw: &RawIdentifier) -> NormalizedIdentifier {
        match raw {
            RawIdentifier::Text(s) => self.normalize_str(s),
            RawIdentifier::Malformed(_) => NormalizedIdentifier::invalid(NON_STRING_REASON),
        }
    }
}

/// Render a postal code as `NNNNN-NNN`.
pub fn format_postal_code(raw: &str) -> Result<String, IdentifierError> {
    let digits = digits_only(raw);
    if digits.len() != POSTAL_CODE_DIGITS {
        return Err(IdentifierError::InvalidPostalCode(raw.to_string()));
    }
    Ok(format!("{}-{}", &digits[..5], &digits[5..]))
}

const NON_STRING_REASON: &str = "identifier must be a string";

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

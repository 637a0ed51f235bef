//! Localpart transform strategies.
//!
//! The subject value asserted by an IdP is not always a legal account
//! localpart on the chat server. A deployment picks one of a small closed
//! set of pure string transforms, applied to the subject value before
//! collision disambiguation. The retry suffix is appended after the
//! transform, so the suffixed identifier stays within the strategy's output
//! alphabet.

use serde::{Deserialize, Serialize};

/// Named transform applied to the subject value to produce the localpart
/// base.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocalpartMapping {
    /// Use the subject value unchanged.
    #[default]
    Passthrough,
    /// Fold ASCII uppercase to lowercase and encode every other byte
    /// outside `a-z0-9._-` as `=xx` (lowercase hex).
    Hexencode,
    /// Lowercase, map `@` to `-`, and every other character outside
    /// `a-z0-9._=-` to `.`.
    Dotreplace,
}

impl LocalpartMapping {
    /// Look up a strategy by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "passthrough" => Some(Self::Passthrough),
            "hexencode" => Some(Self::Hexencode),
            "dotreplace" => Some(Self::Dotreplace),
            _ => None,
        }
    }

    /// Name as written in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Hexencode => "hexencode",
            Self::Dotreplace => "dotreplace",
        }
    }

    /// Apply the transform. Pure: the same input always yields the same
    /// output.
    pub fn apply(&self, subject: &str) -> String {
        match self {
            Self::Passthrough => subject.to_string(),
            Self::Hexencode => hexencode(subject),
            Self::Dotreplace => dotreplace(subject),
        }
    }
}

fn hexencode(subject: &str) -> String {
    let mut out = String::with_capacity(subject.len());
    for byte in subject.bytes() {
        match byte {
            b'A'..=b'Z' => out.push(byte.to_ascii_lowercase() as char),
            b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("={:02x}", byte)),
        }
    }
    out
}

fn dotreplace(subject: &str) -> String {
    subject
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '@' => '-',
            'a'..='z' | '0'..='9' | '.' | '_' | '=' | '-' => c,
            _ => '.',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_is_identity() {
        let mapping = LocalpartMapping::Passthrough;
        assert_eq!(mapping.apply("jdoe"), "jdoe");
        assert_eq!(mapping.apply("J.Doe@example.org"), "J.Doe@example.org");
    }

    #[test]
    fn test_hexencode_folds_case() {
        assert_eq!(LocalpartMapping::Hexencode.apply("JDoe"), "jdoe");
    }

    #[test]
    fn test_hexencode_escapes_outside_alphabet() {
        assert_eq!(
            LocalpartMapping::Hexencode.apply("j doe@example"),
            "j=20doe=40example"
        );
        // The escape character itself is escaped.
        assert_eq!(LocalpartMapping::Hexencode.apply("a=b"), "a=3db");
    }

    #[test]
    fn test_dotreplace() {
        assert_eq!(
            LocalpartMapping::Dotreplace.apply("J.Doe@example.org"),
            "j.doe-example.org"
        );
        assert_eq!(LocalpartMapping::Dotreplace.apply("jane doe"), "jane.doe");
    }

    #[test]
    fn test_transforms_are_deterministic() {
        for mapping in [
            LocalpartMapping::Passthrough,
            LocalpartMapping::Hexencode,
            LocalpartMapping::Dotreplace,
        ] {
            assert_eq!(mapping.apply("Jörg Düe"), mapping.apply("Jörg Düe"));
        }
    }

    #[test]
    fn test_from_name_round_trip() {
        for mapping in [
            LocalpartMapping::Passthrough,
            LocalpartMapping::Hexencode,
            LocalpartMapping::Dotreplace,
        ] {
            assert_eq!(LocalpartMapping::from_name(mapping.name()), Some(mapping));
        }
        assert_eq!(LocalpartMapping::from_name("rot13"), None);
    }
}

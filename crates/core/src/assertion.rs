//! Parsed IdP assertion attributes.
//!
//! The host runtime parses the IdP response and hands the provider an
//! [`Assertion`]: a map from attribute name to an ordered list of values.
//! IdPs may assert multiple values for a single attribute (several
//! organizational-unit memberships, several mail addresses), so even
//! single-valued attributes arrive as lists. The provider only reads the
//! assertion; it never mutates it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The attribute/value facts an identity provider vouches for about an
/// authenticating subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Assertion {
    attributes: HashMap<String, Vec<String>>,
}

impl Assertion {
    /// Create an empty assertion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set all values for an attribute, replacing any existing ones.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.attributes.insert(name.into(), values);
    }

    /// Builder-style [`set`](Self::set), convenient for fixtures.
    pub fn with(mut self, name: impl Into<String>, values: &[&str]) -> Self {
        self.attributes
            .insert(name.into(), values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// First value of an attribute, if the attribute is present with at
    /// least one value.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of an attribute, in asserted order. Empty when the
    /// attribute is absent.
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the attribute was asserted at all.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

impl From<HashMap<String, Vec<String>>> for Assertion {
    fn from(attributes: HashMap<String, Vec<String>>) -> Self {
        Self { attributes }
    }
}

impl FromIterator<(String, Vec<String>)> for Assertion {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

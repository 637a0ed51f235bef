//! Assertion-to-identity mapping.
//!
//! The mapping pipeline is:
//! 1. Extract the stable remote subject identifier (hard requirement)
//! 2. Derive the localpart base through the configured transform
//! 3. Disambiguate collisions with a decimal retry suffix
//! 4. Compose the display name and collect email addresses

pub mod localpart;
pub mod mapper;

pub use localpart::LocalpartMapping;
pub use mapper::{IdentityResult, MappingProvider};

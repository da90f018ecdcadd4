//! Content-hosting provider identifiers.

use serde::{Deserialize, Serialize};

/// One configured content-hosting backend.
///
/// The operator configures a fixed ordered list of providers; that order is
/// both preference and fallback order everywhere in Remora.
///
/// # Examples
///
/// ```
/// use remora_core::Provider;
/// use std::str::FromStr;
///
/// let p = Provider::from_str("real_debrid").unwrap();
/// assert_eq!(p.to_string(), "real_debrid");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provider {
    /// Real-Debrid hosting backend
    RealDebrid,
    /// AllDebrid hosting backend
    AllDebrid,
    /// Premiumize hosting backend
    Premiumize,
}

impl Provider {
    /// Stable lowercase name used for configuration keys and metric labels.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

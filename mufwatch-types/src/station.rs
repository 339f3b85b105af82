//! Station identifiers.

use alloc::string::String;
use core::fmt;

/// Identifier of a single ionosonde station.
///
/// Identifiers are normalized to lowercase so that `"Roquetes"` and
/// `"roquetes"` name the same station. The ordering is the lexical order of
/// the identifier, which is also the iteration order of every per-station map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StationId(String);

impl StationId {
    /// Roquetes (Observatori de l'Ebre).
    pub const ROQUETES: &'static str = "roquetes";
    /// El Arenosillo.
    pub const ARENOSILLO: &'static str = "arenosillo";

    /// Create a station identifier, normalizing it to lowercase.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    /// The Roquetes station.
    pub fn roquetes() -> Self {
        Self::new(Self::ROQUETES)
    }

    /// The El Arenosillo station.
    pub fn arenosillo() -> Self {
        Self::new(Self::ARENOSILLO)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StationId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for StationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_normalized() {
        assert_eq!(StationId::new("  Roquetes "), StationId::roquetes());
        assert_eq!(StationId::from("ARENOSILLO").as_str(), "arenosillo");
    }

    #[test]
    fn ordering_is_lexical() {
        assert!(StationId::arenosillo() < StationId::roquetes());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&StationId::roquetes()).unwrap();
        assert_eq!(json, "\"roquetes\"");
    }
}

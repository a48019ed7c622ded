//! Artist identifiers
//!
//! 128-bit MusicBrainz ids, opaque to the engine: only byte equality,
//! ordering and hashing are used. Ordering is the raw byte order, which is
//! what `Uuid` provides and what the metadata table is sorted by.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
#[schema(value_type = String, example = "a74b1b7f-71a5-4011-9441-d0b5e4122711")]
pub struct ArtistId(pub Uuid);

impl ArtistId {
    /// On-disk size in bytes.
    pub const LEN: usize = 16;

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        ArtistId(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ArtistId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(ArtistId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_byte_order() {
        let a = ArtistId::from_bytes([0x00; 16]);
        let b = ArtistId::from_bytes([0x01; 16]);
        assert!(a < b);
        assert_eq!(a.as_bytes(), &[0x00; 16]);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id: ArtistId = "  a74b1b7f-71a5-4011-9441-d0b5e4122711 ".parse().unwrap();
        assert_eq!(id.to_string(), "a74b1b7f-71a5-4011-9441-d0b5e4122711");
    }
}

//! Cache fingerprints for normalized queries.
//!
//! A fingerprint is the BLAKE3 digest of a length-prefixed encoding of a
//! [`NormalizedQuery`]. Every field is written as `tag | len | bytes`, and
//! optional fields carry a presence byte, so no two distinct normalized
//! queries share an encoding. The scheme is versioned through the domain tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;
use crate::query::NormalizedQuery;

const DOMAIN_TAG: &[u8] = b"scout.search.v1";

/// Fixed-size (256-bit) digest of a normalized search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    /// Fingerprint a normalized query.
    pub fn of(query: &NormalizedQuery) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN_TAG);

        write_field(&mut hasher, b"text", query.text.as_bytes());

        match &query.filters.location {
            Some(location) => write_field(&mut hasher, b"location", location.as_bytes()),
            None => write_absent(&mut hasher, b"location"),
        }

        match query.filters.min_experience {
            Some(years) => write_field(&mut hasher, b"min_experience", &years.to_le_bytes()),
            None => write_absent(&mut hasher, b"min_experience"),
        }

        write_field(
            &mut hasher,
            b"skills",
            &(query.filters.skills.len() as u64).to_le_bytes(),
        );
        for skill in &query.filters.skills {
            write_field(&mut hasher, b"skill", skill.as_bytes());
        }

        write_field(&mut hasher, b"top_k", &(query.top_k as u64).to_le_bytes());

        Self(hasher.finalize())
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// Parse a 64-character hex fingerprint.
    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        blake3::Hash::from_hex(hex)
            .map(Self)
            .map_err(|e| Error::invalid_data(format!("invalid fingerprint '{hex}': {e}")))
    }

    /// Namespaced cache key, e.g. `search:<hex>`.
    pub fn cache_key(&self, namespace: &str) -> String {
        format!("{namespace}:{}", self.0.to_hex())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

fn write_field(hasher: &mut blake3::Hasher, tag: &[u8], value: &[u8]) {
    hasher.update(&(tag.len() as u64).to_le_bytes());
    hasher.update(tag);
    hasher.update(&[1]);
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value);
}

fn write_absent(hasher: &mut blake3::Hasher, tag: &[u8]) {
    hasher.update(&(tag.len() as u64).to_le_bytes());
    hasher.update(tag);
    hasher.update(&[0]);
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

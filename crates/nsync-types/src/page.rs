//! Remote page identifiers.
//!
//! The remote service identifies pages by a 128-bit id that users paste in
//! several shapes: 32 bare hex digits, the dashed UUID form, or a full page
//! URL whose last path segment ends in the id (`My-Page-<32 hex>`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::TypeError;

/// Length of the undashed hex form of a page id.
const SIMPLE_LEN: usize = 32;

/// Identifier of a page on the remote document service.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(Uuid);

impl PageId {
    /// Parse a page id from any of the accepted shapes.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "empty page id"));
        }

        let candidate = last_url_segment(trimmed);
        if let Ok(uuid) = Uuid::try_parse(candidate) {
            return Ok(Self(uuid));
        }

        // `Title-Words-<32 hex>` as found at the end of page URLs.
        if candidate.len() > SIMPLE_LEN {
            let split = candidate.len() - SIMPLE_LEN;
            if candidate.is_char_boundary(split) && candidate[..split].ends_with('-') {
                if let Ok(uuid) = Uuid::try_parse(&candidate[split..]) {
                    return Ok(Self(uuid));
                }
            }
        }

        Err(invalid(input, "expected 32 hex digits or a dashed UUID"))
    }

    /// The dashed (hyphenated) form, as the remote API returns it.
    pub fn hyphenated(&self) -> String {
        self.0.hyphenated().to_string()
    }

    /// The 32-character undashed form used in page URLs.
    pub fn simple(&self) -> String {
        self.0.simple().to_string()
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

fn last_url_segment(input: &str) -> &str {
    let without_query = input
        .split(['?', '#'])
        .next()
        .unwrap_or(input)
        .trim_end_matches('/');
    without_query.rsplit('/').next().unwrap_or(without_query)
}

fn invalid(input: &str, reason: &str) -> TypeError {
    TypeError::InvalidPageId {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.simple())
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hyphenated())
    }
}

impl FromStr for PageId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for PageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Serialize for PageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hyphenated())
    }
}

impl<'de> Deserialize<'de> for PageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

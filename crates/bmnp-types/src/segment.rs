//! Segment and port-mode types.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the VLAN segment a port is bound into (1-4094).
///
/// The controller and the cloud side both pass segmentation ids as
/// strings (`"1001"`), so this type deserializes from either a JSON
/// number or a numeric string and serializes back as a string.
///
/// # Examples
///
/// ```
/// use bmnp_types::SegmentationId;
///
/// let seg: SegmentationId = "1001".parse().unwrap();
/// assert_eq!(seg.as_u16(), 1001);
/// assert!(SegmentationId::new(4095).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct SegmentationId(u16);

impl SegmentationId {
    /// Lowest usable VLAN id.
    pub const MIN: u16 = 1;

    /// Highest usable VLAN id.
    pub const MAX: u16 = 4094;

    /// Creates a segmentation id, validating the VLAN range.
    pub fn new(id: u16) -> Result<Self, ParseError> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(SegmentationId(id))
        } else {
            Err(ParseError::InvalidSegmentationId(id.to_string()))
        }
    }

    /// Returns the raw VLAN id.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for SegmentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SegmentationId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidSegmentationId(s.to_string());
        let id: u16 = s.trim().parse().map_err(|_| invalid())?;
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(SegmentationId(id))
        } else {
            Err(invalid())
        }
    }
}

impl<'de> Deserialize<'de> for SegmentationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.to_string().parse(),
            Raw::Text(s) => s.parse(),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

impl From<SegmentationId> for String {
    fn from(seg: SegmentationId) -> String {
        seg.to_string()
    }
}

impl From<SegmentationId> for u16 {
    fn from(seg: SegmentationId) -> u16 {
        seg.0
    }
}

/// Port mode requested for the bare-metal port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Untagged member of a single segment.
    #[default]
    Access,
    /// Tagged member of one or more segments.
    Trunk,
}

impl AccessType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccessType::Access => "access",
            AccessType::Trunk => "trunk",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "access" => Ok(AccessType::Access),
            "trunk" => Ok(AccessType::Trunk),
            _ => Err(ParseError::InvalidAccessType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_segmentation_range() {
        assert!(SegmentationId::new(1).is_ok());
        assert!(SegmentationId::new(4094).is_ok());
        assert!(SegmentationId::new(0).is_err());
        assert!(SegmentationId::new(4095).is_err());
    }

    #[test]
    fn test_segmentation_parse_error_keeps_input() {
        let err = "vlan7".parse::<SegmentationId>().unwrap_err();
        assert_eq!(err.to_string(), "invalid segmentation id: vlan7 (must be 1-4094)");
    }

    #[test]
    fn test_segmentation_from_string_or_number() {
        let a: SegmentationId = serde_json::from_str("\"1001\"").unwrap();
        let b: SegmentationId = serde_json::from_str("1001").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"1001\"");

        assert!(serde_json::from_str::<SegmentationId>("70000").is_err());
        assert!(serde_json::from_str::<SegmentationId>("\"0\"").is_err());
    }

    #[test]
    fn test_access_type() {
        assert_eq!("ACCESS".parse::<AccessType>().unwrap(), AccessType::Access);
        assert_eq!("trunk".parse::<AccessType>().unwrap(), AccessType::Trunk);
        assert!("hybrid".parse::<AccessType>().is_err());
        assert_eq!(serde_json::to_string(&AccessType::Trunk).unwrap(), "\"trunk\"");
    }
}

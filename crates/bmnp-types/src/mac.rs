//! Switch identifier type.
//!
//! Switches are identified by their chassis MAC address, which the
//! controller reports as colon separated lowercase hex.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit switch chassis MAC address.
///
/// # Examples
///
/// ```
/// use bmnp_types::MacAddress;
///
/// let switch_id: MacAddress = "44:31:92:61:89:d2".parse().unwrap();
/// assert_eq!(switch_id.to_string(), "44:31:92:61:89:d2");
///
/// // Hyphen and dotted (Comware style) formats are accepted too
/// let a: MacAddress = "44-31-92-61-89-D2".parse().unwrap();
/// let b: MacAddress = "4431-9261-89d2".parse().unwrap();
/// assert_eq!(switch_id, a);
/// assert_eq!(switch_id, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Creates a MAC address from raw bytes.
    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    fn parse_grouped(s: &str, separator: char) -> Option<[u8; 6]> {
        let parts: Vec<&str> = s.split(separator).collect();
        if parts.len() != 6 {
            return None;
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return None;
            }
            bytes[i] = u8::from_str_radix(part, 16).ok()?;
        }
        Some(bytes)
    }

    // xxxx-xxxx-xxxx, as printed by Comware switches.
    fn parse_dotted(s: &str) -> Option<[u8; 6]> {
        let groups: Vec<&str> = s.split('-').collect();
        if groups.len() != 3 || groups.iter().any(|g| g.len() != 4) {
            return None;
        }
        let hex: String = groups.concat();

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
        }
        Some(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = if s.contains(':') {
            Self::parse_grouped(s, ':')
        } else if s.matches('-').count() == 5 {
            Self::parse_grouped(s, '-')
        } else {
            Self::parse_dotted(s)
        };

        parsed
            .map(MacAddress)
            .ok_or_else(|| ParseError::InvalidMacAddress(s.to_string()))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

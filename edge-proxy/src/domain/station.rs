//! Station code and station record types.

use std::fmt;

use serde::{Serialize, Serializer};

/// Error returned when parsing an invalid CRS code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid CRS code: {reason}")]
pub struct InvalidCrs {
    reason: &'static str,
}

/// A valid 3-letter CRS (Computer Reservation System) station code.
///
/// CRS codes are always 3 uppercase ASCII letters. This type guarantees
/// that any `Crs` value is valid by construction.
///
/// # Examples
///
/// ```
/// use edge_proxy::domain::Crs;
///
/// let kgx = Crs::parse("KGX").unwrap();
/// assert_eq!(kgx.as_str(), "KGX");
///
/// // Lowercase is rejected
/// assert!(Crs::parse("kgx").is_err());
///
/// // Wrong length is rejected
/// assert!(Crs::parse("KG").is_err());
/// assert!(Crs::parse("KGXX").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs([u8; 3]);

impl Crs {
    /// Parse a CRS code from a string.
    ///
    /// The input must be exactly 3 uppercase ASCII letters (A-Z).
    pub fn parse(s: &str) -> Result<Self, InvalidCrs> {
        let bytes = s.as_bytes();

        if bytes.len() != 3 {
            return Err(InvalidCrs {
                reason: "must be exactly 3 characters",
            });
        }

        for &b in bytes {
            if !b.is_ascii_uppercase() {
                return Err(InvalidCrs {
                    reason: "must be uppercase ASCII letters A-Z",
                });
            }
        }

        Ok(Crs([bytes[0], bytes[1], bytes[2]]))
    }

    /// Extract a CRS code from free-form user input.
    ///
    /// The input is trimmed and uppercased. If the whole input is a code it
    /// is used directly; otherwise the first standalone three-letter word is
    /// taken, so `"London Kings Cross (KGX)"` yields `KGX`.
    ///
    /// ```
    /// use edge_proxy::domain::Crs;
    ///
    /// assert_eq!(Crs::from_input(" kgx ").unwrap().as_str(), "KGX");
    /// assert_eq!(Crs::from_input("Kings Cross (KGX)").unwrap().as_str(), "KGX");
    /// assert!(Crs::from_input("Paddington").is_none());
    /// ```
    pub fn from_input(raw: &str) -> Option<Self> {
        let text = raw.trim().to_uppercase();
        if let Ok(crs) = Crs::parse(&text) {
            return Some(crs);
        }

        text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .find_map(|word| Crs::parse(word).ok())
    }

    /// Returns the CRS code as a string slice.
    pub fn as_str(&self) -> &str {
        // SAFETY: We only store valid ASCII uppercase letters
        std::str::from_utf8(&self.0).unwrap()
    }
}

impl fmt::Debug for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crs({})", self.as_str())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A station in the catalog.
///
/// Records are only constructed from upstream entries that carry both a
/// valid CRS code and a name. Coordinates are optional; a station without
/// them can be found by name but never appears as anyone's neighbour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRecord {
    pub crs: Crs,
    pub name: String,
    /// Lowercase constituent country (`"england"`, `"scotland"`, `"wales"`).
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl StationRecord {
    /// Returns `(lat, lon)` when both coordinates are present and finite.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

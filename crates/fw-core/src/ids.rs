//! Strongly typed identifier wrappers.
//!
//! Feed identifiers (`PlaceUid`, `CityUid`) are plain integers wrapped so a
//! station uid can never be passed where a city uid is expected.  Vehicle
//! numbers are opaque strings: the feed reports them as strings, and leading
//! zeros are significant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
        #[derive(Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(raw: $inner) -> Self {
                $name(raw)
            }
        }
    };
}

typed_id! {
    /// Feed-assigned uid of a place (station or free-floating slot).
    ///
    /// A free-floating slot's uid lives only as long as the vehicle stays put;
    /// station uids are stable.  `0` means the feed omitted the uid.
    pub struct PlaceUid(u64);
}

typed_id! {
    /// Feed-assigned uid of a city (e.g. `362` for Berlin).
    pub struct CityUid(u32);
}

/// Fleet-assigned vehicle number, e.g. `"184203"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleNumber(String);

impl VehicleNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleNumber {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for VehicleNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

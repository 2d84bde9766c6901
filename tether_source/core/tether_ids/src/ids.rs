//! Generational node handles.
//! u64 layout: low 32 bits = arena slot index (0 = nil), high 32 bits = generation.
//! The arena bumps the generation when a slot is reused, so a handle held by a
//! constraint stops resolving once its node is removed.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Node ID, allocated by the scene's node arena. Index + generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeID(pub u64);

impl NodeID {
    #[inline]
    pub const fn nil() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self((index as u64) | ((generation as u64) << 32))
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// Parse a hex handle (1-16 digits, optional `0x` prefix) or the
    /// `index:generation` display form. Short hex forms carry generation 0.
    pub fn parse_str(s: &str) -> Result<Self, String> {
        if let Some((index, generation)) = s.split_once(':') {
            let index = index
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid NodeID index `{index}`: {e}"))?;
            let generation = generation
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid NodeID generation `{generation}`: {e}"))?;
            return Ok(Self::from_parts(index, generation));
        }
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.is_empty() || s.len() > 16 {
            return Err(format!("invalid NodeID `{s}`: expected 1-16 hex digits"));
        }
        if s.len() <= 8 {
            u32::from_str_radix(s, 16)
                .map(|index| Self::from_parts(index, 0))
                .map_err(|e| format!("invalid NodeID `{s}`: {e}"))
        } else {
            u64::from_str_radix(s, 16)
                .map(Self::from_u64)
                .map_err(|e| format!("invalid NodeID `{s}`: {e}"))
        }
    }
}

impl Default for NodeID {
    fn default() -> Self {
        Self::nil()
    }
}

impl FromStr for NodeID {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl fmt::Debug for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeID({}:{})", self.index(), self.generation())
    }
}

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index(), self.generation())
    }
}

impl Serialize for NodeID {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:016x}", self.0))
    }
}

impl<'de> Deserialize<'de> for NodeID {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = NodeID;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("hex string (8 or 16 chars) or u64")
            }
            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                NodeID::parse_str(v).map_err(E::custom)
            }
            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(NodeID::from_u64(v))
            }
        }
        deserializer.deserialize_any(Visitor)
    }
}

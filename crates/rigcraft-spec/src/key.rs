//! Structured joint identifiers.
//!
//! A [`JointKey`] uniquely addresses one joint within a skeleton layer. The
//! build pipeline rewrites scene names many times, so keys are the only
//! caller-facing identity; the textual form (`l_shoulder`, `c_spine03`,
//! `r_thumb01`) exists for serialization and display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which side of the character a joint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Left-side joint (`l` prefix).
    Left,
    /// Right-side joint (`r` prefix).
    Right,
    /// Center-line joint (`c` prefix).
    Center,
}

impl Side {
    /// Returns the single-letter name prefix for this side.
    pub fn prefix(&self) -> &'static str {
        match self {
            Side::Left => "l",
            Side::Right => "r",
            Side::Center => "c",
        }
    }

    /// Returns the opposite side. Center is its own mirror.
    pub fn mirrored(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Center => Side::Center,
        }
    }
}

/// A structured joint identifier: side, semantic name, optional sequence.
///
/// A key with no sequence number denotes a singleton joint (root, pelvis,
/// head). Sequence numbers render zero-padded to two digits, matching the
/// template data (`l_thumb01`, `c_spine05`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JointKey {
    /// Side tag.
    pub side: Side,
    /// Semantic joint name (`shoulder`, `spine`, `thumb`, ...).
    pub name: String,
    /// Optional sequence number within a chain.
    pub seq: Option<u32>,
}

impl JointKey {
    /// Creates a singleton key (no sequence number).
    pub fn new(side: Side, name: impl Into<String>) -> Self {
        Self {
            side,
            name: name.into(),
            seq: None,
        }
    }

    /// Creates a sequenced key.
    pub fn seq(side: Side, name: impl Into<String>, seq: u32) -> Self {
        Self {
            side,
            name: name.into(),
            seq: Some(seq),
        }
    }

    /// Center-line singleton shorthand.
    pub fn center(name: impl Into<String>) -> Self {
        Self::new(Side::Center, name)
    }

    /// Returns this key with the side mirrored.
    pub fn mirrored(&self) -> Self {
        Self {
            side: self.side.mirrored(),
            name: self.name.clone(),
            seq: self.seq,
        }
    }

    /// Returns this key with a different sequence number.
    pub fn with_seq(&self, seq: u32) -> Self {
        Self {
            side: self.side,
            name: self.name.clone(),
            seq: Some(seq),
        }
    }
}

impl fmt::Display for JointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.seq {
            Some(n) => write!(f, "{}_{}{:02}", self.side.prefix(), self.name, n),
            None => write!(f, "{}_{}", self.side.prefix(), self.name),
        }
    }
}

/// Error returned when a key string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeyError(String);

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid joint key '{}'", self.0)
    }
}

impl std::error::Error for ParseKeyError {}

impl FromStr for JointKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, rest) = s
            .split_once('_')
            .ok_or_else(|| ParseKeyError(s.to_string()))?;
        let side = match prefix {
            "l" => Side::Left,
            "r" => Side::Right,
            "c" => Side::Center,
            _ => return Err(ParseKeyError(s.to_string())),
        };
        if rest.is_empty() {
            return Err(ParseKeyError(s.to_string()));
        }

        // Trailing digits form the sequence number; the rest is the name.
        let digit_start = rest
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i);

        match digit_start {
            Some(i) if i > 0 => {
                let seq: u32 = rest[i..].parse().map_err(|_| ParseKeyError(s.to_string()))?;
                Ok(JointKey::seq(side, &rest[..i], seq))
            }
            _ => Ok(JointKey::new(side, rest)),
        }
    }
}

impl Serialize for JointKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JointKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_round_trip() {
        let cases = [
            JointKey::new(Side::Left, "shoulder"),
            JointKey::seq(Side::Center, "spine", 3),
            JointKey::seq(Side::Right, "thumb", 1),
            JointKey::center("root"),
        ];
        for key in cases {
            let text = key.to_string();
            let parsed: JointKey = text.parse().unwrap();
            assert_eq!(parsed, key, "round-trip of '{text}'");
        }
    }

    #[test]
    fn parse_zero_padded_sequence() {
        let key: JointKey = "l_thumb01".parse().unwrap();
        assert_eq!(key, JointKey::seq(Side::Left, "thumb", 1));
        assert_eq!(key.to_string(), "l_thumb01");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("shoulder".parse::<JointKey>().is_err());
        assert!("x_shoulder".parse::<JointKey>().is_err());
        assert!("l_".parse::<JointKey>().is_err());
    }

    #[test]
    fn mirrored_flips_side_only() {
        let key = JointKey::seq(Side::Left, "index", 2);
        assert_eq!(key.mirrored(), JointKey::seq(Side::Right, "index", 2));
        assert_eq!(JointKey::center("root").mirrored(), JointKey::center("root"));
    }

    #[test]
    fn serde_uses_string_form() {
        let key = JointKey::seq(Side::Left, "extraFingerA", 1);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"l_extraFingerA01\"");
        let back: JointKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}

//! Identifier module.
//!
//! Provides the interned string identifiers used throughout the engine:
//! `PlayerId`, `TeamId` and `HoleId`. Each wraps an `Arc<str>` so clones are
//! cheap and comparisons are plain string comparisons.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create a new identifier from a string slice.
            pub fn from_str(s: &str) -> Self {
                Self(Arc::from(s))
            }

            /// Get the string representation of this identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                self.0.as_ref().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                // Hole numbers and team numbers frequently arrive as JSON numbers.
                let value = serde_json::Value::deserialize(deserializer)?;
                match value {
                    serde_json::Value::String(s) => Ok(Self::from(s)),
                    serde_json::Value::Number(n) => Ok(Self::from(n.to_string())),
                    other => Err(serde::de::Error::custom(format!(
                        "expected string or number for {}, got {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_str(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a player in a game.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use golfjunk::PlayerId;
    ///
    /// let p1 = PlayerId::from_str("p1");
    /// let p1b: PlayerId = "p1".into();
    /// assert_eq!(p1, p1b);
    /// ```
    PlayerId
);

string_id!(
    /// Identifier of a team on a hole (usually "1", "2", ...).
    TeamId
);

string_id!(
    /// Identifier of a hole, as recorded by the game ("1" through "18").
    ///
    /// # Examples
    ///
    /// ```rust
    /// use golfjunk::HoleId;
    ///
    /// let hole = HoleId::from_str("10");
    /// assert_eq!(hole.number(), Some(10));
    /// assert_eq!(hole.nine(), Some(1));
    /// ```
    HoleId
);

impl HoleId {
    /// Numeric hole number, if the identifier is a positive integer.
    pub fn number(&self) -> Option<u32> {
        self.0.trim().parse::<u32>().ok().filter(|n| *n > 0)
    }

    /// Zero-based nine the hole belongs to: 0 for holes 1-9, 1 for 10-18.
    ///
    /// Returns `None` for non-numeric identifiers.
    pub fn nine(&self) -> Option<u32> {
        self.number().map(|n| (n - 1) / 9)
    }

    /// The hole with the number immediately before this one.
    ///
    /// Returns `None` for hole 1 and for non-numeric identifiers.
    pub fn previous(&self) -> Option<HoleId> {
        match self.number() {
            Some(n) if n > 1 => Some(HoleId::from((n - 1).to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id1 = PlayerId::from_str("p1");
        let id2 = PlayerId::from_str("p1");
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str(), "p1");
    }

    #[test]
    fn test_id_from_string() {
        let id: TeamId = String::from("2").into();
        assert_eq!(id.as_str(), "2");
    }

    #[test]
    fn test_id_ordering() {
        let a = PlayerId::from_str("alice");
        let b = PlayerId::from_str("bob");
        assert!(a < b);
    }

    #[test]
    fn test_id_deserializes_numbers() {
        let hole: HoleId = serde_json::from_str("7").unwrap();
        assert_eq!(hole.as_str(), "7");
        let team: TeamId = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(team.as_str(), "1");
        assert!(serde_json::from_str::<HoleId>("true").is_err());
    }

    #[test]
    fn test_hole_nines() {
        assert_eq!(HoleId::from_str("1").nine(), Some(0));
        assert_eq!(HoleId::from_str("9").nine(), Some(0));
        assert_eq!(HoleId::from_str("10").nine(), Some(1));
        assert_eq!(HoleId::from_str("18").nine(), Some(1));
        assert_eq!(HoleId::from_str("0").nine(), None);
        assert_eq!(HoleId::from_str("back").nine(), None);
    }

    #[test]
    fn test_hole_previous() {
        assert_eq!(HoleId::from_str("1").previous(), None);
        assert_eq!(HoleId::from_str("10").previous(), Some(HoleId::from_str("9")));
    }
}

//! Declared behaviours of Qth topics.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Role a topic declares in its parent directory listing.
///
/// Listings may carry behaviour strings this client does not know; those are
/// kept verbatim in [`Behaviour::Other`] so they can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Behaviour {
    /// A subdirectory with its own listing.
    Directory,
    /// A retained value with one producer and many consumers.
    PropertyOneToMany,
    /// A retained value with many producers and one consumer.
    PropertyManyToOne,
    /// A transient notification with one producer and many consumers.
    EventOneToMany,
    /// A transient notification with many producers and one consumer.
    EventManyToOne,
    /// Any behaviour string not listed above.
    Other(String),
}

impl Behaviour {
    /// Canonical wire spelling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Directory => "DIRECTORY",
            Self::PropertyOneToMany => "PROPERTY-1:N",
            Self::PropertyManyToOne => "PROPERTY-N:1",
            Self::EventOneToMany => "EVENT-1:N",
            Self::EventManyToOne => "EVENT-N:1",
            Self::Other(raw) => raw,
        }
    }

    /// Property behaviour for the given direction.
    #[must_use]
    pub const fn property(one_to_many: bool) -> Self {
        if one_to_many {
            Self::PropertyOneToMany
        } else {
            Self::PropertyManyToOne
        }
    }

    /// Event behaviour for the given direction.
    #[must_use]
    pub const fn event(one_to_many: bool) -> Self {
        if one_to_many {
            Self::EventOneToMany
        } else {
            Self::EventManyToOne
        }
    }

    /// Whether this is [`Behaviour::Directory`].
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl From<&str> for Behaviour {
    fn from(raw: &str) -> Self {
        match raw {
            "DIRECTORY" => Self::Directory,
            "PROPERTY-1:N" => Self::PropertyOneToMany,
            "PROPERTY-N:1" => Self::PropertyManyToOne,
            "EVENT-1:N" => Self::EventOneToMany,
            "EVENT-N:1" => Self::EventManyToOne,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl FromStr for Behaviour {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(raw))
    }
}

impl fmt::Display for Behaviour {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("DIRECTORY", Behaviour::Directory)]
    #[case("PROPERTY-1:N", Behaviour::PropertyOneToMany)]
    #[case("PROPERTY-N:1", Behaviour::PropertyManyToOne)]
    #[case("EVENT-1:N", Behaviour::EventOneToMany)]
    #[case("EVENT-N:1", Behaviour::EventManyToOne)]
    fn known_behaviours_round_trip(#[case] raw: &str, #[case] expected: Behaviour) {
        let parsed = Behaviour::from(raw);
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), raw);
    }

    #[test]
    fn unknown_behaviours_are_preserved() {
        let parsed = Behaviour::from("STREAM-1:N");
        assert_eq!(parsed, Behaviour::Other(String::from("STREAM-1:N")));
        assert_eq!(parsed.as_str(), "STREAM-1:N");
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(matches!(Behaviour::from("directory"), Behaviour::Other(_)));
    }
}

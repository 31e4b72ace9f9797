//! Directory listings: the retained metadata describing a directory's children.

use serde_json::Value;

use crate::behaviour::Behaviour;

/// One behaviour declared for a child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    behaviour: Behaviour,
    description: Option<String>,
}

impl ListingEntry {
    /// Declared behaviour.
    #[must_use]
    pub const fn behaviour(&self) -> &Behaviour {
        &self.behaviour
    }

    /// Free-text description, when the listing provides one.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A validated directory listing, children in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    children: Vec<(String, Vec<ListingEntry>)>,
}

impl DirectoryListing {
    /// Interprets a parsed JSON value as a directory listing.
    ///
    /// The value must be an object whose values are arrays of objects, each
    /// carrying a string `behaviour` field. Returns `None` otherwise. Any
    /// other fields are ignored.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let children = object
            .iter()
            .map(|(name, entries)| {
                let declared = entries
                    .as_array()?
                    .iter()
                    .map(parse_entry)
                    .collect::<Option<Vec<_>>>()?;
                Some((name.clone(), declared))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { children })
    }

    /// Children and their declared entries, in listing order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &[ListingEntry])> {
        self.children
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// Entries declared for the child called `name`, if it is listed.
    #[must_use]
    pub fn entries(&self, name: &str) -> Option<&[ListingEntry]> {
        self.children
            .iter()
            .find(|(child, _)| child == name)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Whether `name` is listed with `behaviour` among its entries.
    #[must_use]
    pub fn has_behaviour(&self, name: &str, behaviour: &Behaviour) -> bool {
        self.entries(name)
            .is_some_and(|entries| entries.iter().any(|entry| &entry.behaviour == behaviour))
    }

    /// Whether the path segment `segment` is listed as a subdirectory.
    ///
    /// Listings name subdirectories either bare or with a trailing `/`; both
    /// spellings are accepted.
    #[must_use]
    pub fn has_subdirectory(&self, segment: &str) -> bool {
        self.has_behaviour(segment, &Behaviour::Directory)
            || self.has_behaviour(&format!("{segment}/"), &Behaviour::Directory)
    }

    /// Number of listed children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the listing has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

fn parse_entry(entry: &Value) -> Option<ListingEntry> {
    let object = entry.as_object()?;
    let behaviour = object.get("behaviour")?.as_str()?;
    Some(ListingEntry {
        behaviour: Behaviour::from(behaviour),
        description: object
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_well_formed_listing() {
        let value = json!({
            "lights/": [{"behaviour": "DIRECTORY", "description": "Lighting"}],
            "temp": [{"behaviour": "PROPERTY-1:N", "extra": 1}],
        });
        let listing = DirectoryListing::from_value(&value).expect("valid listing");
        let names: Vec<&str> = listing.children().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["lights/", "temp"]);
        let lights = listing.entries("lights/").expect("lights listed");
        assert_eq!(lights.first().and_then(ListingEntry::description), Some("Lighting"));
        assert!(listing.has_behaviour("temp", &Behaviour::PropertyOneToMany));
    }

    #[test]
    fn empty_object_is_a_valid_listing() {
        let listing = DirectoryListing::from_value(&json!({})).expect("valid listing");
        assert!(listing.is_empty());
    }

    #[rstest]
    #[case(json!([]))]
    #[case(json!("DIRECTORY"))]
    #[case(json!({"a": {"behaviour": "DIRECTORY"}}))]
    #[case(json!({"a": ["DIRECTORY"]}))]
    #[case(json!({"a": [{"description": "no behaviour"}]}))]
    #[case(json!({"a": [{"behaviour": 3}]}))]
    #[case(json!({"a": [{"behaviour": "DIRECTORY"}], "b": [null]}))]
    fn rejects_malformed_listings(#[case] value: Value) {
        assert!(DirectoryListing::from_value(&value).is_none());
    }

    #[rstest]
    #[case(json!({"foo": [{"behaviour": "DIRECTORY"}]}))]
    #[case(json!({"foo/": [{"behaviour": "DIRECTORY"}]}))]
    #[case(json!({"foo": [{"behaviour": "EVENT-1:N"}, {"behaviour": "DIRECTORY"}]}))]
    fn recognises_subdirectories(#[case] value: Value) {
        let listing = DirectoryListing::from_value(&value).expect("valid listing");
        assert!(listing.has_subdirectory("foo"));
    }

    #[test]
    fn non_directory_child_is_not_a_subdirectory() {
        let listing = DirectoryListing::from_value(&json!({"foo": [{"behaviour": "PROPERTY-1:N"}]}))
            .expect("valid listing");
        assert!(!listing.has_subdirectory("foo"));
        assert!(!listing.has_subdirectory("bar"));
    }
}

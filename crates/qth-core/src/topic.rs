//! Topic string helpers and directory listing topic names.

/// Listing topic describing the root directory.
pub const LISTING_ROOT: &str = "meta/ls/";

/// Directory part of `topic`: everything up to and including the final `/`.
///
/// Empty when the topic has no `/`.
#[must_use]
pub fn path(topic: &str) -> &str {
    topic.rfind('/').map_or("", |index| topic.split_at(index + 1).0)
}

/// Leaf part of `topic`: everything after the final `/`.
#[must_use]
pub fn name(topic: &str) -> &str {
    topic.rfind('/').map_or(topic, |index| topic.split_at(index + 1).1)
}

/// Whether `path` names a directory (empty, or ending in `/`).
#[must_use]
pub fn is_directory_path(path: &str) -> bool {
    path.is_empty() || path.ends_with('/')
}

/// Splits a directory path into its segments, without separators.
///
/// `"a/b/"` yields `["a", "b"]`; the root path yields nothing.
#[must_use]
pub fn segments(path: &str) -> Vec<&str> {
    match path.strip_suffix('/') {
        Some(trimmed) => trimmed.split('/').collect(),
        None if path.is_empty() => Vec::new(),
        None => path.split('/').collect(),
    }
}

/// Listing topics for every level from the root down to `path`.
///
/// Level 0 is [`LISTING_ROOT`]; level *i* appends the first *i* segments,
/// each followed by `/`.
#[must_use]
pub fn listing_topics(path: &str) -> Vec<String> {
    let mut topics = Vec::with_capacity(segments(path).len() + 1);
    let mut current = String::from(LISTING_ROOT);
    topics.push(current.clone());
    for segment in segments(path) {
        current.push_str(segment);
        current.push('/');
        topics.push(current.clone());
    }
    topics
}

/// Directory path of `child` beneath `parent`.
///
/// Child names that already carry a trailing `/` are not given a second one.
#[must_use]
pub fn child_directory(parent: &str, child: &str) -> String {
    let mut joined = String::with_capacity(parent.len() + child.len() + 1);
    joined.push_str(parent);
    joined.push_str(child.trim_end_matches('/'));
    joined.push('/');
    joined
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("lights/kitchen", "lights/", "kitchen")]
    #[case("a/b/c", "a/b/", "c")]
    #[case("temp", "", "temp")]
    #[case("dir/", "dir/", "")]
    #[case("", "", "")]
    fn splits_path_and_name(#[case] topic: &str, #[case] expected_path: &str, #[case] leaf: &str) {
        assert_eq!(path(topic), expected_path);
        assert_eq!(name(topic), leaf);
    }

    #[rstest]
    #[case("", &[])]
    #[case("foo/", &["foo"])]
    #[case("foo/bar/", &["foo", "bar"])]
    fn segments_of_directory_paths(#[case] dir: &str, #[case] expected: &[&str]) {
        assert_eq!(segments(dir), expected);
    }

    #[test]
    fn listing_topics_cover_every_level() {
        assert_eq!(
            listing_topics("foo/bar/"),
            vec!["meta/ls/", "meta/ls/foo/", "meta/ls/foo/bar/"]
        );
        assert_eq!(listing_topics(""), vec!["meta/ls/"]);
    }

    #[rstest]
    #[case("", "lights", "lights/")]
    #[case("home/", "lights/", "home/lights/")]
    fn child_directories_have_single_separator(
        #[case] parent: &str,
        #[case] child: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(child_directory(parent, child), expected);
    }

    #[rstest]
    #[case("", true)]
    #[case("a/", true)]
    #[case("a", false)]
    fn directory_paths(#[case] candidate: &str, #[case] expected: bool) {
        assert_eq!(is_directory_path(candidate), expected);
    }
}

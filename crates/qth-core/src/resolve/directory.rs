use std::time::Duration;

use tracing::{debug, warn};

use crate::error::QthError;
use crate::json;
use crate::listing::DirectoryListing;
use crate::topic;
use crate::transport::{Message, QoS, Transport};

/// A verified directory listing and the text it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    path: String,
    text: String,
    listing: DirectoryListing,
}

impl Directory {
    /// Directory path that was resolved.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Listing exactly as the broker delivered it.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed listing.
    #[must_use]
    pub const fn listing(&self) -> &DirectoryListing {
        &self.listing
    }

    /// Consumes the directory, returning the listing text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Fetches and verifies the listing for the directory `path`.
///
/// Every level from the root down to `path` is subscribed in one request so
/// that their retained snapshots arrive together. Each ancestor must list the
/// next path segment as a `DIRECTORY`; the deepest level must itself be a
/// directory listing. When a level delivers more than one snapshot, the last
/// one received wins.
///
/// # Errors
///
/// Fails when `path` is not a directory path, when the transport fails, when
/// any level stays silent for longer than `meta_timeout`, when a snapshot is
/// not valid JSON, or when any level does not confirm the directory exists.
pub fn resolve<T>(
    transport: &mut T,
    path: &str,
    meta_timeout: Duration,
) -> Result<Directory, QthError>
where
    T: Transport + ?Sized,
{
    if !topic::is_directory_path(path) {
        return Err(QthError::InvalidDirectoryPath {
            path: path.to_owned(),
        });
    }

    let levels = Levels::new(path);
    debug!(path, levels = levels.topics.len(), "resolving directory");

    let outcome = transport
        .subscribe(&levels.topics, QoS::ExactlyOnce)
        .map_err(|source| QthError::ListingSubscribe { source })
        .and_then(|()| levels.collect(transport, meta_timeout));

    if let Err(error) = transport.unsubscribe(&levels.topics) {
        warn!(path, %error, "failed to unsubscribe from directory listings");
    }
    outcome
}

/// Bookkeeping for one resolution: the listing topic of each level and
/// whether it has been confirmed yet.
struct Levels<'a> {
    path: &'a str,
    segments: Vec<&'a str>,
    topics: Vec<String>,
}

impl<'a> Levels<'a> {
    fn new(path: &'a str) -> Self {
        Self {
            path,
            segments: topic::segments(path),
            topics: topic::listing_topics(path),
        }
    }

    const fn leaf_level(&self) -> usize {
        self.segments.len()
    }

    fn collect<T>(&self, transport: &mut T, meta_timeout: Duration) -> Result<Directory, QthError>
    where
        T: Transport + ?Sized,
    {
        let mut verified = vec![false; self.topics.len()];
        let mut leaf: Option<(String, DirectoryListing)> = None;

        while verified.contains(&false) {
            let message = transport
                .receive(meta_timeout)
                .map_err(|source| QthError::ListingReceive { source })?
                .ok_or_else(|| QthError::ListingTimeout {
                    path: self.path.to_owned(),
                })?;

            let Some(level) = self.topics.iter().position(|topic| *topic == message.topic) else {
                debug!(topic = %message.topic, "ignoring message outside the listing levels");
                continue;
            };

            let listing = self.check_level(level, &message)?;
            if level == self.leaf_level() {
                leaf = Some(listing);
            }
            if let Some(flag) = verified.get_mut(level) {
                *flag = true;
            }
        }

        let (text, listing) = leaf.ok_or_else(|| self.not_found())?;
        Ok(Directory {
            path: self.path.to_owned(),
            text,
            listing,
        })
    }

    fn check_level(
        &self,
        level: usize,
        message: &Message,
    ) -> Result<(String, DirectoryListing), QthError> {
        let (text, value) =
            json::parse_bytes(&message.payload).map_err(|source| QthError::InvalidListing {
                topic: message.topic.clone(),
                source,
            })?;
        let Some(listing) = DirectoryListing::from_value(&value) else {
            debug!(topic = %message.topic, "snapshot is not a directory listing");
            return Err(self.not_found());
        };

        if let Some(segment) = self.segments.get(level)
            && !listing.has_subdirectory(segment)
        {
            debug!(topic = %message.topic, segment, "level does not list the next directory");
            return Err(self.not_found());
        }
        Ok((text.to_owned(), listing))
    }

    fn not_found(&self) -> QthError {
        QthError::DirectoryNotFound {
            path: self.path.to_owned(),
        }
    }
}

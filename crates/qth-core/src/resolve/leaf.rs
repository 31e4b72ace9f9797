use std::time::Duration;

use crate::behaviour::Behaviour;
use crate::error::QthError;
use crate::topic;
use crate::transport::Transport;

use super::directory::resolve;

/// Checks that `topic` declares `desired` among its behaviours.
///
/// # Errors
///
/// Propagates resolution failures for the parent directory, and fails when
/// the topic is not listed or lacks `desired`.
pub fn verify<T>(
    transport: &mut T,
    topic: &str,
    desired: &Behaviour,
    meta_timeout: Duration,
) -> Result<(), QthError>
where
    T: Transport + ?Sized,
{
    let declared = declared_behaviours(transport, topic, meta_timeout)?;
    if declared.contains(desired) {
        Ok(())
    } else {
        Err(QthError::MissingBehaviour {
            topic: topic.to_owned(),
            behaviour: desired.clone(),
        })
    }
}

/// Returns the single non-directory behaviour `topic` declares.
///
/// # Errors
///
/// Propagates resolution failures for the parent directory, and fails when
/// the topic is not listed, is only a directory, or declares more than one
/// non-directory behaviour.
pub fn detect<T>(transport: &mut T, topic: &str, meta_timeout: Duration) -> Result<Behaviour, QthError>
where
    T: Transport + ?Sized,
{
    let declared = declared_behaviours(transport, topic, meta_timeout)?;
    let mut candidates = declared.into_iter().filter(|behaviour| !behaviour.is_directory());
    match (candidates.next(), candidates.next()) {
        (Some(behaviour), None) => Ok(behaviour),
        (Some(_), Some(_)) => Err(QthError::MultipleBehaviours {
            topic: topic.to_owned(),
        }),
        (None, _) => Err(QthError::TopicIsDirectory {
            topic: topic.to_owned(),
        }),
    }
}

fn declared_behaviours<T>(
    transport: &mut T,
    topic: &str,
    meta_timeout: Duration,
) -> Result<Vec<Behaviour>, QthError>
where
    T: Transport + ?Sized,
{
    let directory = resolve(transport, topic::path(topic), meta_timeout)?;
    directory
        .listing()
        .entries(topic::name(topic))
        .map(|entries| entries.iter().map(|entry| entry.behaviour().clone()).collect())
        .ok_or_else(|| QthError::TopicNotFound {
            topic: topic.to_owned(),
        })
}

use tracing::debug;

use crate::behaviour::Behaviour;
use crate::error::QthError;
use crate::resolve::detect;
use crate::transport::Transport;

use super::{CommandConfig, CommandKind, Plan};

/// Chooses a concrete command for an automatic invocation.
///
/// The topic's declared behaviour picks the command: `PROPERTY-1:N` gets,
/// `PROPERTY-N:1` sets, `EVENT-1:N` watches, and `EVENT-N:1` sends. Unless
/// strict, property commands then follow the caller: a set without a value
/// becomes a get, and a get with a value becomes a set. The returned plan is
/// not verified again by the read or write loop.
///
/// # Errors
///
/// Propagates [`detect`] failures, and fails for behaviours no command
/// handles or when a value is supplied to a read.
pub fn dispatch_auto<T>(config: &CommandConfig, transport: &mut T) -> Result<Plan, QthError>
where
    T: Transport + ?Sized,
{
    let behaviour = detect(transport, config.topic(), config.meta_timeout())?;
    let provisional = match behaviour {
        Behaviour::PropertyOneToMany => CommandKind::Get,
        Behaviour::PropertyManyToOne => CommandKind::Set,
        Behaviour::EventOneToMany => CommandKind::Watch,
        Behaviour::EventManyToOne => CommandKind::Send,
        Behaviour::Directory | Behaviour::Other(_) => {
            return Err(QthError::UnsupportedBehaviour {
                topic: config.topic().to_owned(),
                behaviour,
            });
        }
    };

    let supplied = config.value().is_supplied();
    let kind = match provisional {
        CommandKind::Set if !config.strict() && !supplied => CommandKind::Get,
        CommandKind::Get if !config.strict() && supplied => CommandKind::Set,
        other => other,
    };
    debug!(topic = config.topic(), %behaviour, %kind, "dispatched automatic command");

    // Behaviour was just detected; a flipped property would fail a re-check.
    Plan::settle(kind, config.value().clone(), || behaviour).map(Plan::verified)
}

//! Channel expansion for resolved targets.

use crate::external::{NotificationTarget, NotifyChannel};
use crate::incident::IncidentPriority;

/// Expands a target into the channels it should be reached on.
///
/// The push channel is always included. SMS and email follow the target's
/// preferences. Voice is reserved for critical incidents only, regardless
/// of preference.
pub fn expand_channels(
    target: &NotificationTarget,
    priority: IncidentPriority,
) -> Vec<NotifyChannel> {
    let mut channels = vec![NotifyChannel::Push];
    for channel in &target.channels {
        match channel {
            NotifyChannel::Push => {}
            NotifyChannel::Voice => {
                if priority == IncidentPriority::Critical && !channels.contains(channel) {
                    channels.push(*channel);
                }
            }
            NotifyChannel::Sms | NotifyChannel::Email => {
                if !channels.contains(channel) {
                    channels.push(*channel);
                }
            }
        }
    }
    channels
}

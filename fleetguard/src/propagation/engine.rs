//! The propagation engine.

use super::result::{ChannelOutcome, PropagationResult};
use super::targets::expand_channels;
use crate::config::PropagationSettings;
use crate::dispatch::OpsAlert;
use crate::external::{
    min_rank_for, topic, BroadcastBus, ChannelError, ChannelSender, NotificationMessage,
    NotificationTarget, NotifyChannel, OperatorDirectory, PushRegistry,
};
use crate::incident::Incident;
use crate::metrics::MetricsClient;
use crate::store::{IncidentStore, IncidentUpdate};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Push event name for targeted incident alerts.
const PUSH_EVENT_ALERT: &str = "incident_alert";

/// Push event name for the critical fast-path broadcast.
const PUSH_EVENT_CRITICAL: &str = "critical_alert";

/// Fans incident notifications out to every relevant operator.
pub struct PropagationEngine {
    directory: Arc<dyn OperatorDirectory>,
    senders: BTreeMap<NotifyChannel, Arc<dyn ChannelSender>>,
    push: Arc<dyn PushRegistry>,
    bus: Arc<dyn BroadcastBus>,
    store: Arc<dyn IncidentStore>,
    metrics: MetricsClient,
    settings: PropagationSettings,
}

impl PropagationEngine {
    pub fn new(
        directory: Arc<dyn OperatorDirectory>,
        senders: Vec<Arc<dyn ChannelSender>>,
        push: Arc<dyn PushRegistry>,
        bus: Arc<dyn BroadcastBus>,
        store: Arc<dyn IncidentStore>,
        metrics: MetricsClient,
        settings: PropagationSettings,
    ) -> Self {
        let senders = senders
            .into_iter()
            .map(|sender| (sender.channel(), sender))
            .collect();
        Self {
            directory,
            senders,
            push,
            bus,
            store,
            metrics,
            settings,
        }
    }

    /// Propagates one incident: fast path (critical only) in parallel with
    /// the targeted fan-out, then updates the incident's fan-out
    /// bookkeeping. Failures are counted, never raised.
    pub async fn propagate(&self, incident: &Incident, alert: &OpsAlert) -> PropagationResult {
        let started = Instant::now();

        let stamp_start = IncidentUpdate {
            propagation_started_at: Some(Utc::now()),
            ..Default::default()
        };
        if let Err(error) = self.store.update(incident.id, stamp_start).await {
            warn!(incident_id = %incident.id, %error, "Failed to stamp propagation start");
        }

        // The fast path must never wait on directory resolution.
        let (mut result, _) = tokio::join!(
            self.fan_out_targeted(incident, alert),
            self.fast_path(incident, alert),
        );
        result.duration = started.elapsed();

        let bookkeeping = IncidentUpdate {
            propagation_completed_at: Some(Utc::now()),
            add_notified_operators: result.notified_ids.clone(),
            add_notification_attempts: result.result.attempts() as u32,
            ..Default::default()
        };
        if let Err(error) = self.store.update(incident.id, bookkeeping).await {
            warn!(incident_id = %incident.id, %error, "Failed to store propagation bookkeeping");
        }

        let mut outcome = result.result;
        outcome.duration = result.duration;
        self.metrics.propagation_completed(
            outcome.targets_resolved,
            outcome.notified,
            outcome.failed,
            outcome.duration.as_millis() as u64,
        );

        info!(
            incident_id = %incident.id,
            targets = outcome.targets_resolved,
            notified = outcome.notified,
            failed = outcome.failed,
            duration_ms = outcome.duration.as_millis() as u64,
            "Propagation completed"
        );

        outcome
    }

    /// Critical fast path: broadcast to every connected push listener and
    /// the bus, bypassing per-target resolution.
    async fn fast_path(&self, incident: &Incident, alert: &OpsAlert) {
        if incident.priority != crate::incident::IncidentPriority::Critical {
            return;
        }

        let payload = match serde_json::to_value(alert) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(incident_id = %incident.id, %error, "Failed to serialize fast-path alert");
                return;
            }
        };

        let (push_result, bus_result) = tokio::join!(
            self.push.broadcast_to_all(PUSH_EVENT_CRITICAL, payload.clone()),
            self.bus.publish(topic::INCIDENT_CRITICAL, payload),
        );
        if let Err(error) = push_result {
            warn!(incident_id = %incident.id, %error, "Fast-path push broadcast failed");
        }
        if let Err(error) = bus_result {
            warn!(incident_id = %incident.id, %error, "Fast-path bus publish failed");
        }
    }

    /// Resolves targets and fans out per channel with bounded concurrency.
    async fn fan_out_targeted(&self, incident: &Incident, alert: &OpsAlert) -> FanOut {
        let min_rank = min_rank_for(incident.priority);
        let targets = match self
            .directory
            .resolve_targets(&incident.region_id, min_rank)
            .await
        {
            Ok(targets) => targets,
            Err(error) => {
                warn!(incident_id = %incident.id, %error, "Target resolution failed");
                let _ = self
                    .bus
                    .publish(
                        topic::PIPELINE_FAILURE,
                        json!({
                            "incident_id": incident.id,
                            "stage": "target_resolution",
                            "error": error.to_string(),
                        }),
                    )
                    .await;
                return FanOut {
                    result: PropagationResult {
                        directory_failed: true,
                        ..Default::default()
                    },
                    notified_ids: Vec::new(),
                    duration: Default::default(),
                };
            }
        };

        let message = NotificationMessage::for_incident(incident);
        self.deliver(incident, &targets, &message, alert).await
    }

    /// Delivers a message to a resolved target set. Also used by the
    /// escalation monitor with a broader target set and message.
    pub(crate) async fn deliver(
        &self,
        incident: &Incident,
        targets: &[NotificationTarget],
        message: &NotificationMessage,
        alert: &OpsAlert,
    ) -> FanOut {
        let mut by_channel: BTreeMap<NotifyChannel, Vec<NotificationTarget>> = BTreeMap::new();
        for target in targets {
            for channel in expand_channels(target, incident.priority) {
                by_channel.entry(channel).or_default().push(target.clone());
            }
        }

        let alert_payload = serde_json::to_value(alert).unwrap_or_else(|_| json!(null));
        let channel_futures = by_channel.into_iter().map(|(channel, batch)| {
            let message = message.clone();
            let alert_payload = alert_payload.clone();
            async move {
                self.send_channel_batch(channel, batch, message, alert_payload)
                    .await
            }
        });
        let channel_results = futures::future::join_all(channel_futures).await;

        let mut result = PropagationResult {
            targets_resolved: targets.len(),
            ..Default::default()
        };
        let mut notified_ids = BTreeSet::new();
        for (outcome, ok_ids) in channel_results {
            result.notified += outcome.sent;
            result.failed += outcome.failed;
            result.channels.push(outcome);
            notified_ids.extend(ok_ids);
        }

        FanOut {
            result,
            notified_ids: notified_ids.into_iter().collect(),
            duration: Default::default(),
        }
    }

    /// Sends one channel's batch in chunks, each chunk with a bounded
    /// number of in-flight sends. Every send has its own timeout and never
    /// blocks the others; a timed-out send counts as a failure.
    async fn send_channel_batch(
        &self,
        channel: NotifyChannel,
        batch: Vec<NotificationTarget>,
        message: NotificationMessage,
        alert_payload: serde_json::Value,
    ) -> (ChannelOutcome, Vec<String>) {
        let timeout = self.settings.send_timeout();
        let sender = self.senders.get(&channel).cloned();

        let mut outcome = ChannelOutcome {
            channel,
            sent: 0,
            failed: 0,
        };
        let mut ok_ids = Vec::new();

        for chunk in batch.chunks(self.settings.chunk_size.max(1)) {
            let sends = chunk.iter().cloned().map(|target| {
                let sender = sender.clone();
                let message = message.clone();
                let alert_payload = alert_payload.clone();
                let push = Arc::clone(&self.push);
                async move {
                    let sent = match sender {
                        Some(sender) => {
                            tokio::time::timeout(timeout, sender.send(&target, &message))
                                .await
                                .unwrap_or(Err(ChannelError::Timeout(timeout)))
                        }
                        // No dedicated sender: push falls back to the
                        // registry, other channels cannot deliver.
                        None if channel == NotifyChannel::Push => tokio::time::timeout(
                            timeout,
                            push.send_to_user(&target.operator_id, PUSH_EVENT_ALERT, alert_payload),
                        )
                        .await
                        .unwrap_or(Err(crate::external::PushError::Delivery(
                            "timed out".to_string(),
                        )))
                        .map_err(|error| ChannelError::Send(error.to_string())),
                        None => Err(ChannelError::Send(format!(
                            "no sender registered for channel {channel}"
                        ))),
                    };
                    (target.operator_id.clone(), sent)
                }
            });

            let results: Vec<(String, Result<(), ChannelError>)> = stream::iter(sends)
                .buffer_unordered(self.settings.max_in_flight.max(1))
                .collect()
                .await;

            for (operator_id, sent) in results {
                match sent {
                    Ok(()) => {
                        outcome.sent += 1;
                        ok_ids.push(operator_id);
                        self.metrics.notification_sent(channel);
                    }
                    Err(error) => {
                        outcome.failed += 1;
                        self.metrics.notification_failed(channel);
                        warn!(
                            channel = channel.as_str(),
                            operator_id = %operator_id,
                            %error,
                            "Notification send failed"
                        );
                    }
                }
            }
        }

        (outcome, ok_ids)
    }
}

/// Internal fan-out aggregate before bookkeeping is applied.
pub(crate) struct FanOut {
    pub result: PropagationResult,
    pub notified_ids: Vec<String>,
    pub duration: std::time::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{
        DirectoryError, InProcessBus, LogPushRegistry, OperatorRole, StaticDirectory,
    };
    use crate::incident::IncidentPriority;
    use crate::store::InMemoryIncidentStore;
    use crate::testutil::incident;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct CountingSender {
        channel: NotifyChannel,
        sends: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ChannelSender for CountingSender {
        fn channel(&self) -> NotifyChannel {
            self.channel
        }

        async fn send(
            &self,
            _target: &NotificationTarget,
            _message: &NotificationMessage,
        ) -> Result<(), ChannelError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ChannelError::Send("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct SlowSender {
        channel: NotifyChannel,
    }

    #[async_trait]
    impl ChannelSender for SlowSender {
        fn channel(&self) -> NotifyChannel {
            self.channel
        }

        async fn send(
            &self,
            _target: &NotificationTarget,
            _message: &NotificationMessage,
        ) -> Result<(), ChannelError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(())
        }
    }

    struct FailingDirectory;

    #[async_trait]
    impl OperatorDirectory for FailingDirectory {
        async fn resolve_targets(
            &self,
            _region_id: &str,
            _min_rank: u8,
        ) -> Result<Vec<NotificationTarget>, DirectoryError> {
            Err(DirectoryError::Query("directory down".to_string()))
        }
    }

    fn operator(id: &str, channels: Vec<NotifyChannel>) -> NotificationTarget {
        NotificationTarget {
            operator_id: id.to_string(),
            role: OperatorRole::Dispatcher,
            region_id: Some("mnl".to_string()),
            channels,
            priority_weight: 5,
            on_duty: true,
            last_active: None,
        }
    }

    fn engine_with(
        directory: Arc<dyn OperatorDirectory>,
        senders: Vec<Arc<dyn ChannelSender>>,
        settings: PropagationSettings,
        store: Arc<InMemoryIncidentStore>,
    ) -> PropagationEngine {
        let (metrics_tx, _metrics_rx) = mpsc::unbounded_channel();
        PropagationEngine::new(
            directory,
            senders,
            Arc::new(LogPushRegistry),
            Arc::new(InProcessBus::new()),
            store,
            MetricsClient::new(metrics_tx),
            settings,
        )
    }

    #[tokio::test]
    async fn test_fan_out_counts_and_bookkeeping() {
        let store = Arc::new(InMemoryIncidentStore::new());
        let mut subject = incident(IncidentPriority::High);
        subject.region_id = "mnl".to_string();
        let id = subject.id;
        store.save(subject.clone()).await.unwrap();

        let sends = Arc::new(AtomicUsize::new(0));
        let directory = Arc::new(StaticDirectory::new(vec![
            operator("op-1", vec![NotifyChannel::Sms]),
            operator("op-2", vec![]),
        ]));
        let engine = engine_with(
            directory,
            vec![
                Arc::new(CountingSender {
                    channel: NotifyChannel::Push,
                    sends: sends.clone(),
                    fail: false,
                }),
                Arc::new(CountingSender {
                    channel: NotifyChannel::Sms,
                    sends: sends.clone(),
                    fail: false,
                }),
            ],
            PropagationSettings::default(),
            store.clone(),
        );

        let alert = OpsAlert::for_incident(&subject);
        let result = engine.propagate(&subject, &alert).await;

        // op-1: push + sms, op-2: push only.
        assert_eq!(result.targets_resolved, 2);
        assert_eq!(result.notified, 3);
        assert_eq!(result.failed, 0);
        assert_eq!(sends.load(Ordering::SeqCst), 3);

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.notified_operators.len(), 2);
        assert_eq!(stored.notification_attempts, 3);
        assert!(stored.propagation_started_at.is_some());
        assert!(stored.propagation_completed_at.is_some());
    }

    #[tokio::test]
    async fn test_partial_failure_is_counted_not_raised() {
        let store = Arc::new(InMemoryIncidentStore::new());
        let mut subject = incident(IncidentPriority::High);
        subject.region_id = "mnl".to_string();
        store.save(subject.clone()).await.unwrap();

        let sends = Arc::new(AtomicUsize::new(0));
        let directory = Arc::new(StaticDirectory::new(vec![operator(
            "op-1",
            vec![NotifyChannel::Sms],
        )]));
        let engine = engine_with(
            directory,
            vec![
                Arc::new(CountingSender {
                    channel: NotifyChannel::Push,
                    sends: sends.clone(),
                    fail: false,
                }),
                Arc::new(CountingSender {
                    channel: NotifyChannel::Sms,
                    sends: sends.clone(),
                    fail: true,
                }),
            ],
            PropagationSettings::default(),
            store.clone(),
        );

        let alert = OpsAlert::for_incident(&subject);
        let result = engine.propagate(&subject, &alert).await;

        assert_eq!(result.notified, 1);
        assert_eq!(result.failed, 1);
        let sms = result
            .channels
            .iter()
            .find(|c| c.channel == NotifyChannel::Sms)
            .unwrap();
        assert_eq!(sms.failed, 1);

        // The operator still counts as notified via push.
        let stored = store.get(subject.id).await.unwrap();
        assert_eq!(stored.notified_operators, vec!["op-1".to_string()]);
    }

    #[tokio::test]
    async fn test_timed_out_send_counts_as_failure() {
        let store = Arc::new(InMemoryIncidentStore::new());
        let mut subject = incident(IncidentPriority::High);
        subject.region_id = "mnl".to_string();
        store.save(subject.clone()).await.unwrap();

        let directory = Arc::new(StaticDirectory::new(vec![operator("op-1", vec![])]));
        let settings = PropagationSettings {
            send_timeout_ms: 50,
            ..Default::default()
        };
        let engine = engine_with(
            directory,
            vec![Arc::new(SlowSender {
                channel: NotifyChannel::Push,
            })],
            settings,
            store.clone(),
        );

        let alert = OpsAlert::for_incident(&subject);
        let result = engine.propagate(&subject, &alert).await;

        assert_eq!(result.notified, 0);
        assert_eq!(result.failed, 1);
    }

    #[tokio::test]
    async fn test_directory_failure_still_fires_fast_path() {
        let store = Arc::new(InMemoryIncidentStore::new());
        let subject = incident(IncidentPriority::Critical);
        store.save(subject.clone()).await.unwrap();

        let bus = Arc::new(InProcessBus::new());
        let mut events = bus.subscribe();
        let (metrics_tx, _metrics_rx) = mpsc::unbounded_channel();
        let engine = PropagationEngine::new(
            Arc::new(FailingDirectory),
            vec![],
            Arc::new(LogPushRegistry),
            bus.clone(),
            store,
            MetricsClient::new(metrics_tx),
            PropagationSettings::default(),
        );

        let alert = OpsAlert::for_incident(&subject);
        let result = engine.propagate(&subject, &alert).await;

        assert!(result.directory_failed);
        assert_eq!(result.targets_resolved, 0);

        let mut saw_critical = false;
        while let Ok(event) = events.try_recv() {
            if event.topic == topic::INCIDENT_CRITICAL {
                saw_critical = true;
            }
        }
        assert!(saw_critical, "fast path must not depend on the directory");
    }
}

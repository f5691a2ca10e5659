//! The drain loop.
//!
//! A single loop owns the priority queue. New intake arrivals wake it
//! immediately; a sub-second safety-net tick covers a missed wake-up. The
//! intake channel is drained into the queue before every dequeue, so a
//! critical alert arriving late still overtakes queued lower-priority work.
//!
//! Incidents are processed strictly one at a time end-to-end (dispatch,
//! then propagation): the dispatch sub-tasks within one incident run in
//! parallel, but incidents never run concurrently with each other, so the
//! queue can never reorder a critical alert behind a slower low-priority
//! one mid-flight.

use super::queue::IncidentQueue;
use crate::config::EngineSettings;
use crate::dispatch::DispatchOrchestrator;
use crate::incident::Incident;
use crate::propagation::PropagationEngine;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The queue-draining engine.
pub struct IncidentEngine {
    intake_rx: mpsc::Receiver<Incident>,
    queue: IncidentQueue,
    orchestrator: DispatchOrchestrator,
    propagation: Arc<PropagationEngine>,
    settings: EngineSettings,
}

impl IncidentEngine {
    pub fn new(
        intake_rx: mpsc::Receiver<Incident>,
        orchestrator: DispatchOrchestrator,
        propagation: Arc<PropagationEngine>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            intake_rx,
            queue: IncidentQueue::new(),
            orchestrator,
            propagation,
            settings,
        }
    }

    /// Runs the drain loop until shutdown is signalled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            drain_tick_ms = self.settings.drain_tick_ms,
            "Incident engine starting"
        );

        let mut tick = tokio::time::interval(self.settings.drain_tick());
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            // Pull everything waiting at this instant into priority order
            // before deciding what to process next.
            self.drain_intake();

            if let Some(incident) = self.queue.pop() {
                self.process(incident).await;
                continue;
            }

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                received = self.intake_rx.recv() => match received {
                    Some(incident) => self.queue.push(incident),
                    // Intake side dropped; nothing more will arrive.
                    None => break,
                },

                _ = tick.tick() => {}
            }
        }

        debug!(pending = self.queue.len(), "Incident engine stopped");
    }

    /// Moves every already-received intake submission into the queue.
    fn drain_intake(&mut self) {
        while let Ok(incident) = self.intake_rx.try_recv() {
            self.queue.push(incident);
        }
    }

    /// Processes one incident end-to-end: dispatch, then propagation.
    async fn process(&self, incident: Incident) {
        let Some(outcome) = self.orchestrator.dispatch(incident).await else {
            return;
        };
        self.propagation
            .propagate(&outcome.incident, &outcome.alert)
            .await;
    }
}

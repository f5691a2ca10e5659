//! Daemon runner: configuration, logging, wiring, and lifecycle.

use crate::error::CliError;
use crate::Args;
use fleetguard::config::ConfigFile;
use fleetguard::external::{NotificationTarget, NotifyChannel, OperatorRole, StaticDirectory};
use fleetguard::logging::init_logging;
use fleetguard::service::{Collaborators, IncidentService};
use fleetguard::store::{InMemoryIncidentStore, JsonlJournal};
use std::sync::Arc;
use tracing::info;

/// A small on-duty roster so local runs exercise the full fan-out path.
fn local_roster(region: &str) -> Vec<NotificationTarget> {
    vec![
        NotificationTarget {
            operator_id: "dispatcher-1".to_string(),
            role: OperatorRole::Dispatcher,
            region_id: Some(region.to_string()),
            channels: vec![NotifyChannel::Sms],
            priority_weight: 3,
            on_duty: true,
            last_active: None,
        },
        NotificationTarget {
            operator_id: "supervisor-1".to_string(),
            role: OperatorRole::Supervisor,
            region_id: None,
            channels: vec![NotifyChannel::Sms, NotifyChannel::Voice],
            priority_weight: 6,
            on_duty: true,
            last_active: None,
        },
        NotificationTarget {
            operator_id: "manager-1".to_string(),
            role: OperatorRole::Manager,
            region_id: None,
            channels: vec![NotifyChannel::Email],
            priority_weight: 8,
            on_duty: true,
            last_active: None,
        },
    ]
}

/// Runs the daemon until Ctrl-C.
pub fn run(args: Args) -> Result<(), CliError> {
    let config = ConfigFile::load_from(&args.config)?;
    let _logging_guard = init_logging(&config.logging.directory, &config.logging.file)?;

    let mut collaborators = Collaborators::local();
    collaborators.directory = Arc::new(StaticDirectory::new(local_roster(&args.region)));
    if let Some(journal_path) = &args.journal {
        let journal = JsonlJournal::open(journal_path)?;
        collaborators.store = Arc::new(InMemoryIncidentStore::with_journal(Arc::new(journal)));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let service = IncidentService::start(config, collaborators);
        info!(
            version = fleetguard::VERSION,
            region = %args.region,
            "Fleetguard daemon running; press Ctrl-C to stop"
        );

        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to listen for shutdown signal");
        }

        info!("Shutdown signal received");
        service.shutdown().await;
        Ok(())
    })
}

//! External collaborator interfaces.
//!
//! Everything the engine talks to outside its own process lives behind a
//! trait here: the broadcast bus, the push-channel registry, the operator
//! directory, the emergency-services gateway, the fleet directory, and the
//! per-channel notification senders. Each trait ships with an in-process
//! implementation suitable for a single-node deployment and for tests;
//! production deployments inject their own.

mod bus;
mod channels;
mod directory;
mod fleet;
mod gateway;
mod push;

pub use bus::{topic, BroadcastBus, BusError, BusEvent, InProcessBus};
pub use channels::{
    ChannelError, ChannelSender, LogChannelSender, NotificationMessage, NotifyChannel,
};
pub use directory::{
    min_rank_for, DirectoryError, NotificationTarget, OperatorDirectory, OperatorRole,
    StaticDirectory,
};
pub use fleet::{DriverOperatingStatus, FleetDirectory, FleetError, LogFleetDirectory};
pub use gateway::{
    required_services, DispatchStatus, EmergencyGateway, EmergencyServiceRequest, GatewayError,
    LogGateway, ServiceDispatch, ServiceKind,
};
pub use push::{LogPushRegistry, PushError, PushRegistry};

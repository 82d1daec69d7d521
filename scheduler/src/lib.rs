pub mod eligibility;
pub mod engine;
pub mod gate;
pub mod message;
pub mod policy;
pub mod transport;
pub mod types;

pub use engine::BroadcastScheduler;
pub use gate::BroadcastGate;
pub use transport::{MessagingTransport, TransportError};
pub use types::{BroadcastReport, DeliveryOutcome, SchedulerConfig, Trigger};

//! World registry, structural action queue and the maintenance scheduler.
#![forbid(unsafe_code)]

mod actions;
mod error;
mod registry;
mod scheduler;

pub use actions::{ActionId, ActionKind, ActionOutcome, ActionQueue};
pub use error::RegistryError;
pub use registry::{SlotState, TickReport, WorldRegistry};
pub use scheduler::{Scheduler, SchedulerConfig};

//! Change history and pending broadcast bookkeeping for world edits.
#![forbid(unsafe_code)]

mod broadcast;
mod history;

pub use broadcast::{BlockUpdate, BroadcastEntry, BroadcastQueue};
pub use history::{ChangeHistory, ChangeRecord, HistoryStats};

/// Stable integer handle of a loaded world.
pub type WorldId = u32;

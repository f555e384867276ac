//! Batched execution: many sub-commands per packet, results read back in order.

mod commands;
mod pipeline;
mod result;
mod status;

pub use commands::{BatchCommands, ExecuteCommands, QueryCommands, TextCommands};
pub use pipeline::{BatchConfig, Framing, Pipeline};
pub use result::{BatchResult, Outcome};
pub use status::BulkStatus;

//! Event source: turns writes to the signal file into validated agent events
//!
//! ```text
//!   hook script ──writes──▶ signal file
//!                              │  change notification / poll
//!                              ▼
//!                        ChangeTracker (debounce, dedup, parse)
//!                              │  AgentEvent
//!                              ▼
//!                        mpsc channel ──▶ host
//! ```

mod error;
mod parser;
mod source;
mod tracker;


pub use error::WatchError;
pub use parser::{AgentEvent, parse_event_line};
pub use source::{EventSource, WatchMode};
pub use tracker::ChangeTracker;

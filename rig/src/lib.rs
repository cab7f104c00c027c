//! Capture glue for the fusion pipeline.
//!
//! Producer/consumer actors around single-slot latest-frame mailboxes
//! ([`mailbox`], [`capture`]) and the processed-image directory watcher
//! ([`watch`]). The pipeline itself lives in the `fusion` crate; nothing
//! here blocks inside it.

pub mod capture;
pub mod mailbox;
pub mod watch;

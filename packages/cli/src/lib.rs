//! # iondg-cli
//!
//! Inspect and normalize binary datagram files.
//!
//! ## Usage
//!
//! ```bash
//! # print user values
//! iondg dump data.10n
//!
//! # print every physical value, bookkeeping included
//! iondg dump --system data.10n
//!
//! # summary as JSON
//! iondg stats data.10n
//!
//! # rewrite with padding and dead bytes removed
//! iondg normalize data.10n clean.10n
//! ```

pub mod commands;
pub mod json;

pub use commands::{dump, load, normalize, stats, CliError, Stats, TableStats};
pub use json::element_to_json;

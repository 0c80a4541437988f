//! `fw-monitor` — the polling loop.
//!
//! # Cycle
//!
//! ```text
//! loop until shutdown:
//!   ① Fetch    — one snapshot; on failure log, keep state, wait, retry.
//!   ② Diff     — lock tracker, apply_snapshot, unlock.
//!   ③ Emit     — schedule confirmations, hand lost/superseded trips to the
//!                observer, feed the reservation tracker, publish the dump.
//!   ④ Wait     — sleep the polling interval while forwarding trips
//!                confirmed by background tasks.
//! on shutdown:
//!   cancel confirmations, close remaining pending returns as detected.
//! ```
//!
//! The loop is the only caller of the observer, so sinks never see
//! concurrent writes.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let mut monitor = MonitorBuilder::new(&config, source, zones).build()?;
//! let stats = monitor.run(&mut NoopObserver, shutdown).await;
//! ```

pub mod builder;
pub mod error;
pub mod monitor;
pub mod observer;

#[cfg(test)]
mod tests;

pub use builder::MonitorBuilder;
pub use error::{MonitorError, MonitorResult};
pub use monitor::Monitor;
pub use observer::{MonitorObserver, NoopObserver};

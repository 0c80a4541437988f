//! `fw-confirm` — delayed confirmation of detected returns.
//!
//! A return seen in one snapshot is only tentative: the feed sometimes lists
//! a rented vehicle at a place for a cycle or two.  Each detected return gets
//! one independent task that waits the confirmation delay, fetches one fresh
//! snapshot, and applies the outcome to the tracker.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`resolve`]   | `resolve` — pure decision from one re-fetch               |
//! | [`scheduler`] | `ConfirmationScheduler` — `JoinSet` of bounded tasks      |

pub mod resolve;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use resolve::resolve;
pub use scheduler::{ConfirmationOutcome, ConfirmationScheduler};

//! issuefold-core library.
//!
//! Folds comment-backed issue events into issue snapshots.
//!
//! - [`model`]: statuses, the transition table, and the snapshot aggregate.
//! - [`event`]: the wire event, its action tag, payload decoding, and the
//!   comment-body codec.
//! - [`apply`]: the single-event applier.
//! - [`replay`]: the batch replayer built on top of [`apply`].
//! - [`metadata`] and [`sync`]: pure helpers consumed by the code that
//!   writes derived state back to the remote tracker.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums in the engine; `anyhow::Result` in
//!   the config layer.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

pub mod apply;
pub mod config;
pub mod error;
pub mod event;
pub mod metadata;
pub mod model;
pub mod replay;
pub mod sync;

pub use apply::{ApplyError, ReplayOptions, apply, apply_with};
pub use event::Event;
pub use model::issue::{Comment, IssueSnapshot, IssueType};
pub use model::status::Status;
pub use replay::{ReplayError, Replayer, replay, replay_with};

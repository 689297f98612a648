//! docket-core: document state machines, snapshot history, the event log
//! and the ballot engine, over one SQLite database.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`Result`] with a coded
//!   [`DocketError`]; collaborator seams return `anyhow::Result`.
//! - **Logging**: `tracing` macros (`info!` for committed mutations,
//!   `debug!` for no-ops, `warn!` for undo and delivery failures).
//! - **Time**: every operation reads "now" from the injected [`Clock`].

#![forbid(unsafe_code)]

pub mod ballot;
pub mod catalog;
pub mod clock;
pub mod collab;
pub mod config;
pub mod db;
pub mod docket;
pub mod documents;
pub mod error;
pub mod event;
pub mod history;
pub mod lastcall;
pub mod model;
pub mod relations;
pub mod summary;
pub mod telechat;
pub mod transition;
pub mod undo;
pub mod writeups;

pub use ballot::{BallotTally, PositionInput, PositionKind, PositionSummary};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ProjectConfig;
pub use docket::{Docket, DocketBuilder, RetryReport, Settings};
pub use documents::{AttributeEdit, NewDocument};
pub use error::{DocketError, ErrorCode, Result};
pub use event::{Event, EventData, EventType};
pub use lastcall::{ExpiredLastCall, SweepReport};
pub use model::{DocKind, Document, GroupKind, IesgSubstate, PersonId, RelationKind, StdLevel};
pub use summary::{StateSummary, friendly_state};
pub use transition::{StateChange, SubstateChange};

pub mod ballot;
pub mod completions;
pub mod edit;
pub mod file;
pub mod init;
pub mod last_call;
pub mod log;
pub mod outbox;
pub mod relate;
pub mod show;
pub mod state;
pub mod telechat;
pub mod undo;
pub mod writeup;

use crate::actor;
use crate::output::{self, OutputMode};
use docket_core::config::DOCKET_DIR;
use docket_core::{Docket, DocketError, ErrorCode, Event, PersonId};
use std::io::{self, Write};
use std::path::Path;

/// What every command handler gets from the global flags.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub project_root: &'a Path,
    pub output: OutputMode,
    pub actor_flag: Option<&'a str>,
}

impl Context<'_> {
    /// Open the project's store. Fails with `NotInitialized` outside a
    /// `dk init`ed directory.
    pub fn open(&self) -> anyhow::Result<Docket> {
        if !self.project_root.join(DOCKET_DIR).is_dir() {
            return Err(DocketError::precondition(
                ErrorCode::NotInitialized,
                format!("no {DOCKET_DIR}/ in {}", self.project_root.display()),
            )
            .into());
        }
        Docket::open(self.project_root)
    }

    /// Actor for a mutating command.
    pub fn actor(&self) -> anyhow::Result<PersonId> {
        Ok(actor::require_actor(self.actor_flag)?)
    }
}

/// Report mail that failed after the change was committed.
pub fn finish(docket: &mut Docket) {
    output::warn_delivery_failures(&docket.take_delivery_failures());
}

/// One line per event: `#id  time  by  description`.
pub fn write_events(w: &mut dyn Write, events: &[Event]) -> io::Result<()> {
    for event in events {
        let first_line = event.desc.lines().next().unwrap_or_default();
        writeln!(
            w,
            "#{}\t{}\t{}\t{}",
            event.id,
            event.time.format("%Y-%m-%d %H:%M"),
            event.by,
            first_line
        )?;
    }
    Ok(())
}

/// Events written by a mutation, or a note that nothing changed.
pub fn render_events(output: OutputMode, events: &[Event]) -> anyhow::Result<()> {
    output::render(output, &events, |events, w| {
        if events.is_empty() {
            writeln!(w, "No change.")
        } else {
            write_events(w, events)
        }
    })
}

//! `dk show` and `dk list`: read-only views of documents.

use super::Context;
use crate::output::{pretty_kv, pretty_rule, pretty_section, render, render_mode};
use anyhow::Result;
use clap::Args;
use docket_core::{PersonId, StateSummary};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {}

#[derive(Debug, Serialize)]
struct ShowView {
    #[serde(flatten)]
    summary: StateSummary,
    telechat: Option<chrono::NaiveDate>,
    downrefs: Vec<String>,
}

pub fn run_show(args: &ShowArgs, ctx: &Context<'_>) -> Result<()> {
    let docket = ctx.open()?;
    let summary = docket.state_summary(&args.name)?;
    let view = ShowView {
        telechat: docket.telechat_date(&args.name)?,
        downrefs: docket.downrefs(&args.name)?,
        summary,
    };

    render_mode(
        ctx.output,
        &view,
        |v, w| {
            let s = &v.summary;
            writeln!(w, "{}\t{}\t{}\t{}", s.name, s.rev, s.kind, s.summary)
        },
        |v, w| {
            let s = &v.summary;
            pretty_section(w, &format!("{}-{}  {}", s.name, s.rev, s.title))?;
            pretty_kv(w, "Kind", s.kind.name())?;
            pretty_kv(w, "Status", &s.summary)?;
            if let Some(expires) = s.last_call_expires {
                pretty_kv(w, "LC expires", expires.format("%Y-%m-%d").to_string())?;
            }
            if let Some(date) = v.telechat {
                pretty_kv(w, "Telechat", date.to_string())?;
            }
            if !s.tags.is_empty() {
                let tags: Vec<&str> = s.tags.iter().map(String::as_str).collect();
                pretty_kv(w, "Labels", tags.join(", "))?;
            }
            if !s.action_holders.is_empty() {
                let holders: Vec<&str> = s.action_holders.iter().map(PersonId::as_str).collect();
                pretty_kv(w, "Action", holders.join(", "))?;
            }
            if !v.downrefs.is_empty() {
                pretty_kv(w, "Downrefs", v.downrefs.join(", "))?;
            }
            pretty_kv(w, "Updated", s.time.format("%Y-%m-%d %H:%M").to_string())?;
            writeln!(w)?;
            writeln!(w, "States")?;
            pretty_rule(w)?;
            for dim in &s.states {
                writeln!(w, "  {:<24} {} ({})", dim.label, dim.name, dim.slug)?;
                if !dim.next.is_empty() {
                    writeln!(w, "  {:<24} next: {}", "", dim.next.join(", "))?;
                }
            }
            Ok(())
        },
    )
}

pub fn run_list(_args: &ListArgs, ctx: &Context<'_>) -> Result<()> {
    let docket = ctx.open()?;
    let summaries = docket
        .document_names()?
        .iter()
        .map(|name| docket.state_summary(name))
        .collect::<docket_core::Result<Vec<_>>>()?;

    render(ctx.output, &summaries, |rows, w| {
        if rows.is_empty() {
            return writeln!(w, "No documents.");
        }
        for s in rows {
            writeln!(w, "{}-{}\t{}", s.name, s.rev, s.summary)?;
        }
        Ok(())
    })
}

//! `dk revise`, `dk comment` and `dk edit`: attribute-level changes.

use super::{Context, finish, render_events};
use anyhow::Result;
use clap::Args;
use docket_core::model::Group;
use docket_core::{AttributeEdit, GroupKind, PersonId, StdLevel};

#[derive(Args, Debug)]
pub struct ReviseArgs {
    pub name: String,
    /// New two-digit revision.
    pub rev: String,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    pub name: String,
    pub text: String,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub name: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long = "abstract")]
    pub abstract_text: Option<String>,

    #[arg(long)]
    pub notify: Option<String>,

    /// Responsible AD; an empty value clears it.
    #[arg(long)]
    pub ad: Option<String>,

    /// Document shepherd; an empty value clears it.
    #[arg(long)]
    pub shepherd: Option<String>,

    #[arg(long, requires = "group_kind")]
    pub group: Option<String>,

    #[arg(long, requires = "group")]
    pub group_kind: Option<GroupKind>,

    #[arg(long)]
    pub intended: Option<StdLevel>,

    #[arg(long)]
    pub std_level: Option<StdLevel>,

    #[arg(long)]
    pub rfc_number: Option<u32>,
}

fn optional_person(raw: Option<&str>) -> Option<Option<PersonId>> {
    raw.map(|id| (!id.trim().is_empty()).then(|| PersonId::new(id.trim())))
}

impl EditArgs {
    fn edit(&self) -> AttributeEdit {
        AttributeEdit {
            title: self.title.clone(),
            abstract_text: self.abstract_text.clone(),
            notify: self.notify.clone(),
            ad: optional_person(self.ad.as_deref()),
            shepherd: optional_person(self.shepherd.as_deref()),
            group: self.group.as_ref().zip(self.group_kind).map(|(acronym, kind)| Group {
                acronym: acronym.clone(),
                kind,
            }),
            intended_std_level: self.intended.map(Some),
            std_level: self.std_level.map(Some),
            rfc_number: self.rfc_number.map(Some),
            ..AttributeEdit::default()
        }
    }
}

pub fn run_revise(args: &ReviseArgs, ctx: &Context<'_>) -> Result<()> {
    let by = ctx.actor()?;
    let mut docket = ctx.open()?;
    let events = docket.new_revision(&args.name, &by, &args.rev)?;
    finish(&mut docket);
    render_events(ctx.output, &events)
}

pub fn run_comment(args: &CommentArgs, ctx: &Context<'_>) -> Result<()> {
    let by = ctx.actor()?;
    let mut docket = ctx.open()?;
    let event = docket.add_comment(&args.name, &by, &args.text)?;
    finish(&mut docket);
    render_events(ctx.output, &[event])
}

pub fn run_edit(args: &EditArgs, ctx: &Context<'_>) -> Result<()> {
    let by = ctx.actor()?;
    let mut docket = ctx.open()?;
    let events = docket.edit_attributes(&args.name, &by, args.edit())?;
    finish(&mut docket);
    render_events(ctx.output, &events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: EditArgs,
    }

    #[test]
    fn only_given_fields_are_edited() {
        let w = Wrapper::parse_from(["test", "draft-x", "--title", "New", "--ad", ""]);
        let edit = w.args.edit();
        assert_eq!(edit.title.as_deref(), Some("New"));
        assert_eq!(edit.ad, Some(None));
        assert!(edit.shepherd.is_none());
        assert!(edit.group.is_none());
    }

    #[test]
    fn group_needs_both_halves() {
        assert!(Wrapper::try_parse_from(["test", "draft-x", "--group", "quic"]).is_err());
        let w = Wrapper::parse_from(["test", "draft-x", "--group", "quic", "--group-kind", "wg"]);
        assert_eq!(w.args.edit().group.map(|g| g.kind), Some(GroupKind::WorkingGroup));
    }
}

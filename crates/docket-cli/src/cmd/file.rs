//! `dk file`: file a new document.

use super::{Context, finish};
use crate::output::{pretty_kv, render_mode};
use anyhow::{Context as _, Result};
use clap::Args;
use docket_core::model::Group;
use docket_core::{DocKind, GroupKind, NewDocument, PersonId, StdLevel};
use std::io::Write;

#[derive(Args, Debug)]
pub struct FileArgs {
    /// Document name, e.g. `draft-ietf-foo-bar`.
    pub name: String,

    #[arg(long)]
    pub title: String,

    /// draft, rfc, charter, conflrev or statchg.
    #[arg(long, default_value = "draft")]
    pub kind: DocKind,

    /// Two-digit revision. Defaults to 00.
    #[arg(long)]
    pub rev: Option<String>,

    /// Responsible area director.
    #[arg(long)]
    pub ad: Option<String>,

    #[arg(long)]
    pub shepherd: Option<String>,

    /// Notification addresses, comma separated.
    #[arg(long, default_value = "")]
    pub notify: String,

    #[arg(long = "abstract", default_value = "")]
    pub abstract_text: String,

    /// Owning group acronym; individual submissions use `none`.
    #[arg(long, default_value = "none")]
    pub group: String,

    #[arg(long, default_value = "individ")]
    pub group_kind: GroupKind,

    /// Intended standards level (inf, exp, bcp, ps, ...).
    #[arg(long)]
    pub intended: Option<StdLevel>,

    /// Initial state as `type=slug`, e.g. `draft-iesg=pub-req`. Repeatable.
    #[arg(long = "state", value_parser = parse_state_pair)]
    pub states: Vec<(String, String)>,
}

/// `type=slug`.
pub fn parse_state_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((ty, slug)) if !ty.trim().is_empty() && !slug.trim().is_empty() => {
            Ok((ty.trim().to_string(), slug.trim().to_string()))
        }
        _ => Err(format!("expected type=slug, got '{raw}'")),
    }
}

pub fn run_file(args: &FileArgs, ctx: &Context<'_>) -> Result<()> {
    let by = ctx.actor()?;
    let mut docket = ctx.open()?;

    let mut new = NewDocument::new(&args.name, args.kind, &args.title);
    new.rev.clone_from(&args.rev);
    new.ad = args.ad.as_deref().map(PersonId::new);
    new.shepherd = args.shepherd.as_deref().map(PersonId::new);
    new.notify.clone_from(&args.notify);
    new.abstract_text.clone_from(&args.abstract_text);
    new.group = Group {
        acronym: args.group.clone(),
        kind: args.group_kind,
    };
    new.intended_std_level = args.intended;
    new.states.clone_from(&args.states);

    let doc = docket
        .create_document(new, &by)
        .with_context(|| format!("filing {}", args.name))?;
    finish(&mut docket);

    render_mode(
        ctx.output,
        &doc,
        |doc, w| writeln!(w, "{}\t{}\t{}", doc.name, doc.rev, doc.kind),
        |doc, w| {
            writeln!(w, "Filed {}-{}", doc.name, doc.rev)?;
            pretty_kv(w, "Kind", doc.kind.name())?;
            pretty_kv(w, "Title", &doc.title)?;
            for state in doc.states.iter() {
                pretty_kv(w, &state.state_type, &state.name)?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_pairs_parse() {
        assert_eq!(
            parse_state_pair("draft-iesg=pub-req"),
            Ok(("draft-iesg".to_string(), "pub-req".to_string()))
        );
        assert!(parse_state_pair("draft-iesg").is_err());
        assert!(parse_state_pair("=x").is_err());
    }

    #[test]
    fn file_args_parse() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: FileArgs,
        }
        let w = Wrapper::parse_from([
            "test",
            "draft-ietf-foo-bar",
            "--title",
            "Foo",
            "--intended",
            "ps",
            "--state",
            "draft-iesg=pub-req",
        ]);
        assert_eq!(w.args.kind, DocKind::Draft);
        assert_eq!(w.args.intended, Some(StdLevel::ProposedStandard));
        assert_eq!(w.args.group_kind, GroupKind::Individual);
        assert_eq!(w.args.states.len(), 1);
    }
}

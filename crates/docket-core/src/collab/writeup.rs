//! Writeup-generator seam and the canned texts shipped with docket.

use crate::event::{EventData, EventType, WriteupData};
use crate::model::document::Document;
use crate::model::names::slug_enum;
use chrono::NaiveDate;

/// Boilerplate the canned ballot writeup starts with. While it is still in
/// the stored writeup, nobody has written the real one.
pub const WRITEUP_BOILERPLATE: &str = "Relevant content can frequently be found in the abstract";

/// Phrase the last-call text uses to announce downward references.
pub const DOWNREF_MARKER: &str = "document makes the following downward references";

slug_enum! {
    /// Writeup texts attached to a document's approval process.
    pub enum WriteupKind ("writeup kind") {
        LastCall => ("last-call", "Last Call text"),
        BallotWriteup => ("ballot-writeup", "Ballot writeup"),
        BallotApproval => ("ballot-approval", "Approval announcement"),
    }
}

impl WriteupKind {
    #[must_use]
    pub const fn event_type(self) -> EventType {
        match self {
            Self::LastCall => EventType::ChangedLastCallText,
            Self::BallotWriteup => EventType::ChangedBallotWriteupText,
            Self::BallotApproval => EventType::ChangedBallotApprovalText,
        }
    }

    #[must_use]
    pub fn event_data(self, text: String) -> EventData {
        let data = WriteupData { text };
        match self {
            Self::LastCall => EventData::ChangedLastCallText(data),
            Self::BallotWriteup => EventData::ChangedBallotWriteupText(data),
            Self::BallotApproval => EventData::ChangedBallotApprovalText(data),
        }
    }
}

/// Inputs beyond the document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteupContext {
    pub expires: Option<NaiveDate>,
    /// Normatively referenced documents of lower maturity.
    pub downrefs: Vec<String>,
}

pub trait WriteupGenerator: Send + Sync {
    /// Produce the text for `kind`.
    ///
    /// # Errors
    ///
    /// Any template failure; surfaced as a collaborator error.
    fn generate(
        &self,
        doc: &Document,
        kind: WriteupKind,
        ctx: &WriteupContext,
    ) -> anyhow::Result<String>;
}

/// Fixed templates filled from document attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CannedWriteups;

impl CannedWriteups {
    fn level(doc: &Document) -> &'static str {
        doc.intended_std_level.map_or("an RFC", |l| l.name())
    }

    fn last_call(doc: &Document, ctx: &WriteupContext) -> String {
        let expires = ctx
            .expires
            .map_or_else(|| "the end of the last call".to_string(), |d| d.to_string());
        let mut text = format!(
            "The IESG has received a request from the {group} group to consider\n\
             the following document:\n\
             - '{title}'\n  <{name}-{rev}.txt> as {level}\n\n\
             The IESG plans to make a decision in the next few weeks, and solicits\n\
             final comments on this action. Please send substantive comments to the\n\
             last-call mailing list by {expires}.\n\n\
             Abstract\n\n{abstract_text}\n",
            group = doc.group.acronym,
            title = doc.title,
            name = doc.name,
            rev = doc.rev,
            level = Self::level(doc),
            abstract_text = doc.abstract_text,
        );
        if !ctx.downrefs.is_empty() {
            text.push_str("\nThe ");
            text.push_str(DOWNREF_MARKER);
            text.push_str(":\n");
            for target in &ctx.downrefs {
                text.push_str("    ");
                text.push_str(target);
                text.push('\n');
            }
        }
        text
    }

    fn ballot_writeup(doc: &Document) -> String {
        let shepherd = doc.shepherd.as_ref().map_or("(none)", |p| p.as_str());
        let ad = doc.ad.as_ref().map_or("(none)", |p| p.as_str());
        format!(
            "Technical Summary\n\n   {WRITEUP_BOILERPLATE}\n   and/or introduction of the document.\n\n\
             Working Group Summary\n\n   Was the document considered in any WG, and if so, why was it not adopted?\n\n\
             Document Quality\n\n   Are there existing implementations of the protocol?\n\n\
             Personnel\n\n   The Document Shepherd is {shepherd}. The Responsible Area Director is {ad}.\n"
        )
    }

    fn approval(doc: &Document) -> String {
        format!(
            "The IESG has approved the following document:\n\
             - '{title}'\n  ({name}-{rev}.txt) as {level}\n\n\
             This document is the product of the {group} group.\n",
            title = doc.title,
            name = doc.name,
            rev = doc.rev,
            level = Self::level(doc),
            group = doc.group.acronym,
        )
    }
}

impl WriteupGenerator for CannedWriteups {
    fn generate(
        &self,
        doc: &Document,
        kind: WriteupKind,
        ctx: &WriteupContext,
    ) -> anyhow::Result<String> {
        Ok(match kind {
            WriteupKind::LastCall => Self::last_call(doc, ctx),
            WriteupKind::BallotWriteup => Self::ballot_writeup(doc),
            WriteupKind::BallotApproval => Self::approval(doc),
        })
    }
}

//! The IETF state vocabulary.
//!
//! Slugs match the ones used across the IETF toolchain so exported event
//! logs stay recognisable.

use super::{State, StateCatalog, StateType};
use crate::model::names::DocKind;

pub mod draft {
    pub const TYPE: &str = "draft";
    pub const ACTIVE: &str = "active";
    pub const EXPIRED: &str = "expired";
    pub const RFC: &str = "rfc";
    pub const REPLACED: &str = "repl";
}

pub mod draft_iesg {
    pub const TYPE: &str = "draft-iesg";
    pub const PUB_REQ: &str = "pub-req";
    pub const AD_EVAL: &str = "ad-eval";
    pub const LC_REQ: &str = "lc-req";
    pub const LC: &str = "lc";
    pub const WRITEUP_NEEDED: &str = "writeupw";
    pub const GO_AHEAD: &str = "goaheadw";
    pub const EVALUATION: &str = "iesg-eva";
    pub const DEFER: &str = "defer";
    pub const APPROVED: &str = "approved";
    pub const ANNOUNCED: &str = "ann";
    pub const RFC_QUEUE: &str = "rfcqueue";
    pub const PUBLISHED: &str = "pub";
    pub const DEAD: &str = "dead";
    pub const WATCHING: &str = "watching";
    pub const ID_EXISTS: &str = "idexists";
}

pub mod statchg {
    pub const TYPE: &str = "statchg";
    pub const LC_REQ: &str = "lc-req";
    pub const IN_LC: &str = "in-lc";
    pub const EVALUATION: &str = "iesgeval";
    pub const DEFER: &str = "defer";
    pub const APPROVED_SENT: &str = "appr-sent";
    pub const GO_AHEAD: &str = "goahead";
}

pub mod conflrev {
    pub const TYPE: &str = "conflrev";
    pub const EVALUATION: &str = "iesgeval";
    pub const DEFER: &str = "defer";
    pub const APPROVED_NO_PROBLEM_SENT: &str = "appr-noprob-sent";
}

pub mod charter {
    pub const TYPE: &str = "charter";
    pub const IESG_REVIEW: &str = "iesgrev";
    pub const APPROVED: &str = "notrev";
}

pub mod rfc {
    pub const TYPE: &str = "rfc";
    pub const PUBLISHED: &str = "published";
}

type Row<'a> = (&'a str, &'a str, u32, &'a [&'a str]);

fn register(catalog: &mut StateCatalog, ty: StateType, rows: &[Row<'_>]) {
    let slug = ty.slug.clone();
    catalog.add_type(ty);
    for (state_slug, name, order, next) in rows {
        let state = State {
            state_type: slug.clone(),
            slug: (*state_slug).to_string(),
            name: (*name).to_string(),
            desc: String::new(),
            order: *order,
            used: true,
            next_states: next.iter().map(|s| (*s).to_string()).collect(),
        };
        // Rows are static and unique per type.
        if let Err(err) = catalog.add_state(state) {
            tracing::error!(error = %err, "invalid built-in state row");
        }
    }
}

fn state_type(slug: &str, label: &str, doc_kind: DocKind, iesg_process: bool) -> StateType {
    StateType {
        slug: slug.to_string(),
        label: label.to_string(),
        doc_kind,
        iesg_process,
    }
}

pub(super) fn ietf_catalog() -> StateCatalog {
    let mut c = StateCatalog::new();

    register(
        &mut c,
        state_type(draft::TYPE, "State", DocKind::Draft, false),
        &[
            ("active", "Active", 1, &["expired", "rfc", "repl", "auth-rm", "ietf-rm"]),
            ("expired", "Expired", 2, &["active"]),
            ("rfc", "RFC", 3, &[]),
            ("repl", "Replaced", 4, &[]),
            ("auth-rm", "Withdrawn by Submitter", 5, &[]),
            ("ietf-rm", "Withdrawn by IETF", 6, &[]),
        ],
    );

    register(
        &mut c,
        state_type(draft_iesg::TYPE, "IESG state", DocKind::Draft, true),
        &[
            ("pub-req", "Publication Requested", 10, &["ad-eval", "watching", "dead"]),
            ("ad-eval", "AD Evaluation", 11, &["review-e", "lc-req", "iesg-eva", "dead"]),
            ("review-e", "Expert Review", 12, &["ad-eval"]),
            ("lc-req", "Last Call Requested", 15, &["lc"]),
            ("lc", "In Last Call", 16, &["writeupw", "goaheadw"]),
            ("writeupw", "Waiting for Writeup", 18, &["iesg-eva"]),
            ("goaheadw", "Waiting for AD Go-Ahead", 19, &["iesg-eva"]),
            ("iesg-eva", "IESG Evaluation", 20, &["defer", "approved", "ann", "dead"]),
            ("defer", "IESG Evaluation - Defer", 21, &["iesg-eva"]),
            ("approved", "Approved-announcement to be sent", 27, &["ann"]),
            ("ann", "Approved-announcement sent", 30, &["rfcqueue"]),
            ("rfcqueue", "RFC Ed Queue", 31, &["pub"]),
            ("pub", "RFC Published", 32, &[]),
            ("watching", "AD is watching", 42, &["pub-req", "dead"]),
            ("dead", "Dead", 99, &["pub-req", "ad-eval"]),
            ("idexists", "I-D Exists", 100, &["pub-req", "watching"]),
        ],
    );

    register(
        &mut c,
        state_type("draft-stream-ietf", "IETF WG state", DocKind::Draft, false),
        &[
            ("c-adopt", "Call For Adoption By WG Issued", 1, &["adopt-wg", "dead"]),
            ("adopt-wg", "Adopted by a WG", 2, &["wg-doc"]),
            ("wg-doc", "WG Document", 3, &["wg-lc", "dead"]),
            ("wg-lc", "In WG Last Call", 5, &["chair-w", "wg-doc"]),
            ("chair-w", "Waiting for WG Chair Go-Ahead", 6, &["sub-pub"]),
            ("sub-pub", "Submitted to IESG for Publication", 8, &[]),
            ("dead", "Dead WG Document", 9, &["wg-doc"]),
        ],
    );

    // Registered without states: deployments that track IANA review add
    // their own vocabulary, everyone else sees an inactive dimension.
    c.add_type(state_type("draft-iana-review", "IANA Review state", DocKind::Draft, false));

    register(
        &mut c,
        state_type(rfc::TYPE, "State", DocKind::Rfc, false),
        &[("published", "Published", 1, &[])],
    );

    register(
        &mut c,
        state_type(charter::TYPE, "Charter state", DocKind::Charter, true),
        &[
            ("notrev", "Approved", 1, &["infrev"]),
            ("infrev", "Start Chartering/Rechartering (Internal IESG/IAB Review)", 2, &["intrev", "notrev"]),
            ("intrev", "Internal IESG/IAB Review", 3, &["extrev", "iesgrev", "notrev"]),
            ("extrev", "External Review", 4, &["iesgrev", "notrev"]),
            ("iesgrev", "IESG Review", 5, &["notrev"]),
            ("replaced", "Replaced", 6, &[]),
        ],
    );

    register(
        &mut c,
        state_type(conflrev::TYPE, "Conflict Review State", DocKind::ConflictReview, true),
        &[
            ("needshep", "Needs Shepherd", 1, &["adrev", "withdraw", "dead"]),
            ("adrev", "AD Review", 2, &["iesgeval", "withdraw", "dead"]),
            ("iesgeval", "IESG Evaluation", 3, &["defer", "appr-reqnopub-pend", "appr-noprob-pend"]),
            ("defer", "IESG Evaluation - Defer", 4, &["iesgeval"]),
            ("appr-reqnopub-pend", "Approved Request to Not Publish - announcement to be sent", 5, &["appr-reqnopub-sent"]),
            ("appr-noprob-pend", "Approved No Problem - announcement to be sent", 6, &["appr-noprob-sent"]),
            ("appr-reqnopub-sent", "Approved Request to Not Publish - announcement sent", 7, &[]),
            ("appr-noprob-sent", "Approved No Problem - announcement sent", 8, &[]),
            ("withdraw", "Withdrawn", 9, &[]),
            ("dead", "Dead", 10, &["needshep"]),
        ],
    );

    register(
        &mut c,
        state_type(statchg::TYPE, "RFC Status Change state", DocKind::StatusChange, true),
        &[
            ("needshep", "Needs Shepherd", 1, &["adrev", "dead"]),
            ("adrev", "AD Review", 2, &["lc-req", "iesgeval", "dead"]),
            ("lc-req", "Last Call Requested", 3, &["in-lc"]),
            ("in-lc", "In Last Call", 4, &["goahead"]),
            ("goahead", "Waiting for AD Go-Ahead", 5, &["iesgeval"]),
            ("iesgeval", "IESG Evaluation", 6, &["defer", "appr-pend", "appr-sent"]),
            ("defer", "IESG Evaluation - Defer", 7, &["iesgeval"]),
            ("appr-pend", "Approved - announcement to be sent", 8, &["appr-sent"]),
            ("appr-sent", "Approved - announcement sent", 9, &[]),
            ("dead", "Dead", 10, &["needshep"]),
        ],
    );

    c
}

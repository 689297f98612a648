//! Typed directed edges between documents.
//!
//! One edge table serves both directions: "what does X point at" and "what
//! points at X" are two queries over the same rows.

use crate::model::names::{StdLevel, slug_enum};
use serde::{Deserialize, Serialize};

slug_enum! {
    /// Kind of a document-to-document relationship.
    pub enum RelationKind ("relationship") {
        Replaces => ("replaces", "Replaces"),
        Obsoletes => ("obs", "Obsoletes"),
        Updates => ("updates", "Updates"),
        RefNormative => ("refnorm", "Normative Reference"),
        RefInformative => ("refinfo", "Informative Reference"),
        RefUnknown => ("refunk", "Possible Reference"),
        DownrefApproval => ("downref-approval", "Approved Downward Reference"),
        ConflictReviewOf => ("conflrev", "Conflict Review"),
        ToProposedStandard => ("tops", "Moves to Proposed Standard"),
        ToDraftStandard => ("tods", "Moves to Draft Standard"),
        ToInternetStandard => ("tois", "Moves to Internet Standard"),
        ToBcp => ("tobcp", "Moves to BCP"),
        ToInformational => ("toinf", "Moves to Informational"),
        ToExperimental => ("toexp", "Moves to Experimental"),
        ToHistoric => ("tohist", "Moves to Historic"),
    }
}

impl RelationKind {
    /// Status-change edges: the source status change moves the target RFC.
    pub const STATUS_CHANGES: &'static [Self] = &[
        Self::ToProposedStandard,
        Self::ToDraftStandard,
        Self::ToInternetStandard,
        Self::ToBcp,
        Self::ToInformational,
        Self::ToExperimental,
        Self::ToHistoric,
    ];

    /// Level a status-change edge moves its target to.
    #[must_use]
    pub const fn target_level(self) -> Option<StdLevel> {
        match self {
            Self::ToProposedStandard => Some(StdLevel::ProposedStandard),
            Self::ToDraftStandard => Some(StdLevel::DraftStandard),
            Self::ToInternetStandard => Some(StdLevel::InternetStandard),
            Self::ToBcp => Some(StdLevel::Bcp),
            Self::ToInformational => Some(StdLevel::Informational),
            Self::ToExperimental => Some(StdLevel::Experimental),
            Self::ToHistoric => Some(StdLevel::Historic),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_status_change(self) -> bool {
        self.target_level().is_some()
    }
}

/// `source` --kind--> `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
}

impl Relation {
    pub fn new(source: impl Into<String>, kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RelationKind;
    use crate::model::names::StdLevel;
    use std::str::FromStr;

    #[test]
    fn status_change_edges_carry_levels() {
        for kind in RelationKind::STATUS_CHANGES {
            assert!(kind.is_status_change(), "{kind}");
        }
        assert_eq!(
            RelationKind::ToBcp.target_level(),
            Some(StdLevel::Bcp)
        );
        assert!(!RelationKind::RefNormative.is_status_change());
    }

    #[test]
    fn slugs_parse() {
        assert_eq!(
            RelationKind::from_str("downref-approval").ok(),
            Some(RelationKind::DownrefApproval)
        );
        assert!(RelationKind::from_str("cites").is_err());
    }
}

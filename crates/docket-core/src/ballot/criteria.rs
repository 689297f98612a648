//! Pass criteria: what a ballot still needs before the document can pass.

use crate::ballot::types::PositionKind;
use crate::error::{DocketError, ErrorCode, Result};
use crate::model::document::Document;
use crate::model::names::{DocKind, StdLevel};
use crate::model::relation::RelationKind;
use serde::Serialize;
use std::fmt;

/// `ceil((active - recused) * 2 / 3)`.
///
/// # Errors
///
/// Validation error when more members are recused than are active.
pub fn two_thirds_rule(active: usize, recused: usize) -> Result<usize> {
    if recused > active {
        return Err(DocketError::validation(
            ErrorCode::QuotaOutOfRange,
            format!("{recused} recused balloters exceed {active} active members"),
        ));
    }
    Ok(((active - recused) * 2).div_ceil(3))
}

/// Where the tally stands relative to the quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassStatus {
    NeedsMore { more: usize },
    PassOnceResolved { blocking: PositionKind },
    Pass,
}

/// Natural-language verdict over the active positions of a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeededPositions {
    pub needs_yes: bool,
    /// Blocking kind and how many balloters hold it.
    pub blocking: Option<(PositionKind, usize)>,
    pub quota: usize,
    /// `None` when a non-escalated ballot has no yes yet: nothing further
    /// is worth saying until someone sponsors it.
    pub status: Option<PassStatus>,
}

impl NeededPositions {
    #[must_use]
    pub fn passes(&self) -> bool {
        self.status == Some(PassStatus::Pass) && !self.needs_yes
    }
}

impl fmt::Display for NeededPositions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.needs_yes {
            parts.push("Needs a YES.".to_string());
        }
        if let Some((kind, count)) = self.blocking {
            if count == 1 {
                parts.push(format!("Has a {}.", kind.shout()));
            } else {
                parts.push(format!("Has {count} {}.", kind.shout_plural()));
            }
        }
        match self.status {
            Some(PassStatus::NeedsMore { more: 1 }) => {
                parts.push("Needs one more YES or NO OBJECTION position to pass.".to_string());
            }
            Some(PassStatus::NeedsMore { more }) => {
                parts.push(format!(
                    "Needs {more} more YES or NO OBJECTION positions to pass."
                ));
            }
            Some(PassStatus::PassOnceResolved { blocking }) => parts.push(format!(
                "Has enough positions to pass once {} positions are resolved.",
                blocking.shout()
            )),
            Some(PassStatus::Pass) => parts.push("Has enough positions to pass.".to_string()),
            None => {}
        }
        f.write_str(&parts.join(" "))
    }
}

/// A status-change target: the edge kind and the target's current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChangeTarget {
    pub kind: RelationKind,
    pub current_level: Option<StdLevel>,
}

/// Whether the document's ballot needs the two-thirds quota.
#[must_use]
pub fn requires_two_thirds(doc: &Document, targets: &[StatusChangeTarget]) -> bool {
    match doc.kind {
        DocKind::Draft => doc
            .intended_std_level
            .is_some_and(StdLevel::is_standards_track_or_bcp),
        DocKind::StatusChange => targets.iter().any(|t| {
            t.current_level.is_some_and(StdLevel::is_standards_track_or_bcp)
                || t.kind.target_level().is_some_and(StdLevel::is_standards_track_or_bcp)
        }),
        DocKind::Rfc | DocKind::Charter | DocKind::ConflictReview => false,
    }
}

/// Compute what `positions` (current positions of active balloters,
/// synthetic no-records included) still need.
///
/// # Errors
///
/// Validation error when the recused count exceeds `active_count`.
pub fn needed_positions(
    doc: &Document,
    targets: &[StatusChangeTarget],
    positions: &[PositionKind],
    active_count: usize,
) -> Result<NeededPositions> {
    let count = |kind: PositionKind| positions.iter().filter(|p| **p == kind).count();
    let yes = count(PositionKind::Yes);
    let noobj = count(PositionKind::NoObjection);
    let recused = count(PositionKind::Recuse);
    let blocking_kind = positions.iter().copied().find(|p| p.is_blocking());
    let blocking_count = positions.iter().filter(|p| p.is_blocking()).count();

    let needs_yes = yes == 0;
    let blocking = blocking_kind.map(|kind| (kind, blocking_count));

    let escalated = requires_two_thirds(doc, targets);
    let quota = if escalated {
        two_thirds_rule(active_count, recused)?
    } else {
        1
    };

    // Status changes always report the quota, escalated or not.
    if !escalated && needs_yes && doc.kind != DocKind::StatusChange {
        return Ok(NeededPositions {
            needs_yes,
            blocking,
            quota,
            status: None,
        });
    }

    let have = yes + noobj;
    let status = if have < quota {
        PassStatus::NeedsMore { more: quota - have }
    } else if let Some(kind) = blocking_kind {
        PassStatus::PassOnceResolved { blocking: kind }
    } else {
        PassStatus::Pass
    };

    Ok(NeededPositions {
        needs_yes,
        blocking,
        quota,
        status: Some(status),
    })
}

#[cfg(test)]
mod tests {
    use super::{StatusChangeTarget, needed_positions, two_thirds_rule};
    use crate::ballot::types::PositionKind::{self, Abstain, Discuss, NoObjection, NoRecord, Recuse, Yes};
    use crate::error::ErrorCode;
    use crate::model::document::Document;
    use crate::model::names::{DocKind, StdLevel};
    use crate::model::relation::RelationKind;

    fn draft(level: StdLevel) -> Document {
        let mut doc = Document::new("draft-x", DocKind::Draft, "X");
        doc.intended_std_level = Some(level);
        doc
    }

    fn verdict(doc: &Document, positions: &[PositionKind], active: usize) -> String {
        needed_positions(doc, &[], positions, active).unwrap().to_string()
    }

    #[test]
    fn two_thirds_quota() {
        assert_eq!(two_thirds_rule(10, 1).unwrap(), 6);
        assert_eq!(two_thirds_rule(10, 0).unwrap(), 7);
        assert_eq!(two_thirds_rule(15, 0).unwrap(), 10);
        assert_eq!(two_thirds_rule(0, 0).unwrap(), 0);
        let err = two_thirds_rule(3, 4).unwrap_err();
        assert_eq!(err.code(), ErrorCode::QuotaOutOfRange);
    }

    #[test]
    fn informational_quota_is_one() {
        let doc = draft(StdLevel::Informational);
        let needed = needed_positions(&doc, &[], &[Yes, NoRecord], 10).unwrap();
        assert_eq!(needed.quota, 1);
        assert!(needed.passes());
        assert_eq!(needed.to_string(), "Has enough positions to pass.");
    }

    #[test]
    fn informational_without_yes_stops_early() {
        let doc = draft(StdLevel::Informational);
        assert_eq!(verdict(&doc, &[NoObjection, NoObjection], 10), "Needs a YES.");
        assert_eq!(
            verdict(&doc, &[Discuss, NoObjection], 10),
            "Needs a YES. Has a DISCUSS."
        );
    }

    #[test]
    fn status_change_without_yes_reports_quota() {
        let doc = Document::new("status-change-x", DocKind::StatusChange, "X");
        let targets = [StatusChangeTarget {
            kind: RelationKind::ToInformational,
            current_level: Some(StdLevel::Experimental),
        }];
        let needed = needed_positions(&doc, &targets, &[NoObjection, NoRecord], 2).unwrap();
        assert_eq!(needed.quota, 1);
        assert_eq!(needed.to_string(), "Needs a YES. Has enough positions to pass.");

        let needed = needed_positions(&doc, &targets, &[NoRecord, NoRecord], 2).unwrap();
        assert_eq!(
            needed.to_string(),
            "Needs a YES. Needs one more YES or NO OBJECTION position to pass."
        );
    }

    #[test]
    fn standards_track_counts_toward_two_thirds() {
        let doc = draft(StdLevel::ProposedStandard);
        let mut positions = vec![Yes, NoObjection, NoObjection, Recuse];
        positions.extend([NoRecord; 6]);
        let needed = needed_positions(&doc, &[], &positions, 10).unwrap();
        assert_eq!(needed.quota, 6);
        assert_eq!(
            needed.to_string(),
            "Needs 3 more YES or NO OBJECTION positions to pass."
        );
    }

    #[test]
    fn one_more_is_singular() {
        let doc = draft(StdLevel::Bcp);
        // 3 active => quota 2
        assert_eq!(
            verdict(&doc, &[Yes, Abstain, NoRecord], 3),
            "Needs one more YES or NO OBJECTION position to pass."
        );
    }

    #[test]
    fn escalated_without_yes_still_reports_quota() {
        let doc = draft(StdLevel::InternetStandard);
        assert_eq!(
            verdict(&doc, &[NoObjection, NoObjection, NoRecord], 3),
            "Needs a YES. Has enough positions to pass."
        );
    }

    #[test]
    fn blocking_positions_are_named_and_pluralized() {
        let doc = draft(StdLevel::Informational);
        assert_eq!(
            verdict(&doc, &[Yes, Discuss, Discuss], 3),
            "Has 2 DISCUSSes. Has enough positions to pass once DISCUSS positions are resolved."
        );

        let mut charter = Document::new("charter-ietf-x", DocKind::Charter, "X");
        charter.intended_std_level = None;
        assert_eq!(
            verdict(&charter, &[Yes, PositionKind::Block, PositionKind::Block], 3),
            "Has 2 BLOCKs. Has enough positions to pass once BLOCK positions are resolved."
        );
    }

    #[test]
    fn status_change_escalates_on_standards_track_target() {
        let doc = Document::new("status-change-x", DocKind::StatusChange, "X");
        let to_historic_from_ps = [StatusChangeTarget {
            kind: RelationKind::ToHistoric,
            current_level: Some(StdLevel::ProposedStandard),
        }];
        let needed = needed_positions(&doc, &to_historic_from_ps, &[Yes], 9).unwrap();
        assert_eq!(needed.quota, 6);

        let to_bcp = [StatusChangeTarget {
            kind: RelationKind::ToBcp,
            current_level: Some(StdLevel::Informational),
        }];
        assert_eq!(needed_positions(&doc, &to_bcp, &[Yes], 9).unwrap().quota, 6);

        let informational = [StatusChangeTarget {
            kind: RelationKind::ToHistoric,
            current_level: Some(StdLevel::Informational),
        }];
        assert_eq!(
            needed_positions(&doc, &informational, &[Yes], 9).unwrap().quota,
            1
        );
    }

    #[test]
    fn recused_above_active_is_rejected() {
        let doc = draft(StdLevel::ProposedStandard);
        let err = needed_positions(&doc, &[], &[Recuse, Recuse, Yes], 1).unwrap_err();
        assert_eq!(err.code(), ErrorCode::QuotaOutOfRange);
    }
}

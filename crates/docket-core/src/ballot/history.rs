//! Display compaction of a balloter's position history.

use crate::ballot::types::PositionKind;

/// Prior positions to show next to a balloter's current one.
///
/// `newest_first` is the balloter's full position sequence for one ballot,
/// current position first. Consecutive repeats collapse into one entry,
/// and the oldest-end run made only of no-record placeholders or of the
/// current position is dropped.
#[must_use]
pub fn prior_positions(newest_first: &[PositionKind]) -> Vec<PositionKind> {
    let Some((&current, older)) = newest_first.split_first() else {
        return Vec::new();
    };

    let mut prior: Vec<PositionKind> = Vec::with_capacity(older.len());
    let mut last = current;
    for &pos in older {
        if pos != last {
            prior.push(pos);
            last = pos;
        }
    }

    while prior
        .last()
        .is_some_and(|p| *p == PositionKind::NoRecord || *p == current)
    {
        prior.pop();
    }
    prior
}

#[cfg(test)]
mod tests {
    use super::prior_positions;
    use crate::ballot::types::PositionKind::{Abstain, Discuss, NoObjection, NoRecord, Yes};

    #[test]
    fn yes_discuss_yes_shows_only_the_discuss() {
        // newest first: yes (current), discuss, yes
        assert_eq!(prior_positions(&[Yes, Discuss, Yes]), [Discuss]);
    }

    #[test]
    fn repeats_collapse() {
        assert_eq!(
            prior_positions(&[NoObjection, NoObjection, Discuss, Discuss, Abstain]),
            [Discuss, Abstain]
        );
    }

    #[test]
    fn bootstrap_no_record_is_stripped() {
        assert!(prior_positions(&[Yes, NoRecord, NoRecord]).is_empty());
        assert_eq!(prior_positions(&[Yes, Discuss, NoRecord]), [Discuss]);
    }

    #[test]
    fn no_record_between_real_votes_is_kept() {
        assert_eq!(
            prior_positions(&[Yes, NoRecord, Discuss]),
            [NoRecord, Discuss]
        );
    }

    #[test]
    fn empty_and_single() {
        assert!(prior_positions(&[]).is_empty());
        assert!(prior_positions(&[Yes]).is_empty());
    }
}

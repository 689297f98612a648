use chrono::{DateTime, Duration, TimeZone, Utc};
use docket_core::ballot::criteria::{needed_positions, two_thirds_rule};
use docket_core::catalog::StateCatalog;
use docket_core::catalog::defaults::draft_iesg;
use docket_core::collab::StaticRoster;
use docket_core::model::{Document, Person};
use docket_core::{
    AttributeEdit, Clock, DocKind, Docket, DocketBuilder, FixedClock, NewDocument, PersonId,
    PositionInput, PositionKind, StateChange, StdLevel,
};
use proptest::prelude::*;

fn ad() -> PersonId {
    PersonId::new("ad1")
}

fn docket_at(clock: &FixedClock, roster: StaticRoster) -> Docket {
    DocketBuilder::new()
        .clock(clock.clone())
        .roster(roster)
        .in_memory()
        .unwrap()
}

fn iesg(ids: &[&str]) -> StaticRoster {
    let mut roster = StaticRoster::new();
    for id in ids {
        roster.add("iesg", Person::new(*id, id.to_uppercase()));
    }
    roster
}

fn draft_iesg_slugs() -> Vec<String> {
    StateCatalog::ietf()
        .states(draft_iesg::TYPE)
        .iter()
        .filter(|s| s.used)
        .map(|s| s.slug.clone())
        .collect()
}

fn arb_position() -> impl Strategy<Value = PositionKind> {
    prop_oneof![
        Just(PositionKind::Yes),
        Just(PositionKind::NoObjection),
        Just(PositionKind::Discuss),
        Just(PositionKind::Abstain),
        Just(PositionKind::Recuse),
    ]
}

fn input(pos: PositionKind) -> PositionInput {
    if pos.is_blocking() {
        PositionInput::new(pos).discuss("X")
    } else {
        PositionInput::new(pos)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn set_state_leaves_exactly_that_state(picks in prop::collection::vec(any::<prop::sample::Index>(), 1..12)) {
        let slugs = draft_iesg_slugs();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        let mut docket = docket_at(&clock, StaticRoster::new());
        docket
            .create_document(
                NewDocument::new("draft-a", DocKind::Draft, "A").state(draft_iesg::TYPE, draft_iesg::PUB_REQ),
                &ad(),
            )
            .unwrap();

        for pick in picks {
            let slug = pick.get(&slugs);
            clock.advance(Duration::seconds(1));
            docket
                .change_state("draft-a", &ad(), &StateChange::to(draft_iesg::TYPE, slug.as_str()), None)
                .unwrap();
            let doc = docket.document("draft-a").unwrap();
            prop_assert_eq!(doc.state_slug(draft_iesg::TYPE), Some(slug.as_str()));
            prop_assert_eq!(
                doc.states.iter().filter(|s| s.state_type == draft_iesg::TYPE).count(),
                1
            );
        }
    }

    #[test]
    fn tally_shows_the_latest_position(
        steps in prop::collection::vec((arb_position(), 0i64..3), 1..10),
    ) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        let mut docket = docket_at(&clock, iesg(&["ad1", "ad2"]));
        docket.create_document(NewDocument::new("draft-a", DocKind::Draft, "A"), &ad()).unwrap();
        let ballot = docket.create_ballot_if_not_open("draft-a", &ad(), None).unwrap();

        let balloter = PersonId::new("ad2");
        for (pos, gap) in &steps {
            // A zero gap records two positions at the same instant.
            clock.advance(Duration::seconds(*gap));
            docket.record_position(ballot.id, &balloter, &balloter, input(*pos)).unwrap();
        }

        let last = steps.last().map(|(pos, _)| *pos).unwrap();
        let tally = docket.tally(ballot.id).unwrap();
        let current = tally.active.iter().find(|s| s.balloter == balloter).unwrap();
        prop_assert_eq!(current.pos, last);
        prop_assert!(!current.prior.contains(&PositionKind::NoRecord));
        prop_assert!(current.prior.first() != Some(&last));
    }
}

#[test]
fn create_ballot_if_not_open_is_idempotent() {
    let clock = FixedClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    let mut docket = docket_at(&clock, StaticRoster::new());
    docket.create_document(NewDocument::new("draft-a", DocKind::Draft, "A"), &ad()).unwrap();

    let first = docket.create_ballot_if_not_open("draft-a", &ad(), None).unwrap();
    let second = docket.create_ballot_if_not_open("draft-a", &ad(), None).unwrap();
    assert_eq!(first.id, second.id);
    let open: Vec<_> = docket
        .ballots("draft-a")
        .unwrap()
        .into_iter()
        .filter(|b| b.is_open())
        .collect();
    assert_eq!(open.len(), 1);
}

#[test]
fn quota_examples() {
    let mut standards = Document::new("draft-a", DocKind::Draft, "A");
    standards.intended_std_level = Some(StdLevel::ProposedStandard);
    let mut votes = vec![PositionKind::NoRecord; 9];
    votes.push(PositionKind::Recuse);
    let needed = needed_positions(&standards, &[], &votes, 10).unwrap();
    assert_eq!(needed.quota, 6);
    assert_eq!(two_thirds_rule(10, 1).unwrap(), 6);

    let mut informational = Document::new("draft-b", DocKind::Draft, "B");
    informational.intended_std_level = Some(StdLevel::Informational);
    let needed = needed_positions(&informational, &[], &[PositionKind::NoRecord; 10], 10).unwrap();
    assert_eq!(needed.quota, 1);
}

#[test]
fn history_snapshots_replay_to_the_live_document() {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap());
    let mut docket = docket_at(&clock, StaticRoster::new());
    docket
        .create_document(
            NewDocument::new("draft-a", DocKind::Draft, "A").state(draft_iesg::TYPE, draft_iesg::PUB_REQ),
            &ad(),
        )
        .unwrap();

    let mut seen = vec![docket.document("draft-a").unwrap()];
    clock.advance(Duration::hours(1));
    docket
        .change_state("draft-a", &ad(), &StateChange::to(draft_iesg::TYPE, draft_iesg::AD_EVAL), None)
        .unwrap();
    seen.push(docket.document("draft-a").unwrap());
    clock.advance(Duration::hours(1));
    docket
        .edit_attributes(
            "draft-a",
            &ad(),
            AttributeEdit {
                title: Some("A, revised".into()),
                ..AttributeEdit::default()
            },
        )
        .unwrap();
    seen.push(docket.document("draft-a").unwrap());
    clock.advance(Duration::hours(1));
    docket.new_revision("draft-a", &ad(), "01").unwrap();
    let live = docket.document("draft-a").unwrap();

    let snapshots: Vec<Document> = docket
        .history("draft-a")
        .unwrap()
        .into_iter()
        .map(|s| s.document)
        .collect();
    assert_eq!(snapshots, seen);

    for doc in &seen {
        assert_eq!(docket.document_at("draft-a", doc.time).unwrap().as_ref(), Some(doc));
    }
    assert_eq!(docket.document_at("draft-a", clock.now()).unwrap(), Some(live.clone()));
    assert_eq!(docket.document_at_rev("draft-a", "00").unwrap().map(|d| d.rev), Some("00".into()));
    assert_eq!(live.rev, "01");
    assert_eq!(live.title, "A, revised");
}

//! Read path: typed query helpers over the docket store.
//!
//! All functions take a shared `&Connection` and return typed structs,
//! never raw rows. Event and position listings are newest first, ordered
//! by `(time DESC, id DESC)` so same-instant writes keep their log order.

use super::from_us;
use super::store::{corrupt, parse_slug};
use crate::ballot::types::{Ballot, BallotPosition};
use crate::collab::mail::OutgoingMail;
use crate::error::Result;
use crate::event::{Event, EventData, EventType};
use crate::model::document::Document;
use crate::model::person::PersonId;
use crate::model::relation::Relation;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One stored history snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub id: i64,
    pub time: DateTime<Utc>,
    pub rev: String,
    pub document: Document,
    /// Outgoing edges of the document when the snapshot was taken.
    pub relations: Vec<Relation>,
}

/// A message waiting in the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub mail: OutgoingMail,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// # Errors
///
/// Storage failure.
pub fn document_names(conn: &Connection) -> Result<Vec<String>> {
    let names = conn
        .prepare_cached("SELECT name FROM documents ORDER BY name")?
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Names of documents currently in `state_type`/`slug`.
///
/// # Errors
///
/// Storage failure.
pub fn docs_in_state(conn: &Connection, state_type: &str, slug: &str) -> Result<Vec<String>> {
    let names = conn
        .prepare_cached(
            "SELECT doc FROM document_states WHERE state_type = ?1 AND state = ?2 ORDER BY doc",
        )?
        .query_map(params![state_type, slug], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// # Errors
///
/// Storage failure.
pub fn document_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM documents WHERE name = ?1", [name], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

const EVENT_COLUMNS: &str = "id, time_us, by_person, doc, rev, event_type, description, data_json";

struct EventRow {
    id: i64,
    time_us: i64,
    by: String,
    doc: String,
    rev: String,
    event_type: String,
    desc: String,
    data_json: String,
}

impl EventRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            time_us: row.get(1)?,
            by: row.get(2)?,
            doc: row.get(3)?,
            rev: row.get(4)?,
            event_type: row.get(5)?,
            desc: row.get(6)?,
            data_json: row.get(7)?,
        })
    }

    fn into_event(self) -> Result<Event> {
        let event_type: EventType = parse_slug("event_type", &self.event_type)?;
        let data = EventData::deserialize_for(event_type, &self.data_json)
            .map_err(|err| corrupt(format!("event {}: {err}", self.id)))?;
        Ok(Event {
            id: self.id,
            time: from_us(self.time_us)?,
            by: PersonId::new(self.by),
            doc: self.doc,
            rev: self.rev,
            event_type,
            desc: self.desc,
            data,
        })
    }
}

fn collect_events(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Event>> {
    let rows = conn
        .prepare_cached(sql)?
        .query_map(params, EventRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(EventRow::into_event).collect()
}

/// Full event log of a document, newest first.
///
/// # Errors
///
/// Storage failure or an event that no longer parses.
pub fn events_for(conn: &Connection, doc: &str) -> Result<Vec<Event>> {
    collect_events(
        conn,
        &format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE doc = ?1 ORDER BY time_us DESC, id DESC"
        ),
        [doc],
    )
}

/// Events of one type, newest first.
///
/// # Errors
///
/// Storage failure or an event that no longer parses.
pub fn events_of_type(conn: &Connection, doc: &str, event_type: EventType) -> Result<Vec<Event>> {
    collect_events(
        conn,
        &format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE doc = ?1 AND event_type = ?2
             ORDER BY time_us DESC, id DESC"
        ),
        params![doc, event_type.as_str()],
    )
}

/// Most recent event of any of `types`.
///
/// # Errors
///
/// Storage failure or an event that no longer parses.
pub fn latest_event(conn: &Connection, doc: &str, types: &[EventType]) -> Result<Option<Event>> {
    let mut newest: Option<Event> = None;
    for event_type in types {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE doc = ?1 AND event_type = ?2
             ORDER BY time_us DESC, id DESC LIMIT 1"
        );
        let candidate = collect_events(conn, &sql, params![doc, event_type.as_str()])?
            .into_iter()
            .next();
        if let Some(candidate) = candidate {
            let newer = newest
                .as_ref()
                .is_none_or(|n| (candidate.time, candidate.id) > (n.time, n.id));
            if newer {
                newest = Some(candidate);
            }
        }
    }
    Ok(newest)
}

/// # Errors
///
/// Storage failure or an event that no longer parses.
pub fn event_by_id(conn: &Connection, id: i64) -> Result<Option<Event>> {
    let row = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
            [id],
            EventRow::from_row,
        )
        .optional()?;
    row.map(EventRow::into_event).transpose()
}

// ---------------------------------------------------------------------------
// History snapshots
// ---------------------------------------------------------------------------

type SnapshotRow = (i64, i64, String, String, String);

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn parse_snapshot((id, time_us, rev, json, relations): SnapshotRow) -> Result<Snapshot> {
    let document: Document = serde_json::from_str(&json)
        .map_err(|err| corrupt(format!("snapshot {id}: {err}")))?;
    let relations: Vec<Relation> = serde_json::from_str(&relations)
        .map_err(|err| corrupt(format!("snapshot {id} relations: {err}")))?;
    Ok(Snapshot {
        id,
        time: from_us(time_us)?,
        rev,
        document,
        relations,
    })
}

/// All snapshots of a document, oldest first.
///
/// # Errors
///
/// Storage failure or a snapshot that no longer parses.
pub fn snapshots(conn: &Connection, doc: &str) -> Result<Vec<Snapshot>> {
    let rows = conn
        .prepare_cached(
            "SELECT id, time_us, rev, snapshot_json, relations_json FROM doc_history
             WHERE doc = ?1 ORDER BY time_us ASC, id ASC",
        )?
        .query_map([doc], snapshot_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(parse_snapshot).collect()
}

/// Latest snapshot taken of the document as it stood at or before `time`.
///
/// # Errors
///
/// Storage failure or a snapshot that no longer parses.
pub fn snapshot_at(conn: &Connection, doc: &str, time: DateTime<Utc>) -> Result<Option<Snapshot>> {
    let row = conn
        .query_row(
            "SELECT id, time_us, rev, snapshot_json, relations_json FROM doc_history
             WHERE doc = ?1 AND time_us <= ?2 ORDER BY time_us DESC, id DESC LIMIT 1",
            params![doc, super::to_us(time)],
            snapshot_from_row,
        )
        .optional()?;
    row.map(parse_snapshot).transpose()
}

/// Latest snapshot taken while the document was at `rev`.
///
/// # Errors
///
/// Storage failure or a snapshot that no longer parses.
pub fn snapshot_for_rev(conn: &Connection, doc: &str, rev: &str) -> Result<Option<Snapshot>> {
    let row = conn
        .query_row(
            "SELECT id, time_us, rev, snapshot_json, relations_json FROM doc_history
             WHERE doc = ?1 AND rev = ?2 ORDER BY time_us DESC, id DESC LIMIT 1",
            params![doc, rev],
            snapshot_from_row,
        )
        .optional()?;
    row.map(parse_snapshot).transpose()
}

// ---------------------------------------------------------------------------
// Ballots
// ---------------------------------------------------------------------------

const BALLOT_COLUMNS: &str = "id, doc, ballot_type, opened_by, opened_at_us, closed_at_us";

type BallotRow = (i64, String, String, String, i64, Option<i64>);

fn ballot_from_row(row: &Row<'_>) -> rusqlite::Result<BallotRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn parse_ballot((id, doc, ballot_type, opened_by, opened_at_us, closed_at_us): BallotRow) -> Result<Ballot> {
    Ok(Ballot {
        id,
        doc,
        ballot_type,
        opened_by: PersonId::new(opened_by),
        opened_at: from_us(opened_at_us)?,
        closed_at: closed_at_us.map(from_us).transpose()?,
    })
}

/// # Errors
///
/// Storage failure.
pub fn ballot(conn: &Connection, id: i64) -> Result<Option<Ballot>> {
    let row = conn
        .query_row(
            &format!("SELECT {BALLOT_COLUMNS} FROM ballots WHERE id = ?1"),
            [id],
            ballot_from_row,
        )
        .optional()?;
    row.map(parse_ballot).transpose()
}

/// The open ballot of a type on a document, if any.
///
/// # Errors
///
/// Storage failure.
pub fn open_ballot(conn: &Connection, doc: &str, ballot_type: &str) -> Result<Option<Ballot>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {BALLOT_COLUMNS} FROM ballots
                 WHERE doc = ?1 AND ballot_type = ?2 AND closed_at_us IS NULL"
            ),
            params![doc, ballot_type],
            ballot_from_row,
        )
        .optional()?;
    row.map(parse_ballot).transpose()
}

/// Every ballot ever opened on a document, newest first.
///
/// # Errors
///
/// Storage failure.
pub fn ballots_for(conn: &Connection, doc: &str) -> Result<Vec<Ballot>> {
    let rows = conn
        .prepare_cached(&format!(
            "SELECT {BALLOT_COLUMNS} FROM ballots WHERE doc = ?1 ORDER BY opened_at_us DESC, id DESC"
        ))?
        .query_map([doc], ballot_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(parse_ballot).collect()
}

const POSITION_COLUMNS: &str = "event_id, ballot_id, balloter, pos, discuss, discuss_time_us, \
                                comment, comment_time_us, time_us, by_person";

struct PositionRow {
    id: i64,
    ballot_id: i64,
    balloter: String,
    pos: String,
    discuss: String,
    discuss_time_us: Option<i64>,
    comment: String,
    comment_time_us: Option<i64>,
    time_us: i64,
    by: String,
}

impl PositionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ballot_id: row.get(1)?,
            balloter: row.get(2)?,
            pos: row.get(3)?,
            discuss: row.get(4)?,
            discuss_time_us: row.get(5)?,
            comment: row.get(6)?,
            comment_time_us: row.get(7)?,
            time_us: row.get(8)?,
            by: row.get(9)?,
        })
    }

    fn into_position(self) -> Result<BallotPosition> {
        Ok(BallotPosition {
            id: self.id,
            ballot_id: self.ballot_id,
            balloter: PersonId::new(self.balloter),
            pos: parse_slug("pos", &self.pos)?,
            discuss: self.discuss,
            discuss_time: self.discuss_time_us.map(from_us).transpose()?,
            comment: self.comment,
            comment_time: self.comment_time_us.map(from_us).transpose()?,
            time: from_us(self.time_us)?,
            by: PersonId::new(self.by),
        })
    }
}

/// Every position recorded on a ballot, newest first.
///
/// # Errors
///
/// Storage failure or an unknown position slug.
pub fn positions_for(conn: &Connection, ballot_id: i64) -> Result<Vec<BallotPosition>> {
    let rows = conn
        .prepare_cached(&format!(
            "SELECT {POSITION_COLUMNS} FROM ballot_positions
             WHERE ballot_id = ?1 ORDER BY time_us DESC, event_id DESC"
        ))?
        .query_map([ballot_id], PositionRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(PositionRow::into_position).collect()
}

/// A balloter's current position: the latest by `(time, sequence)`.
///
/// # Errors
///
/// Storage failure or an unknown position slug.
pub fn current_position(
    conn: &Connection,
    ballot_id: i64,
    balloter: &PersonId,
) -> Result<Option<BallotPosition>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {POSITION_COLUMNS} FROM ballot_positions
                 WHERE ballot_id = ?1 AND balloter = ?2
                 ORDER BY time_us DESC, event_id DESC LIMIT 1"
            ),
            params![ballot_id, balloter.as_str()],
            PositionRow::from_row,
        )
        .optional()?;
    row.map(PositionRow::into_position).transpose()
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

fn collect_relations(conn: &Connection, sql: &str, key: &str) -> Result<Vec<Relation>> {
    let rows = conn
        .prepare_cached(sql)?
        .query_map([key], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|(source, target, kind)| {
            Ok(Relation::new(source, parse_slug("kind", &kind)?, target))
        })
        .collect()
}

/// Edges leaving `source`.
///
/// # Errors
///
/// Storage failure or an unknown relation kind.
pub fn relations_from(conn: &Connection, source: &str) -> Result<Vec<Relation>> {
    collect_relations(
        conn,
        "SELECT source, target, kind FROM relations WHERE source = ?1 ORDER BY kind, target",
        source,
    )
}

/// Edges pointing at `target`.
///
/// # Errors
///
/// Storage failure or an unknown relation kind.
pub fn relations_to(conn: &Connection, target: &str) -> Result<Vec<Relation>> {
    collect_relations(
        conn,
        "SELECT source, target, kind FROM relations WHERE target = ?1 ORDER BY kind, source",
        target,
    )
}

// ---------------------------------------------------------------------------
// Telechats, outbox, sweep bookkeeping
// ---------------------------------------------------------------------------

/// Calendar dates on or after `from`, earliest first.
///
/// # Errors
///
/// Storage failure or a malformed stored date.
pub fn telechat_dates_from(conn: &Connection, from: NaiveDate) -> Result<Vec<NaiveDate>> {
    // ISO dates sort lexically.
    let rows = conn
        .prepare_cached("SELECT date FROM telechat_dates WHERE date >= ?1 ORDER BY date")?
        .query_map([from.to_string()], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.iter()
        .map(|raw| parse_slug::<NaiveDate>("telechat date", raw))
        .collect()
}

/// Undelivered mail, oldest first.
///
/// # Errors
///
/// Storage failure or malformed stored recipients.
pub fn pending_mail(conn: &Connection) -> Result<Vec<OutboxEntry>> {
    let rows = conn
        .prepare_cached(
            "SELECT id, doc, recipients_json, subject, body, attempts, last_error, created_at_us
             FROM mail_outbox WHERE delivered_at_us IS NULL ORDER BY id",
        )?
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, doc, to_json, subject, body, attempts, last_error, created_us)| {
            let to: Vec<String> = serde_json::from_str(&to_json)
                .map_err(|err| corrupt(format!("outbox {id}: {err}")))?;
            Ok(OutboxEntry {
                id,
                mail: OutgoingMail::new(doc, to, subject, body),
                attempts,
                last_error,
                created_at: from_us(created_us)?,
            })
        })
        .collect()
}

/// When the last-call sweep last completed, if ever.
///
/// # Errors
///
/// Storage failure.
pub fn last_sweep(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
    let us: i64 = conn.query_row(
        "SELECT last_sweep_at_us FROM store_meta WHERE id = 1",
        [],
        |row| row.get(0),
    )?;
    if us == 0 {
        return Ok(None);
    }
    from_us(us).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StateCatalog;
    use crate::catalog::defaults::draft;
    use crate::db::{open_in_memory, store};
    use crate::event::{EventData, NewRevisionData};
    use crate::model::names::DocKind;
    use crate::model::relation::RelationKind;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn seed(conn: &Connection, name: &str) -> Document {
        let catalog = StateCatalog::ietf();
        let mut doc = Document::new(name, DocKind::Draft, "T");
        doc.set_state(catalog.state(draft::TYPE, draft::ACTIVE).unwrap().clone());
        store::insert_document(conn, &doc).unwrap();
        doc
    }

    fn comment(doc: &Document, secs: i64, text: &str) -> Event {
        Event::new(doc, &PersonId::new("ad"), at(secs), text, EventData::AddedComment)
    }

    #[test]
    fn events_are_newest_first_with_sequence_tiebreak() {
        let conn = open_in_memory().unwrap();
        let doc = seed(&conn, "draft-a");
        for (secs, text) in [(10, "first"), (20, "second"), (20, "third")] {
            store::append_event(&conn, &mut comment(&doc, secs, text)).unwrap();
        }
        let descs: Vec<_> = events_for(&conn, "draft-a")
            .unwrap()
            .into_iter()
            .map(|e| e.desc)
            .collect();
        assert_eq!(descs, ["third", "second", "first"]);
    }

    #[test]
    fn latest_event_picks_across_types() {
        let conn = open_in_memory().unwrap();
        let doc = seed(&conn, "draft-a");
        store::append_event(&conn, &mut comment(&doc, 10, "c")).unwrap();
        let mut rev = Event::new(
            &doc,
            &PersonId::new("ad"),
            at(30),
            "New version available",
            EventData::NewRevision(NewRevisionData { rev: "01".into() }),
        );
        store::append_event(&conn, &mut rev).unwrap();

        let latest = latest_event(&conn, "draft-a", &[EventType::AddedComment, EventType::NewRevision])
            .unwrap()
            .unwrap();
        assert_eq!(latest.event_type, EventType::NewRevision);
        assert!(latest_event(&conn, "draft-a", &[EventType::SentLastCall]).unwrap().is_none());
    }

    #[test]
    fn relations_read_both_ways() {
        let conn = open_in_memory().unwrap();
        seed(&conn, "draft-a");
        seed(&conn, "draft-b");
        store::insert_relation(&conn, &Relation::new("draft-a", RelationKind::Replaces, "draft-b")).unwrap();
        assert_eq!(relations_from(&conn, "draft-a").unwrap().len(), 1);
        assert_eq!(relations_to(&conn, "draft-b").unwrap()[0].source, "draft-a");
        assert!(relations_to(&conn, "draft-a").unwrap().is_empty());
    }

    #[test]
    fn telechat_dates_are_filtered_and_sorted() {
        let conn = open_in_memory().unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2026, 11, day).unwrap();
        for day in [19, 5, 2] {
            store::insert_telechat_date(&conn, d(day)).unwrap();
        }
        assert!(!store::insert_telechat_date(&conn, d(5)).unwrap());
        assert_eq!(telechat_dates_from(&conn, d(3)).unwrap(), [d(5), d(19)]);
    }

    #[test]
    fn outbox_tracks_attempts_until_delivered() {
        let conn = open_in_memory().unwrap();
        let mail = OutgoingMail::new("draft-a", vec!["iesg@ietf.org".into()], "s", "b");
        let id = store::enqueue_mail(&conn, &mail, "connection refused", at(5)).unwrap();
        store::mark_mail_failed(&conn, id, "still down").unwrap();

        let pending = pending_mail(&conn).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("still down"));
        assert_eq!(pending[0].mail, mail);

        store::mark_mail_delivered(&conn, id, at(6)).unwrap();
        assert!(pending_mail(&conn).unwrap().is_empty());
    }

    #[test]
    fn last_sweep_starts_unset() {
        let conn = open_in_memory().unwrap();
        assert!(last_sweep(&conn).unwrap().is_none());
        store::set_last_sweep(&conn, at(100)).unwrap();
        assert_eq!(last_sweep(&conn).unwrap(), Some(at(100)));
    }
}

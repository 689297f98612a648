//! The telechat calendar and agenda placement.

use crate::db::{query, store};
use crate::docket::{Docket, Txn};
use crate::error::{DocketError, ErrorCode, Result};
use crate::event::{Event, EventData, EventType, TelechatData};
use crate::history::save_with_history;
use crate::model::document::Document;
use crate::model::person::PersonId;
use chrono::NaiveDate;
use tracing::info;

/// Agenda date `doc` is currently placed on.
pub(crate) fn scheduled_date(txn: &Txn<'_>, doc: &str) -> Result<Option<NaiveDate>> {
    Ok(
        query::latest_event(txn.conn, doc, &[EventType::ScheduledForTelechat])?.and_then(|e| {
            match e.data {
                EventData::ScheduledForTelechat(data) => data.telechat_date,
                _ => None,
            }
        }),
    )
}

/// The `nth` (0-based) telechat on or after today.
pub(crate) fn nth_upcoming(txn: &Txn<'_>, nth: usize) -> Result<NaiveDate> {
    let today = txn.now.date_naive();
    query::telechat_dates_from(txn.conn, today)?
        .get(nth)
        .copied()
        .ok_or_else(|| {
            DocketError::precondition(
                ErrorCode::NoTelechatSlot,
                format!("fewer than {} telechats scheduled from {today}", nth + 1),
            )
        })
}

/// Build the placement event, or `None` when the agenda already says so.
pub(crate) fn schedule_event(
    txn: &Txn<'_>,
    doc: &Document,
    by: &PersonId,
    date: Option<NaiveDate>,
) -> Result<Option<Event>> {
    if let Some(date) = date {
        if !query::telechat_dates_from(txn.conn, date)?.first().is_some_and(|d| *d == date) {
            return Err(DocketError::precondition(
                ErrorCode::NoTelechatSlot,
                format!("no telechat on {date}"),
            ));
        }
    }
    if scheduled_date(txn, &doc.name)? == date {
        return Ok(None);
    }
    let desc = date.map_or_else(
        || "Removed from agenda for telechat".to_string(),
        |d| format!("Placed on agenda for telechat - {d}"),
    );
    Ok(Some(Event::new(
        doc,
        by,
        txn.now,
        desc,
        EventData::ScheduledForTelechat(TelechatData { telechat_date: date }),
    )))
}

impl Docket {
    /// Add a date to the calendar. Returns `false` if it was already there.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn add_telechat_date(&mut self, date: NaiveDate) -> Result<bool> {
        let added = self.transact(|txn| store::insert_telechat_date(txn.conn, date))?;
        if added {
            info!(%date, "telechat date added");
        }
        Ok(added)
    }

    /// Calendar dates on or after `today`, ascending.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn upcoming_telechats(&self, today: NaiveDate) -> Result<Vec<NaiveDate>> {
        query::telechat_dates_from(self.connection(), today)
    }

    /// Put `name` on the agenda for `date`, or take it off with `None`.
    ///
    /// # Errors
    ///
    /// Precondition failure when `date` is not on the calendar; not-found
    /// and storage failures.
    pub fn schedule_for_telechat(
        &mut self,
        name: &str,
        by: &PersonId,
        date: Option<NaiveDate>,
    ) -> Result<Option<Event>> {
        self.transact(|txn| {
            let mut doc = txn.document(name)?;
            let Some(event) = schedule_event(txn, &doc, by, date)? else {
                return Ok(None);
            };
            let mut events = [event];
            save_with_history(txn, &mut doc, &mut events)?;
            let [event] = events;
            Ok(Some(event))
        })
    }

    /// # Errors
    ///
    /// Not-found or storage failures.
    pub fn telechat_date(&self, name: &str) -> Result<Option<NaiveDate>> {
        let reader = self.reader();
        reader.document(name)?;
        scheduled_date(&reader, name)
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::FixedClock;
    use crate::docket::{Docket, DocketBuilder};
    use crate::documents::NewDocument;
    use crate::error::ErrorCode;
    use crate::model::names::DocKind;
    use crate::model::person::PersonId;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
    }

    fn docket() -> Docket {
        let now = Utc.with_ymd_and_hms(2026, 11, 3, 12, 0, 0).unwrap();
        let mut docket = DocketBuilder::new()
            .clock(FixedClock::new(now))
            .in_memory()
            .unwrap();
        docket
            .create_document(NewDocument::new("draft-a", DocKind::Draft, "A"), &PersonId::new("ad"))
            .unwrap();
        docket
    }

    #[test]
    fn calendar_lists_from_today_ascending() {
        let mut docket = docket();
        for d in [19, 5, 1] {
            assert!(docket.add_telechat_date(date(d)).unwrap());
        }
        assert!(!docket.add_telechat_date(date(5)).unwrap());
        assert_eq!(docket.upcoming_telechats(date(3)).unwrap(), [date(5), date(19)]);
    }

    #[test]
    fn scheduling_is_recorded_once() {
        let mut docket = docket();
        docket.add_telechat_date(date(5)).unwrap();
        let by = PersonId::new("ad");

        let event = docket.schedule_for_telechat("draft-a", &by, Some(date(5))).unwrap();
        assert_eq!(
            event.map(|e| e.desc),
            Some("Placed on agenda for telechat - 2026-11-05".to_string())
        );
        assert!(docket.schedule_for_telechat("draft-a", &by, Some(date(5))).unwrap().is_none());
        assert_eq!(docket.telechat_date("draft-a").unwrap(), Some(date(5)));

        docket.schedule_for_telechat("draft-a", &by, None).unwrap();
        assert_eq!(docket.telechat_date("draft-a").unwrap(), None);
    }

    #[test]
    fn dates_off_the_calendar_are_refused() {
        let mut docket = docket();
        let err = docket
            .schedule_for_telechat("draft-a", &PersonId::new("ad"), Some(date(6)))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoTelechatSlot);
    }
}

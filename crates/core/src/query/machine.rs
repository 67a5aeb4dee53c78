use crate::domain::contract;
use crate::domain::movie::{MovieQuery, MovieQueryPatch, PageResult};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryState {
    Idle,
    PendingDebounce,
    InFlight,
    Settled,
    Failed,
}

/// A fetch the driver must issue, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub seq: u64,
    pub query: MovieQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Settled,
    Failed,
    /// Superseded by a later edit or dispatch; the response was dropped.
    Stale,
}

/// What observers see after every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub state: QueryState,
    pub query: MovieQuery,
    /// Last accepted page; survives failures and later edits until replaced.
    pub result: Option<Arc<PageResult>>,
    pub error: Option<CoreError>,
    pub issued_seq: u64,
    pub settled_seq: Option<u64>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// Transition rules for the current catalog query, free of any timer or runtime.
///
/// Only a response carrying the highest issued sequence number, arriving while that request
/// is still the one in flight, may replace the visible result.
#[derive(Debug, Clone)]
pub struct QueryMachine {
    state: QueryState,
    query: MovieQuery,
    issued_seq: u64,
    result: Option<Arc<PageResult>>,
    error: Option<CoreError>,
    settled_seq: Option<u64>,
    settled_at: Option<DateTime<Utc>>,
}

impl QueryMachine {
    pub fn new(initial: MovieQuery) -> Self {
        Self {
            state: QueryState::Idle,
            query: initial,
            issued_seq: 0,
            result: None,
            error: None,
            settled_seq: None,
            settled_at: None,
        }
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn query(&self) -> &MovieQuery {
        &self.query
    }

    pub fn issued_seq(&self) -> u64 {
        self.issued_seq
    }

    /// Applies an edit and (re)enters the debounce window. Invalidates any request in flight.
    pub fn edit(&mut self, patch: &MovieQueryPatch) -> Result<(), CoreError> {
        let next = self.query.with_patch(patch)?;
        if self.state == QueryState::InFlight {
            tracing::debug!(seq = self.issued_seq, "edit while in flight; pending response will be dropped");
        }
        self.query = next;
        self.error = None;
        self.state = QueryState::PendingDebounce;
        Ok(())
    }

    /// Called when the debounce window closes without a further edit.
    pub fn debounce_elapsed(&mut self) -> Option<Dispatch> {
        if self.state != QueryState::PendingDebounce {
            return None;
        }
        Some(self.issue())
    }

    /// Re-issues the failed query with the same parameters. Ignored in any other state.
    pub fn retry(&mut self) -> Option<Dispatch> {
        if self.state != QueryState::Failed {
            return None;
        }
        self.error = None;
        Some(self.issue())
    }

    fn issue(&mut self) -> Dispatch {
        self.issued_seq += 1;
        self.state = QueryState::InFlight;
        Dispatch {
            seq: self.issued_seq,
            query: self.query.clone(),
        }
    }

    pub fn on_response(&mut self, seq: u64, response: Result<PageResult, CoreError>) -> Acceptance {
        if self.state != QueryState::InFlight || seq != self.issued_seq {
            tracing::debug!(
                seq,
                issued_seq = self.issued_seq,
                state = ?self.state,
                "discarding stale catalog response"
            );
            return Acceptance::Stale;
        }

        let checked = response.and_then(|page| {
            contract::validate_page(&page, &self.query)
                .map(|()| page)
                .map_err(|e| CoreError::provider("catalog", "contract", &e))
        });

        match checked {
            Ok(page) => {
                self.result = Some(Arc::new(page));
                self.error = None;
                self.settled_seq = Some(seq);
                self.settled_at = Some(Utc::now());
                self.state = QueryState::Settled;
                Acceptance::Settled
            }
            Err(err) => {
                tracing::warn!(seq, error = %err, "catalog query failed");
                self.error = Some(err);
                self.state = QueryState::Failed;
                Acceptance::Failed
            }
        }
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            state: self.state,
            query: self.query.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            issued_seq: self.issued_seq,
            settled_seq: self.settled_seq,
            settled_at: self.settled_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::movie::{GenreFilter, MovieRecord, Outcome};

    fn page_for(query: &MovieQuery, title: &str) -> PageResult {
        PageResult {
            records: vec![MovieRecord {
                title: title.to_string(),
                year: 2001,
                genres: "Drama".to_string(),
                roi: 1.0,
                box_office: 100,
                poster_url: String::new(),
                imdb_rating: 7.0,
                success_label: Outcome::Hit,
            }],
            total_count: 1,
            total_pages: 1,
            page: query.page,
            page_size: query.page_size,
        }
    }

    fn down() -> CoreError {
        CoreError::provider("test", "query", &anyhow::anyhow!("connection reset"))
    }

    #[test]
    fn starts_idle_without_result() {
        let m = QueryMachine::new(MovieQuery::default());
        assert_eq!(m.state(), QueryState::Idle);
        assert!(m.snapshot().result.is_none());
        assert_eq!(m.issued_seq(), 0);
    }

    #[test]
    fn burst_of_edits_yields_one_dispatch_for_last_value() {
        let mut m = QueryMachine::new(MovieQuery::default());
        for text in ["a", "ab", "abc"] {
            m.edit(&MovieQueryPatch::search(text)).unwrap();
            assert_eq!(m.state(), QueryState::PendingDebounce);
        }
        let d = m.debounce_elapsed().unwrap();
        assert_eq!(d.seq, 1);
        assert_eq!(d.query.search, "abc");
        assert!(m.debounce_elapsed().is_none());
    }

    #[test]
    fn older_response_cannot_overwrite_newer_result() {
        let mut m = QueryMachine::new(MovieQuery::default());
        m.edit(&MovieQueryPatch::search("old")).unwrap();
        let first = m.debounce_elapsed().unwrap();
        m.edit(&MovieQueryPatch::search("new")).unwrap();
        let second = m.debounce_elapsed().unwrap();
        assert!(second.seq > first.seq);

        let acc = m.on_response(second.seq, Ok(page_for(&second.query, "new")));
        assert_eq!(acc, Acceptance::Settled);
        let acc = m.on_response(first.seq, Ok(page_for(&first.query, "old")));
        assert_eq!(acc, Acceptance::Stale);

        let snap = m.snapshot();
        assert_eq!(snap.state, QueryState::Settled);
        assert_eq!(snap.result.unwrap().records[0].title, "new");
        assert_eq!(snap.settled_seq, Some(second.seq));
    }

    #[test]
    fn edit_while_in_flight_invalidates_the_response() {
        let mut m = QueryMachine::new(MovieQuery::default());
        m.edit(&MovieQueryPatch::search("x")).unwrap();
        let d = m.debounce_elapsed().unwrap();
        m.edit(&MovieQueryPatch::search("xy")).unwrap();

        // Same sequence number, but the machine is back in the debounce window.
        let acc = m.on_response(d.seq, Ok(page_for(&d.query, "x")));
        assert_eq!(acc, Acceptance::Stale);
        assert_eq!(m.state(), QueryState::PendingDebounce);
        assert!(m.snapshot().result.is_none());
    }

    #[test]
    fn failure_keeps_last_settled_result_and_retry_reuses_query() {
        let mut m = QueryMachine::new(MovieQuery::default());
        m.edit(&MovieQueryPatch::search("good")).unwrap();
        let d = m.debounce_elapsed().unwrap();
        m.on_response(d.seq, Ok(page_for(&d.query, "good")));

        m.edit(&MovieQueryPatch::genre("Horror")).unwrap();
        let failed = m.debounce_elapsed().unwrap();
        assert_eq!(m.on_response(failed.seq, Err(down())), Acceptance::Failed);

        let snap = m.snapshot();
        assert_eq!(snap.state, QueryState::Failed);
        assert!(snap.error.is_some());
        assert_eq!(snap.result.unwrap().records[0].title, "good");

        let again = m.retry().unwrap();
        assert_eq!(again.query, failed.query);
        assert_eq!(again.seq, failed.seq + 1);
        assert_eq!(again.query.genre_filter, GenreFilter::Genre("Horror".into()));
        assert!(m.snapshot().error.is_none());

        assert_eq!(
            m.on_response(again.seq, Ok(page_for(&again.query, "horror"))),
            Acceptance::Settled
        );
        assert_eq!(m.snapshot().result.unwrap().records[0].title, "horror");
    }

    #[test]
    fn retry_outside_failed_is_ignored() {
        let mut m = QueryMachine::new(MovieQuery::default());
        assert!(m.retry().is_none());
        m.edit(&MovieQueryPatch::search("a")).unwrap();
        assert!(m.retry().is_none());
        assert_eq!(m.state(), QueryState::PendingDebounce);
    }

    #[test]
    fn inconsistent_page_is_a_failure() {
        let mut m = QueryMachine::new(MovieQuery::default());
        m.edit(&MovieQueryPatch::search("a")).unwrap();
        let d = m.debounce_elapsed().unwrap();
        let mut page = page_for(&d.query, "a");
        page.total_pages = 7;
        assert_eq!(m.on_response(d.seq, Ok(page)), Acceptance::Failed);
        assert!(matches!(
            m.snapshot().error,
            Some(CoreError::ProviderUnavailable {
                stage: "contract",
                ..
            })
        ));
    }

    #[test]
    fn empty_page_settles() {
        let mut m = QueryMachine::new(MovieQuery::default());
        m.edit(&MovieQueryPatch::search("zzz")).unwrap();
        let d = m.debounce_elapsed().unwrap();
        let page = PageResult {
            records: vec![],
            total_count: 0,
            total_pages: 0,
            page: d.query.page,
            page_size: d.query.page_size,
        };
        assert_eq!(m.on_response(d.seq, Ok(page)), Acceptance::Settled);
        assert!(m.snapshot().result.unwrap().is_empty());
    }

    #[test]
    fn rejected_edit_changes_nothing() {
        let mut m = QueryMachine::new(MovieQuery::default());
        assert!(m.edit(&MovieQueryPatch::page(0)).is_err());
        assert_eq!(m.state(), QueryState::Idle);
        assert_eq!(m.query(), &MovieQuery::default());
    }

    #[test]
    fn genre_edit_resets_page_but_page_edit_keeps_genre() {
        let mut m = QueryMachine::new(MovieQuery::default());
        m.edit(&MovieQueryPatch::genre("Action")).unwrap();
        m.edit(&MovieQueryPatch::page(4)).unwrap();
        assert_eq!(m.query().page, 4);
        assert_eq!(m.query().genre_filter, GenreFilter::Genre("Action".into()));

        m.edit(&MovieQueryPatch::genre("Drama")).unwrap();
        assert_eq!(m.query().page, 1);
    }
}

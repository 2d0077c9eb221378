use crate::core::gather::{gather_partial, Gathered};
use crate::domain::model::{OfferingId, Session, SessionDetail, SessionId};
use crate::domain::ports::SessionStore;
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::sync::Arc;

/// Read-only lookup of scheduled sessions.
#[derive(Clone)]
pub struct SessionCatalog {
    store: Arc<dyn SessionStore>,
    concurrency: usize,
}

impl SessionCatalog {
    pub fn new(store: Arc<dyn SessionStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn sessions_on_date(&self, date: NaiveDate) -> Result<Vec<Session>> {
        tracing::debug!("Loading sessions on {}", date);
        self.store.sessions_on_date(date).await
    }

    /// Sessions of one offering, optionally bounded by an inclusive date range.
    pub async fn sessions_for_offering(
        &self,
        offering_id: OfferingId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Session>> {
        let mut sessions = self
            .store
            .sessions_for_offering(offering_id, from, to)
            .await?;
        sessions.sort_by_key(|s| (s.date, s.start_time, s.id));
        Ok(sessions)
    }

    pub async fn session_detail(&self, session_id: SessionId) -> Result<SessionDetail> {
        self.store.session_detail(session_id).await
    }

    /// Fetches details for every id concurrently. A failed lookup becomes a
    /// fallback entry for that id; the others are unaffected.
    pub async fn details_for(&self, ids: Vec<SessionId>) -> Vec<Gathered<SessionId, SessionDetail>> {
        let store = Arc::clone(&self.store);
        gather_partial(ids, self.concurrency, move |id| {
            let store = Arc::clone(&store);
            let id = *id;
            async move { store.session_detail(id).await }
        })
        .await
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{sample_session, InMemoryBackend};

    #[tokio::test]
    async fn test_details_for_degrades_unknown_ids() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert_session(sample_session(1, 10, "2026-10-20")).await;
        backend.insert_session(sample_session(3, 10, "2026-10-21")).await;
        let catalog = SessionCatalog::new(backend, 4);

        let details = catalog
            .details_for(vec![SessionId(1), SessionId(2), SessionId(3)])
            .await;

        assert_eq!(details.len(), 3);
        assert!(details[0].value.as_fetched().is_some());
        assert!(details[1].value.is_fallback());
        assert_eq!(details[1].key, SessionId(2));
        assert!(details[2].value.as_fetched().is_some());
    }

    #[tokio::test]
    async fn test_sessions_for_offering_is_chronological() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert_session(sample_session(5, 10, "2026-10-22")).await;
        backend.insert_session(sample_session(6, 11, "2026-10-19")).await;
        backend.insert_session(sample_session(7, 10, "2026-10-18")).await;
        let catalog = SessionCatalog::new(backend, 2);

        let sessions = catalog
            .sessions_for_offering(OfferingId(10), None, None)
            .await
            .unwrap();
        let ids: Vec<SessionId> = sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SessionId(7), SessionId(5)]);

        let bounded = catalog
            .sessions_for_offering(
                OfferingId(10),
                NaiveDate::from_ymd_opt(2026, 10, 20),
                None,
            )
            .await
            .unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].id, SessionId(5));
    }

    #[tokio::test]
    async fn test_sessions_for_offering_includes_last_day() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert_session(sample_session(5, 10, "2026-10-22")).await;
        backend.insert_session(sample_session(8, 10, "2026-10-23")).await;
        backend.insert_session(sample_session(7, 10, "2026-10-18")).await;
        backend.insert_session(sample_session(9, 10, "2026-10-17")).await;
        let catalog = SessionCatalog::new(backend, 2);

        let sessions = catalog
            .sessions_for_offering(
                OfferingId(10),
                NaiveDate::from_ymd_opt(2026, 10, 18),
                NaiveDate::from_ymd_opt(2026, 10, 22),
            )
            .await
            .unwrap();
        let ids: Vec<SessionId> = sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SessionId(7), SessionId(5)]);

        let single_day = catalog
            .sessions_for_offering(
                OfferingId(10),
                NaiveDate::from_ymd_opt(2026, 10, 22),
                NaiveDate::from_ymd_opt(2026, 10, 22),
            )
            .await
            .unwrap();
        assert_eq!(single_day.len(), 1);
        assert_eq!(single_day[0].id, SessionId(5));
    }
}

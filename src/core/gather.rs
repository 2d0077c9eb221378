//! Concurrent fan-out over a set of keys that always yields one result per key.
//!
//! Tasks live on a [`JoinSet`], so dropping the returned future aborts every
//! in-flight fetch.

use crate::utils::error::{LedgerError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of a best-effort fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Enriched<T> {
    Fetched(T),
    Fallback { reason: String },
}

impl<T> Enriched<T> {
    pub fn as_fetched(&self) -> Option<&T> {
        match self {
            Enriched::Fetched(value) => Some(value),
            Enriched::Fallback { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Enriched::Fallback { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gathered<K, T> {
    pub key: K,
    pub value: Enriched<T>,
}

/// Runs `fetch` for every key with at most `limit` in flight and returns the
/// results in input order. A task that panics is reported as a transport error.
pub async fn gather_all<K, T, F, Fut>(keys: Vec<K>, limit: usize, fetch: F) -> Vec<(K, Result<T>)>
where
    K: Send + 'static,
    T: Send + 'static,
    F: Fn(&K) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for (index, key) in keys.iter().enumerate() {
        let pending = fetch(key);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            (index, pending.await)
        });
    }

    let mut slots: Vec<Option<Result<T>>> = keys.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => tracing::warn!("Fan-out task did not complete: {}", e),
        }
    }

    keys.into_iter()
        .zip(slots)
        .map(|(key, slot)| {
            let result = slot.unwrap_or_else(|| {
                Err(LedgerError::transport("task aborted before completion"))
            });
            (key, result)
        })
        .collect()
}

/// Like [`gather_all`], but failures degrade to [`Enriched::Fallback`].
pub async fn gather_partial<K, T, F, Fut>(keys: Vec<K>, limit: usize, fetch: F) -> Vec<Gathered<K, T>>
where
    K: Send + std::fmt::Display + 'static,
    T: Send + 'static,
    F: Fn(&K) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    gather_all(keys, limit, fetch)
        .await
        .into_iter()
        .map(|(key, result)| {
            let value = match result {
                Ok(value) => Enriched::Fetched(value),
                Err(e) => {
                    tracing::warn!("Enrichment for {} degraded: {}", key, e);
                    Enriched::Fallback {
                        reason: e.to_string(),
                    }
                }
            };
            Gathered { key, value }
        })
        .collect()
}

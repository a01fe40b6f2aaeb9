use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::league::{LeagueError, LeagueTable};
use crate::scraper::{Fetch, ScraperError};
use crate::store::{Store, StoreError};
use crate::types::{RecordKind, Tier, WorkItem};

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("{0}")]
    Fetch(#[from] ScraperError),
    #[error("{0}")]
    League(#[from] LeagueError),
    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Rounds each item gets before it is given up on.
    pub max_attempts: u32,
    /// Pause before every round after the first.
    pub retry_delay: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            retry_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    #[serde(flatten)]
    pub item: WorkItem,
    pub attempts: u32,
    pub last_error: String,
}

impl Display for FailedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} after {} attempt(s): {}",
            self.item, self.attempts, self.last_error
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub kind: RecordKind,
    pub rounds: u32,
    pub persisted: Vec<WorkItem>,
    pub remaining: Vec<FailedItem>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n{} batch:", self.kind)?;
        writeln!(f, "  Rounds:    {}", self.rounds)?;
        writeln!(f, "  Persisted: {}", self.persisted.len())?;
        writeln!(f, "  Remaining: {}", self.remaining.len())?;
        for failed in &self.remaining {
            writeln!(f, "    - {}", failed)?;
        }
        Ok(())
    }
}

/// Cartesian product of the inputs, country-major, then year, then tier.
/// Repeated inputs are enumerated once.
pub fn work_items<S: AsRef<str>>(countries: &[S], years: &[i32], tiers: &[Tier]) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(countries.len() * years.len() * tiers.len());

    for country in countries {
        for &year in years {
            for &tier in tiers {
                let item = WorkItem::new(country.as_ref(), year, tier);
                if seen.insert(item.clone()) {
                    items.push(item);
                }
            }
        }
    }

    items
}

/// Fetches every work item of a batch one at a time, persisting each success
/// and re-queueing failures for the next round.
#[derive(Debug)]
pub struct BatchRunner<F> {
    fetcher: F,
    leagues: Arc<LeagueTable>,
    store: Store,
    config: RunnerConfig,
}

impl<F: Fetch> BatchRunner<F> {
    pub fn new(fetcher: F, leagues: Arc<LeagueTable>, store: Store, config: RunnerConfig) -> Self {
        Self {
            fetcher,
            leagues,
            store,
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn run_batch<S: AsRef<str>>(
        &self,
        kind: RecordKind,
        countries: &[S],
        years: &[i32],
        tiers: &[Tier],
    ) -> BatchReport {
        self.run_items(kind, work_items(countries, years, tiers))
            .await
    }

    pub async fn run_items(&self, kind: RecordKind, items: Vec<WorkItem>) -> BatchReport {
        let max_attempts = self.config.max_attempts;
        let mut pending = items;
        let mut persisted = Vec::new();
        let mut last_errors: HashMap<WorkItem, String> = HashMap::new();
        let mut rounds = 0;

        log::info!(
            "{} batch: {} item(s), up to {} attempt(s) each",
            kind,
            pending.len(),
            max_attempts
        );

        while rounds < max_attempts && !pending.is_empty() {
            if rounds > 0 && !self.config.retry_delay.is_zero() {
                log::debug!("Waiting {:?} before retrying", self.config.retry_delay);
                tokio::time::sleep(self.config.retry_delay).await;
            }
            rounds += 1;
            log::info!(
                "Round {}/{}: {} item(s) pending",
                rounds,
                max_attempts,
                pending.len()
            );

            let mut failed = Vec::new();
            for item in pending {
                match self.attempt(kind, &item).await {
                    Ok(path) => {
                        log::debug!("Persisted {} to {}", item, path.display());
                        last_errors.remove(&item);
                        persisted.push(item);
                    }
                    Err(e) => {
                        log::warn!("Failed to fetch {} (round {}): {}", item, rounds, e);
                        last_errors.insert(item.clone(), e.to_string());
                        failed.push(item);
                    }
                }
            }
            pending = failed;
        }

        let remaining: Vec<FailedItem> = pending
            .into_iter()
            .map(|item| FailedItem {
                last_error: last_errors
                    .remove(&item)
                    .unwrap_or_else(|| "not attempted".to_string()),
                attempts: rounds,
                item,
            })
            .collect();

        if remaining.is_empty() {
            log::info!("{} batch complete: {} item(s) persisted", kind, persisted.len());
        } else {
            log::warn!(
                "{} batch gave up on {} item(s) after {} round(s)",
                kind,
                remaining.len(),
                rounds
            );
        }

        BatchReport {
            kind,
            rounds,
            persisted,
            remaining,
        }
    }

    async fn attempt(&self, kind: RecordKind, item: &WorkItem) -> Result<PathBuf, BatchError> {
        let records = self.fetcher.fetch(kind, item).await?;
        let code = &self.leagues.get(&item.country)?.code;
        Ok(self.store.write(code, item.tier, item.year, &records)?)
    }
}

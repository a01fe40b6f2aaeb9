use crate::league::{LeagueError, LeagueTable};
use crate::parser::{ParseError, parse_market_values, parse_standings};
use crate::types::{RecordKind, RecordSet, Tier, WorkItem};

use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("League error: {0}")]
    LeagueError(#[from] LeagueError),
    #[error("Invalid season-end year: {0}")]
    InvalidYear(i32),
}

/// Connection settings of a [`WebScraper`].
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: crate::BASE_URL.to_string(),
            user_agent: crate::BROWSER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Anything able to produce the record set of one work item.
pub trait Fetch {
    fn fetch(
        &self,
        kind: RecordKind,
        item: &WorkItem,
    ) -> impl Future<Output = Result<RecordSet, ScraperError>>;
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    base_url: String,
    leagues: Arc<LeagueTable>,
}

impl WebScraper {
    pub fn new(leagues: Arc<LeagueTable>, config: &ScraperConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            leagues,
        })
    }

    /// Page URL of a league season. Seasons are addressed by their start year.
    pub fn url(
        &self,
        kind: RecordKind,
        country: &str,
        year: i32,
        tier: Tier,
    ) -> Result<String, ScraperError> {
        let league = self.leagues.get(country)?;
        let name = league.name(tier);
        let id = league.league_id(tier);
        let season = year.checked_sub(1).ok_or(ScraperError::InvalidYear(year))?;

        Ok(match kind {
            RecordKind::Standings => format!(
                "{}/{}/{}/wettbewerb/{}?saison_id={}",
                self.base_url,
                name,
                kind.page(),
                id,
                season
            ),
            RecordKind::MarketValues => format!(
                "{}/{}/{}/wettbewerb/{}/plus/?saison_id={}",
                self.base_url,
                name,
                kind.page(),
                id,
                season
            ),
        })
    }

    pub async fn fetch_standings(
        &self,
        country: &str,
        year: i32,
        tier: Tier,
    ) -> Result<RecordSet, ScraperError> {
        let league = self.leagues.get(country)?.league_id(tier);
        let url = self.url(RecordKind::Standings, country, year, tier)?;
        log::info!("Fetching standings of {} {}: {}", league, year, url);
        let html = self.get_html(&url).await?;
        Ok(RecordSet::Standings(parse_standings(&html, &league, year)?))
    }

    pub async fn fetch_market_values(
        &self,
        country: &str,
        year: i32,
        tier: Tier,
    ) -> Result<RecordSet, ScraperError> {
        let league = self.leagues.get(country)?.league_id(tier);
        let url = self.url(RecordKind::MarketValues, country, year, tier)?;
        log::info!("Fetching market values of {} {}: {}", league, year, url);
        let html = self.get_html(&url).await?;
        Ok(RecordSet::MarketValues(parse_market_values(
            &html, &league, year,
        )?))
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

impl Fetch for WebScraper {
    async fn fetch(&self, kind: RecordKind, item: &WorkItem) -> Result<RecordSet, ScraperError> {
        match kind {
            RecordKind::Standings => {
                self.fetch_standings(&item.country, item.year, item.tier)
                    .await
            }
            RecordKind::MarketValues => {
                self.fetch_market_values(&item.country, item.year, item.tier)
                    .await
            }
        }
    }
}

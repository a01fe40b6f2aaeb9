pub mod league;
pub mod parser;
pub mod runner;
pub mod scraper;
pub mod store;
pub mod types;

pub use league::{LeagueInfo, LeagueTable};
pub use runner::{BatchReport, BatchRunner, RunnerConfig};
pub use scraper::{Fetch, ScraperConfig, ScraperError, WebScraper};
pub use store::Store;

pub(crate) const BASE_URL: &str = "https://www.transfermarkt.us";

/// Sent with every request; transfermarkt rejects clients without a browser agent.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/536.5 (KHTML, like Gecko) Chrome/19.0.1084.52 Safari/536.5";

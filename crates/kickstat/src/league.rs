use std::collections::HashMap;
use std::fmt::Display;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::Tier;

#[derive(Debug, thiserror::Error)]
pub enum LeagueError {
    #[error("Failed to read league table: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed league table: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unknown country: {0}")]
    UnknownCountry(String),
    #[error("Country listed more than once: {0}")]
    DuplicateCountry(String),
}

/// Competition metadata of one country, as listed in the league table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueInfo {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Tier 1")]
    pub tier1: String,
    #[serde(rename = "Tier 2")]
    pub tier2: String,
}

impl LeagueInfo {
    /// URL slug of the league for the given tier, e.g. `premier-league`.
    pub fn name(&self, tier: Tier) -> &str {
        match tier {
            Tier::One => &self.tier1,
            Tier::Two => &self.tier2,
        }
    }

    /// League identifier `code + tier`, e.g. `GB1`.
    pub fn league_id(&self, tier: Tier) -> String {
        format!("{}{}", self.code, tier)
    }
}

impl Display for LeagueInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<16} {:<4} {} / {}",
            self.country, self.code, self.tier1, self.tier2
        )
    }
}

/// Read-only league metadata keyed by country, in file order.
#[derive(Debug, Clone, Default)]
pub struct LeagueTable {
    leagues: Vec<LeagueInfo>,
    index: HashMap<String, usize>,
}

impl LeagueTable {
    pub fn new(leagues: Vec<LeagueInfo>) -> Result<Self, LeagueError> {
        let mut index = HashMap::with_capacity(leagues.len());
        for (i, league) in leagues.iter().enumerate() {
            if index.insert(league.country.clone(), i).is_some() {
                return Err(LeagueError::DuplicateCountry(league.country.clone()));
            }
        }
        Ok(Self { leagues, index })
    }

    /// Loads a table with the header `Country,Code,Tier 1,Tier 2`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LeagueError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let leagues = rdr
            .deserialize::<LeagueInfo>()
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Loaded {} league(s)", leagues.len());
        Self::new(leagues)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LeagueError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn get(&self, country: &str) -> Result<&LeagueInfo, LeagueError> {
        self.index
            .get(country)
            .map(|&i| &self.leagues[i])
            .ok_or_else(|| LeagueError::UnknownCountry(country.to_string()))
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.leagues.iter().map(|l| l.country.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LeagueInfo> {
        self.leagues.iter()
    }

    pub fn len(&self) -> usize {
        self.leagues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leagues.is_empty()
    }
}

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Invalid record kind '{0}'. Accepted values: 'standings', 'market-values', 'mv'")]
pub struct RecordKindParseError(String);

#[derive(Debug, thiserror::Error)]
#[error("Invalid tier '{0}'. Accepted values: '1', '2'")]
pub struct TierParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Standings,
    MarketValues,
}

impl RecordKind {
    /// File name prefix of persisted tables.
    pub fn prefix(&self) -> &'static str {
        match self {
            RecordKind::Standings => "S",
            RecordKind::MarketValues => "MV",
        }
    }

    /// Sub-directory persisted tables of this kind are written to.
    pub fn dir_name(&self) -> &'static str {
        match self {
            RecordKind::Standings => "standings",
            RecordKind::MarketValues => "market_values",
        }
    }

    /// Path segment of the transfermarkt page holding this kind of table.
    pub(crate) fn page(&self) -> &'static str {
        match self {
            RecordKind::Standings => "tabelle",
            RecordKind::MarketValues => "startseite",
        }
    }
}

impl FromStr for RecordKind {
    type Err = RecordKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standings" | "s" => Ok(RecordKind::Standings),
            "market-values" | "market_values" | "mv" => Ok(RecordKind::MarketValues),
            _ => Err(RecordKindParseError(s.to_string())),
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Standings => write!(f, "Standings"),
            RecordKind::MarketValues => write!(f, "Market values"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::One, Tier::Two];

    pub fn number(&self) -> u8 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
        }
    }
}

impl FromStr for Tier {
    type Err = TierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Tier::One),
            "2" => Ok(Tier::Two),
            _ => Err(TierParseError(s.to_string())),
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One fetch unit of a batch. Ordered country-major, then year, then tier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub country: String,
    pub year: i32,
    pub tier: Tier,
}

impl WorkItem {
    pub fn new(country: impl Into<String>, year: i32, tier: Tier) -> Self {
        Self {
            country: country.into(),
            year,
            tier,
        }
    }
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} tier {}", self.country, self.year, self.tier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRecord {
    #[serde(rename = "Rank")]
    pub rank: u32,
    #[serde(rename = "Club")]
    pub club: String,
    #[serde(rename = "Pld")]
    pub played: u32,
    #[serde(rename = "W")]
    pub wins: u32,
    #[serde(rename = "D")]
    pub draws: u32,
    #[serde(rename = "L")]
    pub losses: u32,
    #[serde(rename = "Goals_For")]
    pub goals_for: u32,
    #[serde(rename = "Goals_Against")]
    pub goals_against: u32,
    #[serde(rename = "+/-")]
    pub goal_difference: i32,
    #[serde(rename = "Pts")]
    pub points: i32,
    #[serde(rename = "League")]
    pub league: String,
    #[serde(rename = "Year")]
    pub year: i32,
}

impl Display for StandingsRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>3}. {:<32} {:>3} {:>3} {:>3} {:>3} {:>4}:{:<4} {:>+4} {:>4}",
            self.rank,
            self.club,
            self.played,
            self.wins,
            self.draws,
            self.losses,
            self.goals_for,
            self.goals_against,
            self.goal_difference,
            self.points
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketValueRecord {
    #[serde(rename = "VRank")]
    pub value_rank: u32,
    #[serde(rename = "Club")]
    pub club: String,
    #[serde(rename = "Squad")]
    pub squad: u32,
    #[serde(rename = "Avg Age")]
    pub average_age: Option<f64>,
    #[serde(rename = "Foreigners")]
    pub foreigners: u32,
    #[serde(rename = "Avg Player Value (m)")]
    pub average_player_value: Option<f64>,
    #[serde(rename = "Value (m)")]
    pub value: Option<f64>,
    #[serde(rename = "League")]
    pub league: String,
    #[serde(rename = "Year")]
    pub year: i32,
}

impl Display for MarketValueRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let money = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}m"));
        write!(
            f,
            "{:>3}. {:<32} squad {:>2}, foreigners {:>2}, avg {}, total {}",
            self.value_rank,
            self.club,
            self.squad,
            self.foreigners,
            money(self.average_player_value),
            money(self.value)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum RecordSet {
    Standings(Vec<StandingsRecord>),
    MarketValues(Vec<MarketValueRecord>),
}

impl RecordSet {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordSet::Standings(_) => RecordKind::Standings,
            RecordSet::MarketValues(_) => RecordKind::MarketValues,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordSet::Standings(rows) => rows.len(),
            RecordSet::MarketValues(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for RecordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordSet::Standings(rows) => rows.iter().try_for_each(|r| writeln!(f, "{r}")),
            RecordSet::MarketValues(rows) => rows.iter().try_for_each(|r| writeln!(f, "{r}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_from_str() {
        assert_eq!("standings".parse::<RecordKind>().unwrap(), RecordKind::Standings);
        assert_eq!("mv".parse::<RecordKind>().unwrap(), RecordKind::MarketValues);
        assert_eq!(
            "market-values".parse::<RecordKind>().unwrap(),
            RecordKind::MarketValues
        );
        assert!("table".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!("1".parse::<Tier>().unwrap(), Tier::One);
        assert_eq!(" 2 ".parse::<Tier>().unwrap(), Tier::Two);
        assert!("3".parse::<Tier>().is_err());
    }

    #[test]
    fn test_work_item_ordering() {
        let mut items = vec![
            WorkItem::new("Spain", 2005, Tier::One),
            WorkItem::new("England", 2006, Tier::One),
            WorkItem::new("England", 2005, Tier::Two),
            WorkItem::new("England", 2005, Tier::One),
        ];
        items.sort();

        assert_eq!(items[0], WorkItem::new("England", 2005, Tier::One));
        assert_eq!(items[1], WorkItem::new("England", 2005, Tier::Two));
        assert_eq!(items[2], WorkItem::new("England", 2006, Tier::One));
        assert_eq!(items[3], WorkItem::new("Spain", 2005, Tier::One));
    }
}

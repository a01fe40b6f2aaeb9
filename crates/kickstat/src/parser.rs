use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::types::{MarketValueRecord, StandingsRecord};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Results table not found")]
    MissingTable,
    #[error("Row {row} is missing the '{column}' cell")]
    MissingCell { row: usize, column: &'static str },
    #[error("Found {titles} club title(s) for {rows} table row(s)")]
    Misaligned { rows: usize, titles: usize },
    #[error("Invalid number in '{column}': {value}")]
    InvalidNumber { column: &'static str, value: String },
    #[error("Invalid money value: {0}")]
    InvalidValue(String),
    #[error("Results table has no data rows")]
    EmptyTable,
}

/// Cells of a standings row: rank, logo, club, played, W, D, L, goals, +/-, points.
const STANDINGS_CELLS: usize = 10;
/// Cells of a market value row: logo, club, squad, age, foreigners, avg value, total value.
const MARKET_VALUE_CELLS: usize = 7;

static RE_MONEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^€?\s*(\d+(?:\.\d+)?)\s*(bn|m|k)?$").expect("invalid regex: money value")
});
static SEL_RESULTS_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.items").expect("invalid selector: results table"));
static SEL_TITLED_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[title]").expect("invalid selector: titled anchor"));

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn children_named<'a>(
    element: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == name)
}

/// Direct `tbody` rows of the table holding at least one `td`. Rows of tables
/// nested inside cells are not included.
fn body_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    children_named(table, "tbody")
        .flat_map(|tbody| children_named(tbody, "tr"))
        .filter(|tr| children_named(*tr, "td").next().is_some())
        .collect()
}

fn row_cells(row: ElementRef) -> Vec<String> {
    children_named(row, "td")
        .map(|td| normalize_whitespace(&elem_text(td)))
        .collect()
}

fn find_results_table(document: &Html) -> Result<ElementRef<'_>, ParseError> {
    document
        .select(&SEL_RESULTS_TABLE)
        .next()
        .ok_or(ParseError::MissingTable)
}

fn cell<'a>(
    cells: &'a [String],
    row: usize,
    index: usize,
    column: &'static str,
) -> Result<&'a str, ParseError> {
    cells
        .get(index)
        .map(String::as_str)
        .filter(|c| !c.is_empty())
        .ok_or(ParseError::MissingCell { row, column })
}

fn parse_number<T: FromStr>(text: &str, column: &'static str) -> Result<T, ParseError> {
    let cleaned = text.replace('\u{2212}', "-");
    cleaned
        .trim_start_matches('+')
        .parse()
        .map_err(|_| ParseError::InvalidNumber {
            column,
            value: text.to_string(),
        })
}

fn parse_optional_number(text: &str, column: &'static str) -> Result<Option<f64>, ParseError> {
    match text.trim() {
        "" | "-" => Ok(None),
        t => parse_number(&t.replace(',', "."), column).map(Some),
    }
}

fn parse_goals(text: &str) -> Result<(u32, u32), ParseError> {
    let (scored, conceded) = text.split_once(':').ok_or_else(|| ParseError::InvalidNumber {
        column: "Goals",
        value: text.to_string(),
    })?;
    Ok((
        parse_number(scored.trim(), "Goals")?,
        parse_number(conceded.trim(), "Goals")?,
    ))
}

/// Parses a transfermarkt money string into millions of euros.
///
/// `€1.5m` is 1.5, `€500k` is 0.5 and `€1.2bn` is 1200. A bare amount is read
/// as plain euros. `-` and empty cells are missing values.
pub fn parse_value(text: &str) -> Result<Option<f64>, ParseError> {
    let text = text.trim();
    if text.is_empty() || text == "-" {
        return Ok(None);
    }

    let caps = RE_MONEY
        .captures(text)
        .ok_or_else(|| ParseError::InvalidValue(text.to_string()))?;
    let amount: f64 = caps[1]
        .parse()
        .map_err(|_| ParseError::InvalidValue(text.to_string()))?;

    let millions = match caps.get(2).map(|m| m.as_str()) {
        Some("bn") => amount * 1000.0,
        Some("m") => amount,
        Some("k") => amount / 1000.0,
        _ => amount / 1_000_000.0,
    };

    Ok(Some(millions))
}

/// Parses a league table page. Club names are taken from the anchor titles of
/// each row since the cell text is abbreviated.
pub fn parse_standings(
    html: &str,
    league: &str,
    year: i32,
) -> Result<Vec<StandingsRecord>, ParseError> {
    let document = Html::parse_document(html);
    let table = find_results_table(&document)?;
    let rows = body_rows(table);

    if rows.is_empty() {
        return Err(ParseError::EmptyTable);
    }

    let titles: Vec<String> = rows
        .iter()
        .filter_map(|row| row.select(&SEL_TITLED_ANCHOR).next())
        .filter_map(|a| a.value().attr("title"))
        .map(normalize_whitespace)
        .collect();

    // the i-th title names the i-th row
    if titles.len() != rows.len() {
        return Err(ParseError::Misaligned {
            rows: rows.len(),
            titles: titles.len(),
        });
    }

    rows.into_iter()
        .zip(titles)
        .enumerate()
        .map(|(i, (row, club))| {
            let row_no = i + 1;
            let cells = row_cells(row);
            if cells.len() < STANDINGS_CELLS {
                return Err(ParseError::MissingCell {
                    row: row_no,
                    column: "Pts",
                });
            }

            let (goals_for, goals_against) = parse_goals(cell(&cells, row_no, 7, "Goals")?)?;

            Ok(StandingsRecord {
                rank: parse_number(cell(&cells, row_no, 0, "Rank")?, "Rank")?,
                club,
                played: parse_number(cell(&cells, row_no, 3, "Pld")?, "Pld")?,
                wins: parse_number(cell(&cells, row_no, 4, "W")?, "W")?,
                draws: parse_number(cell(&cells, row_no, 5, "D")?, "D")?,
                losses: parse_number(cell(&cells, row_no, 6, "L")?, "L")?,
                goals_for,
                goals_against,
                goal_difference: parse_number(cell(&cells, row_no, 8, "+/-")?, "+/-")?,
                points: parse_number(cell(&cells, row_no, 9, "Pts")?, "Pts")?,
                league: league.to_string(),
                year,
            })
        })
        .collect()
}

/// Parses a league overview page into club market values, ranked by row order.
pub fn parse_market_values(
    html: &str,
    league: &str,
    year: i32,
) -> Result<Vec<MarketValueRecord>, ParseError> {
    let document = Html::parse_document(html);
    let table = find_results_table(&document)?;

    let mut rows: Vec<Vec<String>> = body_rows(table).into_iter().map(row_cells).collect();

    let is_filler = |cells: &Vec<String>| cells.iter().all(|c| c.is_empty());
    if rows.first().is_some_and(is_filler) {
        rows.remove(0);
    }
    if rows
        .last()
        .is_some_and(|r| r.len() < MARKET_VALUE_CELLS || is_filler(r))
    {
        rows.pop();
    }

    if rows.is_empty() {
        return Err(ParseError::EmptyTable);
    }

    rows.iter()
        .enumerate()
        .map(|(i, cells)| {
            let row_no = i + 1;
            if cells.len() < MARKET_VALUE_CELLS {
                return Err(ParseError::MissingCell {
                    row: row_no,
                    column: "Value (m)",
                });
            }

            let value_rank = u32::try_from(row_no).map_err(|_| ParseError::InvalidNumber {
                column: "VRank",
                value: row_no.to_string(),
            })?;

            Ok(MarketValueRecord {
                value_rank,
                club: cell(cells, row_no, 1, "Club")?.to_string(),
                squad: parse_number(cell(cells, row_no, 2, "Squad")?, "Squad")?,
                average_age: parse_optional_number(&cells[3], "Avg Age")?,
                foreigners: parse_number(cell(cells, row_no, 4, "Foreigners")?, "Foreigners")?,
                average_player_value: parse_value(&cells[5])?,
                value: parse_value(&cells[6])?,
                league: league.to_string(),
                year,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn approx(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|v| (v - expected).abs() < 1e-9)
    }

    fn standings_table(rows: &str) -> String {
        format!(
            r#"<html><body>
            <table class="items">
                <thead><tr><th>#</th><th colspan="2">Club</th><th></th><th>W</th><th>D</th><th>L</th><th>Goals</th><th>+/-</th><th>Pts</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
            </body></html>"#
        )
    }

    fn standings_row(rank: u32, title: Option<&str>, short: &str, goals: &str, diff: &str) -> String {
        let logo = match title {
            Some(t) => format!(r#"<a title="{t}" href="/club"><img alt="{t}"></a>"#),
            None => r#"<img alt="">"#.to_string(),
        };
        format!(
            "<tr><td>{rank}</td><td>{logo}</td><td><a href=\"/club\">{short}</a></td>\
             <td>10</td><td>6</td><td>2</td><td>2</td><td>{goals}</td><td>{diff}</td><td>20</td></tr>"
        )
    }

    #[test]
    fn test_parse_value_units() {
        assert_eq!(parse_value("€1.5m").unwrap(), Some(1.5));
        assert_eq!(parse_value("€500k").unwrap(), Some(0.5));
        assert_eq!(parse_value("€1.2bn").unwrap(), Some(1200.0));
        assert_eq!(parse_value("-").unwrap(), None);
        assert_eq!(parse_value("").unwrap(), None);
        assert_eq!(parse_value("  €25.00m ").unwrap(), Some(25.0));
        assert!(approx(parse_value("€250000").unwrap(), 0.25));
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        for text in ["€1.5x", "n/a", "€m", "1.2.3m"] {
            let err = parse_value(text).unwrap_err();
            assert!(
                matches!(err, ParseError::InvalidValue(ref v) if v == text),
                "'{}' should be rejected, got {:?}",
                text,
                err
            );
        }
    }

    #[test]
    fn test_parse_goals() {
        assert_eq!(parse_goals("94:33").unwrap(), (94, 33));
        assert_eq!(parse_goals(" 0 : 7 ").unwrap(), (0, 7));
        assert!(parse_goals("94-33").is_err());
    }

    #[test]
    fn test_parse_standings_from_fixture() {
        let html = fs::read_to_string("fixtures/standings_gb1_2023.html")
            .expect("Failed to read fixture");

        let standings = parse_standings(&html, "GB1", 2023).expect("Failed to parse standings");

        assert_eq!(standings.len(), 20, "Premier League has 20 clubs");
        assert!(standings.iter().all(|r| r.league == "GB1" && r.year == 2023));
        assert!(
            standings
                .iter()
                .enumerate()
                .all(|(i, r)| r.rank as usize == i + 1)
        );

        let first = &standings[0];
        assert_eq!(first.club, "Manchester City");
        assert_eq!(first.played, 38);
        assert_eq!((first.wins, first.draws, first.losses), (28, 5, 5));
        assert_eq!((first.goals_for, first.goals_against), (94, 33));
        assert_eq!(first.goal_difference, 61);
        assert_eq!(first.points, 89);

        assert_eq!(standings[5].club, "Brighton & Hove Albion");
        assert_eq!(standings[10].goal_difference, -9);

        let last = standings.last().unwrap();
        assert_eq!(last.club, "Southampton FC");
        assert_eq!(last.points, 25);

        for record in &standings {
            assert_eq!(record.wins + record.draws + record.losses, record.played);
            assert_eq!(
                record.goals_for as i32 - record.goals_against as i32,
                record.goal_difference
            );
        }
    }

    #[test]
    fn test_parse_standings_names_follow_row_order() {
        let html = standings_table(&format!(
            "{}{}",
            standings_row(1, Some("FC Alpha"), "FC A", "6:2", "+4"),
            standings_row(2, Some("FC Beta"), "FC B", "2:6", "-4"),
        ));

        let standings = parse_standings(&html, "XX1", 2020).expect("Failed to parse standings");

        let clubs: Vec<&str> = standings.iter().map(|r| r.club.as_str()).collect();
        assert_eq!(clubs, vec!["FC Alpha", "FC Beta"]);
        assert_eq!((standings[0].goals_for, standings[0].goals_against), (6, 2));
        assert_eq!((standings[1].goals_for, standings[1].goals_against), (2, 6));
        assert_eq!(standings[0].goal_difference, 4);
        assert_eq!(standings[1].goal_difference, -4);
        assert_eq!(standings[1].rank, 2);
    }

    #[test]
    fn test_parse_standings_misaligned_titles() {
        let html = standings_table(&format!(
            "{}{}",
            standings_row(1, Some("FC Alpha"), "FC A", "6:2", "4"),
            standings_row(2, None, "FC B", "2:6", "-4"),
        ));

        let err = parse_standings(&html, "XX1", 2020).unwrap_err();
        assert!(matches!(err, ParseError::Misaligned { rows: 2, titles: 1 }));
    }

    #[test]
    fn test_parse_standings_missing_table() {
        let html = "<html><body><table class=\"other\"><tr><td>1</td></tr></table></body></html>";

        let err = parse_standings(html, "XX1", 2020).unwrap_err();
        assert!(matches!(err, ParseError::MissingTable));
    }

    #[test]
    fn test_parse_standings_missing_cells() {
        let html = standings_table(
            r#"<tr><td>1</td><td><a title="FC Alpha"></a></td><td>FC A</td><td>10</td></tr>"#,
        );

        let err = parse_standings(&html, "XX1", 2020).unwrap_err();
        assert!(matches!(err, ParseError::MissingCell { row: 1, .. }));
    }

    #[test]
    fn test_parse_standings_bad_goals() {
        let html = standings_table(&standings_row(1, Some("FC Alpha"), "FC A", "six", "4"));

        let err = parse_standings(&html, "XX1", 2020).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { column: "Goals", .. }));
    }

    #[test]
    fn test_parse_standings_empty_table() {
        let html = standings_table("");

        let err = parse_standings(&html, "XX1", 2020).unwrap_err();
        assert!(matches!(err, ParseError::EmptyTable));
    }

    #[test]
    fn test_parse_market_values_from_fixture() {
        let html = fs::read_to_string("fixtures/market_values_gb1_2024.html")
            .expect("Failed to read fixture");

        let values =
            parse_market_values(&html, "GB1", 2024).expect("Failed to parse market values");

        assert_eq!(values.len(), 20, "Premier League has 20 clubs");
        assert!(values.iter().all(|r| r.league == "GB1" && r.year == 2024));
        assert_eq!(
            values.iter().map(|r| r.value_rank).collect::<Vec<_>>(),
            (1..=20).collect::<Vec<_>>()
        );

        let first = &values[0];
        assert_eq!(first.club, "Manchester City");
        assert_eq!(first.squad, 26);
        assert_eq!(first.foreigners, 19);
        assert!(approx(first.average_age, 26.9));
        assert!(approx(first.average_player_value, 49.25));
        assert!(approx(first.value, 1280.0));

        let last = values.last().unwrap();
        assert_eq!(last.club, "Luton Town");
        assert!(approx(last.value, 85.1));
    }

    #[test]
    fn test_parse_market_values_trims_filler_and_summary_rows() {
        let html = r#"<html><body>
            <table class="items">
                <tbody>
                    <tr><td><img alt="logo"></td></tr>
                    <tr><td><img></td><td><a title="FC Alpha">FC Alpha</a></td><td>30</td><td>24.5</td><td>12</td><td>€850k</td><td>€25.50m</td></tr>
                    <tr><td><img></td><td><a title="FC Beta">FC Beta</a></td><td>28</td><td>-</td><td>4</td><td>-</td><td>€1.2bn</td></tr>
                    <tr><td></td><td>Total:</td><td>58</td></tr>
                </tbody>
            </table>
            </body></html>"#;

        let values = parse_market_values(html, "XX2", 2019).expect("Failed to parse");

        assert_eq!(values.len(), 2);
        assert_eq!(values[0].value_rank, 1);
        assert_eq!(values[0].club, "FC Alpha");
        assert!(approx(values[0].average_player_value, 0.85));
        assert!(approx(values[0].value, 25.5));

        assert_eq!(values[1].value_rank, 2);
        assert_eq!(values[1].average_age, None);
        assert_eq!(values[1].average_player_value, None);
        assert_eq!(values[1].value, Some(1200.0));
        assert_eq!(values[1].league, "XX2");
    }

    #[test]
    fn test_parse_market_values_short_row_fails() {
        let html = r#"<table class="items"><tbody>
            <tr><td><img></td><td>FC Alpha</td><td>30</td></tr>
            <tr><td><img></td><td>FC Beta</td><td>28</td><td>25.1</td><td>4</td><td>€1m</td><td>€28m</td></tr>
        </tbody></table>"#;

        let err = parse_market_values(html, "XX2", 2019).unwrap_err();
        assert!(matches!(err, ParseError::MissingCell { row: 1, .. }));
    }

    #[test]
    fn test_parse_market_values_bad_money() {
        let html = r#"<table class="items"><tbody>
            <tr><td><img></td><td>FC Alpha</td><td>30</td><td>25.1</td><td>4</td><td>€1m</td><td>€28q</td></tr>
            <tr><td></td><td>Total:</td></tr>
        </tbody></table>"#;

        let err = parse_market_values(html, "XX2", 2019).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue(ref v) if v == "€28q"));
    }

    #[test]
    fn test_parse_market_values_bad_squad() {
        let html = r#"<table class="items"><tbody>
            <tr><td><img></td><td>FC Alpha</td><td>thirty</td><td>25.1</td><td>4</td><td>€1m</td><td>€28m</td></tr>
        </tbody></table>"#;

        let err = parse_market_values(html, "XX2", 2019).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { column: "Squad", .. }));
    }
}

//! Figure Skating Fandom wiki — US ice rink directory.
//!
//! The wiki page is a curated list organised by state, with separate
//! sections for active and defunct rinks. The Cloudflare-protected front
//! end is bypassed by asking the MediaWiki parse API for the rendered
//! HTML as JSON.
//!
//! Parsing concerns handled here:
//! - `rowspan` on City / County cells when a city has multiple rinks
//! - variable column headers (County vs Borough vs Parish, Notes
//!   sometimes absent, Club vs Affiliated Club)
//! - Clubs / Data summary tables at the bottom that are NOT rink data
//! - rink website URLs embedded as `<a>` tags inside the Rink column

use std::time::Duration;

use ice_maker_source_models::{FetchExtras, FetchResult, WikiExtras};
use scraper::{ElementRef, Html, Selector};

use crate::{RinkFetcher, SourceError};

/// Registry module string for this fetcher.
pub const MODULE: &str = "fetchers.fandom_wiki";

const API_URL: &str = "https://figure-skating.fandom.com/api.php";
const PAGE_TITLE: &str = "List_of_ice_rinks_in_the_USA";
const USER_AGENT: &str = "ice-maker/0.1 (skatetrax rink directory builder)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Section headlines that are not state names.
const SKIP_SECTIONS: &[&str] = &[
    "Clubs",
    "Defunct Clubs",
    "Data",
    "Sources",
    "Contents",
    "References",
    "External links",
];

/// Column headers that mean "county" across states.
const COUNTY_SYNONYMS: &[&str] = &["County", "Borough", "Parish"];

/// Fetcher for the wiki rink list.
#[derive(Debug, Default)]
pub struct FandomWikiFetcher {
    api_url: String,
}

impl FandomWikiFetcher {
    /// Creates a fetcher against the live wiki.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_url: API_URL.to_string(),
        }
    }

    /// Creates a fetcher against an alternate API URL (tests).
    #[must_use]
    pub fn with_url(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
        }
    }
}

impl RinkFetcher for FandomWikiFetcher {
    async fn fetch(&self) -> Result<Vec<FetchResult>, SourceError> {
        log::info!("fandom_wiki: fetching page via MediaWiki API");

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let body: serde_json::Value = client
            .get(&self.api_url)
            .query(&[
                ("action", "parse"),
                ("page", PAGE_TITLE),
                ("format", "json"),
                ("prop", "text"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let html = body["parse"]["text"]["*"]
            .as_str()
            .ok_or_else(|| SourceError::Parse("parse.text.* missing from API response".to_string()))?;

        let results = parse_wiki_page(html);

        let active = results
            .iter()
            .filter(|r| !matches!(&r.extras, FetchExtras::Wiki(w) if w.is_defunct))
            .count();
        log::info!(
            "fandom_wiki: {} rinks collected ({active} active, {} defunct)",
            results.len(),
            results.len() - active
        );

        Ok(results)
    }

    fn module(&self) -> &'static str {
        MODULE
    }
}

/// One resolved table cell: visible text plus the first external link.
type Cell = (String, Option<String>);

/// Parses the rendered wiki page into fetch results.
#[must_use]
pub fn parse_wiki_page(html: &str) -> Vec<FetchResult> {
    let document = Html::parse_document(html);
    let content_sel = Selector::parse("div.mw-parser-output").expect("valid selector");
    let headline_sel = Selector::parse("span.mw-headline").expect("valid selector");

    let Some(content) = document.select(&content_sel).next() else {
        log::warn!("fandom_wiki: content div not found in API response");
        return Vec::new();
    };

    let mut results = Vec::new();
    let mut current_state: Option<String> = None;
    let mut is_defunct = false;

    for child in content.children() {
        let Some(element) = ElementRef::wrap(child) else {
            continue;
        };

        match element.value().name() {
            "h2" => {
                let Some(span) = element.select(&headline_sel).next() else {
                    continue;
                };
                let headline = collapsed_text(&span);
                if SKIP_SECTIONS.contains(&headline.as_str()) {
                    current_state = None;
                    continue;
                }
                current_state = Some(headline);
                is_defunct = false;
            }
            "h3" => {
                if let Some(span) = element.select(&headline_sel).next()
                    && collapsed_text(&span).to_lowercase().contains("defunct")
                {
                    is_defunct = true;
                }
            }
            "table" => {
                let Some(state) = current_state.as_deref() else {
                    continue;
                };

                let (headers, rows) = resolve_table(&element);
                let Some(columns) = map_columns(&headers) else {
                    log::debug!(
                        "fandom_wiki: skipping non-rink table under {state} (headers: {headers:?})"
                    );
                    continue;
                };

                for row in &rows {
                    if let Some(result) = row_to_result(row, &columns, state, is_defunct) {
                        results.push(result);
                    }
                }
            }
            _ => {}
        }
    }

    results
}

/// Semantic column roles found in a rink table.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnMap {
    city: Option<usize>,
    county: Option<usize>,
    rink: Option<usize>,
    club: Option<usize>,
    notes: Option<usize>,
}

/// Maps header names to semantic roles; `None` when the table has no
/// Rink column (Clubs / Data tables).
#[must_use]
pub fn map_columns(headers: &[String]) -> Option<ColumnMap> {
    let mut map = ColumnMap::default();

    for (i, header) in headers.iter().enumerate() {
        let header = header.trim();
        if header == "City" {
            map.city = Some(i);
        } else if COUNTY_SYNONYMS.contains(&header) {
            map.county = Some(i);
        } else if header == "Rink" || header == "Name" {
            map.rink = Some(i);
        } else if header.contains("Club") {
            map.club = Some(i);
        } else if header == "Notes" {
            map.notes = Some(i);
        }
    }

    map.rink.is_some().then_some(map)
}

/// Parses an HTML table into structured rows, expanding rowspans.
///
/// Returns `(headers, rows)`; each row has one [`Cell`] per header
/// column.
#[must_use]
pub fn resolve_table(table: &ElementRef<'_>) -> (Vec<String>, Vec<Vec<Cell>>) {
    let tr_sel = Selector::parse("tr").expect("valid selector");
    let th_sel = Selector::parse("th").expect("valid selector");
    let cell_sel = Selector::parse("td, th").expect("valid selector");
    let link_sel = Selector::parse("a").expect("valid selector");

    let raw_rows: Vec<ElementRef<'_>> = table.select(&tr_sel).collect();
    let Some(header_row) = raw_rows.first() else {
        return (Vec::new(), Vec::new());
    };

    let headers: Vec<String> = header_row
        .select(&th_sel)
        .map(|th| collapsed_text(&th))
        .collect();
    if headers.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let ncols = headers.len();
    let mut grid: Vec<Vec<Cell>> = Vec::new();
    // Each slot is either None (free) or (rows_remaining, cell_value).
    let mut active: Vec<Option<(usize, Cell)>> = vec![None; ncols];

    for tr in &raw_rows[1..] {
        let cells: Vec<ElementRef<'_>> = tr.select(&cell_sel).collect();
        let mut row: Vec<Cell> = vec![(String::new(), None); ncols];
        let mut ci = 0usize;

        for col in 0..ncols {
            if let Some((remaining, value)) = active[col].take() {
                row[col] = value.clone();
                if remaining > 1 {
                    active[col] = Some((remaining - 1, value));
                }
            } else if ci < cells.len() {
                let cell = cells[ci];
                ci += 1;

                let text = cell
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" | ");

                let href = cell
                    .select(&link_sel)
                    .filter_map(|a| a.value().attr("href"))
                    .find(|h| h.starts_with("http"))
                    .map(String::from);

                let value: Cell = (text, href);
                let rowspan = cell
                    .value()
                    .attr("rowspan")
                    .and_then(|rs| rs.parse::<usize>().ok())
                    .unwrap_or(1);
                if rowspan > 1 {
                    active[col] = Some((rowspan - 1, value.clone()));
                }
                row[col] = value;
            }
        }

        grid.push(row);
    }

    (headers, grid)
}

/// Converts one resolved row into a fetch result, or `None` for filler
/// rows.
fn row_to_result(
    row: &[Cell],
    columns: &ColumnMap,
    state: &str,
    is_defunct: bool,
) -> Option<FetchResult> {
    let text = |idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .map(|(t, _)| t.clone())
            .unwrap_or_default()
    };
    let href = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(|(_, h)| h.clone());

    let rink_name = text(columns.rink);
    if rink_name.is_empty() || rink_name.to_lowercase() == "none" {
        return None;
    }

    let city = text(columns.city);

    Some(FetchResult {
        name: rink_name,
        address: format!("{city}, {state}"),
        extras: FetchExtras::Wiki(WikiExtras {
            city,
            state: state.to_string(),
            county: text(columns.county),
            club: text(columns.club),
            notes: text(columns.notes),
            website: href(columns.rink),
            is_defunct,
        }),
    })
}

/// All text under an element, fragments trimmed and whitespace-collapsed.
fn collapsed_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <div class="mw-parser-output">
      <h2><span class="mw-headline">Colorado</span></h2>
      <table>
        <tr><th>City</th><th>County</th><th>Rink</th><th>Affiliated Club</th><th>Notes</th></tr>
        <tr>
          <td rowspan="2">Denver</td><td rowspan="2">Denver</td>
          <td><a href="https://bigbear.example">Big Bear Ice Arena</a></td>
          <td>Denver FSC</td><td>Two sheets</td>
        </tr>
        <tr>
          <td>South Suburban Rink</td><td></td><td></td>
        </tr>
        <tr>
          <td>Boulder</td><td>Boulder</td><td>none</td><td></td><td></td>
        </tr>
      </table>
      <h3><span class="mw-headline">Defunct Rinks</span></h3>
      <table>
        <tr><th>City</th><th>County</th><th>Rink</th></tr>
        <tr><td>Pueblo</td><td>Pueblo</td><td>Old Ice Palace</td></tr>
      </table>
      <h2><span class="mw-headline">Clubs</span></h2>
      <table>
        <tr><th>Club</th><th>City</th></tr>
        <tr><td>Some Club</td><td>Denver</td></tr>
      </table>
    </div>"#;

    #[test]
    fn collects_rinks_under_state_sections() {
        let results = parse_wiki_page(SAMPLE);
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Big Bear Ice Arena", "South Suburban Rink", "Old Ice Palace"]
        );
    }

    #[test]
    fn rowspan_cities_apply_to_following_rows() {
        let results = parse_wiki_page(SAMPLE);
        let FetchExtras::Wiki(extras) = &results[1].extras else {
            panic!("expected wiki extras");
        };
        assert_eq!(extras.city, "Denver");
        assert_eq!(results[1].address, "Denver, Colorado");
    }

    #[test]
    fn defunct_section_flags_rows() {
        let results = parse_wiki_page(SAMPLE);
        let FetchExtras::Wiki(active) = &results[0].extras else {
            panic!("expected wiki extras");
        };
        let FetchExtras::Wiki(defunct) = &results[2].extras else {
            panic!("expected wiki extras");
        };
        assert!(!active.is_defunct);
        assert!(defunct.is_defunct);
    }

    #[test]
    fn website_link_is_captured_from_rink_cell() {
        let results = parse_wiki_page(SAMPLE);
        let FetchExtras::Wiki(extras) = &results[0].extras else {
            panic!("expected wiki extras");
        };
        assert_eq!(extras.website.as_deref(), Some("https://bigbear.example"));
    }

    #[test]
    fn club_tables_are_skipped() {
        let results = parse_wiki_page(SAMPLE);
        assert!(results.iter().all(|r| r.name != "Some Club"));
    }

    #[test]
    fn none_rows_are_dropped() {
        let results = parse_wiki_page(SAMPLE);
        assert!(results.iter().all(|r| r.name.to_lowercase() != "none"));
    }

    #[test]
    fn tables_without_rink_column_map_to_none() {
        assert!(map_columns(&["Club".to_string(), "City".to_string()]).is_none());
        assert!(
            map_columns(&["City".to_string(), "Borough".to_string(), "Rink".to_string()])
                .is_some()
        );
    }

    #[test]
    fn missing_content_div_yields_empty() {
        assert!(parse_wiki_page("<div class='other'></div>").is_empty());
    }
}

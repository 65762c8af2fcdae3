//! sk8stuff single-page rink table.
//!
//! One PHP page returns every rink in one HTML table with columns:
//! Rink Name | Street | City/State/Zip | Rink Phone | Map. The page also
//! carries a handful of `Junk Rink` fixture rows the site owner uses for
//! testing; those are dropped.

use std::time::Duration;

use ice_maker_source_models::FetchResult;
use scraper::{Html, Selector};

use crate::{RinkFetcher, SourceError};

/// Registry module string for this fetcher.
pub const MODULE: &str = "fetchers.sk8stuff";

const SK8STUFF_URL: &str = "https://sk8stuff.com/utility/lister_rinks.php";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetcher for the sk8stuff rink lister.
#[derive(Debug, Default)]
pub struct Sk8stuffFetcher {
    url: String,
}

impl Sk8stuffFetcher {
    /// Creates a fetcher against the live site.
    #[must_use]
    pub fn new() -> Self {
        Self {
            url: SK8STUFF_URL.to_string(),
        }
    }

    /// Creates a fetcher against an alternate URL (tests).
    #[must_use]
    pub fn with_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

impl RinkFetcher for Sk8stuffFetcher {
    async fn fetch(&self) -> Result<Vec<FetchResult>, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let body = client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_rink_table(&body))
    }

    fn module(&self) -> &'static str {
        MODULE
    }
}

/// Parses the rink lister HTML into fetch results.
#[must_use]
pub fn parse_rink_table(html: &str) -> Vec<FetchResult> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").expect("valid selector");
    let row_sel = Selector::parse("tr").expect("valid selector");
    let cell_sel = Selector::parse("td").expect("valid selector");

    let Some(table) = document.select(&table_sel).next() else {
        log::warn!("No table found at sk8stuff rink lister");
        return Vec::new();
    };

    let mut rinks = Vec::new();
    let mut skipped = 0usize;

    for row in table.select(&row_sel).skip(1) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        if cells.len() < 3 {
            skipped += 1;
            continue;
        }

        let name = cells[0].replace(';', " -").replace(',', " -");
        let street = cells[1].replace([',', '\n'], " ");
        let city_state = cells[2].trim();

        // "City/State/Zip" is typically "CityName ST" or "CityName ST 12345".
        let (city, state) = city_state.rsplit_once(' ').unwrap_or((city_state, ""));

        if name.trim().is_empty() || name.contains("Junk Rink") {
            skipped += 1;
            continue;
        }

        rinks.push(FetchResult::plain(
            name.trim(),
            format!("{}, {}, {}", street.trim(), city.trim(), state.trim()),
        ));
    }

    log::info!("sk8stuff: {} rinks collected, {skipped} rows skipped", rinks.len());
    rinks
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><body><table>
          <tr><th>Rink Name</th><th>Street</th><th>City/State/Zip</th><th>Phone</th><th>Map</th></tr>
          <tr><td>Polar Ice House</td><td>100 Main St</td><td>Raleigh NC</td><td>555-1234</td><td>map</td></tr>
          <tr><td>Rink, With Comma</td><td>200 Oak Ave,
Suite 3</td><td>Cary NC 27511</td><td></td><td></td></tr>
          <tr><td>Junk Rink #1</td><td>1 Nowhere</td><td>Nowhere XX</td><td></td><td></td></tr>
          <tr><td>Short Row</td><td>only two cells</td></tr>
        </table></body></html>"#;

    #[test]
    fn parses_rows_into_results() {
        let rinks = parse_rink_table(SAMPLE);
        assert_eq!(rinks.len(), 2);

        assert_eq!(rinks[0].name, "Polar Ice House");
        assert_eq!(rinks[0].address, "100 Main St, Raleigh, NC");
    }

    #[test]
    fn commas_in_names_become_dashes() {
        let rinks = parse_rink_table(SAMPLE);
        assert_eq!(rinks[1].name, "Rink - With Comma");
    }

    #[test]
    fn city_state_zip_splits_on_last_space() {
        let rinks = parse_rink_table(SAMPLE);
        // Zip is part of the state token split; the state keeps the last
        // whitespace-separated token.
        assert!(rinks[1].address.starts_with("200 Oak Ave"));
    }

    #[test]
    fn junk_and_short_rows_are_skipped() {
        let rinks = parse_rink_table(SAMPLE);
        assert!(rinks.iter().all(|r| !r.name.contains("Junk Rink")));
    }

    #[test]
    fn missing_table_yields_empty() {
        assert!(parse_rink_table("<html><body>no table</body></html>").is_empty());
    }
}

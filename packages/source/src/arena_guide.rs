//! arena-guide.com paginated CMS directory.
//!
//! The site is WordPress with a jet-engine listing grid; rink cards come
//! back as rendered HTML inside a JSON envelope from the admin-ajax
//! endpoint. The server-reported `max_num_pages` is based on a different
//! internal page size, so pagination runs until pages come back empty
//! rather than trusting that value.
//!
//! The site owner granted permission for this scrape; the request delay
//! stays conservative regardless.

use std::sync::LazyLock;
use std::time::Duration;

use ice_maker_source_models::FetchResult;
use regex::Regex;
use scraper::{Html, Selector};

use crate::{RinkFetcher, SourceError};

/// Registry module string for this fetcher.
pub const MODULE: &str = "fetchers.arena_guide";

const POST_URL: &str =
    "https://www.arena-guide.com/wp-admin/admin-ajax.php?action=jet-engines/arenas-with-pagination";
const SEED_URL: &str = "https://www.arena-guide.com/locations/usa";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Consecutive failed pages before pagination gives up.
const MAX_FAILED_STREAK: u32 = 5;
/// Consecutive empty pages before pagination stops.
const MAX_EMPTY_STREAK: u32 = 3;

/// Trailing zip fragment on a card address.
static TRAILING_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s?\d+$").expect("valid regex"));

/// The jet-smart-filters form template captured from the live site. The
/// `paged` field and the two pagination props vary per request; the rest
/// rides along unchanged.
const FORM_TEMPLATE: &[(&str, &str)] = &[
    ("action", "jet_smart_filters"),
    ("provider", "jet-engine/arenas-with-pagination"),
    ("settings[lisitng_id]", "40"),
    ("settings[columns]", "2"),
    ("settings[columns_mobile]", "1"),
    ("settings[column_min_width]", "240"),
    ("settings[inline_columns_css]", "false"),
    ("settings[is_archive_template]", "yes"),
    ("settings[post_status][]", "publish"),
    ("settings[posts_num]", "6"),
    ("settings[max_posts_num]", "9"),
    ("settings[not_found_message]", "No data was found"),
    ("settings[load_more_type]", "click"),
    ("settings[load_more_offset][unit]", "px"),
    ("settings[load_more_offset][size]", "0"),
    ("settings[slides_to_scroll]", "1"),
    ("settings[arrows]", "true"),
    ("settings[arrow_icon]", "fa fa-angle-left"),
    ("settings[autoplay]", "true"),
    ("settings[pause_on_hover]", "true"),
    ("settings[autoplay_speed]", "5000"),
    ("settings[infinite]", "true"),
    ("settings[effect]", "slide"),
    ("settings[speed]", "500"),
    ("settings[scroll_slider_on][]", "desktop"),
    ("settings[scroll_slider_on][]", "tablet"),
    ("settings[scroll_slider_on][]", "mobile"),
    ("settings[custom_query]", "yes"),
    ("settings[_element_id]", "arenas-with-pagination"),
    ("props[query_type]", "posts"),
    ("props[query_id]", "s"),
    ("referrer[uri]", "/locations/usa/"),
    ("referrer[self]", "/index.php"),
];

/// Live pagination values reported by the server on the first request and
/// echoed back on every subsequent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationProps {
    /// Total post count the server reports.
    pub found_posts: u64,
    /// Server-side page ceiling (informational only).
    pub max_num_pages: u64,
}

/// Fetcher for the arena-guide directory.
#[derive(Debug, Default)]
pub struct ArenaGuideFetcher {
    post_url: String,
    seed_url: String,
}

impl ArenaGuideFetcher {
    /// Creates a fetcher against the live site.
    #[must_use]
    pub fn new() -> Self {
        Self {
            post_url: POST_URL.to_string(),
            seed_url: SEED_URL.to_string(),
        }
    }

    /// Creates a fetcher against alternate URLs (tests).
    #[must_use]
    pub fn with_urls(post_url: &str, seed_url: &str) -> Self {
        Self {
            post_url: post_url.to_string(),
            seed_url: seed_url.to_string(),
        }
    }

    /// Requests one rendered page, returning its HTML content and the
    /// server's pagination props.
    async fn request_page(
        &self,
        client: &reqwest::Client,
        page_number: u64,
        props: Option<PaginationProps>,
    ) -> Result<(String, PaginationProps), SourceError> {
        let page_str = page_number.to_string();
        let (found_str, pages_str) = props.map_or_else(
            || ("1773".to_string(), "89".to_string()),
            |p| (p.found_posts.to_string(), p.max_num_pages.to_string()),
        );

        let mut form: Vec<(&str, &str)> = FORM_TEMPLATE.to_vec();
        form.push(("paged", &page_str));
        form.push(("props[found_posts]", &found_str));
        form.push(("props[max_num_pages]", &pages_str));
        form.push(("props[page]", &page_str));

        let body: serde_json::Value = client
            .post(&self.post_url)
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = body["content"].as_str().unwrap_or_default().to_string();
        let pagination = parse_pagination(&body)?;

        Ok((content, pagination))
    }
}

impl RinkFetcher for ArenaGuideFetcher {
    async fn fetch(&self) -> Result<Vec<FetchResult>, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        // Seed the session the way a browser lands on the listing page.
        if let Err(e) = client.get(&self.seed_url).send().await {
            log::warn!("arena_guide: seed request failed: {e}");
        }

        // Discover the live post count and page ceiling from the server.
        let (_, props) = self.request_page(&client, 1, None).await?;
        log::info!(
            "arena_guide reports found_posts={}, max_num_pages={}; paginating until empty",
            props.found_posts,
            props.max_num_pages
        );

        let mut rinks: Vec<FetchResult> = Vec::new();
        let mut failed_pages: Vec<u64> = Vec::new();
        let mut consecutive_empty: u32 = 0;
        let mut skipped_cards = 0usize;
        let mut page_number: u64 = 0;

        loop {
            page_number += 1;

            let content = match self.request_page(&client, page_number, Some(props)).await {
                Ok((content, _)) => content,
                Err(e) => {
                    log::warn!("arena_guide: request failed for page {page_number}: {e}");
                    failed_pages.push(page_number);
                    consecutive_empty += 1;
                    if consecutive_empty >= MAX_FAILED_STREAK {
                        log::info!("{MAX_FAILED_STREAK} consecutive empty/failed pages, stopping");
                        break;
                    }
                    tokio::time::sleep(REQUEST_DELAY * 4).await;
                    continue;
                }
            };

            let (page_rinks, page_skipped) = parse_cards(&content);

            if page_rinks.is_empty() && page_skipped == 0 {
                consecutive_empty += 1;
                if consecutive_empty >= MAX_EMPTY_STREAK {
                    log::info!(
                        "{MAX_EMPTY_STREAK} consecutive empty pages at page {page_number}, stopping"
                    );
                    break;
                }
                tokio::time::sleep(REQUEST_DELAY).await;
                continue;
            }

            consecutive_empty = 0;
            skipped_cards += page_skipped;
            rinks.extend(page_rinks);

            if page_number % 20 == 0 {
                log::info!("arena_guide progress: page {page_number} ({} rinks so far)", rinks.len());
            }

            tokio::time::sleep(REQUEST_DELAY).await;
        }

        if !failed_pages.is_empty() {
            log::warn!("arena_guide: {} pages failed: {failed_pages:?}", failed_pages.len());
        }
        if skipped_cards > 0 {
            log::info!("arena_guide: {skipped_cards} cards skipped (missing name or address)");
        }

        log::info!(
            "arena_guide: collected {} rinks from {page_number} pages (expected {})",
            rinks.len(),
            props.found_posts
        );

        Ok(rinks)
    }

    fn module(&self) -> &'static str {
        MODULE
    }
}

/// Pulls the pagination props out of a response envelope.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] when the `pagination` object is absent
/// or non-numeric.
pub fn parse_pagination(body: &serde_json::Value) -> Result<PaginationProps, SourceError> {
    let pagination = &body["pagination"];

    let as_u64 = |value: &serde_json::Value| {
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    };

    let found_posts = as_u64(&pagination["found_posts"])
        .ok_or_else(|| SourceError::Parse("pagination.found_posts missing".to_string()))?;
    let max_num_pages = as_u64(&pagination["max_num_pages"])
        .ok_or_else(|| SourceError::Parse("pagination.max_num_pages missing".to_string()))?;

    Ok(PaginationProps {
        found_posts,
        max_num_pages,
    })
}

/// Extracts rink cards from one rendered page. Returns the parsed
/// results and how many cards were skipped for missing fields.
#[must_use]
pub fn parse_cards(html: &str) -> (Vec<FetchResult>, usize) {
    let document = Html::parse_fragment(html);
    let card_sel = Selector::parse("div.jet-listing-grid__item").expect("valid selector");
    let name_sel = Selector::parse("h2").expect("valid selector");
    let span_sel = Selector::parse("span.elementor-icon-list-text").expect("valid selector");

    let mut rinks = Vec::new();
    let mut skipped = 0usize;

    for card in document.select(&card_sel) {
        let name = card
            .select(&name_sel)
            .next()
            .map(|h2| h2.text().collect::<String>().trim().to_string());

        let address = card
            .select(&span_sel)
            .filter_map(|span| clean_address(&span.text().collect::<String>()))
            .next();

        match (name, address) {
            (Some(name), Some(address)) if !name.is_empty() => {
                rinks.push(FetchResult::plain(name, address));
            }
            _ => skipped += 1,
        }
    }

    (rinks, skipped)
}

/// Strips trailing country names, zip codes, and URLs from a card's
/// address span. Returns `None` for spans that aren't addresses at all.
#[must_use]
pub fn clean_address(raw_text: &str) -> Option<String> {
    let mut location = raw_text.trim().to_string();

    for suffix in ["United States of America", "United States", "USA"] {
        if let Some(stripped) = location.strip_suffix(suffix) {
            location = stripped.trim().to_string();
        }
    }

    location = location.trim_end_matches([',', ' ']).to_string();
    location = TRAILING_ZIP_RE.replace(&location, "").trim().to_string();
    location = location.trim_end_matches(',').to_string();

    if location.contains("http") || location.is_empty() {
        return None;
    }
    Some(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_country_zip_and_commas() {
        assert_eq!(
            clean_address("6119 Landmark Center Blvd, Greensboro, NC, 27407, United States of America"),
            Some("6119 Landmark Center Blvd, Greensboro, NC".to_string())
        );
    }

    #[test]
    fn cleans_bare_usa_suffix() {
        assert_eq!(
            clean_address("100 Main St, Springfield, IL USA"),
            Some("100 Main St, Springfield, IL".to_string())
        );
    }

    #[test]
    fn rejects_urls() {
        assert_eq!(clean_address("https://example.com/rink"), None);
    }

    #[test]
    fn rejects_empty_after_cleaning() {
        assert_eq!(clean_address("  12345 "), None);
    }

    #[test]
    fn parses_cards_from_rendered_html() {
        let html = r#"
            <div class="jet-listing-grid__item">
              <h2>Greensboro Ice House</h2>
              <span class="elementor-icon-list-text">6119 Landmark Center Blvd, Greensboro, NC, 27407, United States</span>
              <span class="elementor-icon-list-text">https://greensboroice.com</span>
            </div>
            <div class="jet-listing-grid__item">
              <h2>No Address Rink</h2>
              <span class="elementor-icon-list-text">https://only-a-url.com</span>
            </div>"#;

        let (rinks, skipped) = parse_cards(html);
        assert_eq!(rinks.len(), 1);
        assert_eq!(skipped, 1);
        assert_eq!(rinks[0].name, "Greensboro Ice House");
        assert_eq!(rinks[0].address, "6119 Landmark Center Blvd, Greensboro, NC");
    }

    #[test]
    fn url_span_is_skipped_in_favor_of_address_span() {
        let html = r#"
            <div class="jet-listing-grid__item">
              <h2>Rink</h2>
              <span class="elementor-icon-list-text">https://rink.example</span>
              <span class="elementor-icon-list-text">1 Ice Way, Denver, CO, 80202, USA</span>
            </div>"#;

        let (rinks, _) = parse_cards(html);
        assert_eq!(rinks[0].address, "1 Ice Way, Denver, CO");
    }

    #[test]
    fn parses_pagination_from_numbers_or_strings() {
        let body = serde_json::json!({"pagination": {"found_posts": 1773, "max_num_pages": "89"}});
        let props = parse_pagination(&body).unwrap();
        assert_eq!(props.found_posts, 1773);
        assert_eq!(props.max_num_pages, 89);
    }

    #[test]
    fn missing_pagination_is_an_error() {
        let body = serde_json::json!({"content": "<div></div>"});
        assert!(parse_pagination(&body).is_err());
    }
}

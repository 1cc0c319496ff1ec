//! HTML page source for the ranked title index
//!
//! This module turns index pages into catalog values:
//! - Locating the title at a rank position in a partition's ranking
//! - Extracting the title page into a [`RecordDraft`]
//! - Extracting the parental advisory page into a complete [`CatalogRecord`]
//!
//! DOM traversal stays in this module. Classification and normalization are
//! delegated to the pure functions in [`crate::catalog`].

use crate::catalog::{
    classify, is_reserved_id, normalize_popularity, normalize_rating, normalize_severity, Advisory,
    AdvisoryCategory, CatalogRecord, Classification, MetadataEntry, MetadataRow, RecordDraft,
};
use crate::config::SourceConfig;
use crate::crawler::fetcher::{FetchError, PageFetcher};
use crate::state::Partition;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use thiserror::Error;

/// Why a title could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("title is not rated")]
    Unrated,

    #[error("title has no poster")]
    NoPoster,

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("malformed page: {0}")]
    Malformed(String),
}

/// Source of ranked titles and their details
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Finds the identifier at a 1-based rank position
    ///
    /// Returns `Ok(None)` when the ranking has no title at that position.
    async fn find_next_candidate(
        &self,
        partition: Partition,
        position: u32,
    ) -> Result<Option<String>, ExtractionFailure>;

    /// Extracts everything but the advisory for a title
    async fn parse_record(&self, id: &str) -> Result<RecordDraft, ExtractionFailure>;

    /// Completes a draft with its parental advisory
    async fn parse_advisory(
        &self,
        id: &str,
        draft: RecordDraft,
    ) -> Result<CatalogRecord, ExtractionFailure>;
}

const CANDIDATE_LINK: &str = ".lister-item-image a[href]";
const TITLE_TEXT: &str = "[class*='TitleHeader__TitleText']";
const GENRE_LINKS: &str = "[data-testid='storyline-genres'] li a";
const METADATA_LIST: &str = "[class*='TitleBlock__TitleMetaDataContainer'] ul";
const RATING_SCORE: &str = "[class*='AggregateRatingButton__RatingScore']";
const RATING_VOTES: &str = "[class*='AggregateRatingButton__TotalRatingAmount']";
const POSTER_IMAGE: &str = ".ipc-image";
const SYNOPSIS_TEXT: &str = "[class*='GenresAndPlot__TextContainerBreakpointL']";

/// Page section holding each advisory category
fn advisory_section(category: AdvisoryCategory) -> &'static str {
    match category {
        AdvisoryCategory::Nudity => "#advisory-nudity span",
        AdvisoryCategory::Violence => "#advisory-violence span",
        AdvisoryCategory::Profanity => "#advisory-profanity span",
        AdvisoryCategory::Substance => "#advisory-alcohol span",
        AdvisoryCategory::Fear => "#advisory-frightening span",
    }
}

/// Page source backed by the HTML title index
pub struct HtmlTitleSource<F: PageFetcher> {
    fetcher: F,
    base_url: String,
    min_user_rating: String,
    film_min_votes: u64,
    game_min_votes: u64,
}

impl<F: PageFetcher> HtmlTitleSource<F> {
    /// Creates a page source that fetches through `fetcher`
    pub fn new(fetcher: F, config: &SourceConfig) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            min_user_rating: config.min_user_rating.clone(),
            film_min_votes: config.film_min_votes,
            game_min_votes: config.game_min_votes,
        }
    }

    /// URL of the single-entry ranking page for a position
    ///
    /// Rankings are sorted by vote count, descending, and restricted to the
    /// partition's title type, minimum user rating and vote threshold.
    pub fn ranking_url(&self, partition: Partition, position: u32) -> String {
        let (title_type, min_votes) = match partition {
            Partition::Film => ("feature", self.film_min_votes),
            Partition::Game => ("video_game", self.game_min_votes),
        };

        format!(
            "{}/search/title/?title_type={}&user_rating={},10.0&num_votes={},\
             &adult=include&view=simple&sort=num_votes,desc&count=1&start={}",
            self.base_url, title_type, self.min_user_rating, min_votes, position
        )
    }

    pub fn title_url(&self, id: &str) -> String {
        format!("{}/title/{}/", self.base_url, id)
    }

    pub fn advisory_url(&self, id: &str) -> String {
        format!("{}/title/{}/parentalguide", self.base_url, id)
    }
}

#[async_trait]
impl<F: PageFetcher> PageSource for HtmlTitleSource<F> {
    async fn find_next_candidate(
        &self,
        partition: Partition,
        position: u32,
    ) -> Result<Option<String>, ExtractionFailure> {
        let url = self.ranking_url(partition, position);
        tracing::debug!("Fetching ranking page: {}", url);

        let body = self.fetcher.fetch(&url).await?;
        extract_candidate(&body)
    }

    async fn parse_record(&self, id: &str) -> Result<RecordDraft, ExtractionFailure> {
        let url = self.title_url(id);
        tracing::debug!("Fetching title page: {}", url);

        let body = self.fetcher.fetch(&url).await?;
        extract_record(id, &body)
    }

    async fn parse_advisory(
        &self,
        id: &str,
        draft: RecordDraft,
    ) -> Result<CatalogRecord, ExtractionFailure> {
        let url = self.advisory_url(id);
        tracing::debug!("Fetching advisory page: {}", url);

        let body = self.fetcher.fetch(&url).await?;
        let advisory = extract_advisory(&body)?;
        Ok(draft.with_advisory(advisory))
    }
}

fn selector(css: &str) -> Result<Selector, ExtractionFailure> {
    Selector::parse(css)
        .map_err(|e| ExtractionFailure::Malformed(format!("bad selector '{}': {:?}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the first match, if non-empty
fn first_text(document: &Html, css: &str) -> Result<Option<String>, ExtractionFailure> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty()))
}

/// Extracts the identifier from a ranking page
///
/// The candidate link has the form `/title/<id>/...`. A page without one, or
/// with an empty identifier, means the ranking is exhausted.
fn extract_candidate(html: &str) -> Result<Option<String>, ExtractionFailure> {
    let document = Html::parse_document(html);
    let sel = selector(CANDIDATE_LINK)?;

    let id = document
        .select(&sel)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| href.split('/').nth(2))
        .map(str::trim)
        .filter(|id| !id.is_empty());

    match id {
        Some(id) if is_reserved_id(id) => Err(ExtractionFailure::Malformed(format!(
            "ranking returned reserved identifier '{}'",
            id
        ))),
        Some(id) => Ok(Some(id.to_string())),
        None => Ok(None),
    }
}

/// Builds the metadata row from the title block
///
/// Only the direct items of the block's first list count. An item with no
/// child elements is a plain label; otherwise the text of its link is used.
fn extract_metadata_row(document: &Html) -> Result<MetadataRow, ExtractionFailure> {
    let list = selector(METADATA_LIST)?;
    let link = selector("a")?;

    let Some(list) = document.select(&list).next() else {
        return Ok(MetadataRow::new(Vec::new()));
    };

    let entries = list
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
        .map(|item| {
            if item.children().any(|child| child.value().is_element()) {
                let text = item
                    .select(&link)
                    .next()
                    .map(element_text)
                    .unwrap_or_else(|| element_text(item));
                MetadataEntry::Linked(text)
            } else {
                MetadataEntry::Label(element_text(item))
            }
        })
        .collect();

    Ok(MetadataRow::new(entries))
}

fn extract_record(id: &str, html: &str) -> Result<RecordDraft, ExtractionFailure> {
    let document = Html::parse_document(html);

    let title = first_text(&document, TITLE_TEXT)?
        .ok_or_else(|| ExtractionFailure::Malformed(format!("{} has no title", id)))?;

    let genre_sel = selector(GENRE_LINKS)?;
    let genres: BTreeSet<String> = document
        .select(&genre_sel)
        .map(|a| element_text(a).to_lowercase())
        .filter(|g| !g.is_empty())
        .collect();

    let row = extract_metadata_row(&document)?;
    let (kind, release_year) = match classify(&row, &genres) {
        Classification::Classified { kind, year } => (kind, year),
        Classification::Unrated => return Err(ExtractionFailure::Unrated),
    };
    if release_year.len() != 4 || !release_year.chars().all(|c| c.is_ascii_digit()) {
        return Err(ExtractionFailure::Malformed(format!(
            "{} has unreadable release year '{}'",
            id, release_year
        )));
    }

    let score = first_text(&document, RATING_SCORE)?.unwrap_or_default();
    let rating = normalize_rating(&score).ok_or_else(|| {
        ExtractionFailure::Malformed(format!("{} has unreadable rating '{}'", id, score))
    })?;

    let votes = first_text(&document, RATING_VOTES)?.unwrap_or_default();
    let popularity = normalize_popularity(&votes).ok_or_else(|| {
        ExtractionFailure::Malformed(format!("{} has unreadable vote count '{}'", id, votes))
    })?;

    let poster_sel = selector(POSTER_IMAGE)?;
    let poster_url = document
        .select(&poster_sel)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .ok_or(ExtractionFailure::NoPoster)?
        .to_string();

    let synopsis = first_text(&document, SYNOPSIS_TEXT)?;

    Ok(RecordDraft {
        id: id.to_string(),
        title,
        kind,
        release_year,
        genres,
        rating,
        popularity,
        poster_url,
        synopsis,
    })
}

/// Reads each advisory category; a missing section is unknown severity
fn extract_advisory(html: &str) -> Result<Advisory, ExtractionFailure> {
    let document = Html::parse_document(html);
    let mut advisory = Advisory::unknown();

    for category in AdvisoryCategory::ALL {
        let label = first_text(&document, advisory_section(category))?.unwrap_or_default();
        advisory.set(category, normalize_severity(&label));
    }

    Ok(advisory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TitleType, SEVERITY_UNKNOWN};
    use std::collections::HashMap;

    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::NotFound {
                    url: url.to_string(),
                })
        }
    }

    fn source_config() -> SourceConfig {
        SourceConfig {
            base_url: "https://titles.example.com/".to_string(),
            min_user_rating: "6.7".to_string(),
            film_min_votes: 100_000,
            game_min_votes: 1_000,
            request_timeout: 30,
        }
    }

    fn source(pages: &[(&str, &str)]) -> HtmlTitleSource<StaticFetcher> {
        let pages = pages
            .iter()
            .map(|(url, body)| (url.to_string(), body.to_string()))
            .collect();
        HtmlTitleSource::new(StaticFetcher { pages }, &source_config())
    }

    const TITLE_PAGE: &str = r#"
        <html><body>
            <h1 class="TitleHeader__TitleText-sc-1wu6n3d-0 dxSWFG">The Matrix</h1>
            <div class="TitleBlock__TitleMetaDataContainer-sc-1nlhx7j-2 hWHMKr">
                <ul>
                    <li><a href="/title/tt0133093/releaseinfo">1999</a></li>
                    <li><a href="/title/tt0133093/parentalguide">R</a></li>
                    <li>2h 16min</li>
                </ul>
            </div>
            <span class="AggregateRatingButton__RatingScore-sc-1ll29m0-1 iTLWoV">8.7</span>
            <div class="AggregateRatingButton__TotalRatingAmount-sc-1ll29m0-3 jkCVKJ">1.8M</div>
            <img class="ipc-image" src="https://img.example.com/matrix.jpg" />
            <p><span class="GenresAndPlot__TextContainerBreakpointL-cum89p-1">A hacker learns the truth.</span></p>
            <div data-testid="storyline-genres"><div><ul>
                <li><a href="/search?genres=action">Action</a></li>
                <li><a href="/search?genres=sci-fi">Sci-Fi</a></li>
            </ul></div></div>
        </body></html>
    "#;

    #[test]
    fn test_ranking_urls() {
        let source = source(&[]);
        assert_eq!(
            source.ranking_url(Partition::Film, 7),
            "https://titles.example.com/search/title/?title_type=feature&user_rating=6.7,10.0\
             &num_votes=100000,&adult=include&view=simple&sort=num_votes,desc&count=1&start=7"
        );
        assert!(source
            .ranking_url(Partition::Game, 1)
            .contains("title_type=video_game&user_rating=6.7,10.0&num_votes=1000,"));
        assert_eq!(
            source.title_url("tt0133093"),
            "https://titles.example.com/title/tt0133093/"
        );
        assert_eq!(
            source.advisory_url("tt0133093"),
            "https://titles.example.com/title/tt0133093/parentalguide"
        );
    }

    #[test]
    fn test_extract_candidate() {
        let html = r#"<div class="lister-item-image"><a href="/title/tt0111161/?ref_=adv_li_i"><img/></a></div>"#;
        assert_eq!(
            extract_candidate(html).unwrap(),
            Some("tt0111161".to_string())
        );
    }

    #[test]
    fn test_extract_candidate_exhausted() {
        assert_eq!(extract_candidate("<html><body>No results</body></html>").unwrap(), None);

        let empty = r#"<div class="lister-item-image"><a href="/title//">x</a></div>"#;
        assert_eq!(extract_candidate(empty).unwrap(), None);
    }

    #[test]
    fn test_extract_candidate_rejects_reserved_ids() {
        let html = r#"<div class="lister-item-image"><a href="/title/cursor/">x</a></div>"#;
        assert!(matches!(
            extract_candidate(html),
            Err(ExtractionFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_extract_record() {
        let draft = extract_record("tt0133093", TITLE_PAGE).unwrap();

        assert_eq!(draft.id, "tt0133093");
        assert_eq!(draft.title, "The Matrix");
        assert_eq!(draft.kind, TitleType::Film);
        assert_eq!(draft.release_year, "1999");
        assert_eq!(draft.rating, 2);
        assert_eq!(draft.popularity, 1_800_000);
        assert_eq!(draft.poster_url, "https://img.example.com/matrix.jpg");
        assert_eq!(draft.synopsis.as_deref(), Some("A hacker learns the truth."));
        let genres: Vec<&str> = draft.genres.iter().map(String::as_str).collect();
        assert_eq!(genres, vec!["action", "sci-fi"]);
    }

    #[test]
    fn test_extract_record_with_type_label() {
        let html = TITLE_PAGE.replace(
            r#"<li><a href="/title/tt0133093/releaseinfo">1999</a></li>"#,
            r#"<li>TV Series</li><li><a href="/title/tt0133093/releaseinfo">2008–2013</a></li>"#,
        );
        let draft = extract_record("tt0133093", &html).unwrap();
        assert_eq!(draft.kind, TitleType::Series);
        assert_eq!(draft.release_year, "2008");
    }

    #[test]
    fn test_metadata_row_reads_only_first_list() {
        let html = TITLE_PAGE.replace(
            "<li>2h 16min</li>\n                </ul>",
            "<li>2h 16min</li>\n                </ul>\n                <ul><li>Extra</li><li>More</li></ul>",
        );
        assert!(html.contains("<li>Extra</li>"));

        let row = extract_metadata_row(&Html::parse_document(&html)).unwrap();
        let texts: Vec<&str> = row.entries.iter().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["1999", "R", "2h 16min"]);
    }

    #[test]
    fn test_metadata_row_skips_nested_items() {
        let html = TITLE_PAGE
            .replace(r#"<li><a href="/title/tt0133093/parentalguide">R</a></li>"#, "")
            .replace("<li>2h 16min</li>", "<li><ul><li>Nested</li></ul></li>");

        let row = extract_metadata_row(&Html::parse_document(&html)).unwrap();
        assert_eq!(row.entries.len(), 2);
        assert_eq!(row.entries[0], MetadataEntry::Linked("1999".to_string()));
    }

    #[test]
    fn test_extract_record_rejects_unreadable_year() {
        let html = TITLE_PAGE.replace(
            r#"<li><a href="/title/tt0133093/releaseinfo">1999</a></li>"#,
            r#"<li> </li><li><a href="/title/tt0133093/releaseinfo">1999</a></li>"#,
        );
        assert!(matches!(
            extract_record("tt0133093", &html),
            Err(ExtractionFailure::Malformed(_))
        ));

        let html = TITLE_PAGE.replace(">1999<", ">TBA<");
        assert!(matches!(
            extract_record("tt0133093", &html),
            Err(ExtractionFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_extract_record_unrated() {
        let html = TITLE_PAGE
            .replace(r#"<li><a href="/title/tt0133093/parentalguide">R</a></li>"#, "")
            .replace("<li>2h 16min</li>", "");
        assert_eq!(
            extract_record("tt0133093", &html),
            Err(ExtractionFailure::Unrated)
        );
    }

    #[test]
    fn test_extract_record_no_poster() {
        let html = TITLE_PAGE.replace(
            r#"<img class="ipc-image" src="https://img.example.com/matrix.jpg" />"#,
            "",
        );
        assert_eq!(
            extract_record("tt0133093", &html),
            Err(ExtractionFailure::NoPoster)
        );
    }

    #[test]
    fn test_extract_record_unreadable_rating() {
        let html = TITLE_PAGE.replace(">8.7<", ">n/a<");
        assert!(matches!(
            extract_record("tt0133093", &html),
            Err(ExtractionFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_extract_record_without_synopsis() {
        let html = TITLE_PAGE.replace("A hacker learns the truth.", "");
        let draft = extract_record("tt0133093", &html).unwrap();
        assert_eq!(draft.synopsis, None);
    }

    #[test]
    fn test_extract_advisory() {
        let html = r#"
            <section id="advisory-nudity"><span>Mild</span><span>ignored</span></section>
            <section id="advisory-violence"><span>Severe</span></section>
            <section id="advisory-profanity"><span>None</span></section>
            <section id="advisory-alcohol"><span>Moderate</span></section>
        "#;
        let advisory = extract_advisory(html).unwrap();

        assert_eq!(advisory.nudity, 1);
        assert_eq!(advisory.violence, 3);
        assert_eq!(advisory.profanity, 0);
        assert_eq!(advisory.substance, 2);
        assert_eq!(advisory.fear, SEVERITY_UNKNOWN);
    }

    #[tokio::test]
    async fn test_source_pipeline() {
        let source = source(&[
            (
                "https://titles.example.com/search/title/?title_type=feature&user_rating=6.7,10.0\
                 &num_votes=100000,&adult=include&view=simple&sort=num_votes,desc&count=1&start=1",
                r#"<div class="lister-item-image"><a href="/title/tt0133093/">x</a></div>"#,
            ),
            ("https://titles.example.com/title/tt0133093/", TITLE_PAGE),
            (
                "https://titles.example.com/title/tt0133093/parentalguide",
                r#"<section id="advisory-violence"><span>Moderate</span></section>"#,
            ),
        ]);

        let id = source
            .find_next_candidate(Partition::Film, 1)
            .await
            .unwrap()
            .unwrap();
        let draft = source.parse_record(&id).await.unwrap();
        let record = source.parse_advisory(&id, draft).await.unwrap();

        assert_eq!(record.id, "tt0133093");
        assert_eq!(record.advisory.violence, 2);
        assert_eq!(record.advisory.nudity, SEVERITY_UNKNOWN);
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces() {
        let source = source(&[]);
        let result = source.parse_record("tt0000001").await;
        assert!(matches!(
            result,
            Err(ExtractionFailure::Fetch(FetchError::NotFound { .. }))
        ));
    }
}

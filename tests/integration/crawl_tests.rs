//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the ranked title index and test
//! full crawl cycles end-to-end, from ranking page to catalog search.

use marquee::config::{Config, CrawlerConfig, SourceConfig, StorageConfig, UserAgentConfig};
use marquee::crawler::{build_coordinator, CycleOutcome};
use marquee::query::search_catalog;
use marquee::state::{CrawlCursor, Partition, Transition};
use marquee::storage::{open_storage, CatalogStore, SqliteStorage};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TITLE_ID: &str = "tt0111161";

/// Creates a test configuration pointing at the mock index
fn create_test_config(base_url: &str, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            pacing_interval: 0,
            backoff_interval: 0,
            cold_start_delay: 0,
            ..CrawlerConfig::default()
        },
        source: SourceConfig {
            base_url: base_url.to_string(),
            min_user_rating: "6.7".to_string(),
            film_min_votes: 100_000,
            game_min_votes: 1_000,
            request_timeout: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
        },
    }
}

fn ranking_page(id: Option<&str>) -> String {
    match id {
        Some(id) => format!(
            r#"<html><body><div class="lister-item mode-simple">
                <div class="lister-item-image"><a href="/title/{}/?ref_=adv_li_i"><img /></a></div>
            </div></body></html>"#,
            id
        ),
        None => "<html><body><div>No results.</div></body></html>".to_string(),
    }
}

fn title_page() -> &'static str {
    r#"<html><body>
        <h1 class="TitleHeader__TitleText-sc-1wu6n3d-0 dxSWFG">The Shawshank Redemption</h1>
        <div class="TitleBlock__TitleMetaDataContainer-sc-1nlhx7j-2 hWHMKr"><ul>
            <li><a href="/title/tt0111161/releaseinfo">1994</a></li>
            <li><a href="/title/tt0111161/parentalguide">R</a></li>
            <li>2h 22min</li>
        </ul></div>
        <span class="AggregateRatingButton__RatingScore-sc-1ll29m0-1 iTLWoV">9.3</span>
        <div class="AggregateRatingButton__TotalRatingAmount-sc-1ll29m0-3 jkCVKJ">2.4M</div>
        <div class="ipc-media"><img class="ipc-image" src="https://img.example.com/shawshank.jpg" /></div>
        <span class="GenresAndPlot__TextContainerBreakpointL-cum89p-1 eqXXmK">Two imprisoned men bond.</span>
        <div data-testid="storyline-genres"><div><ul>
            <li><a href="/search/title?genres=drama">Drama</a></li>
        </ul></div></div>
    </body></html>"#
}

fn advisory_page() -> &'static str {
    r#"<html><body>
        <section id="advisory-nudity"><h4>Sex &amp; Nudity</h4><span>Mild</span></section>
        <section id="advisory-violence"><span>Moderate</span></section>
        <section id="advisory-profanity"><span>Severe</span></section>
        <section id="advisory-alcohol"><span>None</span></section>
    </body></html>"#
}

/// Mounts a ranking page, title page and advisory page for one title
async fn mount_title_index(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search/title/"))
        .and(query_param("title_type", "feature"))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ranking_page(Some(TITLE_ID))))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/title/"))
        .and(query_param("title_type", "feature"))
        .and(query_param("start", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ranking_page(None)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/title/{}/", TITLE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_string(title_page()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/title/{}/parentalguide", TITLE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_string(advisory_page()))
        .mount(server)
        .await;
}

fn in_memory_store(cursor: Option<CrawlCursor>) -> Arc<Mutex<SqliteStorage>> {
    let mut storage = SqliteStorage::new_in_memory().expect("Failed to create storage");
    if let Some(cursor) = cursor {
        storage.write_cursor(&cursor).expect("Failed to seed cursor");
    }
    Arc::new(Mutex::new(storage))
}

#[tokio::test]
async fn test_cycle_stores_title_and_search_finds_it() {
    let server = MockServer::start().await;
    mount_title_index(&server).await;

    let config = create_test_config(&server.uri(), ":memory:");
    let store = in_memory_store(Some(CrawlCursor::initial()));
    let coordinator = build_coordinator(&config, Arc::clone(&store)).unwrap();

    let outcome = coordinator.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Completed {
            transition: Transition::Advance,
            cursor: CrawlCursor::new(Partition::Film, 2, 0),
            stored: Some(TITLE_ID.to_string()),
        }
    );

    let storage = store.lock().unwrap();
    let response = search_catalog(&*storage, [("genre", "Drama"), ("violence", "2")]).unwrap();
    assert_eq!(response.count, 1);
    assert_eq!(response.tags, vec!["drama".to_string()]);
    assert_eq!(response.limit, 50);

    let record = &response.items[0];
    assert_eq!(record.id, TITLE_ID);
    assert_eq!(record.title, "The Shawshank Redemption");
    assert_eq!(record.release_year, "1994");
    assert_eq!(record.rating, 3);
    assert_eq!(record.popularity, 2_400_000);
    assert_eq!(record.poster_url, "https://img.example.com/shawshank.jpg");
    assert_eq!(record.synopsis.as_deref(), Some("Two imprisoned men bond."));
    assert_eq!(record.advisory.nudity, 1);
    assert_eq!(record.advisory.violence, 2);
    assert_eq!(record.advisory.profanity, 3);
    assert_eq!(record.advisory.substance, 0);
    assert_eq!(record.advisory.fear, 4);

    // A stricter ceiling excludes it
    let response = search_catalog(&*storage, [("profanity", "2")]).unwrap();
    assert_eq!(response.count, 0);
}

#[tokio::test]
async fn test_exhausted_ranking_switches_to_games() {
    let server = MockServer::start().await;
    mount_title_index(&server).await;

    let config = create_test_config(&server.uri(), ":memory:");
    let store = in_memory_store(Some(CrawlCursor::new(Partition::Film, 2, 0)));
    let coordinator = build_coordinator(&config, Arc::clone(&store)).unwrap();

    coordinator.run_cycle().await.unwrap();

    let storage = store.lock().unwrap();
    assert_eq!(
        storage.read_cursor().unwrap(),
        Some(CrawlCursor::new(Partition::Game, 1, 0))
    );
    assert_eq!(storage.count_records().unwrap(), 0);
}

#[tokio::test]
async fn test_server_error_holds_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/title/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ranking_page(Some(TITLE_ID))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/title/{}/", TITLE_ID)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), ":memory:");
    let start = CrawlCursor::new(Partition::Film, 1, 0);
    let store = in_memory_store(Some(start));
    let coordinator = build_coordinator(&config, Arc::clone(&store)).unwrap();

    let outcome = coordinator.run_cycle().await.unwrap();
    assert!(matches!(
        outcome,
        CycleOutcome::Completed {
            transition: Transition::HoldRetry,
            ..
        }
    ));

    let storage = store.lock().unwrap();
    assert_eq!(storage.read_cursor().unwrap(), Some(start));
    assert_eq!(storage.count_records().unwrap(), 0);
}

#[tokio::test]
async fn test_cold_start_makes_no_requests() {
    let server = MockServer::start().await;

    let config = create_test_config(&server.uri(), ":memory:");
    let store = in_memory_store(None);
    let coordinator = build_coordinator(&config, Arc::clone(&store)).unwrap();

    let outcome = coordinator.run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::ColdStart);
    assert!(store.lock().unwrap().read_cursor().unwrap().is_none());

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_crawl_loop_persists_progress_across_restart() {
    let server = MockServer::start().await;
    mount_title_index(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");
    let config = create_test_config(&server.uri(), db_path.to_str().unwrap());

    let mut storage = open_storage(&db_path).unwrap();
    storage.write_cursor(&CrawlCursor::initial()).unwrap();
    let store = Arc::new(Mutex::new(storage));

    let coordinator = build_coordinator(&config, Arc::clone(&store)).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { coordinator.run(shutdown_rx).await });

    // Film 1 is stored, film 2 is exhausted, then the loop moves into games
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let cursor = store.lock().unwrap().read_cursor().unwrap();
        if cursor.map(|c| c.partition) == Some(Partition::Game) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "crawl made no progress");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown_tx.send(true).unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("crawl loop did not stop")
        .expect("crawl task panicked");
    assert!(summary.records_stored >= 1);
    drop(store);

    let reopened = open_storage(&db_path).unwrap();
    assert_eq!(reopened.count_records().unwrap(), 1);
    assert!(reopened.get_record(TITLE_ID).unwrap().is_some());
    assert_eq!(
        reopened.read_cursor().unwrap().map(|c| c.partition),
        Some(Partition::Game)
    );
}

//! Integration tests for the crawler
//!
//! These tests run whole crawls end-to-end, either against wiremock servers
//! or against a scripted fetcher for deterministic transport failures.

use async_trait::async_trait;
use ripple_crawl::config::Config;
use ripple_crawl::crawler::{
    DepthPolicy, FetchError, FetchRequest, FetchResponse, Fetcher, ParsedPage, TaskOptions,
};
use ripple_crawl::observer::{CrawlFailure, CrawlResult, ErrorContext, Observer};
use ripple_crawl::storage::{CrawlStore, MemoryStore, SqliteStore, StoreResult};
use ripple_crawl::{CrawlRequest, Crawler};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Every event the crawler reported, in arrival order
#[derive(Debug, Clone, PartialEq)]
enum Event {
    Fetch { url: String, final_url: String, status: u16, html: bool },
    Error { code: String, context: ErrorContext },
    Link { page: String, link: String },
    Image { page: String, link: String },
    Redirect { from: String, to: String, status: u16 },
    Rejected { page: String, link: String },
    Retry { code: String, current_retries: u32 },
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn fetched(&self) -> Vec<(String, u16)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Fetch { url, status, .. } => Some((url, status)),
                _ => None,
            })
            .collect()
    }

    fn error_codes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error { code, .. } => Some(code),
                _ => None,
            })
            .collect()
    }

    fn retries(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Retry { current_retries, .. } => Some(current_retries),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Observer for Recorder {
    async fn on_fetch(&self, result: &CrawlResult, page: Option<&ParsedPage>) {
        self.push(Event::Fetch {
            url: result.url().to_string(),
            final_url: result.response.url.to_string(),
            status: result.status_code(),
            html: page.is_some(),
        });
    }

    async fn on_error(&self, error: &CrawlFailure, context: &ErrorContext) {
        self.push(Event::Error {
            code: error.code().to_string(),
            context: context.clone(),
        });
    }

    async fn on_link_discovered(&self, page: &Url, link: &Url, _anchor: &str, _is_do_follow: bool) {
        self.push(Event::Link {
            page: page.to_string(),
            link: link.to_string(),
        });
    }

    async fn on_image_discovered(&self, page: &Url, link: &Url, _alt: &str) {
        self.push(Event::Image {
            page: page.to_string(),
            link: link.to_string(),
        });
    }

    async fn on_redirect(&self, from: &Url, to: &Url, status_code: u16) {
        self.push(Event::Redirect {
            from: from.to_string(),
            to: to.to_string(),
            status: status_code,
        });
    }

    async fn on_link_rejected(&self, page: &Url, link: &Url, _anchor: &str, _is_do_follow: bool) {
        self.push(Event::Rejected {
            page: page.to_string(),
            link: link.to_string(),
        });
    }

    async fn on_retry_scheduled(&self, error: &CrawlFailure, context: &ErrorContext) {
        self.push(Event::Retry {
            code: error.code().to_string(),
            current_retries: context.current_retries,
        });
    }
}

/// Serves canned outcomes per URL; the last outcome repeats
struct ScriptedFetcher {
    script: HashMap<String, Vec<Result<String, FetchError>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            script: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn page(mut self, url: &str, outcomes: Vec<Result<String, FetchError>>) -> Self {
        self.script.insert(url.to_string(), outcomes);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let key = request.url.to_string();
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(key.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        let outcome = match self.script.get(&key) {
            Some(outcomes) => outcomes[attempt.min(outcomes.len() - 1)].clone(),
            None => Ok("not html".to_string()),
        };

        outcome.map(|body| FetchResponse {
            url: request.url.clone(),
            status_code: 200,
            headers: HashMap::new(),
            body,
            response_time: Duration::from_millis(1),
            proxy: request.proxy.clone(),
            method: request.method.clone(),
        })
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.timeout = 2000;
    config.crawler.retry_timeout = 10;
    config
}

fn html(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{}">link</a>"#, l))
        .collect();
    format!("<html><head><title>t</title></head><body>{}</body></html>", anchors)
}

async fn mount_page(server: &MockServer, at: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_graph_with_server_error_and_back_link() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", 200, html(&[&format!("{base}/b"), &format!("{base}/c")])).await;
    mount_page(&server, "/b", 500, "<html>oops</html>".to_string()).await;
    mount_page(&server, "/c", 200, html(&[&format!("{base}/")])).await;

    let store = Arc::new(MemoryStore::new());
    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(test_config())
        .store(store.clone())
        .observer(recorder.clone())
        .build();

    crawler.crawl(format!("{base}/")).await;

    let mut fetched = recorder.fetched();
    fetched.sort();
    assert_eq!(
        fetched,
        vec![
            (format!("{base}/"), 200),
            (format!("{base}/b"), 500),
            (format!("{base}/c"), 200),
        ]
    );

    assert_eq!(store.history_len(), 3);
    assert_eq!(store.get_depth(&format!("{base}/")).await.unwrap(), Some(0));
    assert_eq!(store.get_depth(&format!("{base}/b")).await.unwrap(), Some(1));
    assert_eq!(store.get_depth(&format!("{base}/c")).await.unwrap(), Some(1));
    assert!(recorder.retries().is_empty());
    assert!(recorder.error_codes().is_empty());

    server.verify().await;
}

#[tokio::test]
async fn test_depth_limit_rejects_deeper_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", 200, html(&[&format!("{base}/one")])).await;
    mount_page(&server, "/one", 200, html(&[&format!("{base}/two")])).await;
    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.crawler.depth_limit = 1;

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(config).observer(recorder.clone()).build();
    crawler.crawl(format!("{base}/")).await;

    assert_eq!(recorder.fetched().len(), 2);
    assert!(recorder.events().contains(&Event::Rejected {
        page: format!("{base}/one"),
        link: format!("{base}/two"),
    }));

    server.verify().await;
}

#[tokio::test]
async fn test_redirect_is_reported_and_target_crawled() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/new", 200, html(&[])).await;

    let store = Arc::new(MemoryStore::new());
    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(test_config())
        .store(store.clone())
        .observer(recorder.clone())
        .build();

    crawler.crawl(format!("{base}/old")).await;

    let events = recorder.events();
    assert!(events.contains(&Event::Redirect {
        from: format!("{base}/old"),
        to: format!("{base}/new"),
        status: 301,
    }));
    assert_eq!(recorder.fetched(), vec![(format!("{base}/new"), 200)]);
    assert_eq!(store.get_depth(&format!("{base}/new")).await.unwrap(), Some(0));

    server.verify().await;
}

#[tokio::test]
async fn test_followed_redirect_reports_final_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/new", 200, html(&["child"])).await;
    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.crawler.follow_redirect = true;

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(config).observer(recorder.clone()).build();
    crawler.crawl(format!("{base}/old")).await;

    let events = recorder.events();
    assert!(events.contains(&Event::Fetch {
        url: format!("{base}/old"),
        final_url: format!("{base}/new"),
        status: 200,
        html: true,
    }));
    assert!(!events.iter().any(|e| matches!(e, Event::Redirect { .. })));
    // Relative links resolve against the final URL
    assert!(events.contains(&Event::Link {
        page: format!("{base}/new"),
        link: format!("{base}/child"),
    }));

    server.verify().await;
}

#[tokio::test]
async fn test_request_shaping_headers() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(wiremock::matchers::header("user-agent", "TestBot/1.0"))
        .and(wiremock::matchers::header("referer", "https://referrer.test/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.crawler.user_agent = "TestBot/1.0".to_string();
    config.crawler.referer = Some("https://referrer.test/".to_string());

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(config).observer(recorder.clone()).build();
    crawler.crawl(format!("{base}/")).await;

    assert_eq!(recorder.fetched(), vec![(format!("{base}/"), 204)]);
    server.verify().await;
}

#[tokio::test]
async fn test_images_and_scripts_are_extracted() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        200,
        r#"<html><head><script src="/app.js"></script></head>
        <body><img src="/logo.png" alt="logo"></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(&server, "/app.js", 200, "console.log(1)".to_string()).await;
    mount_page(&server, "/logo.png", 200, "PNG".to_string()).await;

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(test_config())
        .observer(recorder.clone())
        .build();
    crawler.crawl(format!("{base}/")).await;

    let events = recorder.events();
    assert!(events.contains(&Event::Link {
        page: format!("{base}/"),
        link: format!("{base}/app.js"),
    }));
    assert!(events.contains(&Event::Image {
        page: format!("{base}/"),
        link: format!("{base}/logo.png"),
    }));
    assert!(events.contains(&Event::Fetch {
        url: format!("{base}/logo.png"),
        final_url: format!("{base}/logo.png"),
        status: 200,
        html: false,
    }));

    server.verify().await;
}

#[tokio::test]
async fn test_concurrency_never_exceeds_bound() {
    let seeds: Vec<String> = (0..8).map(|i| format!("https://site.test/{i}")).collect();
    let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_millis(30)));

    let mut config = test_config();
    config.crawler.max_connections = 2;

    let crawler = Crawler::builder(config).fetcher(fetcher.clone()).build();
    crawler.crawl(seeds).await;

    assert_eq!(fetcher.total_calls(), 8);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
    assert!(crawler.peak_concurrency() <= 2);
    assert!(crawler.idle());
}

#[tokio::test]
async fn test_rate_limits_force_single_connection() {
    let seeds: Vec<String> = (0..3).map(|i| format!("https://site.test/{i}")).collect();
    let fetcher = Arc::new(ScriptedFetcher::new());

    let mut config = test_config();
    config.crawler.max_connections = 5;
    config.crawler.rate_limits = 20;

    let crawler = Crawler::builder(config).fetcher(fetcher.clone()).build();
    let started = std::time::Instant::now();
    crawler.crawl(seeds).await;

    assert_eq!(crawler.peak_concurrency(), 1);
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_timeouts_are_retried_until_success() {
    let url = "https://site.test/flaky";
    let fetcher = Arc::new(ScriptedFetcher::new().page(
        url,
        vec![
            Err(FetchError::Timeout),
            Err(FetchError::ConnectionReset),
            Ok("<html></html>".to_string()),
        ],
    ));

    let mut config = test_config();
    config.crawler.max_errors = -1;

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(config)
        .fetcher(fetcher.clone())
        .observer(recorder.clone())
        .build();
    crawler.crawl(url).await;

    assert_eq!(fetcher.calls(url), 3);
    assert_eq!(recorder.retries(), vec![0, 1]);
    assert_eq!(recorder.fetched(), vec![(url.to_string(), 200)]);
    assert!(recorder.error_codes().is_empty());
}

#[tokio::test]
async fn test_retry_budget_exhausted_reports_error() {
    let url = "https://site.test/down";
    let fetcher = Arc::new(ScriptedFetcher::new().page(url, vec![Err(FetchError::Timeout)]));

    let mut config = test_config();
    config.crawler.retries = 2;
    config.crawler.max_errors = -1;

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(config)
        .fetcher(fetcher.clone())
        .observer(recorder.clone())
        .build();
    crawler.crawl(url).await;

    assert_eq!(fetcher.calls(url), 3);
    assert_eq!(recorder.retries().len(), 2);

    let errors: Vec<Event> = recorder
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Error { .. }))
        .collect();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        Event::Error { code, context } => {
            assert_eq!(code, "ETIMEDOUT");
            assert_eq!(context.current_retries, 2);
            assert_eq!(context.max_retries, 2);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_non_retryable_transport_error_is_terminal() {
    let url = "https://site.test/tls";
    let fetcher = Arc::new(
        ScriptedFetcher::new().page(url, vec![Err(FetchError::Transport("bad certificate".into()))]),
    );

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(test_config())
        .fetcher(fetcher.clone())
        .observer(recorder.clone())
        .build();
    crawler.crawl(url).await;

    assert_eq!(fetcher.calls(url), 1);
    assert!(recorder.retries().is_empty());
    assert_eq!(recorder.error_codes().len(), 1);
}

#[tokio::test]
async fn test_host_escalates_through_error_ladder() {
    let seeds: Vec<String> = (0..4).map(|i| format!("https://slow.test/{i}")).collect();
    let mut fetcher = ScriptedFetcher::new();
    for seed in &seeds {
        fetcher = fetcher.page(seed, vec![Err(FetchError::Timeout)]);
    }
    let fetcher = Arc::new(fetcher);

    let mut config = test_config();
    config.crawler.max_connections = 1;
    config.crawler.retries = 0;
    config.crawler.max_errors = 2;
    config.crawler.error_rates = vec![20, 50];

    let store = Arc::new(MemoryStore::new());
    let crawler = Crawler::builder(config)
        .store(store.clone())
        .fetcher(fetcher.clone())
        .build();
    crawler.crawl(seeds).await;

    assert_eq!(fetcher.total_calls(), 4);
    let state = store.get_host_errors("slow.test").await.unwrap().unwrap();
    assert_eq!(state.current_rate_limit_index, Some(1));
    assert!(state.force_rate_limits);
    assert!(state.is_crawlable());
}

#[tokio::test]
async fn test_exhausted_ladder_stops_host() {
    let seeds: Vec<String> = (0..5).map(|i| format!("https://dead.test/{i}")).collect();
    let mut fetcher = ScriptedFetcher::new();
    for seed in &seeds {
        fetcher = fetcher.page(seed, vec![Err(FetchError::ConnectionRefused)]);
    }
    let fetcher = Arc::new(fetcher);

    let mut config = test_config();
    config.crawler.max_connections = 1;
    config.crawler.retries = 0;
    config.crawler.max_errors = 1;
    config.crawler.error_rates = vec![10, 20];

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(config)
        .fetcher(fetcher.clone())
        .observer(recorder.clone())
        .build();
    crawler.crawl(seeds).await;

    // Third error exhausts the two-rung ladder; the rest never hit the network
    assert_eq!(fetcher.total_calls(), 3);
    let codes = recorder.error_codes();
    assert_eq!(codes.iter().filter(|c| *c == "STOPCRAWL").count(), 2);
    assert_eq!(codes.iter().filter(|c| *c == "ECONNREFUSED").count(), 3);
}

#[tokio::test]
async fn test_malformed_input_reported_synthetically() {
    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(test_config())
        .fetcher(Arc::new(ScriptedFetcher::new()))
        .observer(recorder.clone())
        .build();

    crawler
        .crawl(vec![
            ripple_crawl::QueueInput::Empty,
            CrawlRequest::default().into(),
            "ftp://files.test/".into(),
        ])
        .await;

    assert_eq!(
        recorder.error_codes(),
        vec!["NO_OPTIONS", "NO_URL_OPTION", "INVALID_URL"]
    );
    assert!(crawler.idle());
}

#[tokio::test]
async fn test_blacklisted_seed_never_fetched() {
    let fetcher = Arc::new(ScriptedFetcher::new());

    let mut config = test_config();
    config.policy.domain_blacklist = vec!["ads.test".to_string()];

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(config)
        .fetcher(fetcher.clone())
        .observer(recorder.clone())
        .build();
    crawler.crawl("https://tracker.ads.test/pixel").await;

    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(recorder.error_codes(), vec!["DOMAINBLACKLIST"]);
}

#[tokio::test]
async fn test_external_links_rejected_by_default() {
    let page = "https://site.test/";
    let fetcher = Arc::new(ScriptedFetcher::new().page(
        page,
        vec![Ok(html(&["https://other.test/", "https://blog.site.test/", "/local"]))],
    ));

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(test_config())
        .fetcher(fetcher.clone())
        .observer(recorder.clone())
        .build();
    crawler.crawl(page).await;

    let events = recorder.events();
    assert!(events.contains(&Event::Rejected {
        page: page.to_string(),
        link: "https://other.test/".to_string(),
    }));
    assert!(events.contains(&Event::Rejected {
        page: page.to_string(),
        link: "https://blog.site.test/".to_string(),
    }));
    assert_eq!(fetcher.calls("https://site.test/local"), 1);
    assert_eq!(fetcher.total_calls(), 2);
}

#[tokio::test]
async fn test_external_hosts_opens_other_domains() {
    let page = "https://site.test/";
    let fetcher = Arc::new(ScriptedFetcher::new().page(
        page,
        vec![Ok(html(&["https://other.test/", "https://blog.site.test/"]))],
    ));

    let mut config = test_config();
    config.policy.external_hosts = true;

    let recorder = Arc::new(Recorder::default());
    let crawler = Crawler::builder(config)
        .fetcher(fetcher.clone())
        .observer(recorder.clone())
        .build();
    crawler.crawl(page).await;

    assert_eq!(fetcher.calls("https://other.test/"), 1);
    assert_eq!(fetcher.calls("https://blog.site.test/"), 1);
    assert!(!recorder
        .events()
        .iter()
        .any(|e| matches!(e, Event::Rejected { .. })));
}

/// Keeps every link at depth zero
struct FlatDepth;

#[async_trait]
impl DepthPolicy for FlatDepth {
    async fn update_depth(
        &self,
        store: &dyn CrawlStore,
        _parent: &str,
        link: &str,
    ) -> StoreResult<u32> {
        store.set_depth(link, 0).await?;
        Ok(0)
    }
}

#[tokio::test]
async fn test_depth_policy_is_swappable() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .page("https://site.test/", vec![Ok(html(&["/one"]))])
            .page("https://site.test/one", vec![Ok(html(&["/two"]))])
            .page("https://site.test/two", vec![Ok(html(&["/three"]))]),
    );

    let mut config = test_config();
    config.crawler.depth_limit = 1;

    let store = Arc::new(MemoryStore::new());
    let crawler = Crawler::builder(config)
        .store(store.clone())
        .fetcher(fetcher.clone())
        .depth_policy(Arc::new(FlatDepth))
        .build();
    crawler.crawl("https://site.test/").await;

    assert_eq!(fetcher.calls("https://site.test/three"), 1);
    assert_eq!(fetcher.total_calls(), 4);
    assert_eq!(store.get_depth("https://site.test/three").await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_predicate_vetoes_links() {
    let page = "https://site.test/";
    let fetcher = Arc::new(ScriptedFetcher::new().page(
        page,
        vec![Ok(html(&["/keep", "/private/secret"]))],
    ));

    let options = TaskOptions::from(&test_config()).with_predicate(
        |_parent: &Url, link: &Url, _anchor: &str, _follow: bool| !link.path().starts_with("/private"),
    );

    let crawler = Crawler::builder(test_config())
        .fetcher(fetcher.clone())
        .options(options)
        .build();
    crawler.crawl(page).await;

    assert_eq!(fetcher.calls("https://site.test/keep"), 1);
    assert_eq!(fetcher.calls("https://site.test/private/secret"), 0);
}

#[tokio::test]
async fn test_sqlite_run_resumes_unfinished_urls() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ripple.db");

    {
        // An earlier run claimed these but was killed before finishing one
        let store = SqliteStore::open(&db).unwrap();
        store.check_and_mark_history("https://site.test/done").await.unwrap();
        store.mark_completed("https://site.test/done").await.unwrap();
        store.check_and_mark_history("https://site.test/pending").await.unwrap();
    }

    let store = Arc::new(SqliteStore::open(&db).unwrap());
    let fetcher = Arc::new(ScriptedFetcher::new());
    let crawler = Crawler::builder(test_config())
        .store(store.clone())
        .fetcher(fetcher.clone())
        .build();

    let resumed = crawler.crawl_resumed(Vec::<String>::new()).await;

    assert_eq!(resumed, 1);
    assert_eq!(fetcher.calls("https://site.test/pending"), 1);
    assert_eq!(fetcher.calls("https://site.test/done"), 0);
    assert!(store.interrupted_urls().await.unwrap().is_empty());
}

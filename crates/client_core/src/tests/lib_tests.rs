use super::*;
use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde_json::json;
use shared::{
    domain::ProjectId,
    error::ErrorCode,
    protocol::{MutationAck, ProjectDraft},
};
use std::sync::atomic::AtomicU32;
use tokio::{net::TcpListener, sync::Mutex};

struct TestDataSource {
    project_records: Mutex<Result<Vec<Value>, String>>,
    carousel_records: Mutex<Result<Vec<Value>, String>>,
    project_calls: AtomicU32,
    carousel_calls: AtomicU32,
}

impl TestDataSource {
    fn new(
        projects: Result<Vec<Value>, &str>,
        carousel: Result<Vec<Value>, &str>,
    ) -> Arc<Self> {
        Arc::new(Self {
            project_records: Mutex::new(projects.map_err(str::to_string)),
            carousel_records: Mutex::new(carousel.map_err(str::to_string)),
            project_calls: AtomicU32::new(0),
            carousel_calls: AtomicU32::new(0),
        })
    }

    async fn set_projects(&self, projects: Result<Vec<Value>, &str>) {
        *self.project_records.lock().await = projects.map_err(str::to_string);
    }

    fn project_call_count(&self) -> u32 {
        self.project_calls.load(Ordering::SeqCst)
    }

    fn carousel_call_count(&self) -> u32 {
        self.carousel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortfolioDataSource for TestDataSource {
    async fn fetch_projects(&self) -> Result<Vec<Value>> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.project_records.lock().await {
            Ok(records) => Ok(records.clone()),
            Err(message) => Err(anyhow!(message.clone())),
        }
    }

    async fn fetch_carousel_images(&self) -> Result<Vec<Value>> {
        self.carousel_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.carousel_records.lock().await {
            Ok(records) => Ok(records.clone()),
            Err(message) => Err(anyhow!(message.clone())),
        }
    }
}

#[tokio::test]
async fn failing_projects_fetch_leaves_carousel_intact() {
    let source = TestDataSource::new(
        Err("connection refused"),
        Ok(vec![json!({"path": "/a.jpg"})]),
    );
    let client = FeedClient::new(source);
    client.refetch().await;

    let projects = client.projects().await;
    assert!(projects.data.is_empty());
    assert!(!projects.loading);
    let error = projects.error.expect("projects error");
    assert!(error.contains("failed to fetch portfolio"), "{error}");

    let carousel = client.carousel().await;
    assert_eq!(carousel.error, None);
    assert!(!carousel.loading);
    assert_eq!(carousel.data.len(), 1);
    assert_eq!(carousel.data[0].path, "/a.jpg");
}

#[tokio::test]
async fn initial_loading_latches_false_after_first_cycle() {
    let source = TestDataSource::new(Err("down"), Err("down"));
    let client = FeedClient::new(source);
    assert!(client.is_initial_loading());

    client.refetch().await;
    assert!(!client.is_initial_loading());

    client.refetch().await;
    assert!(!client.is_initial_loading());
}

#[tokio::test]
async fn validation_failure_is_distinguished_from_transport_failure() {
    let source = TestDataSource::new(Ok(vec![json!({"name": "no id"})]), Err("boom"));
    let client = FeedClient::new(source);
    client.refetch().await;

    let projects_error = client.projects().await.error.expect("projects error");
    assert!(
        projects_error.contains("portfolio validation failed"),
        "{projects_error}"
    );
    assert!(projects_error.contains("record 0"), "{projects_error}");

    let carousel_error = client.carousel().await.error.expect("carousel error");
    assert!(
        carousel_error.contains("failed to fetch carousel"),
        "{carousel_error}"
    );
}

#[tokio::test]
async fn minimal_records_fill_optionals_with_none() {
    let source = TestDataSource::new(
        Ok(vec![json!({"id": "1", "name": "A"})]),
        Ok(vec![json!({"path": "/x.jpg"})]),
    );
    let client = FeedClient::new(source);
    client.refetch().await;

    let projects = client.projects().await;
    assert_eq!(projects.error, None);
    assert_eq!(
        projects.data,
        vec![Project {
            id: ProjectId("1".to_string()),
            name: "A".to_string(),
            cover: None,
            description: None,
            url: None,
        }]
    );

    let carousel = client.carousel().await;
    assert_eq!(carousel.error, None);
    assert_eq!(
        carousel.data,
        vec![CarouselImage {
            path: "/x.jpg".to_string(),
            desc: None,
        }]
    );

    assert!(!client.is_initial_loading());
}

#[tokio::test]
async fn fetch_failure_discards_previous_data() {
    let source = TestDataSource::new(Ok(vec![json!({"id": "1", "name": "A"})]), Ok(vec![]));
    let client = FeedClient::new(source.clone());
    client.refetch().await;
    assert_eq!(client.projects().await.data.len(), 1);

    source.set_projects(Err("now failing")).await;
    client.refetch().await;

    let projects = client.projects().await;
    assert!(projects.data.is_empty());
    assert!(projects.error.is_some());
}

#[tokio::test]
async fn fetch_all_broadcasts_one_event_per_resource() {
    let source = TestDataSource::new(
        Ok(vec![json!({"id": "1", "name": "A"})]),
        Ok(vec![json!({"path": "/x.jpg"})]),
    );
    let client = FeedClient::new(source);
    let mut events = client.subscribe_events();

    client.fetch_all();

    let first = events.recv().await.expect("first event");
    assert!(matches!(first, FeedEvent::ProjectsUpdated(records) if records.len() == 1));
    let second = events.recv().await.expect("second event");
    assert!(matches!(second, FeedEvent::CarouselUpdated(records) if records.len() == 1));
}

#[tokio::test]
async fn resource_failure_is_broadcast() {
    let source = TestDataSource::new(Err("down"), Ok(vec![]));
    let client = FeedClient::new(source);
    let mut events = client.subscribe_events();

    client.refetch().await;

    let event = events.recv().await.expect("event");
    match event {
        FeedEvent::ResourceFailed { resource, message } => {
            assert_eq!(resource, PORTFOLIO_RESOURCE);
            assert!(message.contains("down"), "{message}");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[derive(Clone)]
struct FeedServerState {
    projects: Value,
    carousel: Value,
}

async fn serve_projects(State(state): State<FeedServerState>) -> Json<Value> {
    Json(state.projects.clone())
}

async fn serve_carousel(State(state): State<FeedServerState>) -> Json<Value> {
    Json(state.carousel.clone())
}

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn http_source_fetches_and_validates_server_records() {
    let state = FeedServerState {
        projects: json!([
            {"id": "p1", "name": "Folio", "created_at": "2024-01-01T00:00:00Z", "position": 7}
        ]),
        carousel: json!([{"path": "/hero.jpg", "desc": null}]),
    };
    let app = Router::new()
        .route("/projects", get(serve_projects))
        .route("/carousel", get(serve_carousel))
        .with_state(state);
    let server_url = spawn_server(app).await;

    let source = HttpDataSource::new(&server_url).expect("source");
    let client = FeedClient::new(Arc::new(source));
    client.refetch().await;

    let projects = client.projects().await;
    assert_eq!(projects.error, None);
    assert_eq!(projects.data.len(), 1);
    assert_eq!(projects.data[0].id, ProjectId("p1".to_string()));
    assert_eq!(projects.data[0].name, "Folio");

    let carousel = client.carousel().await;
    assert_eq!(carousel.error, None);
    assert_eq!(carousel.data[0].path, "/hero.jpg");
    assert_eq!(carousel.data[0].desc, None);
}

#[tokio::test]
async fn http_source_surfaces_server_errors_as_transport_failures() {
    let app = Router::new()
        .route("/projects", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/carousel", get(|| async { Json(json!([])) }));
    let server_url = spawn_server(app).await;

    let source = HttpDataSource::new(&server_url).expect("source");
    let client = FeedClient::new(Arc::new(source));
    client.refetch().await;

    let error = client.projects().await.error.expect("error");
    assert!(error.contains("failed to fetch portfolio"), "{error}");
    assert_eq!(client.carousel().await.error, None);
}

#[derive(Clone, Default)]
struct AdminServerState {
    drafts: Arc<Mutex<Vec<ProjectDraft>>>,
}

async fn handle_create_project(
    State(state): State<AdminServerState>,
    Json(draft): Json<ProjectDraft>,
) -> Json<MutationAck> {
    state.drafts.lock().await.push(draft);
    Json(MutationAck { success: true })
}

async fn handle_delete_project() -> (StatusCode, Json<shared::error::ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(shared::error::ApiError::new(
            ErrorCode::NotFound,
            "project not found",
        )),
    )
}

#[tokio::test]
async fn admin_client_posts_drafts_and_reads_acks() {
    let state = AdminServerState::default();
    let app = Router::new()
        .route("/admin/projects", post(handle_create_project))
        .route(
            "/admin/projects/:project_id",
            axum::routing::delete(handle_delete_project),
        )
        .with_state(state.clone());
    let server_url = spawn_server(app).await;

    let admin = AdminClient::new(server_url);
    let ack = admin
        .create_project(&ProjectDraft {
            name: "Folio".to_string(),
            description: None,
            cover: None,
            url: Some("https://example.com".to_string()),
        })
        .await
        .expect("create");
    assert!(ack.success);

    let recorded = state.drafts.lock().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].name, "Folio");
    drop(recorded);

    let err = admin
        .delete_project(&ProjectId("missing".to_string()))
        .await
        .expect_err("delete should fail");
    assert!(err.to_string().contains("project not found"), "{err}");
}

fn sample_project(id: &str, name: &str) -> Project {
    Project {
        id: ProjectId(id.to_string()),
        name: name.to_string(),
        cover: None,
        description: None,
        url: None,
    }
}

#[tokio::test]
async fn cache_serves_fresh_entries_and_expires_stale_ones() {
    let cache = ResponseCache::new();
    let calls = AtomicU32::new(0);
    let ttl = Duration::from_millis(100);
    let sample = vec![sample_project("1", "A")];

    let first = cache
        .fetch_with_cache(PORTFOLIO_RESOURCE, ttl, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample.clone())
        })
        .await
        .expect("first");
    let second = cache
        .fetch_with_cache(PORTFOLIO_RESOURCE, ttl, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample.clone())
        })
        .await
        .expect("second");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);

    tokio::time::sleep(Duration::from_millis(150)).await;

    let _third: Vec<Project> = cache
        .fetch_with_cache(PORTFOLIO_RESOURCE, ttl, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample.clone())
        })
        .await
        .expect("third");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cached_client_reuses_responses_within_ttl() {
    let source = TestDataSource::new(
        Ok(vec![json!({"id": "1", "name": "A"})]),
        Ok(vec![json!({"path": "/x.jpg"})]),
    );
    let client = CachedFeedClient::new(source.clone(), Arc::new(ResponseCache::new()));

    client.load().await;
    client.load().await;

    assert_eq!(source.project_call_count(), 1);
    assert_eq!(source.carousel_call_count(), 1);
    assert_eq!(client.projects().await.data.len(), 1);
    assert!(!client.is_initial_loading());
}

#[tokio::test]
async fn refetch_always_reaches_the_backend() {
    let source = TestDataSource::new(
        Ok(vec![json!({"id": "1", "name": "A"})]),
        Ok(vec![json!({"path": "/x.jpg"})]),
    );
    let client = CachedFeedClient::new(source.clone(), Arc::new(ResponseCache::new()));

    client.refetch().await;
    client.refetch().await;

    assert_eq!(source.project_call_count(), 2);
    assert_eq!(source.carousel_call_count(), 2);
}

#[tokio::test]
async fn clearing_one_entry_only_refreshes_that_resource() {
    let source = TestDataSource::new(
        Ok(vec![json!({"id": "1", "name": "A"})]),
        Ok(vec![json!({"path": "/x.jpg"})]),
    );
    let client = CachedFeedClient::new(source.clone(), Arc::new(ResponseCache::new()));

    client.load().await;
    client.cache().clear_cache_entry(PORTFOLIO_RESOURCE).await;
    client.load().await;

    assert_eq!(source.project_call_count(), 2);
    assert_eq!(source.carousel_call_count(), 1);
}

#[tokio::test]
async fn failed_fetches_are_not_cached() {
    let source = TestDataSource::new(Err("down"), Ok(vec![json!({"path": "/x.jpg"})]));
    let client = CachedFeedClient::new(source.clone(), Arc::new(ResponseCache::new()));

    client.load().await;
    client.load().await;

    assert_eq!(source.project_call_count(), 2);
    assert_eq!(source.carousel_call_count(), 1);
    assert!(client.projects().await.error.is_some());
    assert_eq!(client.carousel().await.error, None);
}

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use shared::{
    domain::{CarouselImageId, ProjectId},
    error::{ApiError, ErrorCode},
    protocol::{CarouselImageDraft, CarouselImageRecord, MutationAck, ProjectDraft, ProjectRecord},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

mod api;
mod config;

use api::ApiContext;
use config::{load_settings, prepare_database_url};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

const MAX_ADMIN_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/projects", get(http_list_projects))
        .route("/carousel", get(http_list_carousel_images))
        .route("/admin/projects", post(http_create_project))
        .route(
            "/admin/projects/:project_id",
            put(http_update_project).delete(http_delete_project),
        )
        .route("/admin/carousel", post(http_create_carousel_image))
        .route(
            "/admin/carousel/:image_id",
            put(http_update_carousel_image).delete(http_delete_carousel_image),
        )
        .layer(RequestBodyLimitLayer::new(MAX_ADMIN_BODY_BYTES))
        .with_state(state)
}

type ApiResponse<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    state
        .api
        .storage
        .health_check()
        .await
        .map_err(|e| error_response(ApiError::new(ErrorCode::Internal, e.to_string())))?;
    Ok("ok")
}

async fn http_list_projects(State(state): State<Arc<AppState>>) -> ApiResponse<Vec<ProjectRecord>> {
    api::list_projects(&state.api)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_list_carousel_images(
    State(state): State<Arc<AppState>>,
) -> ApiResponse<Vec<CarouselImageRecord>> {
    api::list_carousel_images(&state.api)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_create_project(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ProjectDraft>,
) -> ApiResponse<MutationAck> {
    api::create_project(&state.api, draft)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_update_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(draft): Json<ProjectDraft>,
) -> ApiResponse<MutationAck> {
    api::update_project(&state.api, ProjectId(project_id), draft)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_delete_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResponse<MutationAck> {
    api::delete_project(&state.api, ProjectId(project_id))
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_create_carousel_image(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<CarouselImageDraft>,
) -> ApiResponse<MutationAck> {
    api::create_carousel_image(&state.api, draft)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_update_carousel_image(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
    Json(draft): Json<CarouselImageDraft>,
) -> ApiResponse<MutationAck> {
    api::update_carousel_image(&state.api, CarouselImageId(image_id), draft)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_delete_carousel_image(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> ApiResponse<MutationAck> {
    api::delete_carousel_image(&state.api, CarouselImageId(image_id))
        .await
        .map(Json)
        .map_err(error_response)
}

fn error_response(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match error.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

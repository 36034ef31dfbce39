use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::functions::{FunctionError, Functions};
use crate::app::model::{
    SlidesWithAdsRequest, SlidesWithAdsResponse, SplitChapterRequest, SplitChapterResponse,
    SuccessResponse, TrackAdClickRequest, TrackProgressRequest, TrackProgressResponse,
};

pub const SPLIT_CHAPTER_PATH: &str = "/functions/v1/split-chapter";
pub const SLIDES_WITH_ADS_PATH: &str = "/functions/v1/get-slides-with-ads";
pub const TRACK_PROGRESS_PATH: &str = "/functions/v1/track-progress";
pub const TRACK_AD_CLICK_PATH: &str = "/functions/v1/track-ad-click";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl FunctionError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FunctionError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(err = %self, "function failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Permissive CORS so browser clients on any origin can call the functions.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

pub fn router(functions: Functions) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route(SPLIT_CHAPTER_PATH, post(split_chapter))
        .route(
            SLIDES_WITH_ADS_PATH,
            get(slides_with_ads_query).post(slides_with_ads_json),
        )
        .route(TRACK_PROGRESS_PATH, post(track_progress))
        .route(TRACK_AD_CLICK_PATH, post(track_ad_click))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(functions)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, FunctionError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| FunctionError::InvalidInput(rejection.body_text()))
}

async fn split_chapter(
    State(functions): State<Functions>,
    body: Result<Json<SplitChapterRequest>, JsonRejection>,
) -> Result<Json<SplitChapterResponse>, FunctionError> {
    let req = json_body(body)?;
    functions.split_chapter(req).await.map(Json)
}

async fn slides_with_ads_query(
    State(functions): State<Functions>,
    query: Result<Query<SlidesWithAdsRequest>, QueryRejection>,
) -> Result<Json<SlidesWithAdsResponse>, FunctionError> {
    let Query(req) =
        query.map_err(|rejection| FunctionError::InvalidInput(rejection.body_text()))?;
    slides_with_ads(&functions, req).await
}

async fn slides_with_ads_json(
    State(functions): State<Functions>,
    body: Result<Json<SlidesWithAdsRequest>, JsonRejection>,
) -> Result<Json<SlidesWithAdsResponse>, FunctionError> {
    let req = json_body(body)?;
    slides_with_ads(&functions, req).await
}

async fn slides_with_ads(
    functions: &Functions,
    req: SlidesWithAdsRequest,
) -> Result<Json<SlidesWithAdsResponse>, FunctionError> {
    let today = chrono::Utc::now().date_naive();
    functions.slides_with_ads(req, today).await.map(Json)
}

async fn track_progress(
    State(functions): State<Functions>,
    body: Result<Json<TrackProgressRequest>, JsonRejection>,
) -> Result<Json<TrackProgressResponse>, FunctionError> {
    let req = json_body(body)?;
    functions.track_progress(req).await.map(Json)
}

async fn track_ad_click(
    State(functions): State<Functions>,
    body: Result<Json<TrackAdClickRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, FunctionError> {
    let req = json_body(body)?;
    functions.track_ad_click(req).await.map(Json)
}

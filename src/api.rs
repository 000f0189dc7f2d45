//! HTTP/JSON boundary over the engine.
//!
//! Read routes are open. Routes that change engine state check the
//! `x-api-key` header when an API key is configured.

use crate::content::{ContentDocument, ContentType};
use crate::engine::{AlertAction, ContentEngine};
use crate::error::ContentError;
use crate::i18n::Language;
use crate::security::{is_authorized, API_KEY_HEADER};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Related items returned when no `limit` is given.
pub const DEFAULT_RELATED_LIMIT: usize = 3;

/// Upper bound on `limit` for related items.
pub const MAX_RELATED_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ContentEngine>,
    pub api_key: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/content/:content_type/:key", get(list_content))
        .route("/api/content/:content_type/:key/languages", get(available_languages))
        .route("/api/content/:content_type/:key/:slug", get(get_content))
        .route("/api/content/:content_type/:key/:slug/related", get(related_content))
        .route("/api/validation", get(validation_report))
        .route("/api/validation/check", post(check_single))
        .route("/api/stats", get(corpus_stats))
        .route("/api/alerts", post(alerts))
        .route("/api/cache/invalidate", post(invalidate_cache))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==================== Errors ====================

#[derive(Debug)]
pub enum ApiError {
    Content(ContentError),
    Unauthorized,
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        ApiError::Content(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Content(err) => match err {
                ContentError::NotFound { .. }
                | ContentError::TranslationNotAvailable { .. }
                | ContentError::RuleNotFound(_) => StatusCode::NOT_FOUND,
                ContentError::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ContentError::LanguageUnsupported(_)
                | ContentError::UnknownContentType(_)
                | ContentError::InvalidSlug(_)
                | ContentError::InvalidRuleUpdate { .. } => StatusCode::BAD_REQUEST,
                ContentError::DuplicateRule(_) => StatusCode::CONFLICT,
                ContentError::DuplicateNativeSlug { .. } | ContentError::Io { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Unauthorized => json!({ "error": "invalid or missing API key" }),
            ApiError::Content(
                err @ ContentError::TranslationNotAvailable {
                    canonical_slug,
                    language,
                    ..
                },
            ) => json!({
                "error": err.to_string(),
                "translationAvailable": false,
                "canonicalSlug": canonical_slug,
                "language": language,
            }),
            ApiError::Content(err) => json!({ "error": err.to_string() }),
        };

        if status.is_server_error() {
            warn!("Request failed: {}", body["error"]);
        }

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    if is_authorized(state.api_key.as_deref(), presented) {
        Ok(())
    } else {
        warn!("Rejected request with invalid API key");
        Err(ApiError::Unauthorized)
    }
}

fn parse_target(state: &AppState, content_type: &str, language: &str) -> Result<(ContentType, Language), ApiError> {
    let content_type = content_type.parse::<ContentType>()?;
    let language = state.engine.loader().languages().parse(language)?;
    Ok((content_type, language))
}

// ==================== Content ====================

/// Listing entry; the full document is served by the document route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub slug: String,
    pub language: Language,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub publish_date: Option<NaiveDate>,
    pub read_time_minutes: usize,
}

impl From<&ContentDocument> for ContentSummary {
    fn from(doc: &ContentDocument) -> Self {
        Self {
            slug: doc.slug.clone(),
            language: doc.language,
            title: doc.frontmatter.title.clone(),
            description: doc.frontmatter.description.clone(),
            category: doc.frontmatter.category.clone(),
            tags: doc.frontmatter.tags.clone(),
            publish_date: doc.frontmatter.publish_date,
            read_time_minutes: doc.derived.read_time_minutes,
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_content(
    State(state): State<AppState>,
    Path((content_type, language)): Path<(String, String)>,
) -> ApiResult<Vec<ContentSummary>> {
    let (content_type, language) = parse_target(&state, &content_type, &language)?;
    let docs = state
        .engine
        .loader()
        .load_all_content(content_type, language)
        .await?;

    Ok(Json(docs.iter().map(|d| ContentSummary::from(d.as_ref())).collect()))
}

async fn get_content(
    State(state): State<AppState>,
    Path((content_type, language, slug)): Path<(String, String, String)>,
) -> ApiResult<ContentDocument> {
    let (content_type, language) = parse_target(&state, &content_type, &language)?;
    let doc = state
        .engine
        .loader()
        .load_content(content_type, &slug, language)
        .await?;

    Ok(Json(doc.as_ref().clone()))
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub limit: Option<usize>,
}

async fn related_content(
    State(state): State<AppState>,
    Path((content_type, language, slug)): Path<(String, String, String)>,
    Query(query): Query<RelatedQuery>,
) -> ApiResult<Vec<ContentSummary>> {
    let (content_type, language) = parse_target(&state, &content_type, &language)?;
    let loader = state.engine.loader();

    let source = loader.load_content(content_type, &slug, language).await?;
    let canonical_slug = loader
        .slugs()
        .canonical_slug(content_type, &source.slug, language)
        .unwrap_or_else(|| source.slug.clone());
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RELATED_LIMIT)
        .min(MAX_RELATED_LIMIT);

    let related = loader
        .get_related_content(
            content_type,
            &canonical_slug,
            source.frontmatter.category.as_deref(),
            &source.frontmatter.tags,
            language,
            limit,
        )
        .await?;

    Ok(Json(related.iter().map(|d| ContentSummary::from(d.as_ref())).collect()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableLanguages {
    pub content_type: ContentType,
    pub slug: String,
    pub languages: Vec<Language>,
}

async fn available_languages(
    State(state): State<AppState>,
    Path((content_type, slug)): Path<(String, String)>,
) -> ApiResult<AvailableLanguages> {
    let content_type = content_type.parse::<ContentType>()?;
    let languages = state
        .engine
        .loader()
        .get_available_languages(&slug, content_type)
        .await;

    Ok(Json(AvailableLanguages {
        content_type,
        slug,
        languages,
    }))
}

// ==================== Validation ====================

async fn validation_report(State(state): State<AppState>) -> Result<Response, ApiError> {
    let report = state.engine.validation_report().await?;
    Ok(Json(report).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub content_type: String,
    pub english_slug: String,
    pub language: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub content_type: ContentType,
    pub english_slug: String,
    pub language: Language,
    pub is_valid: bool,
    pub issues: Vec<String>,
}

async fn check_single(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> ApiResult<CheckResponse> {
    let (content_type, language) = parse_target(&state, &request.content_type, &request.language)?;
    let issues = state
        .engine
        .check_single(&request.english_slug, content_type, language)
        .await?;

    Ok(Json(CheckResponse {
        content_type,
        english_slug: request.english_slug,
        language,
        is_valid: issues.is_empty(),
        issues,
    }))
}

async fn corpus_stats(State(state): State<AppState>) -> Result<Response, ApiError> {
    let stats = state.engine.corpus_stats().await?;
    Ok(Json(stats).into_response())
}

// ==================== Alerts & Cache ====================

async fn alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(action): Json<AlertAction>,
) -> Result<Response, ApiError> {
    if action.is_mutating() {
        authorize(&state, &headers)?;
    }
    let response = state.engine.handle_alert_action(action).await?;
    Ok(Json(response).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateRequest {
    pub content_type: Option<String>,
    pub language: Option<String>,
}

async fn invalidate_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;

    let content_type = request
        .content_type
        .as_deref()
        .map(str::parse::<ContentType>)
        .transpose()?;
    let language = request
        .language
        .as_deref()
        .map(|code| state.engine.loader().languages().parse(code))
        .transpose()?;

    state.engine.invalidate(content_type, language).await;

    Ok(Json(json!({ "invalidated": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ContentError) -> StatusCode {
        ApiError::from(err).status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_of(ContentError::TranslationNotAvailable {
                content_type: ContentType::Blog,
                language: Language::Fr,
                canonical_slug: "a".to_string(),
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ContentError::Parse {
                path: "x.md".to_string(),
                reason: "missing title".to_string(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ContentError::LanguageUnsupported("xx".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ContentError::UnknownContentType("news".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(ContentError::RuleNotFound("r".to_string())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ContentError::DuplicateRule("r".to_string())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(ContentError::InvalidRuleUpdate {
                rule_id: "r".to_string(),
                reason: "fixed".to_string(),
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}

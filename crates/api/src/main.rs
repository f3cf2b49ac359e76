use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use decksmith_core::compose::compose_with_logo;
use decksmith_core::config::Settings;
use decksmith_core::deck::build_pptx;
use decksmith_core::fetch::HttpImageFetcher;
use decksmith_core::report::contract::RawPayload;
use decksmith_core::report::payload::ReportPayload;
use decksmith_core::theme::Theme;

mod error;

use error::ApiError;

const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let fetcher = HttpImageFetcher::from_settings(&settings)?;
    tokio::fs::create_dir_all(&settings.public_dir).await?;

    let state = AppState {
        inner: Arc::new(AppStateInner {
            settings: settings.clone(),
            fetcher,
            theme: Theme::default(),
        }),
    };

    let app = Router::new()
        .route("/", get(healthz))
        .route("/build-pptx-report", post(build_pptx_report))
        .route("/api/build-pptx", post(api_build_pptx))
        .nest_service("/public", ServeDir::new(&settings.public_dir))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "Server is running"
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

#[derive(Clone)]
struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    settings: Settings,
    fetcher: HttpImageFetcher,
    theme: Theme,
}

fn parse_and_validate(body: Value) -> Result<ReportPayload, ApiError> {
    let raw: RawPayload = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(anyhow::Error::new(e)))?;
    raw.validate_into_payload().map_err(ApiError::bad_request)
}

fn file_name_for(payload: &ReportPayload) -> String {
    format!("Research_{}_{}.pptx", payload.ticker, payload.as_of_date)
}

async fn build_deck(state: &AppState, payload: &ReportPayload) -> Result<Vec<u8>, ApiError> {
    let slides = compose_with_logo(payload, &state.inner.theme, &state.inner.fetcher).await;
    build_pptx(&state.inner.theme, &slides, &payload.company_name).map_err(ApiError::build_failed)
}

/// Direct download: validate, build, stream the binary back as an attachment.
async fn build_pptx_report(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let payload = parse_and_validate(body)?;
    let buf = build_deck(&state, &payload).await?;

    tracing::info!(
        ticker = %payload.ticker,
        size = buf.len(),
        "built deck for direct download"
    );

    let disposition = format!("attachment; filename=\"{}\"", file_name_for(&payload));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PPTX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buf,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
struct BuildPptxResponse {
    #[serde(rename = "fileName")]
    file_name: String,
    #[serde(rename = "downloadUrl")]
    download_url: String,
    size: usize,
}

/// Action endpoint: validate, build, persist under a fresh id, return a link.
async fn api_build_pptx(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<BuildPptxResponse>), ApiError> {
    check_api_key(&state.inner.settings, &headers)?;

    let payload = parse_and_validate(body)?;
    let buf = build_deck(&state, &payload).await?;
    let size = buf.len();

    let id = Uuid::new_v4();
    let path = PathBuf::from(&state.inner.settings.public_dir).join(format!("{id}.pptx"));
    tokio::fs::write(&path, &buf)
        .await
        .map_err(|e| ApiError::persistence_failed(anyhow::Error::new(e)))?;

    let base = base_url(&state.inner.settings, &headers);
    tracing::info!(ticker = %payload.ticker, %id, size, "built and persisted deck");

    Ok((
        StatusCode::CREATED,
        Json(BuildPptxResponse {
            file_name: file_name_for(&payload),
            download_url: format!("{base}/public/{id}.pptx"),
            size,
        }),
    ))
}

/// Open when no API_KEY is configured; otherwise the `x-api-key` header must
/// match exactly.
fn check_api_key(settings: &Settings, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = settings.api_key.as_deref() else {
        return Ok(());
    };
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(got) if got == expected => Ok(()),
        _ => Err(ApiError::unauthorized()),
    }
}

fn base_url(settings: &Settings, headers: &HeaderMap) -> String {
    if let Some(base) = settings.app_base_url.as_deref() {
        return base.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost:3000");
    format!("http://{host}")
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(api_key: Option<&str>, base: Option<&str>) -> Settings {
        Settings {
            api_key: api_key.map(str::to_string),
            app_base_url: base.map(str::to_string),
            public_dir: "public".into(),
            logo_fetch_timeout_secs: 10,
            sentry_dsn: None,
        }
    }

    fn valid_body() -> Value {
        json!({
            "ticker": "ACME",
            "companyName": "Acme Corp",
            "asOfDate": "2026-08-30",
            "snapshot": {
                "industry": "Widgets",
                "businessModel": "B2B manufacturing",
                "growthFocus": "International expansion"
            },
            "ratings": [],
            "positives": [],
            "negatives": [],
            "tone": "Neutral",
            "whyTone": "Mixed signals."
        })
    }

    #[test]
    fn download_filename_embeds_ticker_and_date() {
        let payload = parse_and_validate(valid_body()).unwrap();
        assert_eq!(file_name_for(&payload), "Research_ACME_2026-08-30.pptx");
    }

    #[test]
    fn invalid_tone_maps_to_bad_request() {
        let mut body = valid_body();
        body["tone"] = json!("Sideways");
        let err = parse_and_validate(body).unwrap_err();
        assert_eq!(err.kind(), "bad_request");
    }

    #[test]
    fn api_key_check_is_open_when_unconfigured() {
        let headers = HeaderMap::new();
        assert!(check_api_key(&settings(None, None), &headers).is_ok());
    }

    #[test]
    fn api_key_check_rejects_mismatch() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "wrong".parse().unwrap());
        let err = check_api_key(&settings(Some("secret"), None), &headers).unwrap_err();
        assert_eq!(err.kind(), "unauthorized");

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "secret".parse().unwrap());
        assert!(check_api_key(&settings(Some("secret"), None), &headers).is_ok());
    }

    #[test]
    fn base_url_prefers_configured_app_base() {
        let headers = HeaderMap::new();
        assert_eq!(
            base_url(&settings(None, Some("https://decks.example.com/")), &headers),
            "https://decks.example.com"
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "decks.internal:8080".parse().unwrap());
        assert_eq!(
            base_url(&settings(None, None), &headers),
            "http://decks.internal:8080"
        );
    }
}

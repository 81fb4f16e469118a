//! api-server — HTTP surface for per-domain theme assignments.
//!
//! Serves the settings form as a typed JSON view, accepts its submissions, and
//! exposes the resolved assignments for the domain-routing collaborator.
//! - Storage: SQLite (default, `sqlite` feature) or in-memory.
//! - Directories: domains and themes seeded from `SEED_PATH` at startup.
//! - CORS: Configurable via CORS_ALLOW_ORIGIN (origin string) for an admin frontend.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! SEED_PATH=./seed.json cargo run -p api-server
//!
//! # volatile storage
//! STORAGE_PROVIDER=memory cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;
mod seed;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use theme_switch::adapters::memory::{
    InMemoryDomainDirectory, InMemorySettingsStore, InMemoryThemeDirectory,
};
use theme_switch::service::{FormValues, ThemeSwitchService};
use theme_switch::view::SAVED_MESSAGE;
use theme_switch::{
    CoreError, Domain, DomainDirectory, DomainId, GlobalThemeDefaults, SettingsBatch,
    SettingsStore, Theme, ThemeDefaults, ThemeDirectory, ThemeId,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Path of the settings form, as mounted in the host's admin area.
const SETTINGS_PATH: &str = "/admin/config/domain/theme-switch";

struct MemoryBackend {
    store: InMemorySettingsStore,
    domains: InMemoryDomainDirectory,
    themes: InMemoryThemeDirectory,
    defaults: ThemeDefaults,
}

// Local backend abstraction supporting memory or sqlite (feature-gated).
enum BackendKind {
    Memory(MemoryBackend),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteRepo),
}

#[derive(Clone)]
struct AnyBackend {
    kind: Arc<BackendKind>,
}

impl AnyBackend {
    fn memory(domains: Vec<Domain>, themes: Vec<Theme>, defaults: ThemeDefaults) -> Self {
        Self {
            kind: Arc::new(BackendKind::Memory(MemoryBackend {
                store: InMemorySettingsStore::new(),
                domains: InMemoryDomainDirectory::with_domains(domains),
                themes: InMemoryThemeDirectory::with_themes(themes),
                defaults,
            })),
        }
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(
        cfg: &config::Config,
        domains: &[Domain],
        themes: &[Theme],
    ) -> Result<Self, CoreError> {
        let repo = sqlite_adapter::SqliteRepo::create(&cfg.db_path)?;
        repo.ensure_system_theme(&cfg.defaults)?;
        for theme in themes {
            repo.upsert_theme(theme)?;
        }
        for domain in domains {
            repo.upsert_domain(domain)?;
        }
        Ok(Self {
            kind: Arc::new(BackendKind::Sqlite(repo)),
        })
    }
}

impl SettingsStore for AnyBackend {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        match &*self.kind {
            BackendKind::Memory(m) => m.store.get(key),
            #[cfg(feature = "sqlite")]
            BackendKind::Sqlite(r) => r.get(key),
        }
    }

    fn save(&self, batch: &SettingsBatch) -> Result<(), CoreError> {
        match &*self.kind {
            BackendKind::Memory(m) => m.store.save(batch),
            #[cfg(feature = "sqlite")]
            BackendKind::Sqlite(r) => r.save(batch),
        }
    }
}

impl DomainDirectory for AnyBackend {
    fn list_all(&self) -> Result<Vec<Domain>, CoreError> {
        match &*self.kind {
            BackendKind::Memory(m) => m.domains.list_all(),
            #[cfg(feature = "sqlite")]
            BackendKind::Sqlite(r) => r.list_all(),
        }
    }
}

impl ThemeDirectory for AnyBackend {
    fn list_installed(&self) -> Result<Vec<Theme>, CoreError> {
        match &*self.kind {
            BackendKind::Memory(m) => m.themes.list_installed(),
            #[cfg(feature = "sqlite")]
            BackendKind::Sqlite(r) => r.list_installed(),
        }
    }
}

impl GlobalThemeDefaults for AnyBackend {
    fn default_site_theme(&self) -> Result<ThemeId, CoreError> {
        match &*self.kind {
            BackendKind::Memory(m) => m.defaults.default_site_theme(),
            #[cfg(feature = "sqlite")]
            BackendKind::Sqlite(r) => r.default_site_theme(),
        }
    }

    fn default_admin_theme(&self) -> Result<ThemeId, CoreError> {
        match &*self.kind {
            BackendKind::Memory(m) => m.defaults.default_admin_theme(),
            #[cfg(feature = "sqlite")]
            BackendKind::Sqlite(r) => r.default_admin_theme(),
        }
    }
}

type Service = ThemeSwitchService<AnyBackend, AnyBackend, AnyBackend, AnyBackend>;

#[derive(Clone)]
struct AppState {
    svc: Arc<Service>,
}

impl AppState {
    fn new(backend: AnyBackend) -> Self {
        Self {
            svc: Arc::new(ThemeSwitchService::new(
                backend.clone(),
                backend.clone(),
                backend.clone(),
                backend,
            )),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_volatile();

    let (domains, themes) = match seed::Seed::load(cfg.seed_path.as_deref())
        .and_then(seed::Seed::into_parts)
    {
        Ok(parts) => parts,
        Err(e) => {
            error!(err = %e, "failed to load seed");
            std::process::exit(1);
        }
    };
    info!(
        domains = domains.len(),
        themes = themes.len(),
        "directories seeded"
    );

    let backend = build_backend(&cfg, domains, themes);
    let app = router(AppState::new(backend));

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");
    let app = app
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    let app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(%addr, "api-server listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a backend based on config and feature flags.
fn build_backend(cfg: &config::Config, domains: Vec<Domain>, themes: Vec<Theme>) -> AnyBackend {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => match AnyBackend::sqlite(cfg, &domains, &themes) {
            Ok(b) => b,
            Err(e) => {
                error!(db_path = %cfg.db_path.display(), err = %e, "failed to init SqliteRepo; using memory");
                AnyBackend::memory(domains, themes, cfg.defaults.clone())
            }
        },
        _ => AnyBackend::memory(domains, themes, cfg.defaults.clone()),
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(SETTINGS_PATH, get(render_settings).post(submit_settings))
        .route("/api/assignments", get(list_assignments))
        .route("/api/assignments/:domain_id", get(get_assignment))
        .with_state(state)
}

fn internal_error(e: &CoreError, what: &str) -> Response {
    error!(err = %e, "{} failed", what);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(http_common::json_err("error")),
    )
        .into_response()
}

async fn render_settings(State(state): State<AppState>) -> Response {
    match state.svc.render() {
        Ok(view) => Json(view).into_response(),
        Err(e) => internal_error(&e, "render"),
    }
}

async fn submit_settings(
    State(state): State<AppState>,
    Json(raw): Json<HashMap<String, Option<String>>>,
) -> Response {
    // A null value is submitted as "no value" and clears the stored override.
    let values: FormValues = raw
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect();
    let outcome = match state.svc.submit(&values) {
        Ok(o) => o,
        Err(e) => return internal_error(&e, "save"),
    };
    if outcome.domains_written == 0 {
        warn!("submit rejected: no domains configured");
        return (
            StatusCode::CONFLICT,
            Json(http_common::json_err("no_domains")),
        )
            .into_response();
    }
    match state.svc.render() {
        Ok(view) => match serde_json::to_value(&view) {
            Ok(v) => Json(http_common::json_message_with(SAVED_MESSAGE, "view", v)).into_response(),
            Err(e) => {
                error!(err = %e, "serialize view failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(http_common::json_err("error")),
                )
                    .into_response()
            }
        },
        Err(e) => internal_error(&e, "render"),
    }
}

#[derive(Serialize)]
struct AssignmentsOut {
    assignments: Vec<theme_switch::ThemeAssignment>,
}

async fn list_assignments(State(state): State<AppState>) -> Response {
    match state.svc.assignments() {
        Ok(assignments) => Json(AssignmentsOut { assignments }).into_response(),
        Err(e) => internal_error(&e, "list assignments"),
    }
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(domain_id): Path<String>,
) -> Response {
    let id = match DomainId::new(domain_id) {
        Ok(id) => id,
        Err(e) => {
            warn!(err = %e, "bad domain id in path");
            return (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_error_with_message(
                    "invalid_domain_id",
                    &e.to_string(),
                )),
            )
                .into_response();
        }
    };
    match state.svc.assignment_for(&id) {
        Ok(Some(a)) => Json(a).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(http_common::json_err("not_found")),
        )
            .into_response(),
        Err(e) => internal_error(&e, "get assignment"),
    }
}

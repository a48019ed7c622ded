//! HTTP server
//!
//! Thin front-end over the engine. Searches are CPU-bound and can fault
//! cold pages for a long time, so they are dispatched to a dedicated rayon
//! pool sized by configuration; trivial endpoints (name resolution, random
//! pick, stats) answer inline on the async workers and never queue behind
//! an in-flight large search.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::EngineConfig;
use crate::engine::{Engine, ExploreResult, PathResult, StoreStats};
use crate::error::EngineError;
use crate::id::ArtistId;
use crate::search::{Algorithm, SearchControl, SearchParams};
use crate::store::{Artist, Direction};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(find_path, explore, search_artists, random_artist, stats, health),
    components(schemas(
        Artist,
        Algorithm,
        Direction,
        ErrorResponse,
        SearchHit
    )),
    info(
        title = "artistpath API",
        version = "1.0.0",
        description = "Artist-to-artist pathfinding over the Last.fm similarity graph"
    )
)]
struct ApiDoc;

struct AppState {
    engine: Arc<Engine>,
    search_pool: rayon::ThreadPool,
    deadline: Option<Duration>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            EngineError::UnknownArtist(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            EngineError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            EngineError::Cancelled { .. } => (StatusCode::REQUEST_TIMEOUT, self.0.to_string()),
            // Budget trips are converted to results by the engine; anything
            // else reaching here is a store failure and stays opaque.
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Build the Axum router
fn build_router(state: Arc<AppState>, http_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/path", get(find_path))
        .route("/explore", get(explore))
        .route("/artists/search", get(search_artists))
        .route("/artists/random", get(random_artist))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(http_timeout))
        .layer(cors)
        .with_state(state)
}

/// Hand a search to the CPU pool and await its result.
async fn dispatch<T, F>(state: &AppState, job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Engine, &SearchControl) -> Result<T, EngineError> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    let control = SearchControl {
        deadline: state.deadline.map(|d| Instant::now() + d),
        cancel: None,
    };
    let (tx, rx) = tokio::sync::oneshot::channel();
    state.search_pool.spawn(move || {
        let _ = tx.send(job(&engine, &control));
    });
    rx.await
        .map_err(|_| ApiError(EngineError::Io(std::io::Error::other("search worker dropped"))))?
        .map_err(ApiError)
}

fn params_from(
    engine: &Engine,
    min_similarity: Option<f32>,
    max_relations: Option<usize>,
    budget: Option<usize>,
) -> SearchParams {
    let defaults = engine.defaults();
    SearchParams {
        min_similarity: min_similarity.unwrap_or(defaults.min_similarity),
        max_relations: max_relations.unwrap_or(defaults.max_relations),
        budget: budget.unwrap_or(defaults.budget),
    }
}

// ============ Path Endpoint ============

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PathQuery {
    /// Source artist id
    from: ArtistId,
    /// Target artist id
    to: ArtistId,
    /// Similarity floor in [0, 1]
    min_similarity: Option<f32>,
    /// Per-node fan-out cap in [1, 250]
    max_relations: Option<usize>,
    /// Max distinct artists visited
    budget: Option<usize>,
    /// bfs (fewest hops) or weighted (best similarity product)
    algorithm: Option<Algorithm>,
}

/// Find a path between two artists
#[utoipa::path(
    get,
    path = "/path",
    params(PathQuery),
    responses(
        (status = 200, description = "Search completed (found or not)"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Unknown artist", body = ErrorResponse),
    )
)]
async fn find_path(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<PathResult>, ApiError> {
    let result = dispatch(&state, move |engine, control| {
        let params = params_from(
            engine,
            query.min_similarity,
            query.max_relations,
            query.budget,
        );
        engine.find_path(
            query.from,
            query.to,
            params,
            query.algorithm.unwrap_or_default(),
            control,
        )
    })
    .await?;
    Ok(Json(result))
}

// ============ Explore Endpoint ============

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExploreQuery {
    /// Root artist id
    id: ArtistId,
    /// forward (who this artist points to) or reverse (who points to it)
    direction: Option<Direction>,
    min_similarity: Option<f32>,
    max_relations: Option<usize>,
    budget: Option<usize>,
    algorithm: Option<Algorithm>,
}

/// Bounded neighborhood around one artist
#[utoipa::path(
    get,
    path = "/explore",
    params(ExploreQuery),
    responses(
        (status = 200, description = "Neighborhood subgraph"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Unknown artist", body = ErrorResponse),
    )
)]
async fn explore(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExploreQuery>,
) -> Result<Json<ExploreResult>, ApiError> {
    let result = dispatch(&state, move |engine, control| {
        let params = params_from(
            engine,
            query.min_similarity,
            query.max_relations,
            query.budget,
        );
        engine.explore(
            query.id,
            query.direction.unwrap_or(Direction::Forward),
            params,
            query.algorithm.unwrap_or_default(),
            control,
        )
    })
    .await?;
    Ok(Json(result))
}

// ============ Trivial Endpoints ============

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Substring to look for (case- and whitespace-insensitive)
    q: String,
    /// Max hits returned
    limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchHit {
    pub artists: Vec<Artist>,
}

/// Resolve a name query to artists
#[utoipa::path(
    get,
    path = "/artists/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Ranked matches", body = SearchHit),
        (status = 400, description = "Empty query", body = ErrorResponse),
    )
)]
async fn search_artists(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchHit>, ApiError> {
    let artists = state
        .engine
        .resolve_name(&query.q, query.limit.unwrap_or(10))?;
    Ok(Json(SearchHit { artists }))
}

/// Uniformly random artist
#[utoipa::path(
    get,
    path = "/artists/random",
    responses((status = 200, description = "One artist", body = Artist))
)]
async fn random_artist(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Artist>, ApiError> {
    Ok(Json(state.engine.random_artist()?))
}

/// Store-wide counters
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Store statistics"))
)]
async fn stats(State(state): State<Arc<AppState>>) -> Json<StoreStats> {
    Json(state.engine.stats())
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Server is up"))
)]
async fn health() -> &'static str {
    "ok"
}

// ============ Lifecycle ============

/// Set up the tracing subscriber for the whole process (server and CLI
/// share it). `RUST_LOG` overrides the default `info` filter;
/// `--log-format json` emits JSON lines for log shippers.
pub fn init_tracing(log_format: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_format == "json" {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }
}

/// Open the store and serve until asked to stop.
///
/// With no explicit port the listener binds port 0 and the OS assigns one;
/// the bound address is read back from the listener, so there is no
/// probe-then-bind race.
pub async fn serve(config: EngineConfig, port: Option<u16>) -> anyhow::Result<()> {
    let engine = Arc::new(Engine::open(&config)?);

    let search_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("search-{i}"))
        .build()?;

    // The cooperative deadline fires first; the HTTP timeout is a backstop
    // for everything else on the request path.
    let http_timeout = config.deadline.unwrap_or(Duration::from_secs(60)) + Duration::from_secs(5);

    let state = Arc::new(AppState {
        engine,
        search_pool,
        deadline: config.deadline,
    });
    let app = build_router(state, http_timeout);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port.unwrap_or(0))).await?;
    let port = listener.local_addr()?.port();
    tracing::info!(port, "listening on http://127.0.0.1:{port}");
    tracing::info!(port, "Swagger UI: http://127.0.0.1:{port}/swagger-ui/");

    // SIGTERM registration can fail, so it happens here where the error
    // still has somewhere to go; a Ctrl-C install error surfaces on first
    // poll inside the future and is treated as a stop request.
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let shutdown = async move {
        #[cfg(unix)]
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    tracing::warn!(%error, "Ctrl-C handler unavailable, stopping");
                }
            }
            _ = terminate.recv() => {}
        }
        #[cfg(not(unix))]
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "Ctrl-C handler unavailable, stopping");
        }
        tracing::info!("shutdown requested, draining in-flight searches");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

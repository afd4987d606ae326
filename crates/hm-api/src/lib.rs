use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    extract::State,
    extract::connect_info::ConnectInfo,
    http::Method,
    http::Request,
    http::header::{CONTENT_TYPE, HeaderName, HeaderValue},
    middleware,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use clap::Parser;
use dotenvy::dotenv;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
};
use hm_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use hm_common::matching::{DEFAULT_MAX_RESULTS, RankingConfig, RankingEngine};
use hm_common::run_id;
use hm_common::source::{CandidateSource, JsonFileSource};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod error;
pub mod handlers;

use error::ApiError;
use handlers::{health, referral, search};

const SHUTDOWN_DRAIN_GRACE: std::time::Duration = std::time::Duration::from_millis(200);
const RATE_LIMIT_PRUNE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Upper bound on `max` accepted from callers.
pub const MAX_SEARCH_RESULTS: usize = 100;

#[derive(Debug, Clone, Parser)]
#[command(name = "hm-api", about = "HTTP API for handyman search and referrals")]
struct Cli {
    /// Server port
    #[arg(long, env = "PORT", default_value_t = 8787)]
    port: u16,

    /// JSON file holding the candidate pool (record array or sheet value range)
    #[arg(long, env = "HM_CANDIDATES_PATH")]
    candidates_path: PathBuf,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "HM_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,

    /// Result count when a search does not pass `max`
    #[arg(long, env = "HM_DEFAULT_MAX", default_value_t = DEFAULT_MAX_RESULTS)]
    default_max: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub candidates_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub default_max: usize,
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = cli
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();

        if cli.default_max == 0 || cli.default_max > MAX_SEARCH_RESULTS {
            return Err(ApiError::Config(format!(
                "HM_DEFAULT_MAX must be between 1 and {MAX_SEARCH_RESULTS}"
            )));
        }

        Ok(Self {
            port: cli.port,
            candidates_path: cli.candidates_path,
            cors_origins,
            default_max: cli.default_max,
        })
    }

    pub fn for_tests() -> Self {
        Self {
            port: 8787,
            candidates_path: PathBuf::from("candidates.json"),
            cors_origins: vec!["http://localhost:3000".into()],
            default_max: DEFAULT_MAX_RESULTS,
        }
    }
}

type IpRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_sec: u32,
    pub burst: u32,
}

impl RateLimitConfig {
    fn parse_env_u32(var: &str) -> Option<u32> {
        env::var(var)
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
    }

    fn from_env() -> Self {
        Self {
            per_sec: Self::parse_env_u32("HM_RATE_LIMIT_PER_SEC").unwrap_or(20),
            burst: Self::parse_env_u32("HM_RATE_LIMIT_BURST").unwrap_or(40),
        }
    }
}

fn build_ip_limiter(config: &RateLimitConfig) -> Arc<IpRateLimiter> {
    let per_second = NonZeroU32::new(config.per_sec).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::per_second(per_second).allow_burst(burst);

    Arc::new(RateLimiter::keyed(quota))
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<RankingEngine>,
    pub source: Arc<dyn CandidateSource>,
    rate_limiter: Arc<IpRateLimiter>,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: AppConfig,
        ranking: RankingConfig,
        source: Arc<dyn CandidateSource>,
    ) -> SharedState {
        Arc::new(Self {
            config,
            engine: Arc::new(RankingEngine::new(ranking)),
            source,
            rate_limiter: build_ip_limiter(&RateLimitConfig::from_env()),
            readiness: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Drops per-IP limiter entries whose quota has fully replenished and
    /// returns how many remain.
    pub fn prune_rate_limits(&self) -> usize {
        self.rate_limiter.retain_recent();
        self.rate_limiter.shrink_to_fit();
        self.rate_limiter.len()
    }
}

fn spawn_rate_limit_pruner(state: SharedState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let tracked = state.prune_rate_limits();
            tracing::debug!(tracked_ips = tracked, "pruned rate limiter state");
        }
    })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

fn request_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

async fn global_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(client_ip) = request_ip(&req) {
        if state.rate_limiter.check_key(&client_ip).is_err() {
            return Err(ApiError::TooManyRequests("rate limit exceeded".into()));
        }
    }

    Ok(next.run(req).await)
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    Ok(error::with_request_id(request_id, next.run(req)).await)
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    Router::new()
        .route("/", get(health::banner))
        .route("/healthz", get(health::healthz))
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .route("/handymen/search", get(search::search_handymen))
        .route("/refer", post(referral::create_referral))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            global_rate_limit,
        ))
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid::default(),
        ))
        .layer(cors)
        .with_state(state)
}

pub fn test_state(source: Arc<dyn CandidateSource>) -> SharedState {
    AppState::new(AppConfig::for_tests(), RankingConfig::default(), source)
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;
    let ranking = RankingConfig::from_env().map_err(|err| ApiError::Config(err.to_string()))?;
    let source: Arc<dyn CandidateSource> =
        Arc::new(JsonFileSource::new(config.candidates_path.clone()));

    info!(
        run_id = run_id::get(),
        source = source.name(),
        weights = ?ranking.weights,
        default_language = %ranking.default_language,
        "ranking configured"
    );

    let state = AppState::new(config.clone(), ranking, source);
    let pruner = spawn_rate_limit_pruner(state.clone());

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(%addr, "hm-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    pruner.abort();
    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state
        .readiness
        .store(false, std::sync::atomic::Ordering::SeqCst);

    // Let load balancers observe /readyz as not ready before connections stop.
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use hm_common::source::StaticSource;
    use std::sync::Mutex;
    use tower::ServiceExt;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn with_envs(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_GUARD.lock().unwrap();

        let previous: Vec<(&str, Option<String>)> = vars
            .iter()
            .map(|(var, value)| {
                let old = env::var(var).ok();
                match value {
                    Some(v) => unsafe { env::set_var(var, v) },
                    None => unsafe { env::remove_var(var) },
                }
                (*var, old)
            })
            .collect();

        f();

        for (var, previous_value) in previous {
            match previous_value {
                Some(v) => unsafe { env::set_var(var, v) },
                None => unsafe { env::remove_var(var) },
            }
        }
    }

    fn cli(default_max: usize) -> Cli {
        Cli {
            port: 8787,
            candidates_path: PathBuf::from("candidates.json"),
            cors_origins: " http://a.example , ,http://b.example".into(),
            default_max,
        }
    }

    #[tokio::test]
    async fn sets_request_id_when_missing() {
        let app = create_router(test_state(Arc::new(StaticSource::default())));

        let response = app
            .oneshot(Request::builder().uri("/livez").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn prune_keeps_recently_limited_clients() {
        let state = test_state(Arc::new(StaticSource::default()));
        assert_eq!(state.prune_rate_limits(), 0);

        let client: IpAddr = [10, 0, 0, 7].into();
        assert!(state.rate_limiter.check_key(&client).is_ok());

        assert_eq!(state.prune_rate_limits(), 1);
    }

    #[test]
    fn config_splits_cors_origins() {
        let config = AppConfig::from_cli(cli(5)).unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["http://a.example".to_string(), "http://b.example".to_string()]
        );
    }

    #[test]
    fn config_rejects_out_of_range_default_max() {
        assert!(matches!(AppConfig::from_cli(cli(0)), Err(ApiError::Config(_))));
        assert!(matches!(AppConfig::from_cli(cli(101)), Err(ApiError::Config(_))));
    }

    #[test]
    fn rate_limit_config_respects_env_overrides() {
        with_envs(
            &[
                ("HM_RATE_LIMIT_PER_SEC", Some("10")),
                ("HM_RATE_LIMIT_BURST", Some("0")),
            ],
            || {
                let cfg = RateLimitConfig::from_env();
                assert_eq!(
                    cfg,
                    RateLimitConfig {
                        per_sec: 10,
                        burst: 40,
                    }
                );
            },
        );
    }
}

//! HTTP 服务
//!
//! 路由构建、共享状态与请求日志中间件。

pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;
use crate::providers::claude::ClaudeProvider;

/// 共享应用状态
///
/// 各请求之间只共享只读配置与 HTTP 客户端，无可变共享状态。
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<ClaudeProvider>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let provider = ClaudeProvider::new(&config.llm_api_key, &config.llm_base_url);
        Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
        }
    }
}

/// 构建应用路由
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/api/classify", post(handlers::api::classify))
        .route("/api/translate", post(handlers::api::translate))
        .route("/api/health", get(handlers::api::health))
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(state)
}

/// CORS 配置
///
/// `*` 时放开所有源（不带凭证）；否则按配置的源列表放行。
fn cors_layer(config: &Config) -> CorsLayer {
    let origins = config.allow_origins_list();
    if origins.iter().any(|origin| origin == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
            .allow_credentials(false)
    }
}

/// 请求日志中间件
///
/// 记录每个请求的方法、路径、状态码与耗时，
/// 并把耗时写入 `X-Process-Time` 响应头。
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    tracing::info!("Request: {} {}", method, path);

    let mut response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    tracing::info!(
        "Response: {} {} | Status: {} | Time: {:.3}s",
        method,
        path,
        response.status().as_u16(),
        elapsed
    );

    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed)) {
        response.headers_mut().insert("X-Process-Time", value);
    }

    response
}

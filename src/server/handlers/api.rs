//! API 路由处理器
//!
//! `/api/classify`、`/api/translate`、`/api/health`。
//!
//! 翻译端点的错误分两段：流开始前的失败走正常 HTTP 错误响应；
//! 响应头发出之后的失败一律转为流内 `data:` 载荷再跟 `[END]`，
//! 传输层本身不再报错。

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;

use crate::error::AppError;
use crate::models::schemas::{
    ClassificationResult, ClassifyRequest, HealthResponse, TranslateRequest,
};
use crate::server::AppState;
use crate::services::llm_service::{self, TranslateMode};
use crate::stream::sse;

/// 对外服务名
pub const SERVICE_NAME: &str = "Communication Translator";

const MIN_INPUT_CHARS: usize = 5;

/// 输入长度校验（按字符数，裁剪首尾空白后）
fn validate_text(text: &str) -> Result<(), AppError> {
    if text.trim().chars().count() < MIN_INPUT_CHARS {
        return Err(AppError::Validation(
            "输入内容过短，至少需要5个字符".to_string(),
        ));
    }
    Ok(())
}

/// 分类类型 → 角色组合路由表
///
/// 未列出的类型不做默认兜底，直接报未知分类。
pub fn route_roles(classification_type: &str) -> Result<(&'static str, &'static str), AppError> {
    match classification_type {
        "产品需求" => Ok(("pm", "dev")),      // 产品需求 → 翻译给开发
        "技术方案" => Ok(("dev", "pm")),      // 技术方案 → 翻译给产品
        "运营数据" => Ok(("operation", "dev")), // 运营数据需求 → 翻译给开发
        "管理决策" => Ok(("management", "pm")), // 管理决策 → 翻译给产品经理
        other => Err(AppError::UnknownClassification(other.to_string())),
    }
}

/// POST /api/classify
pub async fn classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassificationResult>, AppError> {
    validate_text(&request.text)?;
    let result = llm_service::classify_input(&state, &request.text).await?;
    Ok(Json(result))
}

/// POST /api/translate
pub async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Response, AppError> {
    validate_text(&request.text)?;

    let preview = llm_service::truncate_chars(&request.text, 50);

    // 角色解析：手动模式直接用请求里的角色，否则先分类再路由
    let (source_role, target_role, classification) =
        match (&request.source_role, &request.target_role) {
            (Some(source), Some(target)) => {
                tracing::info!(
                    "[翻译模式] {} → {} | 输入: {}...",
                    source.to_uppercase(),
                    target.to_uppercase(),
                    preview
                );
                (source.clone(), target.clone(), None)
            }
            _ => {
                tracing::info!("[翻译模式] 自动识别 | 输入: {}...", preview);
                let classification = llm_service::classify_input(&state, &request.text).await?;

                match classification.action.as_str() {
                    "clarify" => {
                        tracing::info!(
                            "[自动识别结果] 需要澄清 | 原因: {}",
                            classification.reasoning
                        );
                        return Ok(canned_response(sse::clarify_events()));
                    }
                    "split" => {
                        tracing::info!(
                            "[自动识别结果] 需要拆分话题 | 原因: {}",
                            classification.reasoning
                        );
                        return Ok(canned_response(sse::split_topic_events()));
                    }
                    _ => {}
                }

                let (source, target) = route_roles(&classification.category)?;
                tracing::info!(
                    "[自动识别结果] 分类: {} (置信度: {}) → {} → {}",
                    classification.category,
                    sse::format_confidence(classification.confidence),
                    source.to_uppercase(),
                    target.to_uppercase()
                );
                (source.to_string(), target.to_string(), Some(classification))
            }
        };

    let mode = if classification.is_some() {
        TranslateMode::Auto
    } else {
        TranslateMode::Manual
    };
    let summary = classification
        .as_ref()
        .map(|c| sse::classification_event(&c.category, c.confidence));
    let (classification_type, classification_confidence) = match classification {
        Some(c) => (Some(c.category), Some(c.confidence)),
        None => (None, None),
    };

    let text = request.text;
    let body_stream = async_stream::stream! {
        // 建连注释先行，强制开始流式传输
        yield sse::CONNECTED_COMMENT.to_string();

        if let Some(summary) = summary {
            yield summary;
        }

        let translator = llm_service::translate_stream(
            state,
            text,
            source_role,
            target_role,
            mode,
            classification_type,
            classification_confidence,
        );
        futures::pin_mut!(translator);

        while let Some(chunk) = translator.next().await {
            yield sse::data_event(&chunk);
        }

        yield sse::END_MARKER.to_string();
    };

    Ok(sse_response(Body::from_stream(body_stream.map(
        |event: String| Ok::<Bytes, std::convert::Infallible>(Bytes::from(event)),
    ))))
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// 固定事件序列的 SSE 响应（clarify / split 分支）
fn canned_response(events: Vec<String>) -> Response {
    let body = Body::from_stream(futures::stream::iter(
        events
            .into_iter()
            .map(|event| Ok::<Bytes, std::convert::Infallible>(Bytes::from(event))),
    ));
    sse_response(body)
}

/// 构建 SSE 响应头
fn sse_response(body: Body) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

//! API 端到端测试
//!
//! 用本地 mock 上游替代真实 LLM 服务：非流式调用返回分类 JSON，
//! 流式调用返回固定的 Anthropic SSE 事件序列。
//! 覆盖校验拦截、自动/手动两种翻译模式、clarify 分支与未知分类。

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use rolecast::config::Config;
use rolecast::server::{build_router, AppState};

/// mock 上游返回的流式事件序列
const MOCK_SSE_BODY: &str = concat!(
    "event: message_start\n",
    "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_mock\",\"model\":\"glm-4.6\"}}\n\n",
    "event: content_block_start\n",
    "data: {\"type\":\"content_block_start\",\"index\":0}\n\n",
    "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"**理解确认**\"}}\n\n",
    "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"：需要登录功能\\n支持两种方式\"}}\n\n",
    "data: {\"type\":\"message_delta\",\"usage\":{\"input_tokens\":100,\"output_tokens\":12}}\n\n",
    "data: {\"type\":\"message_stop\"}\n\n",
);

/// 分类器输出：JSON 包在 ```json 围栏里（模型常见行为）
const FENCED_CLASSIFICATION: &str = "分类结果：\n```json\n{\"type\": \"产品需求\", \"confidence\": 0.95, \"reasoning\": \"包含用户需求和功能描述\", \"keywords\": [\"登录\", \"功能\"], \"action\": \"translate\"}\n```\n";

#[derive(Clone)]
struct MockUpstream {
    /// 非流式调用返回的首个文本块内容
    classification_text: String,
    /// 非流式（分类）端点是否被调用过
    classify_called: Arc<AtomicBool>,
    /// 流式端点是否被调用过
    stream_called: Arc<AtomicBool>,
}

impl MockUpstream {
    fn new(classification_text: &str) -> Self {
        Self {
            classification_text: classification_text.to_string(),
            classify_called: Arc::new(AtomicBool::new(false)),
            stream_called: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// 启动 mock 上游，返回 base_url
async fn spawn_mock(mock: MockUpstream) -> String {
    let app = Router::new().route(
        "/v1/messages",
        post(move |Json(request): Json<Value>| {
            let mock = mock.clone();
            async move {
                if request["stream"].as_bool().unwrap_or(false) {
                    mock.stream_called.store(true, Ordering::SeqCst);
                    axum::http::Response::builder()
                        .header(header::CONTENT_TYPE, "text/event-stream")
                        .body(Body::from(MOCK_SSE_BODY))
                        .unwrap()
                } else {
                    mock.classify_called.store(true, Ordering::SeqCst);
                    let body = json!({
                        "content": [{"type": "text", "text": mock.classification_text}],
                        "usage": {"input_tokens": 100, "output_tokens": 40}
                    });
                    axum::http::Response::builder()
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(body.to_string()))
                        .unwrap()
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// 写出最小可用的 ai-context 目录
fn write_context(dir: &Path) {
    let prompts = dir.join("prompts");
    let roles = dir.join("modules").join("roles");
    let rules = dir.join("modules").join("rules");
    fs::create_dir_all(&prompts).unwrap();
    fs::create_dir_all(&roles).unwrap();
    fs::create_dir_all(&rules).unwrap();

    fs::write(prompts.join("classifier.md"), "你是分类器，输出 JSON").unwrap();
    fs::write(
        prompts.join("translator.md"),
        "{{SOURCE_ROLE}} → {{TARGET_ROLE}}\n{{SOURCE_ROLE_CONTENT}}\n{{TARGET_ROLE_CONTENT}}\n{{FORMAT_RULES}}\n",
    )
    .unwrap();
    for role in ["pm", "dev", "operation", "management"] {
        fs::write(roles.join(format!("{}.md", role)), format!("{} 视角", role)).unwrap();
    }
    fs::write(rules.join("format-rules.md"), "使用 Markdown").unwrap();
}

/// 构建指向给定上游的测试应用；TempDir 需由调用方持有
fn test_app(base_url: &str) -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    write_context(dir.path());
    let logs_dir = dir.path().join("logs");
    fs::create_dir_all(&logs_dir).unwrap();

    let config = Config {
        llm_api_key: "sk-test".to_string(),
        llm_base_url: base_url.to_string(),
        llm_model: "glm-4.6".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        debug: false,
        log_level: "info".to_string(),
        log_retention_days: 30,
        allow_origins: "*".to_string(),
        ai_context_dir: dir.path().to_path_buf(),
        logs_dir,
    };

    let router = build_router(AppState::new(config));
    (dir, router)
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health() {
    // 无需上游
    let (_dir, app) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "Communication Translator");
}

#[tokio::test]
async fn test_classify_rejects_short_input() {
    // base_url 不可达：短输入必须在任何上游调用之前被拦截
    let (_dir, app) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(json_request("/api/classify", json!({"text": "  登录 "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn test_translate_rejects_short_input() {
    let (_dir, app) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(json_request("/api/translate", json!({"text": "abc"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_classify_parses_fenced_json() {
    let base_url = spawn_mock(MockUpstream::new(FENCED_CLASSIFICATION)).await;
    let (_dir, app) = test_app(&base_url);

    let response = app
        .oneshot(json_request(
            "/api/classify",
            json!({"text": "我们需要一个用户登录功能，支持手机号和邮箱两种方式"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["type"], "产品需求");
    assert_eq!(body["confidence"], 0.95);
    assert_eq!(body["action"], "translate");
}

#[tokio::test]
async fn test_classify_rejects_out_of_range_confidence() {
    let base_url = spawn_mock(MockUpstream::new(
        "{\"type\": \"产品需求\", \"confidence\": 1.5, \"reasoning\": \"x\", \"keywords\": [], \"action\": \"translate\"}",
    ))
    .await;
    let (_dir, app) = test_app(&base_url);

    let response = app
        .oneshot(json_request(
            "/api/classify",
            json!({"text": "我们需要一个用户登录功能"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["type"], "parse_error");
}

#[tokio::test]
async fn test_translate_manual_mode_streams_without_classification() {
    let mock = MockUpstream::new(FENCED_CLASSIFICATION);
    let classify_called = mock.classify_called.clone();
    let base_url = spawn_mock(mock).await;
    let (dir, app) = test_app(&base_url);

    let response = app
        .oneshot(json_request(
            "/api/translate",
            json!({
                "text": "我们需要一个用户登录功能，支持手机号和邮箱两种方式",
                "source_role": "pm",
                "target_role": "dev"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let body = body_string(response).await;

    // 建连注释先行
    assert!(body.starts_with(": connected\n\n"));
    // 手动模式不调分类器，也不发分类摘要
    assert!(!classify_called.load(Ordering::SeqCst));
    assert!(!body.contains("[分类结果"));
    // 转发的 chunk 逐个成帧
    assert!(body.contains("data: **理解确认**\n\n"));
    // 含内部换行的 chunk 拆成连续 data: 行
    assert!(body.contains("data: ：需要登录功能\ndata: 支持两种方式\n\n"));
    // 终止标记收尾
    assert!(body.ends_with("data: [END]\n\n"));

    // 转录异步落盘，稍等后检查
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let transcripts: Vec<_> = fs::read_dir(dir.path().join("logs"))
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with("llm_output_")
        })
        .collect();
    assert_eq!(transcripts.len(), 1);
    let transcript = fs::read_to_string(transcripts[0].path()).unwrap();
    assert!(transcript.contains("Mode: 手动选择"));
    assert!(transcript.contains("Translation: PM → DEV"));
    assert!(transcript.contains("总 Chunk 数: 2"));
}

#[tokio::test]
async fn test_translate_auto_mode_emits_classification_summary() {
    let base_url = spawn_mock(MockUpstream::new(FENCED_CLASSIFICATION)).await;
    let (_dir, app) = test_app(&base_url);

    let response = app
        .oneshot(json_request(
            "/api/translate",
            json!({"text": "我们需要一个用户登录功能，支持手机号和邮箱两种方式"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;

    assert!(body.starts_with(": connected\n\n"));

    // 分类摘要在翻译输出之前
    let summary_pos = body
        .find("data: [分类结果: 产品需求 (置信度: 95%)]\ndata: \n\n")
        .expect("缺少分类摘要事件");
    let chunk_pos = body.find("data: **理解确认**").expect("缺少翻译输出");
    assert!(summary_pos < chunk_pos);

    assert!(body.ends_with("data: [END]\n\n"));
}

#[tokio::test]
async fn test_translate_clarify_skips_translator() {
    let mock = MockUpstream::new(
        "{\"type\": \"产品需求\", \"confidence\": 0.4, \"reasoning\": \"信息不足\", \"keywords\": [], \"action\": \"clarify\"}",
    );
    let stream_called = mock.stream_called.clone();
    let base_url = spawn_mock(mock).await;
    let (_dir, app) = test_app(&base_url);

    let response = app
        .oneshot(json_request(
            "/api/translate",
            json!({"text": "帮我看看这个东西怎么弄"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;

    // 固定引导文案，逐字节一致
    let expected = concat!(
        "data: [输入信息不足]\n\n",
        "data: \n\n",
        "data: 为了更好地帮助您，请补充：\n\n",
        "data: 1. 如果这是产品需求，请说明：想解决什么问题？预期目标？\n\n",
        "data: 2. 如果这是技术方案，请说明：改动背景？解决什么问题？\n\n",
        "data: [END]\n\n",
    );
    assert_eq!(body, expected);

    // 翻译流从未被调用
    assert!(!stream_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_translate_unknown_classification_type() {
    let base_url = spawn_mock(MockUpstream::new(
        "{\"type\": \"闲聊\", \"confidence\": 0.9, \"reasoning\": \"日常对话\", \"keywords\": [], \"action\": \"translate\"}",
    ))
    .await;
    let (_dir, app) = test_app(&base_url);

    let response = app
        .oneshot(json_request(
            "/api/translate",
            json!({"text": "今天中午大家一起吃什么"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["type"], "unknown_classification");
    assert!(body["error"]["message"].as_str().unwrap().contains("闲聊"));
}

//! LLM 交互服务
//!
//! 两个入口：
//! - [`classify_input`]: 一次非流式调用，解析分类 JSON
//! - [`translate_stream`]: 流式调用，逐段转发文本增量并在结束后落转录
//!
//! 两者都不做重试，失败在首次发生时直接暴露给调用方。

use async_stream::stream;
use futures::{pin_mut, Stream, StreamExt};

use crate::error::AppError;
use crate::models::anthropic::{Message, MessagesRequest};
use crate::models::schemas::ClassificationResult;
use crate::providers::claude;
use crate::server::AppState;
use crate::services::{skill_service, transcript::Transcript};
use crate::stream::{DeltaParser, SseFrameBuffer};

const CLASSIFY_MAX_TOKENS: u32 = 1000;
const TRANSLATE_MAX_TOKENS: u32 = 4000;
const SNIPPET_CHARS: usize = 200;
const PREVIEW_CHARS: usize = 50;

/// 翻译模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateMode {
    /// 自动识别（先分类再路由）
    Auto,
    /// 手动选择角色
    Manual,
}

impl TranslateMode {
    /// 转录中的模式标签
    pub fn label(self) -> &'static str {
        match self {
            TranslateMode::Auto => "自动识别",
            TranslateMode::Manual => "手动选择",
        }
    }
}

/// 生成请求标识：时间戳 + 微秒
pub fn request_id() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S_%6f").to_string()
}

/// 按字符数截断（中文安全）
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// 从自由文本中提取 JSON
///
/// 模型可能把 JSON 包在 ```json 或 ``` 围栏里再配上说明文字，
/// 有围栏时只取围栏内部。
pub fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let interior = &text[start + 7..];
        if let Some(end) = interior.find("```") {
            return interior[..end].trim();
        }
    } else if let Some(start) = text.find("```") {
        let interior = &text[start + 3..];
        if let Some(end) = interior.find("```") {
            return interior[..end].trim();
        }
    }
    text.trim()
}

/// 分类用户输入
///
/// 单次调用、单次解析：模型输出不是合法分类 JSON 时直接报
/// [`AppError::Parse`]，不重试。
pub async fn classify_input(
    state: &AppState,
    text: &str,
) -> Result<ClassificationResult, AppError> {
    let request_id = request_id();
    tracing::info!(
        "[CLASSIFY REQUEST] ID: {}, Input: {}...",
        request_id,
        truncate_chars(text, PREVIEW_CHARS)
    );

    let classifier_prompt = skill_service::read_skill(&state.config, "classifier", None, None)?;

    let request = MessagesRequest {
        model: state.config.llm_model.clone(),
        max_tokens: CLASSIFY_MAX_TOKENS,
        system: classifier_prompt,
        messages: vec![Message::user(text)],
        stream: false,
    };

    let response = state.provider.create_message(&request).await.map_err(|e| {
        tracing::error!("[CLASSIFY ERROR] API Error: {}", e);
        AppError::Upstream(e)
    })?;

    let raw_text = claude::first_text(&response).map_err(AppError::Upstream)?;
    let extracted = extract_json_block(raw_text);

    let result: ClassificationResult = serde_json::from_str(extracted).map_err(|e| {
        tracing::error!(
            "[CLASSIFY ERROR] JSON Parse Failed: {}, Response: {}",
            e,
            truncate_chars(extracted, SNIPPET_CHARS)
        );
        AppError::Parse {
            message: e.to_string(),
            snippet: truncate_chars(extracted, SNIPPET_CHARS),
        }
    })?;

    if !result.confidence_in_range() {
        tracing::error!(
            "[CLASSIFY ERROR] confidence 超出范围: {}",
            result.confidence
        );
        return Err(AppError::Parse {
            message: format!("confidence 超出 [0,1] 范围: {}", result.confidence),
            snippet: truncate_chars(extracted, SNIPPET_CHARS),
        });
    }

    match response.usage {
        Some(usage) => tracing::info!(
            "[CLASSIFY SUCCESS] Type: {}, Confidence: {}, Tokens: {}/{}",
            result.category,
            result.confidence,
            usage.input_tokens,
            usage.output_tokens
        ),
        None => tracing::info!(
            "[CLASSIFY SUCCESS] Type: {}, Confidence: {}",
            result.category,
            result.confidence
        ),
    }

    Ok(result)
}

/// 流式翻译
///
/// 产出原始文本增量（不组 SSE 帧，组帧由路由层负责）。一次性流，
/// 不可重启。上游失败不中断迭代协议，而是把错误文本作为最后一个
/// chunk 产出——消费方必须把任何 chunk 都视作可能内嵌错误提示。
pub fn translate_stream(
    state: AppState,
    text: String,
    source_role: String,
    target_role: String,
    mode: TranslateMode,
    classification_type: Option<String>,
    classification_confidence: Option<f64>,
) -> impl Stream<Item = String> {
    stream! {
        let request_id = request_id();
        tracing::info!(
            "[TRANSLATE REQUEST] ID: {}, {} → {}, Input: {}...",
            request_id,
            source_role.to_uppercase(),
            target_role.to_uppercase(),
            truncate_chars(&text, PREVIEW_CHARS)
        );

        let translator_prompt = match skill_service::read_skill(
            &state.config,
            "translator",
            Some(&source_role),
            Some(&target_role),
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!("[TRANSLATE ERROR] {}", e);
                yield format!("\n\n[错误] {}", e);
                return;
            }
        };

        let request = MessagesRequest {
            model: state.config.llm_model.clone(),
            max_tokens: TRANSLATE_MAX_TOKENS,
            system: translator_prompt.clone(),
            messages: vec![Message::user(&*text)],
            stream: true,
        };

        let upstream = match state.provider.stream_message(&request).await {
            Ok(upstream) => upstream,
            Err(e) => {
                tracing::error!("[TRANSLATE ERROR] {}", e);
                yield format!("\n\n[错误] LLM API 调用失败: {}", e);
                return;
            }
        };
        pin_mut!(upstream);

        let mut frames = SseFrameBuffer::new();
        let mut parser = DeltaParser::new();
        let mut chunk_count: u64 = 0;
        let mut char_count: u64 = 0;
        let mut failed = false;

        'receive: while let Some(item) = upstream.next().await {
            let bytes = match item {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!("[TRANSLATE ERROR] 流式传输中断: {}", e);
                    yield format!("\n\n[错误] LLM API 调用失败: {}", e);
                    failed = true;
                    break 'receive;
                }
            };

            for payload in frames.feed(&String::from_utf8_lossy(&bytes)) {
                let parsed = parser.parse_data(&payload);

                if let Some(error) = parsed.error {
                    tracing::error!(
                        "[TRANSLATE ERROR] 上游流内错误: {} - {}",
                        error.kind,
                        error.message
                    );
                    yield format!("\n\n[错误] LLM API 调用失败: {}", error.message);
                    failed = true;
                    break 'receive;
                }

                if let Some(text_chunk) = parsed.text_delta {
                    chunk_count += 1;
                    char_count += text_chunk.chars().count() as u64;
                    // 原样转发，不做任何格式化；转义序列由前端处理
                    yield text_chunk;
                }

                if parsed.is_done {
                    break 'receive;
                }
            }
        }

        if !failed {
            let record = Transcript {
                request_id: request_id.clone(),
                mode_label: mode.label(),
                classification_type,
                classification_confidence,
                source_role: source_role.clone(),
                target_role: target_role.clone(),
                user_input: text,
                system_prompt: translator_prompt,
                output: parser.full_content().to_string(),
                chunk_count,
                char_count,
            };
            let output_file = record.path(&state.config.logs_dir);
            crate::services::transcript::spawn_write(&state.config.logs_dir, record);

            match parser.usage() {
                Some(usage) => tracing::info!(
                    "[TRANSLATE SUCCESS] Chunks: {}, Chars: {}, Tokens: {}/{}, Output: {}",
                    chunk_count,
                    char_count,
                    usage.input_tokens,
                    usage.output_tokens,
                    output_file.display()
                ),
                None => tracing::info!(
                    "[TRANSLATE SUCCESS] Chunks: {}, Chars: {}, Output: {}",
                    chunk_count,
                    char_count,
                    output_file.display()
                ),
            }
        }
    }
}

//! Claude Provider（Anthropic Messages API 客户端）
//!
//! 封装上游 LLM 调用：非流式的 `create_message` 与流式的
//! `stream_message`。错误收敛为 [`LlmError`] 的有限几类，
//! 调用方按类分支而不是笼统捕获。

use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use thiserror::Error;

use crate::models::anthropic::{ContentBlock, MessagesRequest, MessagesResponse};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// 上游调用错误
#[derive(Error, Debug)]
pub enum LlmError {
    /// 网络层失败（连接失败、DNS、传输中断）
    #[error("网络错误: {0}")]
    Network(String),

    /// 请求超时
    #[error("请求超时: {0}")]
    Timeout(String),

    /// 上游限流（HTTP 429）
    #[error("上游限流 (429)")]
    RateLimited,

    /// 上游返回非 2xx
    #[error("API 错误 ({status}): {message}")]
    Api { status: u16, message: String },

    /// 响应不符合预期结构
    #[error("响应格式异常: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            LlmError::Timeout(error.to_string())
        } else {
            LlmError::Network(error.to_string())
        }
    }
}

/// Anthropic 格式的 LLM 客户端
pub struct ClaudeProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl ClaudeProvider {
    /// 创建 Provider
    ///
    /// HTTP 客户端带超时配置，避免流式传输中途被连接池回收中断。
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(300))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client,
        }
    }

    /// 构建完整的 API URL
    ///
    /// 兼容用户配置的 base_url 带或不带 `/v1`。
    fn build_url(&self, endpoint: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/{}", base, endpoint)
        } else {
            format!("{}/v1/{}", base, endpoint)
        }
    }

    /// 发送请求并做统一的状态码检查
    async fn send(&self, request: &MessagesRequest) -> Result<reqwest::Response, LlmError> {
        let url = self.build_url("messages");

        tracing::debug!(
            "[CLAUDE_API] 发送请求: url={} model={} stream={}",
            url,
            request.model,
            request.stream
        );

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        tracing::debug!("[CLAUDE_API] 响应状态: status={}", status);

        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    /// 非流式调用，返回完整响应
    pub async fn create_message(
        &self,
        request: &MessagesRequest,
    ) -> Result<MessagesResponse, LlmError> {
        let resp = self.send(request).await?;
        resp.json::<MessagesResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    /// 流式调用，返回原始字节流
    ///
    /// 调用方负责设置 `request.stream = true` 并解析 SSE 帧。
    pub async fn stream_message(
        &self,
        request: &MessagesRequest,
    ) -> Result<impl Stream<Item = Result<Bytes, reqwest::Error>>, LlmError> {
        let resp = self.send(request).await?;
        Ok(resp.bytes_stream())
    }
}

/// 从响应中取第一个文本内容块
///
/// 显式的响应形状适配：上游 SDK 形状的假设集中在这里，
/// 形状不符时给出明确错误而不是在调用处崩溃。
pub fn first_text(response: &MessagesResponse) -> Result<&str, LlmError> {
    match response.content.first() {
        Some(ContentBlock::Text { text }) if !text.is_empty() => Ok(text),
        Some(_) => Err(LlmError::InvalidResponse(
            "首个内容块不是文本".to_string(),
        )),
        None => Err(LlmError::InvalidResponse("响应内容为空".to_string())),
    }
}

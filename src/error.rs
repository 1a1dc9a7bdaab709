//! 应用错误类型
//!
//! 定义请求处理过程中可能发生的错误，以及到 HTTP 响应的映射。
//! 流式响应开始后的错误不走这里，而是转换为流内载荷。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::providers::claude::LlmError;

/// 应用错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 输入校验失败
    #[error("{0}")]
    Validation(String),

    /// 参数错误
    #[error("{0}")]
    InvalidArgument(String),

    /// 不支持的 skill
    #[error("不支持的 skill: {0}")]
    UnsupportedSkill(String),

    /// 分类类型不在路由表中
    #[error("未知的分类类型: {0}")]
    UnknownClassification(String),

    /// 模板或片段文件缺失
    #[error("{0}")]
    NotFound(String),

    /// 分类结果无法解析
    #[error("分类结果JSON解析失败: {message}\n原始响应: {snippet}")]
    Parse { message: String, snippet: String },

    /// LLM Provider 调用失败
    #[error("LLM API 调用失败: {0}")]
    Upstream(#[from] LlmError),
}

impl AppError {
    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedSkill(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownClassification(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Parse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// 获取错误类型字符串
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::UnsupportedSkill(_) => "unsupported_skill",
            AppError::UnknownClassification(_) => "unknown_classification",
            AppError::NotFound(_) => "not_found",
            AppError::Parse { .. } => "parse_error",
            AppError::Upstream(_) => "upstream_error",
        }
    }

    /// 转换为 JSON 错误响应
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": self.error_type(),
                "code": self.status_code().as_u16()
            }
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("[ERROR] {}: {}", self.error_type(), self);
        } else {
            tracing::warn!("[ERROR] {}: {}", self.error_type(), self);
        }
        (status, Json(self.to_json())).into_response()
    }
}

//! Anthropic Messages API 数据模型
//!
//! 上游调用的请求/响应结构与流式事件定义。
//! 流式事件使用 `type` 字段做内部标签，未识别的事件安全忽略。

use serde::{Deserialize, Serialize};

/// Messages API 请求
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    /// 模型名称
    pub model: String,
    /// 最大输出 token 数
    pub max_tokens: u32,
    /// 系统提示词
    pub system: String,
    /// 对话消息列表
    pub messages: Vec<Message>,
    /// 是否流式输出
    pub stream: bool,
}

/// 对话消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    /// 构造一条 user 消息
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Messages API 非流式响应
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    /// 内容块列表
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Token 用量
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// 内容块
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// 文本内容
    Text { text: String },
    /// 其他类型（工具调用等，本服务不处理）
    #[serde(other)]
    Other,
}

/// Token 用量
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// 流式事件
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// 消息开始
    MessageStart {
        #[serde(default)]
        message: Option<MessageStartInfo>,
    },
    /// 内容块开始
    ContentBlockStart {
        #[serde(default)]
        index: u32,
    },
    /// 内容增量
    ContentBlockDelta {
        #[serde(default)]
        index: u32,
        delta: Delta,
    },
    /// 内容块结束
    ContentBlockStop {
        #[serde(default)]
        index: u32,
    },
    /// 消息级增量（携带最终用量）
    MessageDelta {
        #[serde(default)]
        usage: Option<Usage>,
    },
    /// 消息结束
    MessageStop,
    /// 心跳
    Ping,
    /// 上游错误
    Error { error: ApiErrorBody },
    /// 其他未识别事件
    #[serde(other)]
    Other,
}

/// message_start 事件携带的消息信息
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageStartInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
}

/// 上游错误体
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// 内容增量
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    /// 文本增量
    TextDelta { text: String },
    /// 工具参数增量（本服务不处理）
    InputJsonDelta { partial_json: String },
    /// 其他增量类型
    #[serde(other)]
    Other,
}

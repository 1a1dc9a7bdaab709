//! 上游 Anthropic SSE 流解析
//!
//! 两层结构：
//! - [`SseFrameBuffer`] 处理 TCP 分片，按空行边界切出完整帧的 data 载荷
//! - [`DeltaParser`] 将 data 载荷解析为流事件，抽取文本增量并累积全文

use crate::models::anthropic::{ApiErrorBody, Delta, StreamEvent, Usage};
use tracing::{debug, warn};

/// SSE 帧缓冲
///
/// 处理三种情况：帧被拆到多个读取、一次读取包含多帧、`\r\n` 行结尾。
#[derive(Debug, Default)]
pub struct SseFrameBuffer {
    buffer: String,
}

impl SseFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一段数据，返回所有完整帧的 data 载荷
    ///
    /// 一帧内多个 `data:` 行按 SSE 约定以 `\n` 连接；
    /// `event:` 行与 `:` 注释行被跳过。
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut payloads = Vec::new();

        while let Some(boundary) = self.find_frame_boundary() {
            let frame: String = self.buffer.drain(..boundary).collect();
            if let Some(payload) = Self::extract_data(&frame) {
                payloads.push(payload);
            }
        }

        payloads
    }

    /// 查找完整帧的结束位置（空行边界）
    fn find_frame_boundary(&self) -> Option<usize> {
        if let Some(pos) = self.buffer.find("\n\n") {
            return Some(pos + 2);
        }
        if let Some(pos) = self.buffer.find("\r\n\r\n") {
            return Some(pos + 4);
        }
        None
    }

    /// 提取一帧中的 data 载荷
    fn extract_data(frame: &str) -> Option<String> {
        let mut data_lines: Vec<&str> = Vec::new();

        for line in frame.lines() {
            if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
            }
            // event: 行和注释行不携带载荷，跳过
        }

        if data_lines.is_empty() {
            None
        } else {
            Some(data_lines.join("\n"))
        }
    }
}

/// 单帧解析结果
#[derive(Debug, Clone, Default)]
pub struct ParsedDelta {
    /// 文本增量
    pub text_delta: Option<String>,
    /// 流是否已结束
    pub is_done: bool,
    /// 上游在流内报告的错误
    pub error: Option<ApiErrorBody>,
}

/// 流事件解析器
///
/// 消费 data 载荷，抽取文本增量，并累积完整内容与用量信息。
#[derive(Debug, Default)]
pub struct DeltaParser {
    full_content: String,
    usage: Option<Usage>,
}

impl DeltaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累积的完整文本
    pub fn full_content(&self) -> &str {
        &self.full_content
    }

    /// 上游报告的最终用量
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// 解析一个 data 载荷
    ///
    /// 无法解析的载荷记录 warn 后跳过，不中断流。
    pub fn parse_data(&mut self, data: &str) -> ParsedDelta {
        if data.trim().is_empty() {
            return ParsedDelta::default();
        }

        let event: StreamEvent = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                warn!("[DELTA_PARSER] 解析事件失败: {} - data: {}", e, data);
                return ParsedDelta::default();
            }
        };

        match event {
            StreamEvent::ContentBlockDelta { delta, .. } => match delta {
                Delta::TextDelta { text } => {
                    self.full_content.push_str(&text);
                    ParsedDelta {
                        text_delta: Some(text),
                        ..Default::default()
                    }
                }
                _ => ParsedDelta::default(),
            },
            StreamEvent::MessageDelta { usage } => {
                if usage.is_some() {
                    self.usage = usage;
                }
                ParsedDelta::default()
            }
            StreamEvent::MessageStop => {
                debug!("[DELTA_PARSER] 消息结束");
                ParsedDelta {
                    is_done: true,
                    ..Default::default()
                }
            }
            StreamEvent::Error { error } => {
                warn!("[DELTA_PARSER] 上游错误: {} - {}", error.kind, error.message);
                ParsedDelta {
                    error: Some(error),
                    ..Default::default()
                }
            }
            // message_start / content_block_start / content_block_stop / ping 无需处理
            _ => ParsedDelta::default(),
        }
    }
}

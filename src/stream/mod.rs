//! 流式处理层
//!
//! 提供流式数据处理能力，包括：
//! - 上游流格式解析 (anthropic_sse)
//! - 下游流格式生成 (sse)
//!
//! # 架构设计
//!
//! ```text
//! 上游字节流 ──> [SseFrameBuffer] ──> data 载荷 ──> [DeltaParser] ──> 文本增量
//! 文本增量 ──> [sse::data_event] ──> 对外 SSE 事件
//! ```

pub mod anthropic_sse;
pub mod sse;

// 重新导出核心类型
pub use anthropic_sse::{DeltaParser, ParsedDelta, SseFrameBuffer};

//! API 数据模型
//!
//! 请求/响应 DTO 定义。字段语义与前端约定保持一致。

use serde::{Deserialize, Serialize};

/// 分类请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// 待分类的文本
    pub text: String,
}

/// 翻译请求
///
/// 同时给出 `source_role` 与 `target_role` 时走手动模式，
/// 否则先分类再路由。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    /// 待翻译的文本
    pub text: String,
    /// 源角色，如 "pm", "dev"
    #[serde(default)]
    pub source_role: Option<String>,
    /// 目标角色，如 "dev", "pm"
    #[serde(default)]
    pub target_role: Option<String>,
}

/// 分类结果
///
/// 由分类器 LLM 输出的 JSON 解析而来。`category` 在线上是开放字符串，
/// 路由表只识别固定的四种类型。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// 内容类型（如 "产品需求"）
    #[serde(rename = "type")]
    pub category: String,
    /// 置信度，[0, 1]
    pub confidence: f64,
    /// 判断理由
    pub reasoning: String,
    /// 关键词列表
    #[serde(default)]
    pub keywords: Vec<String>,
    /// 建议的操作：translate / clarify / split / reject
    pub action: String,
}

impl ClassificationResult {
    /// 置信度是否在合法区间内
    pub fn confidence_in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
    }
}

/// 健康检查响应
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

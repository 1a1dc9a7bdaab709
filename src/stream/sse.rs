//! 下游 SSE 事件组帧
//!
//! 本服务对外的流式响应统一为 `data:` 事件帧。
//! 组帧规则：chunk 内的换行必须拆成同一事件内的多个连续 `data:` 行，
//! 前端用 `\n` 重新连接；事件之间以空行分隔。

/// 流结束标记
pub const END_MARKER: &str = "data: [END]\n\n";

/// 建连注释帧，强制开始流式传输
pub const CONNECTED_COMMENT: &str = ": connected\n\n";

/// 将一个 chunk 组装为一个 SSE 事件
///
/// 内部换行拆分为多个 `data:` 行，最后以空行结束事件。
pub fn data_event(chunk: &str) -> String {
    let mut event = String::with_capacity(chunk.len() + 16);
    for line in chunk.split('\n') {
        event.push_str("data: ");
        event.push_str(line);
        event.push('\n');
    }
    event.push('\n');
    event
}

/// 分类摘要事件（自动识别模式下先于翻译输出发送）
pub fn classification_event(category: &str, confidence: f64) -> String {
    format!(
        "data: [分类结果: {} (置信度: {})]\ndata: \n\n",
        category,
        format_confidence(confidence)
    )
}

/// 置信度展示格式，如 0.95 -> "95%"
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// `action == "clarify"` 时的固定引导事件序列
pub fn clarify_events() -> Vec<String> {
    vec![
        "data: [输入信息不足]\n\n".to_string(),
        "data: \n\n".to_string(),
        "data: 为了更好地帮助您，请补充：\n\n".to_string(),
        "data: 1. 如果这是产品需求，请说明：想解决什么问题？预期目标？\n\n".to_string(),
        "data: 2. 如果这是技术方案，请说明：改动背景？解决什么问题？\n\n".to_string(),
        END_MARKER.to_string(),
    ]
}

/// `action == "split"` 时的固定提示事件序列
pub fn split_topic_events() -> Vec<String> {
    vec![
        "data: [检测到多个话题]\n\n".to_string(),
        "data: \n\n".to_string(),
        "data: 建议分别讨论以下话题：\n\n".to_string(),
        "data: 请选择其中一个话题重新输入。\n\n".to_string(),
        END_MARKER.to_string(),
    ]
}

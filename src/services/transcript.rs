//! 翻译请求转录文件
//!
//! 每次翻译请求落一个独立的纯文本转录：请求元信息、完整系统提示词、
//! 完整模型输出和统计计数。只写一次，服务自身从不读回，
//! 仅用于审计与调试。

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const BANNER: &str = "================================================================================";

/// 一次翻译请求的转录内容
#[derive(Debug, Clone)]
pub struct Transcript {
    pub request_id: String,
    /// 模式标签："自动识别" / "手动选择"
    pub mode_label: &'static str,
    pub classification_type: Option<String>,
    pub classification_confidence: Option<f64>,
    pub source_role: String,
    pub target_role: String,
    pub user_input: String,
    pub system_prompt: String,
    pub output: String,
    pub chunk_count: u64,
    pub char_count: u64,
}

impl Transcript {
    /// 转录文件路径
    pub fn path(&self, logs_dir: &Path) -> PathBuf {
        logs_dir.join(format!("llm_output_{}.txt", self.request_id))
    }

    /// 渲染完整文件内容
    pub fn render(&self) -> String {
        let mut body = String::new();

        let _ = writeln!(body, "{}", BANNER);
        let _ = writeln!(body, "Request ID: {}", self.request_id);
        let _ = writeln!(body, "Mode: {}", self.mode_label);
        if let Some(category) = &self.classification_type {
            let mut line = format!("Classification Type: {}", category);
            if let Some(confidence) = self.classification_confidence {
                line.push_str(&format!(
                    " (置信度: {})",
                    crate::stream::sse::format_confidence(confidence)
                ));
            }
            let _ = writeln!(body, "{}", line);
        }
        let _ = writeln!(
            body,
            "Translation: {} → {}",
            self.source_role.to_uppercase(),
            self.target_role.to_uppercase()
        );
        let _ = writeln!(body, "User Input: {}", self.user_input);
        let _ = writeln!(body, "{}", BANNER);
        let _ = writeln!(body);
        let _ = writeln!(body, "【System Prompt】");
        let _ = writeln!(body);
        let _ = writeln!(body, "{}", self.system_prompt);
        let _ = writeln!(body);
        let _ = writeln!(body, "{}", BANNER);
        let _ = writeln!(body);
        let _ = writeln!(body, "【LLM 完整输出】");
        let _ = writeln!(body);
        let _ = writeln!(body, "{}", self.output);
        let _ = writeln!(body);
        let _ = writeln!(body, "{}", BANNER);
        let _ = writeln!(body, "【输出统计】");
        let _ = writeln!(body, "总 Chunk 数: {}", self.chunk_count);
        let _ = writeln!(body, "总字符数: {}", self.char_count);
        let _ = writeln!(body, "换行符数量: {}", self.output.matches('\n').count());
        let _ = writeln!(body, "{}", BANNER);

        body
    }

    /// 同步写入转录文件
    pub fn write_blocking(&self, logs_dir: &Path) -> std::io::Result<PathBuf> {
        let path = self.path(logs_dir);
        fs::write(&path, self.render())?;
        Ok(path)
    }
}

/// 异步落盘，best-effort
///
/// 在阻塞线程池上执行，不阻塞流式转发；失败只记日志，不影响请求结果。
pub fn spawn_write(logs_dir: &Path, transcript: Transcript) {
    let logs_dir = logs_dir.to_path_buf();
    tokio::task::spawn_blocking(move || match transcript.write_blocking(&logs_dir) {
        Ok(path) => {
            tracing::debug!("[TRANSCRIPT] 已写入: {}", path.display());
        }
        Err(e) => {
            tracing::warn!(
                "[TRANSCRIPT] 写入失败: {} - {}",
                transcript.path(&logs_dir).display(),
                e
            );
        }
    });
}

//! 配置管理
//!
//! 从环境变量读取服务配置。必需项缺失时启动失败，
//! 其余项提供默认值。

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// 应用配置
#[derive(Debug, Clone)]
pub struct Config {
    /// LLM API Key（必需）
    pub llm_api_key: String,
    /// LLM 服务地址（必需，Anthropic API 格式）
    pub llm_base_url: String,
    /// 模型标识（必需）
    pub llm_model: String,
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 调试模式（放开日志级别）
    pub debug: bool,
    /// 日志级别
    pub log_level: String,
    /// 转录文件保留天数
    pub log_retention_days: u32,
    /// CORS 允许的源（逗号分隔，或 "*"）
    pub allow_origins: String,
    /// AI Context 目录（prompts/modules）
    pub ai_context_dir: PathBuf,
    /// 日志与转录输出目录
    pub logs_dir: PathBuf,
}

impl Config {
    /// 从环境变量读取配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            llm_api_key: required("LLM_API_KEY")?,
            llm_base_url: required("LLM_BASE_URL")?,
            llm_model: required("LLM_MODEL")?,
            host: env_or("HOST", "0.0.0.0"),
            port: env_or("PORT", "8000")
                .parse()
                .context("PORT 必须是有效端口号")?,
            debug: env_or("DEBUG", "false")
                .parse()
                .context("DEBUG 必须是 true/false")?,
            log_level: env_or("LOG_LEVEL", "info"),
            log_retention_days: env_or("LOG_RETENTION_DAYS", "30")
                .parse()
                .context("LOG_RETENTION_DAYS 必须是非负整数")?,
            allow_origins: env_or("ALLOW_ORIGINS", "*"),
            ai_context_dir: PathBuf::from(env_or("AI_CONTEXT_DIR", "./ai-context")),
            logs_dir: PathBuf::from(env_or("LOGS_DIR", "./logs")),
        })
    }

    /// 校验配置是否可用
    ///
    /// 检查 prompt 目录存在，并确保日志目录已创建。
    pub fn validate(&self) -> Result<()> {
        if !self.ai_context_dir.is_dir() {
            bail!("AI Context 目录不存在: {}", self.ai_context_dir.display());
        }
        if !self.prompts_dir().is_dir() {
            bail!("Prompts 目录不存在: {}", self.prompts_dir().display());
        }
        fs::create_dir_all(&self.logs_dir)
            .with_context(|| format!("无法创建日志目录: {}", self.logs_dir.display()))?;
        Ok(())
    }

    /// Prompts 目录
    pub fn prompts_dir(&self) -> PathBuf {
        self.ai_context_dir.join("prompts")
    }

    /// Modules 目录（角色与规则片段）
    pub fn modules_dir(&self) -> PathBuf {
        self.ai_context_dir.join("modules")
    }

    /// 将 allow_origins 字符串转换为列表
    pub fn allow_origins_list(&self) -> Vec<String> {
        if self.allow_origins == "*" {
            return vec!["*".to_string()];
        }
        self.allow_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!("{} 未配置", name),
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

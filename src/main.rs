//! 服务入口
//!
//! 启动顺序：读配置 → 校验 → 初始化日志 → 清理过期日志 → 启动 HTTP 服务。
//! 必需配置缺失时直接退出。

use anyhow::Context;
use tokio::net::TcpListener;

use rolecast::config::Config;
use rolecast::logger;
use rolecast::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("配置读取失败")?;
    config.validate().context("配置验证失败，请检查配置")?;

    logger::init(&config);

    tracing::info!("Communication Translator - 启动中...");
    tracing::info!("LLM Model: {}", config.llm_model);
    tracing::info!("Server: {}:{}", config.host, config.port);
    tracing::info!("AI Context Dir: {}", config.ai_context_dir.display());

    match logger::prune_logs(&config.logs_dir, config.log_retention_days) {
        Ok(pruned) if pruned > 0 => {
            tracing::info!("[STARTUP] 清理过期日志文件: {} 个", pruned);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("[STARTUP] 清理日志文件失败: {}", e),
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config);
    let router = server::build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;

    tracing::info!("Communication Translator 启动成功");
    axum::serve(listener, router)
        .await
        .context("服务器运行失败")?;

    Ok(())
}

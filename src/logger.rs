//! 日志初始化与日志清理
//!
//! 服务日志同时写 stdout 与 logs 目录下按天分文件的日志文件。
//! 日志初始化在进程启动时由入口点显式调用一次，
//! 不使用运行期检查的全局标记。

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

/// 服务日志文件名前缀，完整文件名形如 `app.log.2026-08-27`
const SERVICE_LOG_PREFIX: &str = "app.log";

/// 按天分文件的服务日志写入器
///
/// 每条日志按写入当天的日期追加到对应文件，跨天自然滚动；
/// 打不开文件时丢弃该条，不影响 stdout 输出。
struct DailyFileWriter {
    logs_dir: PathBuf,
}

impl<'a> MakeWriter<'a> for DailyFileWriter {
    type Writer = Box<dyn io::Write>;

    fn make_writer(&'a self) -> Self::Writer {
        let path = self
            .logs_dir
            .join(service_log_name(chrono::Local::now().date_naive()));
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Box::new(file),
            Err(_) => Box::new(io::sink()),
        }
    }
}

fn service_log_name(date: NaiveDate) -> String {
    format!("{}.{}", SERVICE_LOG_PREFIX, date.format("%Y-%m-%d"))
}

/// 初始化 tracing 日志
///
/// 级别取 `RUST_LOG` 环境变量，否则用配置的 log_level；
/// debug 模式强制放开到 debug。stdout 与 logs 目录下的
/// 按天日志文件各挂一层输出。重复调用无效。
pub fn init(config: &Config) {
    let level = if config.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rolecast={level},tower_http=warn")));

    let file_writer = DailyFileWriter {
        logs_dir: config.logs_dir.clone(),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init();
}

/// 清理过期的日志文件
///
/// 删除 logs 目录下超过保留天数的转录文件（`llm_output_*.txt`）
/// 与按天滚动出的服务日志（`app.log.*`），返回删除数量。
/// 其他文件不动。
pub fn prune_logs(logs_dir: &Path, retention_days: u32) -> std::io::Result<usize> {
    let cutoff = SystemTime::now() - Duration::from_secs(u64::from(retention_days) * 86_400);
    let mut pruned = 0;

    for entry in fs::read_dir(logs_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !is_prunable(&name) {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        if modified < cutoff {
            match fs::remove_file(entry.path()) {
                Ok(()) => pruned += 1,
                Err(e) => {
                    tracing::warn!("[PRUNE] 删除失败: {} - {}", entry.path().display(), e);
                }
            }
        }
    }

    Ok(pruned)
}

fn is_prunable(name: &str) -> bool {
    (name.starts_with("llm_output_") && name.ends_with(".txt"))
        || name.starts_with("app.log.")
}

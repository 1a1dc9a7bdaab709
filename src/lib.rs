//! rolecast - 职能沟通翻译引擎
//!
//! 把职场自由文本按角色视角分类（产品 / 技术 / 运营 / 管理），
//! 再调用 LLM 做角色间的表达翻译，通过 SSE 流式返回。
//!
//! 架构：
//! - `config`: 配置管理
//! - `models`: API 与上游数据模型
//! - `providers`: 上游 LLM 客户端
//! - `stream`: 流式解析与组帧
//! - `services`: 提示词组装 / LLM 交互 / 转录
//! - `server`: HTTP 路由与处理器

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod providers;
pub mod server;
pub mod services;
pub mod stream;

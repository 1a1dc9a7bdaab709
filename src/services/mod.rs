//! 业务逻辑服务

pub mod llm_service;
pub mod skill_service;
pub mod transcript;

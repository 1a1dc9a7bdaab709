//! 数据模型

pub mod anthropic;
pub mod schemas;

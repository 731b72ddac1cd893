//! HTTP 处理器

pub mod health;
pub mod metrics;
pub mod permission;
pub mod role;

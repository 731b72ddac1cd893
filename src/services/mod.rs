//! 业务服务层

pub mod permission_service;

pub use permission_service::PermissionService;

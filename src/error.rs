//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use crate::repository::base::{IntegrityError, RepositoryError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Forbidden => "Access denied".to_string(),
            AppError::NotFound(what) => format!("Resource not found: {}", what),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = Uuid::new_v4().to_string();

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.user_message(),
                request_id,
            },
        };

        // 记录错误日志
        tracing::error!(
            code = self.code(),
            message = %self,
            request_id = %error_response.error.request_id,
            "Application error"
        );

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// RBAC 领域错误
#[derive(Debug, Error)]
pub enum RbacError {
    #[error("role not found: {0}")]
    RoleNotFound(Uuid),

    /// 写操作的目标对象不存在（对象标识为 "表:id" 的描述串）
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("role {role_id} already assigned to user {user_id}")]
    RoleAlreadyAssigned { user_id: Uuid, role_id: Uuid },

    #[error("role {role_id} is not assigned to user {user_id}")]
    RoleNotAssigned { user_id: Uuid, role_id: Uuid },

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for RbacError {
    /// 完整性违规保持独立分类，便于调用方按约束匹配。
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Integrity(e) => RbacError::Integrity(e),
            other => RbacError::Repository(other),
        }
    }
}

impl From<sqlx::Error> for RbacError {
    fn from(err: sqlx::Error) -> Self {
        RbacError::from(RepositoryError::from(err))
    }
}

impl From<RbacError> for AppError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::RoleNotFound(id) => AppError::NotFound(format!("role {}", id)),
            RbacError::ObjectNotFound(what) => AppError::NotFound(what),
            e @ RbacError::RoleAlreadyAssigned { .. } => AppError::Conflict(e.to_string()),
            e @ RbacError::RoleNotAssigned { .. } => AppError::Conflict(e.to_string()),
            RbacError::Integrity(e) => {
                tracing::warn!(error = %e, "Integrity violation surfaced to API");
                AppError::Conflict("request conflicts with existing data".to_string())
            }
            RbacError::Repository(RepositoryError::Database(e)) => AppError::Database(e),
            RbacError::Repository(e) => {
                tracing::error!(error = %e, "Unexpected repository error");
                AppError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::Forbidden.code(), 403);
        assert_eq!(AppError::NotFound("role".to_string()).code(), 404);
        assert_eq!(AppError::BadRequest("test".to_string()).code(), 400);
        assert_eq!(AppError::Conflict("dup".to_string()).code(), 409);
    }

    #[test]
    fn test_user_message_no_sensitive_info() {
        let error = AppError::Database(sqlx::Error::RowNotFound);
        let message = error.user_message();
        assert_eq!(message, "Database error occurred");
        assert!(!message.contains("sqlx"));
    }

    #[test]
    fn test_rbac_error_mapping() {
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();

        let err: AppError = RbacError::RoleNotFound(role_id).into();
        assert_eq!(err.code(), 404);

        let err: AppError = RbacError::RoleAlreadyAssigned { user_id, role_id }.into();
        assert_eq!(err.code(), 409);

        let err: AppError = RbacError::RoleNotAssigned { user_id, role_id }.into();
        assert_eq!(err.code(), 409);
    }
}

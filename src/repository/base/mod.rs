//! 通用仓储基础层：条件、分页、查询/创建/更新/删除执行器

pub mod condition;
pub mod creator;
pub mod integrity;
pub mod pagination;
pub mod purger;
pub mod querier;
pub mod updater;

pub use condition::{combine_or, negate, QueryCondition, QueryOrder};
pub use creator::{execute_creator, execute_creator_if_absent, Creator, CreatorSpec};
pub use integrity::{
    match_integrity_error, parse_integrity_error, IntegrityError, IntegrityErrorCheck,
    IntegrityKind,
};
pub use pagination::{
    CursorBackwardPagination, CursorForwardPagination, OffsetPagination, PageInfo, Pagination,
};
pub use purger::{execute_batch_purger, execute_purger, BatchPurger, Purger};
pub use querier::{execute_batch_querier, BatchQuerier, BatchQueryResult};
pub use updater::{
    execute_batch_updater, execute_updater, BatchUpdater, Updater, UpdaterSpec,
};

use thiserror::Error;

/// 行类型与其所在表的静态绑定。
pub trait TableRow {
    const TABLE: &'static str;
    const PK: &'static str = "id";
}

/// 仓储层错误：完整性违规单独分类，其余数据库错误原样携带。
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    /// 数据库报告的完整性类错误在进入仓储层时就地分类。
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let code = db_err.code();
            let parsed = parse_integrity_error(
                code.as_deref(),
                db_err.message(),
                db_err.constraint(),
                db_err.table(),
            );
            if parsed.kind != IntegrityKind::Unclassified {
                return RepositoryError::Integrity(parsed);
            }
        }
        RepositoryError::Database(err)
    }
}

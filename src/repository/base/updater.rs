//! 通用更新器：按主键的单行更新与按条件的批量更新

use super::condition::QueryCondition;
use super::{RepositoryError, TableRow};
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

/// 更新规格：声明 SET 子句的各项。
///
/// 每一项用 `set.push("col = ").push_bind_unseparated(value)` 写入，
/// 项与项之间由 Separated 自动加逗号。
pub trait UpdaterSpec: Send + Sync {
    type Row: TableRow + for<'r> FromRow<'r, PgRow> + Send + Unpin;

    fn push_set(&self, set: &mut Separated<'_, '_, Postgres, &'static str>);
}

/// 按主键更新单行。
pub struct Updater<S: UpdaterSpec> {
    pub spec: S,
    pub pk_value: Uuid,
}

impl<S: UpdaterSpec> Updater<S> {
    pub fn new(spec: S, pk_value: Uuid) -> Self {
        Self { spec, pk_value }
    }
}

/// UPDATE {table} SET ... WHERE {pk} = $n RETURNING *
///
/// 目标行不存在时返回 None，由调用方翻译为领域错误。
pub async fn execute_updater<S: UpdaterSpec>(
    conn: &mut PgConnection,
    updater: &Updater<S>,
) -> Result<Option<S::Row>, RepositoryError> {
    let mut builder = QueryBuilder::new("UPDATE ");
    builder.push(S::Row::TABLE);
    builder.push(" SET ");
    let mut set = builder.separated(", ");
    updater.spec.push_set(&mut set);
    builder.push(" WHERE ");
    builder.push(S::Row::PK);
    builder.push(" = ");
    builder.push_bind(updater.pk_value);
    builder.push(" RETURNING *");

    let row = builder
        .build_query_as::<S::Row>()
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// 按条件批量更新。
pub struct BatchUpdater<S: UpdaterSpec> {
    pub spec: S,
    pub conditions: Vec<QueryCondition>,
}

impl<S: UpdaterSpec> BatchUpdater<S> {
    pub fn new(spec: S, conditions: Vec<QueryCondition>) -> Self {
        Self { spec, conditions }
    }
}

/// UPDATE {table} SET ... [WHERE 条件]，返回影响行数。
pub async fn execute_batch_updater<S: UpdaterSpec>(
    conn: &mut PgConnection,
    updater: &BatchUpdater<S>,
) -> Result<u64, RepositoryError> {
    let mut builder = QueryBuilder::new("UPDATE ");
    builder.push(S::Row::TABLE);
    builder.push(" SET ");
    let mut set = builder.separated(", ");
    updater.spec.push_set(&mut set);
    for (i, cond) in updater.conditions.iter().enumerate() {
        builder.push(if i == 0 { " WHERE (" } else { " AND (" });
        cond.apply(&mut builder);
        builder.push(")");
    }

    let result = builder.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

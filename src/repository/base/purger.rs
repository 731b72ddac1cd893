//! 通用物理删除器

use super::condition::QueryCondition;
use super::{RepositoryError, TableRow};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, QueryBuilder};
use std::marker::PhantomData;
use uuid::Uuid;

/// 按主键物理删除单行。
pub struct Purger<R: TableRow> {
    pub pk_value: Uuid,
    _row: PhantomData<R>,
}

impl<R: TableRow> Purger<R> {
    pub fn new(pk_value: Uuid) -> Self {
        Self {
            pk_value,
            _row: PhantomData,
        }
    }
}

/// DELETE FROM {table} WHERE {pk} = $1 RETURNING *
///
/// 目标行不存在时返回 None。
pub async fn execute_purger<R>(
    conn: &mut PgConnection,
    purger: &Purger<R>,
) -> Result<Option<R>, RepositoryError>
where
    R: TableRow + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut builder = QueryBuilder::new("DELETE FROM ");
    builder.push(R::TABLE);
    builder.push(" WHERE ");
    builder.push(R::PK);
    builder.push(" = ");
    builder.push_bind(purger.pk_value);
    builder.push(" RETURNING *");

    let row = builder
        .build_query_as::<R>()
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// 按条件批量物理删除。级联清理子表时使用。
pub struct BatchPurger<R: TableRow> {
    pub conditions: Vec<QueryCondition>,
    _row: PhantomData<R>,
}

impl<R: TableRow> BatchPurger<R> {
    pub fn new(conditions: Vec<QueryCondition>) -> Self {
        Self {
            conditions,
            _row: PhantomData,
        }
    }
}

/// DELETE FROM {table} [WHERE 条件]，返回删除行数。
pub async fn execute_batch_purger<R: TableRow>(
    conn: &mut PgConnection,
    purger: &BatchPurger<R>,
) -> Result<u64, RepositoryError> {
    let mut builder = QueryBuilder::new("DELETE FROM ");
    builder.push(R::TABLE);
    for (i, cond) in purger.conditions.iter().enumerate() {
        builder.push(if i == 0 { " WHERE (" } else { " AND (" });
        cond.apply(&mut builder);
        builder.push(")");
    }

    let result = builder.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

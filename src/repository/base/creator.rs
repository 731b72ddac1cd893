//! 通用单行创建器：规格描述列与值，执行器负责 SQL 组装

use super::{RepositoryError, TableRow};
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};

/// 创建规格：声明插入哪些列，以及怎样把值绑定进去。
pub trait CreatorSpec: Send + Sync {
    type Row: TableRow + for<'r> FromRow<'r, PgRow> + Send + Unpin;

    fn columns(&self) -> &'static [&'static str];

    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>);
}

/// 持有规格的创建器。规格描述「插入什么」，执行在 execute_creator。
pub struct Creator<S: CreatorSpec> {
    pub spec: S,
}

impl<S: CreatorSpec> Creator<S> {
    pub fn new(spec: S) -> Self {
        Self { spec }
    }
}

fn build_insert<S: CreatorSpec>(creator: &Creator<S>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("INSERT INTO ");
    builder.push(S::Row::TABLE);
    builder.push(" (");
    builder.push(creator.spec.columns().join(", "));
    builder.push(") VALUES (");
    let mut values = builder.separated(", ");
    creator.spec.push_values(&mut values);
    builder.push(")");
    builder
}

/// INSERT INTO {table} (cols) VALUES (...) RETURNING *
pub async fn execute_creator<S: CreatorSpec>(
    conn: &mut PgConnection,
    creator: &Creator<S>,
) -> Result<S::Row, RepositoryError> {
    let mut builder = build_insert(creator);
    builder.push(" RETURNING *");

    let row = builder
        .build_query_as::<S::Row>()
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

/// 与 execute_creator 相同，但冲突行不报错也不中止事务：
/// ON CONFLICT DO NOTHING，已存在时返回 None。
pub async fn execute_creator_if_absent<S: CreatorSpec>(
    conn: &mut PgConnection,
    creator: &Creator<S>,
) -> Result<Option<S::Row>, RepositoryError> {
    let mut builder = build_insert(creator);
    builder.push(" ON CONFLICT DO NOTHING RETURNING *");

    let row = builder
        .build_query_as::<S::Row>()
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

//! 批量查询执行器：条件 + 排序 + 分页的统一 SQL 组装

use super::condition::{QueryCondition, QueryOrder};
use super::pagination::{PageInfo, Pagination};
use super::RepositoryError;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder, Row};

/// 一次批量查询的完整描述。基础查询由调用方提供，这里只负责包装。
pub struct BatchQuerier {
    pub conditions: Vec<QueryCondition>,
    pub orders: Vec<QueryOrder>,
    pub pagination: Pagination,
}

pub struct BatchQueryResult<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page_info: PageInfo,
}

/// 把条件用 AND 连接进 WHERE 子句。
fn push_where(builder: &mut QueryBuilder<'_, Postgres>, conditions: &[QueryCondition]) {
    for (i, cond) in conditions.iter().enumerate() {
        builder.push(if i == 0 { " WHERE (" } else { " AND (" });
        cond.apply(builder);
        builder.push(")");
    }
}

/// 组装最终 SQL：
///
/// ```text
/// SELECT _filtered.* [, COUNT(*) OVER() AS _total_count]
/// FROM ( {base} [WHERE 条件] ) AS _filtered
/// [WHERE 游标条件] [ORDER BY ...] LIMIT ... [OFFSET ...]
/// ```
///
/// 过滤条件在子查询内（可引用基础查询的表别名），游标条件与排序
/// 在子查询外（只能引用投影列）。
fn build_batch_query(base_query: &str, querier: &BatchQuerier) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT _filtered.*");
    if querier.pagination.uses_window_function() {
        builder.push(", COUNT(*) OVER() AS _total_count");
    }
    builder.push(" FROM (");
    builder.push(base_query);
    push_where(&mut builder, &querier.conditions);
    builder.push(") AS _filtered");
    querier.pagination.apply(&mut builder, &querier.orders);
    builder
}

/// 游标分页的总数查询。天然不含游标位置条件：总数是整个过滤集的大小。
fn build_count_query(base_query: &str, conditions: &[QueryCondition]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM (");
    builder.push(base_query);
    push_where(&mut builder, conditions);
    builder.push(") AS _filtered");
    builder
}

/// 执行批量查询并返回行、总数与页信息。
pub async fn execute_batch_querier<T>(
    conn: &mut PgConnection,
    base_query: &str,
    querier: &BatchQuerier,
) -> Result<BatchQueryResult<T>, RepositoryError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut builder = build_batch_query(base_query, querier);
    let raw_rows: Vec<PgRow> = builder.build().fetch_all(&mut *conn).await?;

    // 窗口计数只有在取到行时才可读；空页（偏移越界）退回独立计数查询。
    let total_count = match raw_rows.first() {
        Some(row) if querier.pagination.uses_window_function() => {
            row.try_get::<i64, _>("_total_count")?
        }
        _ => {
            let mut count_builder = build_count_query(base_query, &querier.conditions);
            count_builder
                .build_query_scalar::<i64>()
                .fetch_one(&mut *conn)
                .await?
        }
    };

    let mut items = Vec::with_capacity(raw_rows.len());
    for row in &raw_rows {
        items.push(T::from_row(row)?);
    }

    let (kept, page_info) = querier.pagination.compute_page_info(items.len(), total_count);
    items.truncate(kept);

    Ok(BatchQueryResult {
        items,
        total_count,
        page_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::base::pagination::{
        CursorForwardPagination, OffsetPagination,
    };

    fn name_condition() -> QueryCondition {
        QueryCondition::new(|b| {
            b.push("r.name ILIKE ");
            b.push_bind("%admin%".to_string());
        })
    }

    #[test]
    fn offset_query_injects_window_count() {
        let querier = BatchQuerier {
            conditions: vec![name_condition()],
            orders: vec![QueryOrder::asc("name")],
            pagination: Pagination::Offset(OffsetPagination { limit: 10, offset: 0 }),
        };
        let sql = build_batch_query("SELECT r.id, r.name FROM roles r", &querier).into_sql();
        assert_eq!(
            sql,
            "SELECT _filtered.*, COUNT(*) OVER() AS _total_count \
             FROM (SELECT r.id, r.name FROM roles r WHERE (r.name ILIKE $1)) AS _filtered \
             ORDER BY name ASC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn cursor_query_has_no_window_count() {
        let querier = BatchQuerier {
            conditions: vec![],
            orders: vec![],
            pagination: Pagination::CursorForward(CursorForwardPagination {
                first: 5,
                cursor_order: QueryOrder::asc("created_at"),
                cursor_condition: Some(QueryCondition::new(|b| {
                    b.push("created_at > ");
                    b.push_bind("2026-01-01".to_string());
                })),
            }),
        };
        let sql = build_batch_query("SELECT r.id FROM roles r", &querier).into_sql();
        assert_eq!(
            sql,
            "SELECT _filtered.* FROM (SELECT r.id FROM roles r) AS _filtered \
             WHERE created_at > $1 ORDER BY created_at ASC LIMIT $2"
        );
    }

    #[test]
    fn multiple_conditions_joined_with_and() {
        let querier = BatchQuerier {
            conditions: vec![name_condition(), name_condition()],
            orders: vec![],
            pagination: Pagination::Offset(OffsetPagination { limit: 1, offset: 0 }),
        };
        let sql = build_batch_query("SELECT r.id FROM roles r", &querier).into_sql();
        assert!(sql.contains("WHERE (r.name ILIKE $1) AND (r.name ILIKE $2)"));
    }

    #[test]
    fn count_query_excludes_cursor_position() {
        let sql = build_count_query("SELECT r.id FROM roles r", &[name_condition()]).into_sql();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM (SELECT r.id FROM roles r WHERE (r.name ILIKE $1)) AS _filtered"
        );
    }
}

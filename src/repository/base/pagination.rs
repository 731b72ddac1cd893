//! 分页模型：偏移分页与游标分页

use super::condition::{QueryCondition, QueryOrder};
use sqlx::{Postgres, QueryBuilder};

/// 偏移分页。总数通过 COUNT(*) OVER() 窗口列随行返回。
#[derive(Debug)]
pub struct OffsetPagination {
    pub limit: i64,
    pub offset: i64,
}

/// 向前游标分页：取游标之后的 first 条，多取一条探测下一页。
pub struct CursorForwardPagination {
    pub first: i64,
    /// 游标列的排序，放在用户排序之前以保证游标语义
    pub cursor_order: QueryOrder,
    /// 游标位置条件；第一页为 None
    pub cursor_condition: Option<QueryCondition>,
}

/// 向后游标分页：取游标之前的 last 条。
pub struct CursorBackwardPagination {
    pub last: i64,
    pub cursor_order: QueryOrder,
    pub cursor_condition: Option<QueryCondition>,
}

/// 分页方式。闭集：执行器对每种方式做穷尽匹配。
pub enum Pagination {
    Offset(OffsetPagination),
    CursorForward(CursorForwardPagination),
    CursorBackward(CursorBackwardPagination),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    /// 偏移分页用窗口函数随行取总数；游标分页需要单独的 COUNT 查询。
    pub fn uses_window_function(&self) -> bool {
        matches!(self, Pagination::Offset(_))
    }

    /// 把游标条件、ORDER BY 与 LIMIT/OFFSET 写到包装子查询之外。
    /// `orders` 是调用方的排序，游标排序永远排在它们前面。
    pub fn apply(&self, builder: &mut QueryBuilder<'_, Postgres>, orders: &[QueryOrder]) {
        let cursor = match self {
            Pagination::Offset(_) => None,
            Pagination::CursorForward(p) => Some((&p.cursor_order, p.cursor_condition.as_ref())),
            Pagination::CursorBackward(p) => Some((&p.cursor_order, p.cursor_condition.as_ref())),
        };

        if let Some((_, Some(condition))) = cursor {
            builder.push(" WHERE ");
            condition.apply(builder);
        }

        let mut order_exprs: Vec<&QueryOrder> = Vec::new();
        if let Some((cursor_order, _)) = cursor {
            order_exprs.push(cursor_order);
        }
        order_exprs.extend(orders.iter());
        if !order_exprs.is_empty() {
            builder.push(" ORDER BY ");
            for (i, order) in order_exprs.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                order.push_to(builder);
            }
        }

        match self {
            Pagination::Offset(p) => {
                builder.push(" LIMIT ");
                builder.push_bind(p.limit);
                builder.push(" OFFSET ");
                builder.push_bind(p.offset);
            }
            // 多取一条用于判断是否还有下一页/上一页
            Pagination::CursorForward(p) => {
                builder.push(" LIMIT ");
                builder.push_bind(p.first + 1);
            }
            Pagination::CursorBackward(p) => {
                builder.push(" LIMIT ");
                builder.push_bind(p.last + 1);
            }
        }
    }

    /// 根据取回行数与总数计算应保留的行数与页信息。纯函数，便于单测。
    pub fn compute_page_info(&self, fetched: usize, total: i64) -> (usize, PageInfo) {
        match self {
            Pagination::Offset(p) => {
                let kept = fetched;
                let info = PageInfo {
                    has_previous_page: p.offset > 0,
                    has_next_page: p.offset + (fetched as i64) < total,
                };
                (kept, info)
            }
            Pagination::CursorForward(p) => {
                let first = p.first as usize;
                let kept = fetched.min(first);
                let info = PageInfo {
                    has_next_page: fetched > first,
                    has_previous_page: p.cursor_condition.is_some(),
                };
                (kept, info)
            }
            Pagination::CursorBackward(p) => {
                let last = p.last as usize;
                let kept = fetched.min(last);
                let info = PageInfo {
                    has_previous_page: fetched > last,
                    has_next_page: p.cursor_condition.is_some(),
                };
                (kept, info)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(limit: i64, offset: i64) -> Pagination {
        Pagination::Offset(OffsetPagination { limit, offset })
    }

    fn forward(first: i64, with_cursor: bool) -> Pagination {
        Pagination::CursorForward(CursorForwardPagination {
            first,
            cursor_order: QueryOrder::asc("created_at"),
            cursor_condition: with_cursor.then(|| {
                QueryCondition::new(|b| {
                    b.push("created_at > ");
                    b.push_bind("2026-01-01".to_string());
                })
            }),
        })
    }

    fn backward(last: i64, with_cursor: bool) -> Pagination {
        Pagination::CursorBackward(CursorBackwardPagination {
            last,
            cursor_order: QueryOrder::desc("created_at"),
            cursor_condition: with_cursor.then(|| {
                QueryCondition::new(|b| {
                    b.push("created_at < ");
                    b.push_bind("2026-01-01".to_string());
                })
            }),
        })
    }

    #[test]
    fn offset_uses_window_function() {
        assert!(offset(10, 0).uses_window_function());
        assert!(!forward(10, false).uses_window_function());
        assert!(!backward(10, false).uses_window_function());
    }

    #[test]
    fn offset_apply_renders_limit_offset() {
        let mut builder = QueryBuilder::new("SELECT * FROM t");
        offset(10, 20).apply(&mut builder, &[QueryOrder::asc("name")]);
        assert_eq!(
            builder.into_sql(),
            "SELECT * FROM t ORDER BY name ASC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn forward_apply_renders_cursor_and_lookahead() {
        let mut builder = QueryBuilder::new("SELECT * FROM t");
        forward(10, true).apply(&mut builder, &[QueryOrder::asc("name")]);
        assert_eq!(
            builder.into_sql(),
            "SELECT * FROM t WHERE created_at > $1 ORDER BY created_at ASC, name ASC LIMIT $2"
        );
    }

    #[test]
    fn forward_first_page_has_no_where() {
        let mut builder = QueryBuilder::new("SELECT * FROM t");
        forward(10, false).apply(&mut builder, &[]);
        assert_eq!(
            builder.into_sql(),
            "SELECT * FROM t ORDER BY created_at ASC LIMIT $1"
        );
    }

    #[test]
    fn offset_page_info_middle_page() {
        let (kept, info) = offset(10, 10).compute_page_info(10, 30);
        assert_eq!(kept, 10);
        assert!(info.has_previous_page);
        assert!(info.has_next_page);
    }

    #[test]
    fn offset_page_info_first_and_last() {
        let (_, first) = offset(10, 0).compute_page_info(10, 30);
        assert!(!first.has_previous_page);
        assert!(first.has_next_page);

        let (_, last) = offset(10, 20).compute_page_info(10, 30);
        assert!(last.has_previous_page);
        assert!(!last.has_next_page);
    }

    #[test]
    fn offset_page_info_empty_result() {
        let (kept, info) = offset(10, 0).compute_page_info(0, 0);
        assert_eq!(kept, 0);
        assert!(!info.has_next_page);
        assert!(!info.has_previous_page);
    }

    #[test]
    fn forward_page_info_lookahead_row_trimmed() {
        let pagination = forward(10, false);
        let (kept, info) = pagination.compute_page_info(11, 30);
        assert_eq!(kept, 10);
        assert!(info.has_next_page);
        assert!(!info.has_previous_page);
    }

    #[test]
    fn forward_page_info_exact_page_has_no_next() {
        let (kept, info) = forward(10, true).compute_page_info(10, 30);
        assert_eq!(kept, 10);
        assert!(!info.has_next_page);
        assert!(info.has_previous_page);
    }

    #[test]
    fn backward_page_info_mirrors_forward() {
        let (kept, info) = backward(5, true).compute_page_info(6, 30);
        assert_eq!(kept, 5);
        assert!(info.has_previous_page);
        assert!(info.has_next_page);
    }
}

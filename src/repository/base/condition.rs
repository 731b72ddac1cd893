//! 延迟绑定的查询条件与排序

use sqlx::{Postgres, QueryBuilder};
use std::borrow::Cow;

/// 查询条件：一个把自身写入 QueryBuilder 的闭包。
///
/// 条件在构造时捕获拥有的值，执行时才通过 push_bind 写入参数，
/// 因此可以在没有连接的情况下组装、组合、传递。
pub struct QueryCondition {
    apply: Box<dyn for<'a> Fn(&mut QueryBuilder<'a, Postgres>) + Send + Sync>,
}

impl QueryCondition {
    pub fn new<F>(apply: F) -> Self
    where
        F: for<'a> Fn(&mut QueryBuilder<'a, Postgres>) + Send + Sync + 'static,
    {
        Self {
            apply: Box::new(apply),
        }
    }

    pub fn apply(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        (self.apply)(builder);
    }
}

impl std::fmt::Debug for QueryCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("QueryCondition")
    }
}

/// 用 OR 连接一组条件。空列表产生恒假条件（与空 OR 的数学语义一致）。
pub fn combine_or(conditions: Vec<QueryCondition>) -> QueryCondition {
    QueryCondition::new(move |builder| {
        if conditions.is_empty() {
            builder.push("FALSE");
            return;
        }
        for (i, cond) in conditions.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder.push("(");
            cond.apply(builder);
            builder.push(")");
        }
    })
}

/// 对条件取反。
pub fn negate(condition: QueryCondition) -> QueryCondition {
    QueryCondition::new(move |builder| {
        builder.push("NOT (");
        condition.apply(builder);
        builder.push(")");
    })
}

/// 排序项：列表达式 + 方向。
#[derive(Debug, Clone)]
pub struct QueryOrder {
    expr: Cow<'static, str>,
    ascending: bool,
}

impl QueryOrder {
    pub fn asc(expr: impl Into<Cow<'static, str>>) -> Self {
        Self {
            expr: expr.into(),
            ascending: true,
        }
    }

    pub fn desc(expr: impl Into<Cow<'static, str>>) -> Self {
        Self {
            expr: expr.into(),
            ascending: false,
        }
    }

    pub fn push_to(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(self.expr.as_ref());
        builder.push(if self.ascending { " ASC" } else { " DESC" });
    }
}

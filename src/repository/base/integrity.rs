//! Postgres 完整性错误的分类与匹配

use thiserror::Error;

/// 完整性违规的种类。SQLSTATE 23 类加排他约束。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityKind {
    UniqueViolation,
    ForeignKeyViolation,
    CheckViolation,
    NotNullViolation,
    ExclusionViolation,
    Unclassified,
}

/// 分类后的完整性错误。constraint/table 来自驱动报告，可能缺失。
#[derive(Debug, Clone, Error)]
#[error("integrity violation ({kind:?}) on {table:?} constraint {constraint:?}: {message}")]
pub struct IntegrityError {
    pub kind: IntegrityKind,
    pub constraint: Option<String>,
    pub table: Option<String>,
    pub message: String,
}

/// 按 SQLSTATE 分类；无码或未知码时退回到消息关键字。
pub fn parse_integrity_error(
    code: Option<&str>,
    message: &str,
    constraint: Option<&str>,
    table: Option<&str>,
) -> IntegrityError {
    let kind = match code {
        Some("23505") => IntegrityKind::UniqueViolation,
        Some("23503") => IntegrityKind::ForeignKeyViolation,
        Some("23514") => IntegrityKind::CheckViolation,
        Some("23502") => IntegrityKind::NotNullViolation,
        Some("23P01") => IntegrityKind::ExclusionViolation,
        _ => classify_by_message(message),
    };
    IntegrityError {
        kind,
        constraint: constraint.map(str::to_owned),
        table: table.map(str::to_owned),
        message: message.to_owned(),
    }
}

fn classify_by_message(message: &str) -> IntegrityKind {
    let lower = message.to_lowercase();
    if lower.contains("unique constraint") || lower.contains("duplicate key") {
        IntegrityKind::UniqueViolation
    } else if lower.contains("foreign key") {
        IntegrityKind::ForeignKeyViolation
    } else if lower.contains("check constraint") {
        IntegrityKind::CheckViolation
    } else if lower.contains("not-null") || lower.contains("null value") {
        IntegrityKind::NotNullViolation
    } else if lower.contains("exclusion constraint") {
        IntegrityKind::ExclusionViolation
    } else {
        IntegrityKind::Unclassified
    }
}

/// 一条匹配规则：种类（必须相同）+ 可选的约束名 + 命中时返回的领域错误。
pub struct IntegrityErrorCheck<E> {
    pub kind: IntegrityKind,
    pub constraint: Option<&'static str>,
    pub error: E,
}

/// 依次尝试各规则，第一条命中者胜出；都不中则原样返回完整性错误。
pub fn match_integrity_error<E>(
    err: IntegrityError,
    checks: Vec<IntegrityErrorCheck<E>>,
) -> Result<E, IntegrityError> {
    for check in checks {
        if check.kind != err.kind {
            continue;
        }
        if let Some(expected) = check.constraint {
            if err.constraint.as_deref() != Some(expected) {
                continue;
            }
        }
        return Ok(check.error);
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlstate_takes_precedence_over_message() {
        let err = parse_integrity_error(
            Some("23503"),
            "duplicate key value violates unique constraint",
            None,
            None,
        );
        assert_eq!(err.kind, IntegrityKind::ForeignKeyViolation);
    }

    #[test]
    fn keyword_fallback_without_code() {
        let cases = [
            ("duplicate key value", IntegrityKind::UniqueViolation),
            ("violates foreign key constraint", IntegrityKind::ForeignKeyViolation),
            ("violates check constraint \"ck_x\"", IntegrityKind::CheckViolation),
            ("null value in column \"name\"", IntegrityKind::NotNullViolation),
            (
                "conflicting key value violates exclusion constraint",
                IntegrityKind::ExclusionViolation,
            ),
            ("something else entirely", IntegrityKind::Unclassified),
        ];
        for (message, expected) in cases {
            assert_eq!(parse_integrity_error(None, message, None, None).kind, expected);
        }
    }

    #[test]
    fn keyword_fallback_is_case_insensitive() {
        let err = parse_integrity_error(None, "DUPLICATE KEY value", None, None);
        assert_eq!(err.kind, IntegrityKind::UniqueViolation);
    }

    #[test]
    fn match_requires_same_kind_and_constraint() {
        let err = parse_integrity_error(
            Some("23505"),
            "duplicate key",
            Some("uq_user_roles_user_id_role_id"),
            Some("user_roles"),
        );
        let result = match_integrity_error(
            err,
            vec![
                IntegrityErrorCheck {
                    kind: IntegrityKind::ForeignKeyViolation,
                    constraint: None,
                    error: "fk",
                },
                IntegrityErrorCheck {
                    kind: IntegrityKind::UniqueViolation,
                    constraint: Some("uq_user_roles_user_id_role_id"),
                    error: "already_assigned",
                },
            ],
        );
        assert_eq!(result.ok(), Some("already_assigned"));
    }

    #[test]
    fn unmatched_error_is_returned_unchanged() {
        let err = parse_integrity_error(Some("23514"), "check failed", Some("ck_x"), None);
        let result = match_integrity_error::<&str>(
            err,
            vec![IntegrityErrorCheck {
                kind: IntegrityKind::UniqueViolation,
                constraint: None,
                error: "dup",
            }],
        );
        let err = result.err();
        assert!(err.is_some());
        assert_eq!(err.map(|e| e.kind), Some(IntegrityKind::CheckViolation));
    }

    #[test]
    fn constraint_none_matches_any_constraint() {
        let err = parse_integrity_error(Some("23505"), "duplicate key", Some("uq_whatever"), None);
        let result = match_integrity_error(
            err,
            vec![IntegrityErrorCheck {
                kind: IntegrityKind::UniqueViolation,
                constraint: None,
                error: "dup",
            }],
        );
        assert_eq!(result.ok(), Some("dup"));
    }
}

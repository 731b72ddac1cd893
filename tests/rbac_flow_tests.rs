//! 角色生命周期与分配的集成测试
//! 需要 TEST_DATABASE_URL 指向可用的 Postgres；未设置时跳过。

use serial_test::serial;
use strata_manager::error::RbacError;
use strata_manager::rbac::{
    EntityType, ObjectId, ObjectPermissionInput, OperationType, PermissionGroupInput,
    PermissionInput, PermissionStatus, RoleCreateInput, RolePermissionsUpdateInput, RoleSource,
    RoleStatus, ScopeId, ScopeType, ScopedPermissionInput, UserRoleAssignmentInput,
    UserRoleRevocationInput,
};
use strata_manager::repository::base::{BatchQuerier, OffsetPagination, Pagination};
use strata_manager::repository::permission::{
    ObjectPermissionConditions, PermissionConditions,
};
use strata_manager::repository::PermissionControllerRepository;
use uuid::Uuid;

mod common;

fn viewer_role_input(name: &str) -> RoleCreateInput {
    RoleCreateInput {
        name: name.to_string(),
        source: RoleSource::Custom,
        status: RoleStatus::Active,
        description: Some("read-only access".to_string()),
        permission_groups: vec![PermissionGroupInput {
            scope_id: ScopeId::new(ScopeType::Project, "proj-1"),
            permissions: vec![
                PermissionInput {
                    entity_type: EntityType::Session,
                    operation: OperationType::Read,
                },
                PermissionInput {
                    entity_type: EntityType::Vfolder,
                    operation: OperationType::Read,
                },
            ],
        }],
        object_permissions: vec![ObjectPermissionInput {
            object_id: ObjectId::new(EntityType::Session, "sess-special"),
            operation: OperationType::Update,
            status: PermissionStatus::Active,
        }],
    }
}

#[tokio::test]
#[serial]
async fn test_create_role_with_nested_permissions() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db);

    let role = repo.create_role(viewer_role_input("viewer")).await.unwrap();

    assert_eq!(role.role.name, "viewer");
    assert_eq!(role.role.status, RoleStatus::Active);
    assert_eq!(role.permission_groups.len(), 1);
    assert_eq!(role.permission_groups[0].permissions.len(), 2);
    assert_eq!(
        role.permission_groups[0].scope_id,
        ScopeId::new(ScopeType::Project, "proj-1")
    );
    assert_eq!(role.object_permissions.len(), 1);

    // 再读一遍应与创建结果一致
    let fetched = repo.get_role_with_permissions(role.role.id).await.unwrap();
    assert_eq!(fetched.role.id, role.role.id);
    assert_eq!(fetched.permission_groups.len(), 1);
    assert_eq!(fetched.object_permissions.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_create_role_rolls_back_on_duplicate_group() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db.clone());

    let mut input = viewer_role_input("atomic");
    // 同一范围出现两次，第二个权限组违反唯一约束
    let duplicate_group = input.permission_groups[0].clone();
    input.permission_groups.push(duplicate_group);

    let result = repo.create_role(input).await;
    assert!(result.is_err());

    // 角色行不应残留
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE name = 'atomic'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[serial]
async fn test_update_role_permissions_creates_groups_on_demand() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db);

    let role = repo.create_role(viewer_role_input("editor")).await.unwrap();

    // 已有范围复用既有组，新范围按需建组
    let updated = repo
        .update_role_permissions(
            role.role.id,
            RolePermissionsUpdateInput {
                add_scoped_permissions: vec![
                    ScopedPermissionInput {
                        scope_id: ScopeId::new(ScopeType::Project, "proj-1"),
                        entity_type: EntityType::Session,
                        operation: OperationType::Update,
                    },
                    ScopedPermissionInput {
                        scope_id: ScopeId::new(ScopeType::Domain, "dom-1"),
                        entity_type: EntityType::Image,
                        operation: OperationType::Read,
                    },
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.permission_groups.len(), 2);
    let proj_group = updated
        .permission_groups
        .iter()
        .find(|g| g.scope_id == ScopeId::new(ScopeType::Project, "proj-1"))
        .unwrap();
    assert_eq!(proj_group.permissions.len(), 3);
    assert_eq!(proj_group.id, role.permission_groups[0].id);
}

#[tokio::test]
#[serial]
async fn test_update_role_permissions_is_idempotent_for_duplicates() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db);

    let role = repo.create_role(viewer_role_input("idem")).await.unwrap();

    // 重复添加已存在的授权不报错也不产生重复行，
    // 且同一事务内跟在后面的新增照常生效
    let updated = repo
        .update_role_permissions(
            role.role.id,
            RolePermissionsUpdateInput {
                add_scoped_permissions: vec![
                    ScopedPermissionInput {
                        scope_id: ScopeId::new(ScopeType::Project, "proj-1"),
                        entity_type: EntityType::Session,
                        operation: OperationType::Read,
                    },
                    ScopedPermissionInput {
                        scope_id: ScopeId::new(ScopeType::Project, "proj-1"),
                        entity_type: EntityType::Image,
                        operation: OperationType::Read,
                    },
                ],
                add_object_permissions: vec![ObjectPermissionInput {
                    object_id: ObjectId::new(EntityType::Session, "sess-special"),
                    operation: OperationType::Update,
                    status: PermissionStatus::Active,
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.permission_groups.len(), 1);
    assert_eq!(updated.permission_groups[0].permissions.len(), 3);
    assert_eq!(updated.object_permissions.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_update_role_permissions_removes_entries() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db);

    let role = repo.create_role(viewer_role_input("trimmed")).await.unwrap();
    let removable = role.permission_groups[0].permissions[0].id;
    let removable_object = role.object_permissions[0].id;

    let updated = repo
        .update_role_permissions(
            role.role.id,
            RolePermissionsUpdateInput {
                remove_scoped_permission_ids: vec![removable],
                remove_object_permission_ids: vec![removable_object],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.permission_groups[0].permissions.len(), 1);
    assert!(updated.object_permissions.is_empty());
}

#[tokio::test]
#[serial]
async fn test_update_missing_role_reports_object_not_found() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db);

    let result = repo
        .update_role_permissions(Uuid::new_v4(), RolePermissionsUpdateInput::default())
        .await;
    assert!(matches!(result, Err(RbacError::ObjectNotFound(_))));
}

#[tokio::test]
#[serial]
async fn test_assign_and_revoke_role() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db.clone());

    let role = repo.create_role(viewer_role_input("member")).await.unwrap();
    let user_id = common::seed_user(&db, "alice").await;
    let admin_id = common::seed_user(&db, "admin").await;

    let assignment = repo
        .assign_role(UserRoleAssignmentInput {
            user_id,
            role_id: role.role.id,
            granted_by: Some(admin_id),
            expires_at: None,
        })
        .await
        .unwrap();
    assert_eq!(assignment.user_id, user_id);

    // 重复分配
    let duplicate = repo
        .assign_role(UserRoleAssignmentInput {
            user_id,
            role_id: role.role.id,
            granted_by: None,
            expires_at: None,
        })
        .await;
    assert!(matches!(
        duplicate,
        Err(RbacError::RoleAlreadyAssigned { .. })
    ));

    // 撤销后可重新分配
    let revoked_id = repo
        .revoke_role(UserRoleRevocationInput {
            user_id,
            role_id: role.role.id,
        })
        .await
        .unwrap();
    assert_eq!(revoked_id, assignment.id);

    // 再撤销一次
    let gone = repo
        .revoke_role(UserRoleRevocationInput {
            user_id,
            role_id: role.role.id,
        })
        .await;
    assert!(matches!(gone, Err(RbacError::RoleNotAssigned { .. })));
}

#[tokio::test]
#[serial]
async fn test_assign_to_missing_role_reports_not_found() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db.clone());
    let user_id = common::seed_user(&db, "bob").await;

    let result = repo
        .assign_role(UserRoleAssignmentInput {
            user_id,
            role_id: Uuid::new_v4(),
            granted_by: None,
            expires_at: None,
        })
        .await;
    assert!(matches!(result, Err(RbacError::ObjectNotFound(_))));
}

#[tokio::test]
#[serial]
async fn test_soft_delete_marks_role_and_object_permissions() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db.clone());

    let role = repo.create_role(viewer_role_input("doomed")).await.unwrap();
    let deleted = repo.delete_role(role.role.id).await.unwrap();

    assert_eq!(deleted.status, RoleStatus::Deleted);
    assert!(deleted.deleted_at.is_some());

    // 行仍在，但对象权限被标记为 deleted
    let statuses: Vec<String> = sqlx::query_scalar(
        "SELECT status::text FROM object_permissions WHERE role_id = $1",
    )
    .bind(role.role.id)
    .fetch_all(db.pool())
    .await
    .unwrap();
    assert!(!statuses.is_empty());
    assert!(statuses.iter().all(|s| s == "deleted"));
}

#[tokio::test]
#[serial]
async fn test_purge_removes_all_related_rows() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db.clone());

    let role = repo.create_role(viewer_role_input("purged")).await.unwrap();
    let user_id = common::seed_user(&db, "carol").await;
    repo.assign_role(UserRoleAssignmentInput {
        user_id,
        role_id: role.role.id,
        granted_by: None,
        expires_at: None,
    })
    .await
    .unwrap();

    repo.purge_role(role.role.id).await.unwrap();

    for table in [
        "roles",
        "permission_groups",
        "object_permissions",
        "user_roles",
    ] {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            table,
            if table == "roles" { "id" } else { "role_id" }
        ))
        .bind(role.role.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(count, 0, "table {} should be empty", table);
    }

    let orphan_permissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(orphan_permissions, 0);

    // 再删一次
    let again = repo.purge_role(role.role.id).await;
    assert!(matches!(again, Err(RbacError::RoleNotFound(_))));
}

#[tokio::test]
#[serial]
async fn test_get_user_roles_lists_assignments() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db.clone());

    let viewer = repo.create_role(viewer_role_input("viewer")).await.unwrap();
    let mut other_input = viewer_role_input("auditor");
    other_input.object_permissions.clear();
    let auditor = repo.create_role(other_input).await.unwrap();
    let user_id = common::seed_user(&db, "dave").await;

    for role_id in [viewer.role.id, auditor.role.id] {
        repo.assign_role(UserRoleAssignmentInput {
            user_id,
            role_id,
            granted_by: None,
            expires_at: None,
        })
        .await
        .unwrap();
    }

    let roles = repo.get_user_roles(user_id).await.unwrap();
    let mut names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["auditor", "viewer"]);

    // 未分配的用户没有角色
    let stranger = common::seed_user(&db, "erin").await;
    assert!(repo.get_user_roles(stranger).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_search_permissions_filters_by_role() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db);

    let viewer = repo.create_role(viewer_role_input("viewer")).await.unwrap();
    repo.create_role(viewer_role_input("other")).await.unwrap();

    let querier = BatchQuerier {
        conditions: vec![PermissionConditions::by_role_id(viewer.role.id)],
        orders: vec![],
        pagination: Pagination::Offset(OffsetPagination { limit: 10, offset: 0 }),
    };
    let result = repo.search_permissions(&querier).await.unwrap();
    assert_eq!(result.total_count, 2);
    let group_id = viewer.permission_groups[0].id;
    assert!(result
        .items
        .iter()
        .all(|p| p.permission_group_id == group_id));

    // 叠加实体类型过滤
    let querier = BatchQuerier {
        conditions: vec![
            PermissionConditions::by_role_id(viewer.role.id),
            PermissionConditions::by_entity_types(vec![EntityType::Vfolder]),
        ],
        orders: vec![],
        pagination: Pagination::Offset(OffsetPagination { limit: 10, offset: 0 }),
    };
    let result = repo.search_permissions(&querier).await.unwrap();
    assert_eq!(result.total_count, 1);
    assert_eq!(result.items[0].entity_type, EntityType::Vfolder);
}

#[tokio::test]
#[serial]
async fn test_search_object_permissions_filters_by_status() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db);

    let role = repo.create_role(viewer_role_input("holder")).await.unwrap();
    repo.update_role_permissions(
        role.role.id,
        RolePermissionsUpdateInput {
            add_object_permissions: vec![ObjectPermissionInput {
                object_id: ObjectId::new(EntityType::Image, "img-1"),
                operation: OperationType::Read,
                status: PermissionStatus::Inactive,
            }],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let querier = BatchQuerier {
        conditions: vec![
            ObjectPermissionConditions::by_role_id(role.role.id),
            ObjectPermissionConditions::by_statuses(vec![PermissionStatus::Active]),
        ],
        orders: vec![],
        pagination: Pagination::Offset(OffsetPagination { limit: 10, offset: 0 }),
    };
    let result = repo.search_object_permissions(&querier).await.unwrap();
    assert_eq!(result.total_count, 1);
    assert_eq!(result.items[0].status, PermissionStatus::Active);
    assert_eq!(
        result.items[0].object_id,
        ObjectId::new(EntityType::Session, "sess-special")
    );
}

#[tokio::test]
#[serial]
async fn test_map_entity_to_scope_is_idempotent() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let repo = PermissionControllerRepository::new(db);

    let scope = ScopeId::new(ScopeType::Project, "proj-1");
    let object = ObjectId::new(EntityType::Vfolder, "vf-1");

    let first = repo.map_entity_to_scope(&scope, &object).await.unwrap();
    let second = repo.map_entity_to_scope(&scope, &object).await.unwrap();
    assert_eq!(first, second);

    let scopes = repo.get_entity_mapped_scopes(&object).await.unwrap();
    assert_eq!(scopes, vec![scope]);
}

//! RBAC 领域类型（作用域标识、权限、角色）

pub mod id;
pub mod permission;
pub mod role;
pub mod types;

pub use id::{IdParseError, ObjectId, ScopeId};
pub use permission::{
    ObjectPermissionData, ObjectPermissionInput, PermissionData, PermissionGroupData,
    PermissionGroupInput, PermissionInput, ScopedPermissionInput,
};
pub use role::{
    AssignedUserData, AssignedUserListResult, ListResult, ObjectPermissionListResult,
    PermissionListResult, RoleCreateInput, RoleData, RoleDataWithPermissions, RoleListResult,
    RolePermissionsUpdateInput, RoleUpdateInput, UserRoleAssignmentInput, UserRoleData,
    UserRoleRevocationInput,
};
pub use types::{
    EntityType, OperationType, PermissionStatus, RoleSource, RoleStatus, ScopeType,
};

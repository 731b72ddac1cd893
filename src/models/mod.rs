//! 数据库行模型

pub mod association;
pub mod object_permission;
pub mod permission;
pub mod role;
pub mod user_role;

pub use association::AssociationScopesEntitiesRow;
pub use object_permission::ObjectPermissionRow;
pub use permission::{PermissionGroupJoinRow, PermissionGroupRow, PermissionRow};
pub use role::RoleRow;
pub use user_role::{AssignedUserRow, UserRoleRow};

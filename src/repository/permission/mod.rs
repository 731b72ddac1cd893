//! 权限控制仓储层

pub mod creators;
pub mod db_source;
pub mod options;
pub mod repository;

pub use options::{
    AssignedUserConditions, AssignedUserOrders, ObjectPermissionConditions,
    ObjectPermissionOrders, PermissionConditions, PermissionOrders, RoleConditions, RoleOrders,
    StringMatchSpec,
};
pub use repository::PermissionControllerRepository;

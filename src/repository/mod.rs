//! Database repository layer

pub mod base;
pub mod permission;

pub use permission::PermissionControllerRepository;

//! Scope-entity association row model

use crate::rbac::{EntityType, ObjectId, ScopeId, ScopeType};
use crate::repository::base::TableRow;
use uuid::Uuid;

/// association_scopes_entities 表的一行：实体归属于哪个作用域。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssociationScopesEntitiesRow {
    pub id: Uuid,
    pub scope_type: ScopeType,
    pub scope_id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl TableRow for AssociationScopesEntitiesRow {
    const TABLE: &'static str = "association_scopes_entities";
}

impl AssociationScopesEntitiesRow {
    pub fn scope(&self) -> ScopeId {
        ScopeId::new(self.scope_type, self.scope_id.clone())
    }

    pub fn object(&self) -> ObjectId {
        ObjectId::new(self.entity_type, self.entity_id.clone())
    }
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminant stored alongside every catalog item reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ItemType {
    #[sea_orm(string_value = "product")]
    Product,
    #[sea_orm(string_value = "service")]
    Service,
}

/// A catalog item reference: exactly one of product or service, never two
/// nullable foreign keys with a mutual-exclusion check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemRef {
    Product(Uuid),
    Service(Uuid),
}

impl ItemRef {
    pub fn new(item_type: ItemType, id: Uuid) -> Self {
        match item_type {
            ItemType::Product => ItemRef::Product(id),
            ItemType::Service => ItemRef::Service(id),
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            ItemRef::Product(_) => ItemType::Product,
            ItemRef::Service(_) => ItemType::Service,
        }
    }

    pub fn item_id(&self) -> Uuid {
        match self {
            ItemRef::Product(id) | ItemRef::Service(id) => *id,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.item_id().is_nil()
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemRef::Product(id) => write!(f, "product:{}", id),
            ItemRef::Service(id) => write!(f, "service:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_type_and_id() {
        let id = Uuid::new_v4();
        let item = ItemRef::Service(id);
        assert_eq!(ItemRef::new(item.item_type(), item.item_id()), item);
    }
}

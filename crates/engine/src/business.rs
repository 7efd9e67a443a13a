//! Garages and vendors behind one tagged reference.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ListingKind, Role, garages, vendors};

/// Kind of business entity a principal may own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusinessKind {
    Garage,
    Vendor,
}

impl BusinessKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Garage => "garage",
            Self::Vendor => "vendor",
        }
    }

    pub const fn role(self) -> Role {
        match self {
            Self::Garage => Role::Garage,
            Self::Vendor => Role::Vendor,
        }
    }

    /// Garages offer services, vendors sell parts.
    pub const fn listing_kind(self) -> ListingKind {
        match self {
            Self::Garage => ListingKind::Service,
            Self::Vendor => ListingKind::Part,
        }
    }
}

impl TryFrom<&str> for BusinessKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "garage" => Ok(Self::Garage),
            "vendor" => Ok(Self::Vendor),
            other => Err(EngineError::Validation(format!(
                "invalid business kind: {other}"
            ))),
        }
    }
}

/// Points at one row of `garages` or `vendors`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessRef {
    pub kind: BusinessKind,
    pub id: i32,
}

impl BusinessRef {
    pub const fn garage(id: i32) -> Self {
        Self {
            kind: BusinessKind::Garage,
            id,
        }
    }

    pub const fn vendor(id: i32) -> Self {
        Self {
            kind: BusinessKind::Vendor,
            id,
        }
    }
}

/// A garage or vendor row, with the table it came from kept in `reference`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Business {
    pub reference: BusinessRef,
    pub owner_user_id: i32,
    pub name: String,
    pub location_id: Option<i32>,
    pub description: Option<String>,
    pub image_path: Option<String>,
}

impl From<garages::Model> for Business {
    fn from(model: garages::Model) -> Self {
        Self {
            reference: BusinessRef::garage(model.id),
            owner_user_id: model.user_id,
            name: model.name,
            location_id: model.location_id,
            description: model.description,
            image_path: model.image_path,
        }
    }
}

impl From<vendors::Model> for Business {
    fn from(model: vendors::Model) -> Self {
        Self {
            reference: BusinessRef::vendor(model.id),
            owner_user_id: model.user_id,
            name: model.name,
            location_id: model.location_id,
            description: model.description,
            image_path: model.image_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_pairs_with_role_and_listing() {
        assert_eq!(BusinessKind::Garage.role(), Role::Garage);
        assert_eq!(BusinessKind::Vendor.listing_kind(), ListingKind::Part);
        assert_eq!(BusinessKind::try_from(" Vendor ").unwrap(), BusinessKind::Vendor);
        assert!(BusinessKind::try_from("customer").is_err());
    }
}

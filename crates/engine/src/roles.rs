//! Role tags and the `roles` / `user_roles` tables.
//!
//! A principal holds exactly one role. The schema allows many, the engine
//! only ever assigns one at registration.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{BusinessKind, EngineError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Garage,
    Vendor,
    Admin,
}

impl Role {
    /// Canonical name, as stored in `roles.name`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Garage => "Garage",
            Self::Vendor => "Vendor",
            Self::Admin => "Admin",
        }
    }

    /// The kind of business entity a principal with this role owns.
    pub const fn business_kind(self) -> Option<BusinessKind> {
        match self {
            Self::Garage => Some(BusinessKind::Garage),
            Self::Vendor => Some(BusinessKind::Vendor),
            Self::Customer | Self::Admin => None,
        }
    }

    pub const fn is_business(self) -> bool {
        self.business_kind().is_some()
    }

    /// Landing page after a successful login.
    pub const fn dashboard_path(self) -> &'static str {
        match self {
            Self::Customer => "/customer/dashboard",
            Self::Garage => "/garage/dashboard",
            Self::Vendor => "/vendor/dashboard",
            Self::Admin => "/admin/dashboard",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both the canonical names and the legacy form values
/// (`customer`, `garage_owner`, `vendor`).
impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "garage" | "garage_owner" => Ok(Self::Garage),
            "vendor" => Ok(Self::Vendor),
            "admin" => Ok(Self::Admin),
            other => Err(EngineError::Validation(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub mod user_roles {
    //! Junction between `users` and `roles`.

    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "user_roles")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub user_id: i32,
        #[sea_orm(primary_key, auto_increment = false)]
        pub role_id: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_form_values() {
        assert_eq!(Role::try_from("customer").unwrap(), Role::Customer);
        assert_eq!(Role::try_from("garage_owner").unwrap(), Role::Garage);
        assert_eq!(Role::try_from("Vendor").unwrap(), Role::Vendor);
        assert!(Role::try_from("mechanic").is_err());
    }

    #[test]
    fn only_garage_and_vendor_own_businesses() {
        assert_eq!(Role::Garage.business_kind(), Some(BusinessKind::Garage));
        assert_eq!(Role::Vendor.business_kind(), Some(BusinessKind::Vendor));
        assert!(!Role::Customer.is_business());
        assert!(!Role::Admin.is_business());
    }
}

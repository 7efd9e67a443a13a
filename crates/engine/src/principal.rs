//! The verified caller every operation is scoped by.

use serde::{Deserialize, Serialize};

use crate::{BusinessKind, BusinessRef, EngineError, ResultEngine, Role};

/// An authenticated principal: user id, role tag and, for garages and
/// vendors, the business entity they own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i32,
    pub role: Role,
    pub business: Option<BusinessRef>,
}

impl Principal {
    pub fn require_role(&self, role: Role) -> ResultEngine<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!(
                "{} access required",
                role.as_str().to_lowercase()
            )))
        }
    }

    /// The owned business, which must be of `kind` when one is given.
    pub fn require_business(&self, kind: Option<BusinessKind>) -> ResultEngine<BusinessRef> {
        let business = self
            .business
            .ok_or_else(|| EngineError::Forbidden("business account required".to_string()))?;
        match kind {
            Some(kind) if kind != business.kind => Err(EngineError::Forbidden(format!(
                "{} account required",
                kind.as_str()
            ))),
            _ => Ok(business),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_scope_checks_kind() {
        let garage = Principal {
            user_id: 1,
            role: Role::Garage,
            business: Some(BusinessRef::garage(7)),
        };
        assert_eq!(garage.require_business(None).unwrap(), BusinessRef::garage(7));
        assert!(matches!(
            garage.require_business(Some(BusinessKind::Vendor)),
            Err(EngineError::Forbidden(_))
        ));
        assert!(garage.require_role(Role::Admin).is_err());

        let customer = Principal {
            user_id: 2,
            role: Role::Customer,
            business: None,
        };
        assert!(customer.require_business(None).is_err());
        assert!(customer.require_role(Role::Customer).is_ok());
    }
}

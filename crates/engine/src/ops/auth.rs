use sea_orm::{QueryFilter, prelude::*};

use crate::{
    ApprovalState, EngineError, Principal, ResultEngine, Role, password, user_roles, users,
};

use super::{Engine, find_business_by_owner, registration::role_id};

impl Engine {
    /// Checks credentials for the claimed role and returns the principal.
    ///
    /// The approval gate runs only after the password verified, so an
    /// unknown account and a wrong password look the same to the caller.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> ResultEngine<Principal> {
        let email = users::normalize_email(email);
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&self.database)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;

        let role_id = role_id(&self.database, role).await?;
        let holds_role = user_roles::Entity::find_by_id((user.id, role_id))
            .one(&self.database)
            .await?
            .is_some();
        if !holds_role || !password::verify_password(password, &user.password_hash) {
            tracing::debug!(user_id = user.id, %role, "login refused");
            return Err(EngineError::InvalidCredentials);
        }

        match user.approval_state()? {
            ApprovalState::Rejected => return Err(EngineError::Rejected),
            ApprovalState::Pending if role.is_business() => {
                return Err(EngineError::PendingApproval);
            }
            _ => {}
        }

        let business = match role.business_kind() {
            Some(kind) => Some(
                find_business_by_owner(&self.database, user.id, kind)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("{} account", kind.as_str())))?
                    .reference,
            ),
            None => None,
        };

        tracing::info!(user_id = user.id, %role, "login");
        Ok(Principal {
            user_id: user.id,
            role,
            business,
        })
    }
}

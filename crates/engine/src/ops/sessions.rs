use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{BusinessRef, EngineError, Principal, ResultEngine, Role, sessions};

use super::Engine;

impl Engine {
    /// Stores a new session for `principal` and returns its opaque token.
    pub async fn open_session(&self, principal: &Principal) -> ResultEngine<String> {
        let now = Utc::now();
        let token = Uuid::new_v4().to_string();
        sessions::ActiveModel {
            token: ActiveValue::Set(token.clone()),
            user_id: ActiveValue::Set(principal.user_id),
            role: ActiveValue::Set(principal.role.as_str().to_string()),
            business_id: ActiveValue::Set(principal.business.map(|b| b.id)),
            created_at: ActiveValue::Set(now),
            expires_at: ActiveValue::Set(now + self.session_ttl),
        }
        .insert(&self.database)
        .await?;
        Ok(token)
    }

    /// Resolves a session token. Unknown and expired tokens give `None`;
    /// expired rows are deleted on the way.
    pub async fn resolve_session(&self, token: &str) -> ResultEngine<Option<Principal>> {
        let Some(session) = sessions::Entity::find_by_id(token.to_string())
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };

        if session.expires_at <= Utc::now() {
            sessions::Entity::delete_by_id(session.token)
                .exec(&self.database)
                .await?;
            return Ok(None);
        }

        let role = Role::try_from(session.role.as_str())?;
        let business = match (role.business_kind(), session.business_id) {
            (Some(kind), Some(id)) => Some(BusinessRef { kind, id }),
            (Some(_), None) => {
                return Err(EngineError::InvalidState(
                    "business session without business id".to_string(),
                ));
            }
            (None, _) => None,
        };
        Ok(Some(Principal {
            user_id: session.user_id,
            role,
            business,
        }))
    }

    pub async fn close_session(&self, token: &str) -> ResultEngine<()> {
        sessions::Entity::delete_by_id(token.to_string())
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Drops every expired session. Returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> ResultEngine<u64> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lte(Utc::now()))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }
}

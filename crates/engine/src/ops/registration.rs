use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, SqlErr, TransactionTrait, prelude::*,
};

use crate::{
    ApprovalState, BusinessKind, BusinessRef, EngineError, MoneyCents, Principal, ResultEngine,
    Role, garages, locations, password, roles, user_roles, users, vendors,
};

use super::{Engine, normalize_required, with_tx};

/// Self-service sign-up form.
#[derive(Clone, Debug)]
pub struct NewRegistration {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub contact: String,
    pub city: String,
    pub district: String,
    /// Required for garages and vendors, ignored otherwise.
    pub business_name: Option<String>,
}

/// Trimmed and validated fields shared by sign-up and admin bootstrap.
struct PrincipalFields {
    email: String,
    password_hash: String,
    contact: String,
    city: String,
    district: String,
}

impl PrincipalFields {
    fn validate(
        email: &str,
        password: &str,
        contact: &str,
        city: &str,
        district: &str,
    ) -> ResultEngine<Self> {
        let email = users::normalize_email(&normalize_required(email, "email")?);
        if !email.contains('@') {
            return Err(EngineError::Validation("invalid email address".to_string()));
        }
        if password.is_empty() {
            return Err(EngineError::Validation(
                "password must not be empty".to_string(),
            ));
        }
        Ok(Self {
            email,
            password_hash: String::new(),
            contact: normalize_required(contact, "contact")?,
            city: normalize_required(city, "city")?,
            district: normalize_required(district, "district")?,
        })
    }
}

impl Engine {
    /// Registers a customer, garage or vendor.
    ///
    /// Location, user, role assignment and business entity are written in a
    /// single DB transaction: either all rows exist afterwards or none does.
    pub async fn register(&self, input: NewRegistration) -> ResultEngine<Principal> {
        if input.role == Role::Admin {
            return Err(EngineError::Validation(
                "admin accounts cannot be self-registered".to_string(),
            ));
        }
        let mut fields = PrincipalFields::validate(
            &input.email,
            &input.password,
            &input.contact,
            &input.city,
            &input.district,
        )?;
        let business_name = match input.role.business_kind() {
            Some(_) => Some(normalize_required(
                input.business_name.as_deref().unwrap_or_default(),
                "business name",
            )?),
            None => None,
        };
        fields.password_hash = password::hash_password(&input.password)?;

        let (balance, approval) = match input.role {
            Role::Customer => (self.customer_opening_balance, ApprovalState::Approved),
            _ => (MoneyCents::ZERO, ApprovalState::Pending),
        };

        let principal = with_tx!(self, |db_tx| {
            insert_principal(
                &db_tx,
                fields,
                input.role,
                approval,
                balance,
                business_name,
            )
            .await
        })?;
        tracing::info!(
            user_id = principal.user_id,
            role = %principal.role,
            "registered principal"
        );
        Ok(principal)
    }

    /// Creates an approved admin. Only reachable from the admin CLI.
    pub async fn create_admin(
        &self,
        email: &str,
        password: &str,
        contact: &str,
        city: &str,
        district: &str,
    ) -> ResultEngine<Principal> {
        let mut fields = PrincipalFields::validate(email, password, contact, city, district)?;
        fields.password_hash = password::hash_password(password)?;

        let principal = with_tx!(self, |db_tx| {
            insert_principal(
                &db_tx,
                fields,
                Role::Admin,
                ApprovalState::Approved,
                MoneyCents::ZERO,
                None,
            )
            .await
        })?;
        tracing::info!(user_id = principal.user_id, "created admin");
        Ok(principal)
    }
}

pub(super) async fn role_id<C: ConnectionTrait>(db: &C, role: Role) -> ResultEngine<i32> {
    roles::Entity::find()
        .filter(roles::Column::Name.eq(role.as_str()))
        .one(db)
        .await?
        .map(|model| model.id)
        .ok_or_else(|| EngineError::NotFound(format!("role {role}")))
}

async fn insert_principal(
    db_tx: &DatabaseTransaction,
    fields: PrincipalFields,
    role: Role,
    approval: ApprovalState,
    balance: MoneyCents,
    business_name: Option<String>,
) -> ResultEngine<Principal> {
    let location = locations::ActiveModel {
        city: ActiveValue::Set(fields.city),
        district: ActiveValue::Set(fields.district),
        latitude: ActiveValue::Set(0.0),
        longitude: ActiveValue::Set(0.0),
        ..Default::default()
    }
    .insert(db_tx)
    .await?;

    let user = users::ActiveModel {
        email: ActiveValue::Set(fields.email),
        password_hash: ActiveValue::Set(fields.password_hash),
        contact: ActiveValue::Set(fields.contact),
        location_id: ActiveValue::Set(Some(location.id)),
        account_balance: ActiveValue::Set(balance.cents()),
        approval: ActiveValue::Set(approval.as_str().to_string()),
        created_at: ActiveValue::Set(Utc::now()),
        ..Default::default()
    }
    .insert(db_tx)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => EngineError::DuplicateEmail,
        _ => EngineError::Database(err),
    })?;

    user_roles::ActiveModel {
        user_id: ActiveValue::Set(user.id),
        role_id: ActiveValue::Set(role_id(db_tx, role).await?),
    }
    .insert(db_tx)
    .await?;

    let business = match (role.business_kind(), business_name) {
        (Some(BusinessKind::Garage), Some(name)) => {
            let garage = garages::ActiveModel {
                name: ActiveValue::Set(name),
                user_id: ActiveValue::Set(user.id),
                location_id: ActiveValue::Set(Some(location.id)),
                ..Default::default()
            }
            .insert(db_tx)
            .await?;
            Some(BusinessRef::garage(garage.id))
        }
        (Some(BusinessKind::Vendor), Some(name)) => {
            let vendor = vendors::ActiveModel {
                name: ActiveValue::Set(name),
                user_id: ActiveValue::Set(user.id),
                location_id: ActiveValue::Set(Some(location.id)),
                ..Default::default()
            }
            .insert(db_tx)
            .await?;
            Some(BusinessRef::vendor(vendor.id))
        }
        (Some(kind), None) => {
            return Err(EngineError::Validation(format!(
                "{} name is required",
                kind.as_str()
            )));
        }
        (None, _) => None,
    };

    Ok(Principal {
        user_id: user.id,
        role,
        business,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_trimmed_and_email_lowercased() {
        let fields =
            PrincipalFields::validate(" Jane@Example.COM ", "pw", " 0700 ", " Nairobi ", " CBD ")
                .unwrap();
        assert_eq!(fields.email, "jane@example.com");
        assert_eq!(fields.contact, "0700");
        assert_eq!(fields.city, "Nairobi");
        assert_eq!(fields.district, "CBD");
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(matches!(
            PrincipalFields::validate("no-at-sign", "pw", "c", "x", "y"),
            Err(EngineError::Validation(_))
        ));
        assert!(PrincipalFields::validate("a@b.c", "", "c", "x", "y").is_err());
        assert!(PrincipalFields::validate("a@b.c", "pw", "  ", "x", "y").is_err());
        assert!(PrincipalFields::validate("a@b.c", "pw", "c", "", "y").is_err());
    }
}

//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for AutoHub:
//!
//! - `locations`: city/district of a principal or business
//! - `users`: principals, wallet balance and approval state
//! - `roles` / `user_roles`: role tags (seeded) and their assignment
//! - `garages` / `vendors`: business entities owned by a principal
//! - `services` / `parts`: listings owned by a business
//! - `transactions`: ledger entries (order requests and payments)
//! - `ratings`: one rating per completed transaction
//! - `messages`: direct messages between principals
//! - `sessions`: server-side login sessions

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Role tags seeded into `roles`. Order is stable so ids are predictable.
const ROLE_NAMES: [&str; 4] = ["Customer", "Garage", "Vendor", "Admin"];

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Locations {
    Table,
    Id,
    City,
    District,
    Latitude,
    Longitude,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    Contact,
    LocationId,
    AccountBalance,
    Approval,
    CreatedAt,
}

#[derive(Iden)]
enum Roles {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum UserRoles {
    Table,
    UserId,
    RoleId,
}

#[derive(Iden)]
enum Garages {
    Table,
    Id,
    Name,
    UserId,
    LocationId,
    Description,
    ImagePath,
}

#[derive(Iden)]
enum Vendors {
    Table,
    Id,
    Name,
    UserId,
    LocationId,
    Description,
    ImagePath,
}

#[derive(Iden)]
enum Services {
    Table,
    Id,
    Name,
    Price,
    GarageId,
    Description,
    ImagePath,
}

#[derive(Iden)]
enum Parts {
    Table,
    Id,
    Name,
    Price,
    VendorId,
    Description,
    ImagePath,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    InitiatorUserId,
    ServiceId,
    PartId,
    TargetGarageId,
    TargetVendorId,
    Amount,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Ratings {
    Table,
    Id,
    TransactionId,
    UserId,
    GarageId,
    VendorId,
    Value,
    Comment,
    CreatedAt,
}

#[derive(Iden)]
enum Messages {
    Table,
    Id,
    SenderUserId,
    ReceiverUserId,
    Body,
    SentAt,
}

#[derive(Iden)]
enum Sessions {
    Table,
    Token,
    UserId,
    Role,
    BusinessId,
    CreatedAt,
    ExpiresAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Locations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Locations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Locations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Locations::City).string().not_null())
                    .col(ColumnDef::new(Locations::District).string().not_null())
                    .col(
                        ColumnDef::new(Locations::Latitude)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Locations::Longitude)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Contact).string().not_null())
                    .col(ColumnDef::new(Users::LocationId).integer())
                    .col(
                        ColumnDef::new(Users::AccountBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::Approval)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-users-location_id")
                            .from(Users::Table, Users::LocationId)
                            .to(Locations::Table, Locations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Roles (+ seed) and UserRoles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Roles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Roles::Name).string().not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        let mut seed = Query::insert();
        seed.into_table(Roles::Table).columns([Roles::Name]);
        for name in ROLE_NAMES {
            seed.values_panic([name.into()]);
        }
        manager.exec_stmt(seed).await?;

        manager
            .create_table(
                Table::create()
                    .table(UserRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserRoles::UserId).integer().not_null())
                    .col(ColumnDef::new(UserRoles::RoleId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(UserRoles::UserId)
                            .col(UserRoles::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_roles-user_id")
                            .from(UserRoles::Table, UserRoles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_roles-role_id")
                            .from(UserRoles::Table, UserRoles::RoleId)
                            .to(Roles::Table, Roles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Business entities
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Garages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Garages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Garages::Name).string().not_null())
                    .col(
                        ColumnDef::new(Garages::UserId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Garages::LocationId).integer())
                    .col(ColumnDef::new(Garages::Description).text())
                    .col(ColumnDef::new(Garages::ImagePath).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-garages-user_id")
                            .from(Garages::Table, Garages::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-garages-location_id")
                            .from(Garages::Table, Garages::LocationId)
                            .to(Locations::Table, Locations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vendors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vendors::Name).string().not_null())
                    .col(
                        ColumnDef::new(Vendors::UserId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Vendors::LocationId).integer())
                    .col(ColumnDef::new(Vendors::Description).text())
                    .col(ColumnDef::new(Vendors::ImagePath).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-vendors-user_id")
                            .from(Vendors::Table, Vendors::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-vendors-location_id")
                            .from(Vendors::Table, Vendors::LocationId)
                            .to(Locations::Table, Locations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Listings
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Services::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Services::Name).string().not_null())
                    .col(ColumnDef::new(Services::Price).big_integer().not_null())
                    .col(ColumnDef::new(Services::GarageId).integer().not_null())
                    .col(ColumnDef::new(Services::Description).text())
                    .col(ColumnDef::new(Services::ImagePath).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-services-garage_id")
                            .from(Services::Table, Services::GarageId)
                            .to(Garages::Table, Garages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-services-garage_id")
                    .table(Services::Table)
                    .col(Services::GarageId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Parts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Parts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Parts::Name).string().not_null())
                    .col(ColumnDef::new(Parts::Price).big_integer().not_null())
                    .col(ColumnDef::new(Parts::VendorId).integer().not_null())
                    .col(ColumnDef::new(Parts::Description).text())
                    .col(ColumnDef::new(Parts::ImagePath).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-parts-vendor_id")
                            .from(Parts::Table, Parts::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-parts-vendor_id")
                    .table(Parts::Table)
                    .col(Parts::VendorId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::InitiatorUserId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::ServiceId).integer())
                    .col(ColumnDef::new(Transactions::PartId).integer())
                    .col(ColumnDef::new(Transactions::TargetGarageId).integer())
                    .col(ColumnDef::new(Transactions::TargetVendorId).integer())
                    .col(ColumnDef::new(Transactions::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-initiator_user_id")
                            .from(Transactions::Table, Transactions::InitiatorUserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-service_id")
                            .from(Transactions::Table, Transactions::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-part_id")
                            .from(Transactions::Table, Transactions::PartId)
                            .to(Parts::Table, Parts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-target_garage_id")
                            .from(Transactions::Table, Transactions::TargetGarageId)
                            .to(Garages::Table, Garages::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-target_vendor_id")
                            .from(Transactions::Table, Transactions::TargetVendorId)
                            .to(Vendors::Table, Vendors::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-initiator_user_id")
                    .table(Transactions::Table)
                    .col(Transactions::InitiatorUserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Ratings
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ratings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Ratings::TransactionId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Ratings::UserId).integer().not_null())
                    .col(ColumnDef::new(Ratings::GarageId).integer())
                    .col(ColumnDef::new(Ratings::VendorId).integer())
                    .col(ColumnDef::new(Ratings::Value).integer().not_null())
                    .col(ColumnDef::new(Ratings::Comment).text())
                    .col(ColumnDef::new(Ratings::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ratings-transaction_id")
                            .from(Ratings::Table, Ratings::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Messages
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Messages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Messages::SenderUserId).integer().not_null())
                    .col(
                        ColumnDef::new(Messages::ReceiverUserId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Messages::Body).text().not_null())
                    .col(ColumnDef::new(Messages::SentAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-messages-sender_user_id")
                            .from(Messages::Table, Messages::SenderUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-messages-receiver_user_id")
                            .from(Messages::Table, Messages::ReceiverUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-messages-sender-receiver")
                    .table(Messages::Table)
                    .col(Messages::SenderUserId)
                    .col(Messages::ReceiverUserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 9. Sessions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Token)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::UserId).integer().not_null())
                    .col(ColumnDef::new(Sessions::Role).string().not_null())
                    .col(ColumnDef::new(Sessions::BusinessId).integer())
                    .col(ColumnDef::new(Sessions::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Sessions::ExpiresAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sessions-user_id")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ratings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Parts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Services::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vendors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Garages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Locations::Table).to_owned())
            .await?;
        Ok(())
    }
}

pub use business::{Business, BusinessKind, BusinessRef};
pub use error::EngineError;
pub use listings::{Listing, ListingInput, ListingKind, ListingRef};
pub use money::{CURRENCY_CODE, MoneyCents};
pub use ops::{
    AdminListing, BusinessDashboard, BusinessOrder, BusinessProfile, ConversationMessage,
    CustomerHistoryEntry, DEFAULT_CUSTOMER_OPENING_BALANCE, Engine, EngineBuilder, Finalized,
    MessageThread, NewRegistration, OrderRequest, PendingBusiness, SearchFilter, SearchHit,
};
pub use principal::Principal;
pub use roles::Role;
pub use transactions::{LedgerEntry, TransactionStatus};
pub use users::ApprovalState;

mod business;
mod error;
mod listings;
mod money;
mod ops;
mod password;
mod principal;

pub mod garages;
pub mod locations;
pub mod messages;
pub mod parts;
pub mod ratings;
pub mod roles;
pub mod services;
pub mod sessions;
pub mod transactions;
pub mod users;
pub mod vendors;

pub use roles::user_roles;

type ResultEngine<T> = Result<T, EngineError>;

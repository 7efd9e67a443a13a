//! Payloads exchanged with the AutoHub HTTP surface.
//!
//! Forms are what browsers post (`application/x-www-form-urlencoded`); every
//! field arrives as text and is validated by the server. Views are the JSON
//! bodies returned by `GET` routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome carried in the `?status=..&message=..` query of a redirect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashStatus {
    Success,
    Error,
}

impl FlashStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Flash message echoed back by every view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub status: Option<FlashStatus>,
    pub message: Option<String>,
}

/// A money amount as shown to users plus its raw value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// e.g. `KES 2500.00`
    pub display: String,
    pub cents: i64,
}

pub mod auth {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RegisterForm {
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub password: String,
        /// `customer`, `garage_owner` or `vendor`.
        #[serde(default)]
        pub role: String,
        #[serde(default)]
        pub contact: String,
        #[serde(default)]
        pub city: String,
        #[serde(default)]
        pub district: String,
        pub business_name: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LoginForm {
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub password: String,
        #[serde(default)]
        pub role: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LandingView {
        pub flash: Flash,
    }
}

pub mod customer {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DashboardQuery {
        /// `history` shows the transaction list instead of the marketplace.
        pub view: Option<String>,
        pub q: Option<String>,
        pub category: Option<String>,
        /// `Garage` or `Vendor`.
        pub target: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SearchHitView {
        pub item_type: String,
        pub item_id: i32,
        pub item_name: String,
        pub price: Amount,
        pub business_type: String,
        pub business_id: i32,
        pub business_name: String,
        pub business_user_id: i32,
        pub city: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryRowView {
        pub transaction_id: i32,
        pub item_type: Option<String>,
        pub item_name: Option<String>,
        pub business_name: Option<String>,
        pub business_user_id: Option<i32>,
        pub amount: Amount,
        pub status: String,
        pub created_at: DateTime<Utc>,
        pub has_rated: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DashboardView {
        pub email: String,
        pub balance: Amount,
        pub view: String,
        pub listings: Vec<SearchHitView>,
        pub history: Vec<HistoryRowView>,
        pub flash: Flash,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RequestForm {
        /// `service` or `part`.
        #[serde(default)]
        pub item_type: String,
        #[serde(default)]
        pub item_id: String,
        /// `garage` or `vendor`.
        #[serde(default)]
        pub business_type: String,
        #[serde(default)]
        pub business_id: String,
        /// Price the page displayed. Ignored beyond a sanity check.
        pub price: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RechargeForm {
        #[serde(default)]
        pub amount: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct FinalizeForm {
        #[serde(default)]
        pub transaction_id: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RateForm {
        #[serde(default)]
        pub transaction_id: String,
        #[serde(default)]
        pub rating: String,
        pub comment: Option<String>,
    }
}

pub mod business {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ListingView {
        pub id: i32,
        pub item_type: String,
        pub name: String,
        pub price: Amount,
        pub description: Option<String>,
        pub image_path: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileView {
        pub business_type: String,
        pub business_id: i32,
        pub name: String,
        pub owner_user_id: i32,
        pub owner_email: String,
        pub contact: String,
        pub city: Option<String>,
        pub district: Option<String>,
        pub description: Option<String>,
        pub image_path: Option<String>,
        pub average_rating: Option<f64>,
        pub listings: Vec<ListingView>,
        pub flash: Flash,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderView {
        pub transaction_id: i32,
        pub customer_email: String,
        pub item_name: Option<String>,
        pub amount: Amount,
        pub status: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DashboardView {
        pub business_type: String,
        pub name: String,
        pub listing_count: u64,
        pub orders_last_7_days: u64,
        pub pending_orders: u64,
        pub average_rating: Option<f64>,
        pub recent_orders: Vec<OrderView>,
        pub flash: Flash,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ListingsView {
        pub listings: Vec<ListingView>,
        pub flash: Flash,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct OrdersQuery {
        /// `all` (default) or a transaction status.
        pub status: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrdersView {
        pub status: String,
        pub orders: Vec<OrderView>,
        pub flash: Flash,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ListingDeleteForm {
        #[serde(default)]
        pub listing_id: String,
    }
}

pub mod message {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MessagesQuery {
        /// User id of the conversation partner to open.
        pub with: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SendForm {
        #[serde(default)]
        pub receiver_id: String,
        #[serde(default)]
        pub body: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ThreadView {
        pub partner_user_id: i32,
        pub partner_name: String,
        pub last_body: String,
        pub last_sent_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageView {
        pub id: i32,
        pub body: String,
        pub sent_at: DateTime<Utc>,
        pub is_sender: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessagesView {
        pub threads: Vec<ThreadView>,
        pub partner_user_id: Option<i32>,
        pub partner_name: Option<String>,
        pub conversation: Vec<MessageView>,
        pub flash: Flash,
    }
}

pub mod admin {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DashboardQuery {
        /// `pending` (default) or `listings`.
        pub view: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ApprovalForm {
        #[serde(default)]
        pub user_id: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ListingDeleteForm {
        #[serde(default)]
        pub item_type: String,
        #[serde(default)]
        pub item_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PendingView {
        pub user_id: i32,
        pub email: String,
        pub contact: String,
        pub role: String,
        pub business_name: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ListingRowView {
        pub item_type: String,
        pub item_id: i32,
        pub name: String,
        pub price: Amount,
        pub business_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DashboardView {
        pub view: String,
        pub pending: Vec<PendingView>,
        pub listings: Vec<ListingRowView>,
        pub flash: Flash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_status_is_lowercase() {
        let flash = Flash {
            status: Some(FlashStatus::Error),
            message: Some("nope".to_string()),
        };
        let json = serde_json::to_value(&flash).unwrap();
        assert_eq!(json["status"], "error");
        let back: Flash = serde_json::from_value(json).unwrap();
        assert_eq!(back, flash);
    }

    #[test]
    fn missing_form_fields_default_to_empty() {
        let form: auth::LoginForm = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert_eq!(form.email, "a@b.c");
        assert!(form.password.is_empty());
        assert!(form.role.is_empty());
    }
}

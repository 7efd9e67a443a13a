//! Services and parts offered by businesses.

use serde::{Deserialize, Serialize};

use crate::{BusinessKind, BusinessRef, EngineError, MoneyCents, parts, services};

/// A garage lists services, a vendor lists parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingKind {
    Service,
    Part,
}

impl ListingKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Part => "part",
        }
    }

    pub const fn business_kind(self) -> BusinessKind {
        match self {
            Self::Service => BusinessKind::Garage,
            Self::Part => BusinessKind::Vendor,
        }
    }
}

impl TryFrom<&str> for ListingKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "service" | "services" => Ok(Self::Service),
            "part" | "parts" => Ok(Self::Part),
            other => Err(EngineError::Validation(format!(
                "invalid item kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingRef {
    pub kind: ListingKind,
    pub id: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub reference: ListingRef,
    pub business: BusinessRef,
    pub name: String,
    pub price: MoneyCents,
    pub description: Option<String>,
    pub image_path: Option<String>,
}

impl From<services::Model> for Listing {
    fn from(model: services::Model) -> Self {
        Self {
            reference: ListingRef {
                kind: ListingKind::Service,
                id: model.id,
            },
            business: BusinessRef::garage(model.garage_id),
            name: model.name,
            price: MoneyCents::new(model.price),
            description: model.description,
            image_path: model.image_path,
        }
    }
}

impl From<parts::Model> for Listing {
    fn from(model: parts::Model) -> Self {
        Self {
            reference: ListingRef {
                kind: ListingKind::Part,
                id: model.id,
            },
            business: BusinessRef::vendor(model.vendor_id),
            name: model.name,
            price: MoneyCents::new(model.price),
            description: model.description,
            image_path: model.image_path,
        }
    }
}

/// Fields a business submits when adding or editing a listing.
///
/// `image_path: None` keeps the current image on edit.
#[derive(Clone, Debug, Default)]
pub struct ListingInput {
    pub name: String,
    pub price: MoneyCents,
    pub description: Option<String>,
    pub image_path: Option<String>,
}

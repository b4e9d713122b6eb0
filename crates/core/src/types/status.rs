//! Status and classification enums for marketplace entities.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a status-like string is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct StatusParseError {
    /// Which enum failed to parse.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl StatusParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Publication status of a marketplace product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Visible on the storefront.
    #[default]
    Active,
    /// Hidden by an admin, kept for later.
    Inactive,
    /// Awaiting approval.
    Draft,
    /// Rejected or retired.
    Archived,
}

impl ProductStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 4] = [Self::Active, Self::Inactive, Self::Draft, Self::Archived];

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Draft => "draft",
            Self::Archived => "archived",
        }
    }

    /// Status the admin list switches to when the toggle is clicked.
    ///
    /// Only `active` becomes `inactive`; every other status is re-activated.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive | Self::Draft | Self::Archived => Self::Active,
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError::new("product status", s))
    }
}

/// Kind of product interaction recorded for analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_event_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    Click,
    AddToCart,
    Purchase,
    Abandon,
}

impl EventType {
    pub const ALL: [Self; 5] = [
        Self::View,
        Self::Click,
        Self::AddToCart,
        Self::Purchase,
        Self::Abandon,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Click => "click",
            Self::AddToCart => "add_to_cart",
            Self::Purchase => "purchase",
            Self::Abandon => "abandon",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| StatusParseError::new("event type", s))
    }
}

/// Device class reported with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "device_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Mobile,
    Desktop,
    Tablet,
}

impl DeviceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
        }
    }
}

impl FromStr for DeviceType {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mobile" => Ok(Self::Mobile),
            "desktop" => Ok(Self::Desktop),
            "tablet" => Ok(Self::Tablet),
            other => Err(StatusParseError::new("device type", other)),
        }
    }
}

/// Decision taken on a draft product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationAction {
    /// Approve: the product becomes `active` and is marked validated.
    Publish,
    /// Reject: the product is archived.
    Reject,
}

impl ValidationAction {
    /// Wire name, as sent in `?action=`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Reject => "reject",
        }
    }

    /// Status the product ends up with after the decision.
    #[must_use]
    pub const fn resulting_status(self) -> ProductStatus {
        match self {
            Self::Publish => ProductStatus::Active,
            Self::Reject => ProductStatus::Archived,
        }
    }
}

impl FromStr for ValidationAction {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publish" => Ok(Self::Publish),
            "reject" => Ok(Self::Reject),
            other => Err(StatusParseError::new("validation action", other)),
        }
    }
}

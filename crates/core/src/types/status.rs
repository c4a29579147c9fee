//! Status and role enums for various entities.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// `Pending` is the initial state; `Delivered` and `Cancelled` are terminal.
/// See [`crate::Fulfillment`] for the transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Delivered, Self::Cancelled];

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is allowed out of this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Storefront account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular shopper.
    #[default]
    Customer,
    /// Back-office access: catalog management and order administration.
    Admin,
}

impl UserRole {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// How the buyer pays for an order.
///
/// The three methods offered at checkout are named variants; any other value
/// the client submits is kept verbatim in `Other` so the set can grow without
/// a server release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    Bkash,
    Nagad,
    Other(String),
}

impl PaymentMethod {
    /// Display/wire name of the method.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CashOnDelivery => "Cash on Delivery",
            Self::Bkash => "Bkash",
            Self::Nagad => "Nagad",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for PaymentMethod {
    fn from(s: &str) -> Self {
        match s.trim() {
            "Cash on Delivery" => Self::CashOnDelivery,
            "Bkash" | "bKash" => Self::Bkash,
            "Nagad" => Self::Nagad,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for PaymentMethod {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentMethod {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Err(serde::de::Error::custom("payment method is required"));
        }
        Ok(Self::from(raw))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_parse() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert!("Pending".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_order_status_serde() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert!(serde_json::from_str::<OrderStatus>("\"refunded\"").is_err());
    }

    #[test]
    fn test_user_role_roundtrip() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(UserRole::default(), UserRole::Customer);
        assert!("viewer".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_payment_method_known_and_other() {
        assert_eq!(PaymentMethod::from("Bkash"), PaymentMethod::Bkash);
        assert_eq!(
            PaymentMethod::from("Cash on Delivery"),
            PaymentMethod::CashOnDelivery
        );
        let rocket = PaymentMethod::from("Rocket");
        assert_eq!(rocket, PaymentMethod::Other("Rocket".to_owned()));
        assert_eq!(serde_json::to_string(&rocket).unwrap(), "\"Rocket\"");
    }

    #[test]
    fn test_payment_method_rejects_blank() {
        assert!(serde_json::from_str::<PaymentMethod>("\"  \"").is_err());
    }
}

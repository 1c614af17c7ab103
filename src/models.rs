use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

// ============ Database Models ============

/// A customer record.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    /// System-generated identifier.
    pub customer_id: i64,
    pub name: String,
    /// Unique across all customers; immutable after creation.
    pub email: String,
    /// Unique across all customers.
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// An address owned by exactly one customer.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub address_id: i64,
    /// Owning customer.
    pub customer_id: i64,
    pub line1: String,
    pub area: Option<String>,
    pub city: String,
    pub pincode: String,
    pub created_at: DateTime<Utc>,
}

/// A customer together with its full address collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerWithAddresses {
    #[serde(flatten)]
    pub customer: Customer,
    pub addresses: Vec<Address>,
}

// ============ Request Payloads ============

/// POST /v1/customers body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewCustomer {
    #[schema(example = "Asha Rao")]
    pub name: String,
    #[schema(example = "asha@example.com")]
    pub email: String,
    #[schema(example = "9876543210")]
    pub phone: String,
}

/// PATCH /v1/customers/{id} body.
///
/// Only `name` and `phone` are accepted. Any other field, `email` included, is
/// ignored. Absent and `null` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CustomerUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl CustomerUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none()
    }
}

/// POST /v1/customers/{id}/addresses body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAddress {
    #[schema(example = "12 Main St")]
    pub line1: String,
    #[serde(default)]
    pub area: Option<String>,
    pub city: String,
    pub pincode: String,
}

// ============ Query Parameters ============

/// Query string of GET /v1/customers.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCustomersParams {
    /// Case-insensitive substring match on name.
    pub name: Option<String>,
    /// Exact email match.
    pub email: Option<String>,
    /// Exact phone match.
    pub phone: Option<String>,
    /// Page size, 1..=200 (default 50).
    pub limit: Option<i64>,
    /// Records to skip, >= 0 (default 0).
    pub offset: Option<i64>,
}

/// Query string of the internal validation endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ValidateAddressParams {
    pub address_id: i64,
}

/// Normalized search filters. Empty strings are treated as "no filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        if let Some(name) = &self.name {
            if !customer.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(email) = &self.email {
            if &customer.email != email {
                return false;
            }
        }
        if let Some(phone) = &self.phone {
            if &customer.phone != phone {
                return false;
            }
        }
        true
    }
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

// ============ Validation Endpoint ============

/// Why a (customer, address) pair failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationReason {
    CustomerNotFound,
    AddressNotOwned,
}

/// Outcome of an ownership check, before it is wrapped for the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressOwnership {
    Owned,
    Rejected(ValidationReason),
}

/// Response body of the internal validation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddressValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ValidationReason>,
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
}

impl AddressValidationResponse {
    pub fn new(ownership: AddressOwnership, correlation_id: String) -> Self {
        match ownership {
            AddressOwnership::Owned => Self {
                valid: true,
                reason: None,
                correlation_id,
            },
            AddressOwnership::Rejected(reason) => Self {
                valid: false,
                reason: Some(reason),
                correlation_id,
            },
        }
    }
}

/// Response body of GET /health.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

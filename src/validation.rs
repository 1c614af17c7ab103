//! Payload validation run before any request touches the store.
//!
//! Every function returns `AppError::Validation` describing the first field
//! that failed.

use regex::Regex;
use std::sync::LazyLock;

use crate::errors::AppError;
use crate::models::{
    CustomerFilter, CustomerUpdate, ListCustomersParams, NewAddress, NewCustomer, Page,
};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_PHONE_LEN: usize = 20;
pub const MAX_LINE_LEN: usize = 255;
pub const MAX_CITY_LEN: usize = 100;
pub const MAX_PINCODE_LEN: usize = 20;

// RFC 5322 simplified: local@domain.tld, the domain needs at least one dot.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("email regex is valid")
});

/// Checks the email format.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_REGEX.is_match(email)
}

fn required(field: &str, value: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    optional(field, value, max_len)
}

fn optional(field: &str, value: &str, max_len: usize) -> Result<(), AppError> {
    if value.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

pub fn validate_new_customer(payload: &NewCustomer) -> Result<(), AppError> {
    required("name", &payload.name, MAX_NAME_LEN)?;
    if !is_valid_email(&payload.email) {
        return Err(AppError::Validation(
            "email is not a valid email address".to_string(),
        ));
    }
    required("phone", &payload.phone, MAX_PHONE_LEN)?;
    Ok(())
}

pub fn validate_customer_update(payload: &CustomerUpdate) -> Result<(), AppError> {
    if let Some(name) = &payload.name {
        required("name", name, MAX_NAME_LEN)?;
    }
    if let Some(phone) = &payload.phone {
        required("phone", phone, MAX_PHONE_LEN)?;
    }
    Ok(())
}

pub fn validate_new_address(payload: &NewAddress) -> Result<(), AppError> {
    required("line1", &payload.line1, MAX_LINE_LEN)?;
    if let Some(area) = &payload.area {
        optional("area", area, MAX_LINE_LEN)?;
    }
    required("city", &payload.city, MAX_CITY_LEN)?;
    required("pincode", &payload.pincode, MAX_PINCODE_LEN)?;
    Ok(())
}

/// Turns raw list query parameters into a filter and a bounded page.
pub fn parse_list_params(params: ListCustomersParams) -> Result<(CustomerFilter, Page), AppError> {
    let limit = params.limit.unwrap_or(Page::DEFAULT_LIMIT);
    if !(1..=Page::MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            Page::MAX_LIMIT
        )));
    }

    let offset = params.offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::Validation(
            "offset must be greater than or equal to 0".to_string(),
        ));
    }

    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let filter = CustomerFilter {
        name: non_empty(params.name),
        email: non_empty(params.email),
        phone: non_empty(params.phone),
    };

    Ok((filter, Page { limit, offset }))
}

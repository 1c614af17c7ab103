use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::correlation::CorrelationId;
use crate::errors::{ApiError, AppError, ResultExt};
use crate::models::*;
use crate::repository::CustomerRepository;
use crate::validation;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Customer and address storage.
    pub repo: Arc<dyn CustomerRepository>,
    /// Service label used in health output and metrics.
    pub service_name: String,
    /// Render handle of the process-wide metrics recorder.
    pub metrics: PrometheusHandle,
}

/// Unwraps an extractor result, turning a rejection into a correlated 422.
fn accept<T, R>(extracted: Result<T, R>, cid: &CorrelationId) -> Result<T, ApiError>
where
    AppError: From<R>,
{
    extracted.map_err(AppError::from).correlate(cid)
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is alive", body = HealthResponse)),
    tag = "infra"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: state.service_name.clone(),
    })
}

/// POST /v1/customers
///
/// Creates a customer. Email and phone must not belong to any existing customer.
#[utoipa::path(
    post,
    path = "/v1/customers",
    request_body = NewCustomer,
    responses(
        (status = 201, description = "Customer created", body = Customer),
        (status = 400, description = "Email or phone already in use", body = ErrorBody),
        (status = 422, description = "Invalid payload", body = ErrorBody),
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let Json(payload) = accept(payload, &cid)?;
    validation::validate_new_customer(&payload).correlate(&cid)?;

    let customer = state
        .repo
        .create_customer(&payload)
        .await
        .map_err(|e| {
            if matches!(e, AppError::CustomerExists) {
                tracing::warn!("Rejected customer create: email or phone already in use");
            }
            e
        })
        .correlate(&cid)?;

    tracing::info!(customer_id = customer.customer_id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /v1/customers
///
/// Search / list customers, ordered by id.
#[utoipa::path(
    get,
    path = "/v1/customers",
    params(ListCustomersParams),
    responses(
        (status = 200, description = "Matching customers", body = [Customer]),
        (status = 422, description = "Invalid query parameters", body = ErrorBody),
    ),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    params: Result<Query<ListCustomersParams>, QueryRejection>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let Query(params) = accept(params, &cid)?;
    let (filter, page) = validation::parse_list_params(params).correlate(&cid)?;

    let customers = state
        .repo
        .list_customers(&filter, page)
        .await
        .correlate(&cid)?;

    tracing::info!(count = customers.len(), "Listed customers");
    Ok(Json(customers))
}

/// GET /v1/customers/:id
///
/// Returns the customer with its full address collection.
#[utoipa::path(
    get,
    path = "/v1/customers/{id}",
    params(("id" = i64, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer with addresses", body = CustomerWithAddresses),
        (status = 404, description = "Customer not found", body = ErrorBody),
    ),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<CustomerWithAddresses>, ApiError> {
    let Path(customer_id) = accept(id, &cid)?;

    let customer = state.repo.get_customer(customer_id).await.correlate(&cid)?;

    tracing::debug!(customer_id, addresses = customer.addresses.len(), "Fetched customer");
    Ok(Json(customer))
}

/// PATCH /v1/customers/:id
///
/// Partial update of `name` and `phone`. Email cannot be changed through this API.
#[utoipa::path(
    patch,
    path = "/v1/customers/{id}",
    params(("id" = i64, Path, description = "Customer id")),
    request_body = CustomerUpdate,
    responses(
        (status = 200, description = "Updated customer", body = Customer),
        (status = 400, description = "Phone already associated with another customer", body = ErrorBody),
        (status = 404, description = "Customer not found", body = ErrorBody),
        (status = 422, description = "Invalid payload", body = ErrorBody),
    ),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CustomerUpdate>, JsonRejection>,
) -> Result<Json<Customer>, ApiError> {
    let Path(customer_id) = accept(id, &cid)?;
    let Json(update) = accept(payload, &cid)?;
    validation::validate_customer_update(&update).correlate(&cid)?;

    let customer = state
        .repo
        .update_customer(customer_id, &update)
        .await
        .map_err(|e| {
            if matches!(e, AppError::PhoneInUse) {
                tracing::warn!(customer_id, "Rejected phone change: number already in use");
            }
            e
        })
        .correlate(&cid)?;

    tracing::info!(customer_id, "Customer updated");
    Ok(Json(customer))
}

/// DELETE /v1/customers/:id
///
/// Deletes the customer together with its addresses.
#[utoipa::path(
    delete,
    path = "/v1/customers/{id}",
    params(("id" = i64, Path, description = "Customer id")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 404, description = "Customer not found", body = ErrorBody),
    ),
    tag = "customers"
)]
pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(customer_id) = accept(id, &cid)?;

    state
        .repo
        .delete_customer(customer_id)
        .await
        .correlate(&cid)?;

    tracing::info!(customer_id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/customers/:id/addresses
#[utoipa::path(
    get,
    path = "/v1/customers/{id}/addresses",
    params(("id" = i64, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Addresses of the customer", body = [Address]),
        (status = 404, description = "Customer not found", body = ErrorBody),
    ),
    tag = "addresses"
)]
pub async fn list_addresses(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Address>>, ApiError> {
    let Path(customer_id) = accept(id, &cid)?;

    let addresses = state
        .repo
        .list_addresses(customer_id)
        .await
        .correlate(&cid)?;

    Ok(Json(addresses))
}

/// POST /v1/customers/:id/addresses
#[utoipa::path(
    post,
    path = "/v1/customers/{id}/addresses",
    params(("id" = i64, Path, description = "Customer id")),
    request_body = NewAddress,
    responses(
        (status = 201, description = "Address created", body = Address),
        (status = 404, description = "Customer not found", body = ErrorBody),
        (status = 422, description = "Invalid payload", body = ErrorBody),
    ),
    tag = "addresses"
)]
pub async fn create_address(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewAddress>, JsonRejection>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    let Path(customer_id) = accept(id, &cid)?;
    let Json(payload) = accept(payload, &cid)?;
    validation::validate_new_address(&payload).correlate(&cid)?;

    let address = state
        .repo
        .create_address(customer_id, &payload)
        .await
        .correlate(&cid)?;

    tracing::info!(customer_id, address_id = address.address_id, "Address created");
    Ok((StatusCode::CREATED, Json(address)))
}

/// GET /internal/v1/customers/:id/validate-address?address_id=
///
/// Used by other services (e.g. order-service) to check that an address
/// belongs to a customer. Business outcomes are always a 200 with a reason.
#[utoipa::path(
    get,
    path = "/internal/v1/customers/{id}/validate-address",
    params(
        ("id" = i64, Path, description = "Customer id"),
        ValidateAddressParams
    ),
    responses(
        (status = 200, description = "Ownership verdict", body = AddressValidationResponse),
        (status = 422, description = "Malformed request", body = ErrorBody),
    ),
    tag = "internal"
)]
pub async fn validate_customer_address(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    id: Result<Path<i64>, PathRejection>,
    params: Result<Query<ValidateAddressParams>, QueryRejection>,
) -> Result<Json<AddressValidationResponse>, ApiError> {
    let Path(customer_id) = accept(id, &cid)?;
    let Query(params) = accept(params, &cid)?;

    let ownership = state
        .repo
        .check_address_ownership(customer_id, params.address_id)
        .await
        .correlate(&cid)?;

    tracing::info!(
        customer_id,
        address_id = params.address_id,
        outcome = ?ownership,
        "Validated customer address"
    );
    Ok(Json(AddressValidationResponse::new(
        ownership,
        cid.to_string(),
    )))
}

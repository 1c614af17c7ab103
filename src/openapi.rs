use axum::{http::StatusCode, response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::errors::ErrorBody;
use crate::handlers;
use crate::models::{
    Address, AddressValidationResponse, Customer, CustomerUpdate, CustomerWithAddresses,
    HealthResponse, NewAddress, NewCustomer, ValidationReason,
};

#[derive(OpenApi)]
#[openapi(
    info(title = "customer-service", version = "v1"),
    paths(
        handlers::health,
        handlers::create_customer,
        handlers::list_customers,
        handlers::get_customer,
        handlers::update_customer,
        handlers::delete_customer,
        handlers::list_addresses,
        handlers::create_address,
        handlers::validate_customer_address,
    ),
    components(schemas(
        Customer,
        Address,
        CustomerWithAddresses,
        NewCustomer,
        CustomerUpdate,
        NewAddress,
        AddressValidationResponse,
        ValidationReason,
        HealthResponse,
        ErrorBody,
    )),
    tags(
        (name = "customers", description = "Customer records"),
        (name = "addresses", description = "Addresses owned by a customer"),
        (name = "internal", description = "Service-to-service queries"),
        (name = "infra", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI document generated from the handler annotations.
pub async fn serve_openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Serves the Swagger UI HTML page.
///
/// The page embeds the Swagger UI bundle and points it at `/openapi.json`.
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>customer-service - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

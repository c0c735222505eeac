use axum::response::Json;

#[utoipa::path(
    get,
    path= "/openapi.json",
    responses (
        (status = 200, description = "OpenAPI document of this service")
    ),
    tag = "openapi",
)]
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(crate::conferma::openapi())
}

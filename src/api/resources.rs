//! Emergency resource lookup

use axum::{Json, Router, extract::Path, routing::get};
use serde::Serialize;

use crate::resources::{EmergencyResource, emergency_resources};

#[derive(Serialize)]
pub struct ResourcesResponse {
    pub country: String,
    pub resources: &'static [EmergencyResource],
}

async fn lookup(Path(country): Path<String>) -> Json<ResourcesResponse> {
    let country = country.trim().to_ascii_uppercase();
    let resources = emergency_resources(&country);
    Json(ResourcesResponse { country, resources })
}

/// Build resources router (static data, no state needed)
pub fn router() -> Router {
    Router::new().route("/{country}", get(lookup))
}

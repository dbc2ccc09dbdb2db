use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Linket API",
            "version": version,
            "description": "Digital business card backend: profiles, links, lead capture, NFC tags",
            "endpoints": {
                "profiles": "/profiles[/:id[/activate]] (owner)",
                "account": "/account, /account/handle (owner)",
                "lead_form": "/lead-form/fields[/:key], /lead-form/settings (owner)",
                "leads": "/leads[/export] (owner)",
                "vcard": "/vcard (owner)",
                "tags": "/tags[/claim|/:id/assignment] (owner)",
                "analytics": "/analytics (owner)",
                "admin": "/admin/tags (admin)",
                "public": "/public/:handle[/form|/leads|/contact.vcf], /t/:chip_uid",
            }
        }
    }))
}

/// GET /health - liveness plus a storage round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend_name();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "storage": backend,
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "storage unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "storage": backend,
                    }
                })),
            )
        }
    }
}

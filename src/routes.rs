use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{elevated, protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// The full HTTP surface.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        .merge(public_routes())
        .merge(owner_routes().route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware)))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::permissive().allow_origin(origins)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .route("/public/:handle", get(public::profile::get))
        .route("/public/:handle/form", get(public::lead_form::get))
        .route("/public/:handle/leads", post(public::lead_form::submit))
        .route("/public/:handle/contact.vcf", get(public::vcard::get))
        .route("/t/:chip_uid", get(public::tap::get))
}

fn owner_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(protected::profiles::list).post(protected::profiles::save))
        .route("/profiles/:id", delete(protected::profiles::delete))
        .route("/profiles/:id/activate", post(protected::profiles::activate))
        .route("/account", put(protected::account::update))
        .route("/account/handle", get(protected::account::handle))
        .route(
            "/lead-form/fields",
            get(protected::lead_form::fields_get).put(protected::lead_form::fields_put),
        )
        .route("/lead-form/fields/:key", delete(protected::lead_form::field_delete))
        .route(
            "/lead-form/settings",
            get(protected::lead_form::settings_get).put(protected::lead_form::settings_put),
        )
        .route("/leads", get(protected::leads::list))
        .route("/leads/export", get(protected::leads::export))
        .route("/vcard", get(protected::vcard::get).put(protected::vcard::put))
        .route("/tags", get(protected::tags::list))
        .route("/tags/claim", post(protected::tags::claim))
        .route(
            "/tags/:id/assignment",
            put(protected::tags::assign).delete(protected::tags::release),
        )
        .route("/analytics", get(protected::analytics::get))
        .route("/admin/tags", post(elevated::tags::register))
}

//! OpenAPI document

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::handlers::{auth, health, notes};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        notes::list_notes,
        notes::create_note,
        notes::get_note,
        notes::update_note,
        notes::delete_note,
        health::health_check,
        health::readiness_check,
        health::prometheus_metrics,
    ),
    components(schemas(
        crate::auth::Credentials,
        crate::auth::RefreshRequest,
        auth::MessageResponse,
        auth::LoginResponse,
        auth::RefreshResponse,
        notes_core::Note,
        notes_core::NoteInput,
        health::HealthResponse,
        health::ReadinessResponse,
        crate::error::ApiError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and session tokens"),
        (name = "notes", description = "Per-user notes"),
        (name = "health", description = "Probes and metrics")
    )
)]
pub struct ApiDoc;

/// Registers the bearer token scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

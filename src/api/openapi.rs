use super::handlers::{auth, health, notes, users};
use crate::auth::require_access_token;
use axum::middleware;
use utoipa::openapi::{
    security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Contact, InfoBuilder, License, OpenApiBuilder, Tag,
};
use utoipa_axum::{router::OpenApiRouter, routes};

pub const PROTECTED_PREFIX: &str = "/api/v1/protected";

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Protected routes sit behind [`require_access_token`]; sign-up, sign-in,
/// refresh and health do not.
pub(crate) fn api_router() -> OpenApiRouter {
    let protected = OpenApiRouter::new()
        .routes(routes!(users::me))
        .routes(routes!(users::get_user, users::update_user, users::delete_user))
        .routes(routes!(users::get_user_by_login))
        .routes(routes!(notes::create_note))
        .routes(routes!(notes::get_note, notes::update_note, notes::delete_note))
        .routes(routes!(notes::list_by_user))
        .routes(routes!(notes::count_by_user))
        .layer(middleware::from_fn(require_access_token));

    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::sign_up))
        .routes(routes!(auth::sign_in))
        .routes(routes!(auth::refresh))
        .nest(PROTECTED_PREFIX, protected);

    let openapi = router.get_openapi_mut();
    openapi.tags = Some(vec![
        tag("auth", "Sign-up, sign-in and token refresh"),
        tag("users", "Accounts; mutations are restricted to the account itself"),
        tag("notes", "Notes; every operation is restricted to the owner"),
        tag("health", "Service and database health"),
    ]);
    openapi
        .components
        .get_or_insert_with(Default::default)
        .add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );

    router
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // "Name <email>"; only the first author is used.
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    let (name, email) = match primary.split_once('<') {
        Some((name, email)) => (name.trim(), email.trim_end_matches('>').trim()),
        None => (primary, ""),
    };
    if name.is_empty() && email.is_empty() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = optional_str(name).map(str::to_string);
    contact.email = optional_str(email).map(str::to_string);
    Some(contact)
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        let contact = spec.info.contact.unwrap_or_default();
        assert_eq!(contact.name.as_deref(), Some("Team Notekeeper"));
        assert_eq!(contact.email.as_deref(), Some("team@notekeeper.dev"));
    }

    #[test]
    fn protected_routes_are_prefixed() {
        let spec = openapi();
        let paths: Vec<&String> = spec.paths.paths.keys().collect();
        for expected in [
            "/health",
            "/api/v1/auth/sign-up",
            "/api/v1/auth/sign-in",
            "/api/v1/auth/refresh",
            "/api/v1/protected/users/me",
            "/api/v1/protected/users/{id}",
            "/api/v1/protected/users/by-login/{login}",
            "/api/v1/protected/notes",
            "/api/v1/protected/notes/{id}",
            "/api/v1/protected/notes/by-user/{id}",
            "/api/v1/protected/notes/count-by-user/{id}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}: {paths:?}"
            );
        }
    }

    #[test]
    fn bearer_scheme_is_declared() {
        let spec = openapi();
        let components = spec.components.unwrap_or_default();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}

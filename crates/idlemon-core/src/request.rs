// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Player-facing routes and their request bodies.
//!
//! Each [`Route`] declares whether it needs an authenticated player and which
//! body schema it accepts. [`parse_body`] is the single entry point for turning
//! raw bytes into a validated request.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Largest accepted request body.
pub const MAX_REQUEST_BODY_BYTES: usize = 512;

/// Player name length bounds, in characters.
pub const NAME_MIN_LEN: usize = 3;
/// See [`NAME_MIN_LEN`].
pub const NAME_MAX_LEN: usize = 16;

/// Password length bounds, in characters.
pub const PASSWORD_MIN_LEN: usize = 8;
/// See [`PASSWORD_MIN_LEN`].
pub const PASSWORD_MAX_LEN: usize = 72;

/// Longest accepted email address.
pub const EMAIL_MAX_LEN: usize = 254;

/// HTTP method of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read-only.
    Get,
    /// Create.
    Post,
    /// Update.
    Put,
}

/// Body schema accepted by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySchema {
    /// [`SignUpRequest`].
    SignUp,
    /// [`SignInRequest`].
    SignIn,
    /// [`RenameRequest`].
    Rename,
}

/// Every player-facing route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /`
    HealthCheck,
    /// `GET /version`
    Version,
    /// `PUT /campaign/collect`
    CampaignCollect,
    /// `PUT /daily-quest/:id/complete`
    DailyQuestComplete,
    /// `PUT /summon/unit`
    SummonUnit,
    /// `PUT /unit/:id/toggle-lock`
    UnitToggleLock,
    /// `POST /user/sign-up`
    SignUp,
    /// `POST /user/sign-in`
    SignIn,
    /// `POST /user/sign-out`
    SignOut,
    /// `PUT /user/rename`
    Rename,
}

impl Route {
    /// All routes.
    pub const ALL: [Route; 10] = [
        Route::HealthCheck,
        Route::Version,
        Route::CampaignCollect,
        Route::DailyQuestComplete,
        Route::SummonUnit,
        Route::UnitToggleLock,
        Route::SignUp,
        Route::SignIn,
        Route::SignOut,
        Route::Rename,
    ];

    /// The route's method.
    pub fn method(&self) -> Method {
        match self {
            Route::HealthCheck | Route::Version => Method::Get,
            Route::SignUp | Route::SignIn | Route::SignOut => Method::Post,
            _ => Method::Put,
        }
    }

    /// The route's path pattern.
    pub fn path(&self) -> &'static str {
        match self {
            Route::HealthCheck => "/",
            Route::Version => "/version",
            Route::CampaignCollect => "/campaign/collect",
            Route::DailyQuestComplete => "/daily-quest/:id/complete",
            Route::SummonUnit => "/summon/unit",
            Route::UnitToggleLock => "/unit/:id/toggle-lock",
            Route::SignUp => "/user/sign-up",
            Route::SignIn => "/user/sign-in",
            Route::SignOut => "/user/sign-out",
            Route::Rename => "/user/rename",
        }
    }

    /// Whether the route needs a valid authorization header.
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Route::HealthCheck | Route::Version | Route::SignUp | Route::SignIn
        )
    }

    /// The body schema the route accepts, if any.
    pub fn body(&self) -> Option<BodySchema> {
        match self {
            Route::SignUp => Some(BodySchema::SignUp),
            Route::SignIn => Some(BodySchema::SignIn),
            Route::Rename => Some(BodySchema::Rename),
            _ => None,
        }
    }
}

/// `POST /user/sign-up`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    /// Display name.
    pub name: String,
    /// Sign-in email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

impl SignUpRequest {
    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// `POST /user/sign-in`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    /// Sign-in email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

impl SignInRequest {
    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// `PUT /user/rename`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameRequest {
    /// New display name.
    pub name: String,
}

impl RenameRequest {
    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }
}

/// A parsed and validated request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Sign-up body.
    SignUp(SignUpRequest),
    /// Sign-in body.
    SignIn(SignInRequest),
    /// Rename body.
    Rename(RenameRequest),
}

/// Parse `bytes` as the body of `route` and validate it.
pub fn parse_body(route: Route, bytes: &[u8]) -> Result<RequestBody> {
    let Some(schema) = route.body() else {
        return Err(Error::validation("body", "this route does not accept a body"));
    };
    if bytes.len() > MAX_REQUEST_BODY_BYTES {
        return Err(Error::validation(
            "body",
            format!("must be at most {} bytes", MAX_REQUEST_BODY_BYTES),
        ));
    }

    let body = match schema {
        BodySchema::SignUp => {
            let req: SignUpRequest = decode(bytes)?;
            req.validate()?;
            RequestBody::SignUp(req)
        }
        BodySchema::SignIn => {
            let req: SignInRequest = decode(bytes)?;
            req.validate()?;
            RequestBody::SignIn(req)
        }
        BodySchema::Rename => {
            let req: RenameRequest = decode(bytes)?;
            req.validate()?;
            RequestBody::Rename(req)
        }
    };
    Ok(body)
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::validation("body", e.to_string()))
}

/// Names are 3-16 characters of ASCII letters, digits, and underscores.
pub fn validate_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(Error::validation(
            "name",
            format!(
                "must be between {} and {} characters",
                NAME_MIN_LEN, NAME_MAX_LEN
            ),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::validation(
            "name",
            "may only contain letters, digits, and underscores",
        ));
    }
    Ok(())
}

/// Emails have exactly one `@` with non-empty parts on both sides and no whitespace.
pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() || email.len() > EMAIL_MAX_LEN {
        return Err(Error::validation(
            "email",
            format!("must be between 1 and {} characters", EMAIL_MAX_LEN),
        ));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(Error::validation("email", "must not contain whitespace"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(Error::validation("email", "must be a valid email address")),
    }
}

/// Passwords are 8-72 characters.
pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(Error::validation(
            "password",
            format!(
                "must be between {} and {} characters",
                PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
            ),
        ));
    }
    Ok(())
}

/// Canonical form used for email lookups and uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.to_ascii_lowercase()
}

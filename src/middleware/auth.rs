// ABOUTME: Authentication middleware for the chat API
// ABOUTME: Checks the app-check header, decodes the bearer token and stores the identity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, Span};

use crate::auth::authenticate_header;
use crate::context::ServerContext;
use crate::errors::AppError;

/// Header carrying the client attestation token
pub const APP_CHECK_HEADER: &str = "x-firebase-appcheck";

/// Reject requests without a valid identity and attach it to the request
///
/// When the server requires app check, the `X-Firebase-AppCheck` header must
/// be present as well. Its value is not verified.
///
/// ```rust,no_run
/// use axum::{middleware, routing::get, Router};
/// use chatrail_server::context::ServerContext;
/// use chatrail_server::middleware::require_auth;
///
/// # async fn handler() -> &'static str { "" }
/// # fn example(context: ServerContext) {
/// let app: Router<ServerContext> = Router::new()
///     .route("/", get(handler))
///     .layer(middleware::from_fn_with_state(context, require_auth));
/// # }
/// ```
pub async fn require_auth(
    State(context): State<ServerContext>,
    mut req: Request,
    next: Next,
) -> Response {
    if context.config().require_app_check && !req.headers().contains_key(APP_CHECK_HEADER) {
        debug!("Missing X-Firebase-AppCheck header");
        return AppError::auth_invalid("Missing X-Firebase-AppCheck header").into_response();
    }

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match authenticate_header(header) {
        Ok(user) => {
            Span::current().record("user_id", user.id.as_str());
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(error) => {
            debug!(code = ?error.code, "Authentication failed");
            // Token details are never echoed back
            AppError::auth_required().into_response()
        }
    }
}

//! HTTP handlers for billing endpoints.
//!
//! These handlers connect axum routes to application layer
//! command/query handlers. Business-rule denials (exhausted credits,
//! grace-period blocks, missing subscription) come back as structured
//! responses, never 500s.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    DownloadThemeCommand, DownloadThemeHandler, DownloadThemeResult, GetCreditStatusHandler,
    GetCreditStatusQuery, GetEntitlementHandler, GetEntitlementQuery, ProcessBillingEventCommand,
    ProcessBillingEventHandler,
};
use crate::domain::billing::{WebhookError, WebhookVerifier};
use crate::domain::foundation::{DomainError, ErrorCode, ThemeId};
use crate::ports::{
    DownloadLog, EarlyAdopterPool, LicenseStore, Mailer, SubscriptionStore, UserDirectory,
    WebhookEventLedger,
};

use super::super::middleware::RequireAuth;
use super::dto::{
    DownloadThemeRequest, DownloadThemeResponse, EntitlementResponse, ErrorResponse,
    SubscriptionSummaryResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub verifier: WebhookVerifier,
    pub ledger: Arc<dyn WebhookEventLedger>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub downloads: Arc<dyn DownloadLog>,
    pub licenses: Arc<dyn LicenseStore>,
    pub slot_pool: Arc<dyn EarlyAdopterPool>,
    pub users: Arc<dyn UserDirectory>,
    pub mailer: Arc<dyn Mailer>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn webhook_handler(&self) -> ProcessBillingEventHandler {
        ProcessBillingEventHandler::new(
            self.verifier.clone(),
            self.ledger.clone(),
            self.subscriptions.clone(),
            self.licenses.clone(),
            self.slot_pool.clone(),
            self.users.clone(),
            self.mailer.clone(),
        )
    }

    pub fn download_handler(&self) -> DownloadThemeHandler {
        DownloadThemeHandler::new(
            self.subscriptions.clone(),
            self.downloads.clone(),
            self.users.clone(),
        )
    }

    pub fn entitlement_handler(&self) -> GetEntitlementHandler {
        GetEntitlementHandler::new(self.subscriptions.clone(), self.users.clone())
    }

    pub fn credit_status_handler(&self) -> GetCreditStatusHandler {
        GetCreditStatusHandler::new(self.subscriptions.clone(), self.downloads.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/billing - Process a billing provider webhook.
///
/// The raw body must reach the verifier byte-exact; any re-encoding
/// breaks the HMAC.
pub async fn handle_billing_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> axum::response::Response {
    let Some(signature) = headers
        .get("Billing-Signature")
        .and_then(|v| v.to_str().ok())
    else {
        let error = ErrorResponse::new("MISSING_SIGNATURE", "Missing Billing-Signature header");
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    };

    let handler = state.webhook_handler();
    let cmd = ProcessBillingEventCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    match handler.handle(cmd).await {
        Ok(_) => (StatusCode::OK, Json(WebhookAckResponse { received: true })).into_response(),
        Err(err) => webhook_error_response(err),
    }
}

fn webhook_error_response(err: WebhookError) -> axum::response::Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(error = %err, retryable = err.is_retryable(), "webhook processing failed");
    } else {
        tracing::warn!(error = %err, "webhook delivery rejected");
    }
    let error = ErrorResponse::new("WEBHOOK_ERROR", err.to_string());
    (status, Json(error)).into_response()
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/extension/status - Resolved entitlement for the extension.
pub async fn get_extension_status(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.entitlement_handler();
    let query = GetEntitlementQuery {
        user_id: user.user_id,
    };

    let status = handler.handle(query).await?;
    Ok(Json(EntitlementResponse::from(status)))
}

/// GET /api/subscription - Credit position and recent downloads.
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.credit_status_handler();
    let query = GetCreditStatusQuery {
        user_id: user.user_id,
    };

    let result = handler.handle(query).await?;
    Ok(Json(SubscriptionSummaryResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/download - Consume a credit (or exercise the redownload
/// exemption) for a premium theme.
pub async fn download_theme(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<DownloadThemeRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let theme_id = ThemeId::new(request.theme_id)
        .map_err(|e| DomainError::validation("theme_id", e.to_string()))?;

    let handler = state.download_handler();
    let cmd = DownloadThemeCommand {
        user_id: user.user_id,
        theme_id,
    };

    match handler.handle(cmd).await? {
        DownloadThemeResult::Allowed {
            is_redownload,
            credits,
        } => {
            let response = DownloadThemeResponse {
                allowed: true,
                is_redownload,
                reason: None,
                credits: credits.map(Into::into),
            };
            Ok((StatusCode::OK, Json(response)))
        }
        DownloadThemeResult::Denied { reason } => {
            let response = DownloadThemeResponse {
                allowed: false,
                is_redownload: false,
                reason: Some(reason),
                credits: None,
            };
            Ok((StatusCode::FORBIDDEN, Json(response)))
        }
    }
}

/// GET /health - Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
pub struct BillingApiError(DomainError);

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
            ErrorCode::SubscriptionNotFound
            | ErrorCode::LicenseNotFound
            | ErrorCode::UserNotFound
            | ErrorCode::ThemeNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidStateTransition | ErrorCode::EventAlreadyCompleted => {
                StatusCode::CONFLICT
            }
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::DatabaseError | ErrorCode::EmailError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(code = %self.0.code, error = %self.0, "request failed");
        }

        let body = ErrorResponse::new(self.0.code.to_string(), self.0.message.clone());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_theme_not_found_to_404() {
        let err = BillingApiError(DomainError::new(ErrorCode::ThemeNotFound, "unknown theme"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_maps_validation_to_400() {
        let err = BillingApiError(DomainError::validation("theme_id", "empty"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_maps_database_to_500() {
        let err = BillingApiError(DomainError::database("connection lost"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn webhook_error_response_uses_error_status() {
        let response = webhook_error_response(WebhookError::InProgress);
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = webhook_error_response(WebhookError::InvalidSignature);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

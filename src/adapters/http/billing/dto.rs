//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the
//! billing API. They serve as the boundary between HTTP and the
//! application layer.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::GetCreditStatusResult;
use crate::domain::billing::{CreditStatus, EntitlementStatus, PlanType, SubscriptionStatus};
use crate::ports::DownloadRecord;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to download a premium theme.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadThemeRequest {
    pub theme_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned to the billing provider.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

/// Resolved entitlement for the extension status check.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementResponse {
    pub has_subscription: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanType>,
    pub is_lifetime: bool,
    pub has_full_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<String>,
    pub accessible_themes: Vec<String>,
}

impl From<EntitlementStatus> for EntitlementResponse {
    fn from(status: EntitlementStatus) -> Self {
        Self {
            has_subscription: status.has_subscription,
            status: status.status,
            plan: status.plan,
            is_lifetime: status.is_lifetime,
            has_full_access: status.has_full_access,
            current_period_end: status
                .current_period_end
                .map(|t| t.as_datetime().to_rfc3339()),
            trial_ends_at: status.trial_ends_at.map(|t| t.as_datetime().to_rfc3339()),
            accessible_themes: status
                .accessible_themes
                .into_iter()
                .map(|t| t.as_str().to_string())
                .collect(),
        }
    }
}

/// Credit position within the current billing period.
#[derive(Debug, Clone, Serialize)]
pub struct CreditStatusResponse {
    pub remaining: i32,
    pub used: i32,
    pub total: i32,
    /// End of period, when credits reset (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<String>,
    /// True when access survives only until the period closes.
    pub is_grace_period: bool,
}

impl From<CreditStatus> for CreditStatusResponse {
    fn from(credits: CreditStatus) -> Self {
        Self {
            remaining: credits.remaining,
            used: credits.used,
            total: credits.total,
            resets_at: credits.resets_at.map(|t| t.as_datetime().to_rfc3339()),
            is_grace_period: credits.is_grace_period,
        }
    }
}

/// One entry in the download history.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadHistoryEntry {
    pub theme_id: String,
    pub downloaded_at: String,
}

impl From<DownloadRecord> for DownloadHistoryEntry {
    fn from(record: DownloadRecord) -> Self {
        Self {
            theme_id: record.theme_id.as_str().to_string(),
            downloaded_at: record.downloaded_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Account-page subscription summary.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummaryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<CreditStatusResponse>,
    pub recent_downloads: Vec<DownloadHistoryEntry>,
}

impl From<GetCreditStatusResult> for SubscriptionSummaryResponse {
    fn from(result: GetCreditStatusResult) -> Self {
        Self {
            credits: result.credits.map(CreditStatusResponse::from),
            recent_downloads: result
                .recent_downloads
                .into_iter()
                .map(DownloadHistoryEntry::from)
                .collect(),
        }
    }
}

/// Response for a download attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadThemeResponse {
    pub allowed: bool,
    pub is_redownload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<CreditStatusResponse>,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entitlement_response_omits_absent_fields() {
        let response = EntitlementResponse::from(EntitlementStatus::none());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["has_subscription"], false);
        assert!(json.get("status").is_none());
        assert!(json.get("current_period_end").is_none());
        assert_eq!(json["accessible_themes"], serde_json::json!([]));
    }

    #[test]
    fn internal_entitlement_serializes_full_catalog() {
        let response = EntitlementResponse::from(EntitlementStatus::internal());
        assert!(response.has_full_access);
        assert!(!response.accessible_themes.is_empty());
    }
}

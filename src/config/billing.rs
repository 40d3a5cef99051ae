//! Billing configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Billing configuration (webhook verification)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingConfig {
    /// Webhook signing secret shared with the billing provider
    pub webhook_secret: String,
}

impl BillingConfig {
    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_WEBHOOK_SECRET"));
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_missing_secret() {
        let config = BillingConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_secret_prefix() {
        let config = BillingConfig {
            webhook_secret: "secret_xxx".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        let config = BillingConfig {
            webhook_secret: "whsec_xyz789".to_string(),
        };
        assert!(config.validate().is_ok());
    }
}

//! ProcessBillingEventHandler - Command handler for billing provider webhooks.
//!
//! Pipeline: verify signature, acquire the idempotency lock, dispatch on
//! event type, then mark the ledger completed or abandoned. Side effects
//! only run while this delivery holds the lock.

use std::sync::Arc;

use crate::domain::billing::{
    BillingEvent, BillingEventKind, CheckoutSessionObject, InvoiceObject, LicenseEntitlement,
    LicenseKind, PlanType, Subscription, SubscriptionObject, SubscriptionStatus, WebhookError,
    WebhookVerifier, SUBSCRIPTION_MAX_SLOTS,
};
use crate::domain::foundation::{SubscriptionId, ThemeId, Timestamp, UserId};
use crate::ports::{
    BeginOutcome, EarlyAdopterPool, LicenseStore, Mailer, SubscriptionStore, UserDirectory,
    WebhookEventLedger,
};

/// Command to process an incoming billing webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessBillingEventCommand {
    /// Raw request body, byte-exact as received.
    pub payload: Vec<u8>,
    /// Signature header (`t=<ts>,v1=<hex>`).
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessBillingEventResult {
    /// A previous delivery already completed this event.
    AlreadyProcessed,
    /// Checkout completed; subscription record and license exist.
    CheckoutProcessed { subscription_id: SubscriptionId },
    /// Single-theme purchase completed; lifetime license created.
    ThemePurchaseProcessed { license_key: String },
    /// Invoice payment applied.
    InvoiceProcessed { converted_to_lifetime: bool },
    /// Renewal payment failed; user notified, no state change.
    PaymentFailureNotified,
    /// Provider-side subscription change applied.
    SubscriptionUpdated,
    /// Subscription deleted; record expired and licenses deactivated.
    SubscriptionExpired,
    /// Trial-ending reminder sent.
    TrialEndingNotified,
    /// Event type we don't handle.
    Ignored,
}

/// Handler for billing provider webhooks.
pub struct ProcessBillingEventHandler {
    verifier: WebhookVerifier,
    ledger: Arc<dyn WebhookEventLedger>,
    subscriptions: Arc<dyn SubscriptionStore>,
    licenses: Arc<dyn LicenseStore>,
    slot_pool: Arc<dyn EarlyAdopterPool>,
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn Mailer>,
}

impl ProcessBillingEventHandler {
    pub fn new(
        verifier: WebhookVerifier,
        ledger: Arc<dyn WebhookEventLedger>,
        subscriptions: Arc<dyn SubscriptionStore>,
        licenses: Arc<dyn LicenseStore>,
        slot_pool: Arc<dyn EarlyAdopterPool>,
        users: Arc<dyn UserDirectory>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            verifier,
            ledger,
            subscriptions,
            licenses,
            slot_pool,
            users,
            mailer,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessBillingEventCommand,
    ) -> Result<ProcessBillingEventResult, WebhookError> {
        // 1. Verify signature before touching any state
        let event = self.verifier.verify_and_parse(&cmd.payload, &cmd.signature)?;

        // 2. Acquire the idempotency lock
        match self.ledger.begin_processing(&event.id).await? {
            BeginOutcome::Acquired => {}
            BeginOutcome::AlreadyProcessed => {
                tracing::debug!(event_id = %event.id, "duplicate delivery, already completed");
                return Ok(ProcessBillingEventResult::AlreadyProcessed);
            }
            BeginOutcome::InProgress => return Err(WebhookError::InProgress),
        }

        // 3. Dispatch, then settle the ledger either way
        match self.dispatch(&event).await {
            Ok(result) => {
                self.ledger
                    .complete_processing(&event.id, &event.event_type)
                    .await?;
                Ok(result)
            }
            Err(err) => {
                if let Err(abandon_err) = self.ledger.abandon_processing(&event.id).await {
                    tracing::error!(
                        event_id = %event.id,
                        error = %abandon_err,
                        "failed to release webhook lock after handler error"
                    );
                }
                Err(err)
            }
        }
    }

    async fn dispatch(
        &self,
        event: &BillingEvent,
    ) -> Result<ProcessBillingEventResult, WebhookError> {
        match event.kind() {
            BillingEventKind::CheckoutSessionCompleted => {
                self.handle_checkout_completed(event).await
            }
            BillingEventKind::InvoicePaid => self.handle_invoice_paid(event).await,
            BillingEventKind::InvoicePaymentFailed => {
                self.handle_invoice_payment_failed(event).await
            }
            BillingEventKind::SubscriptionUpdated => self.handle_subscription_updated(event).await,
            BillingEventKind::SubscriptionDeleted => self.handle_subscription_deleted(event).await,
            BillingEventKind::TrialWillEnd => self.handle_trial_will_end(event).await,
            BillingEventKind::Unknown => {
                tracing::debug!(event_type = %event.event_type, "ignoring unhandled event type");
                Ok(ProcessBillingEventResult::Ignored)
            }
        }
    }

    async fn handle_checkout_completed(
        &self,
        event: &BillingEvent,
    ) -> Result<ProcessBillingEventResult, WebhookError> {
        let session: CheckoutSessionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        if session.metadata.purchase_type.as_deref() == Some("theme") {
            return self.handle_theme_purchase(&session).await;
        }

        let user_id = self.resolve_user_id(&session).await?;
        let plan = PlanType::from_metadata(session.metadata.plan_type.as_deref().unwrap_or(""));
        let external_subscription_id = session
            .subscription
            .clone()
            .ok_or(WebhookError::MissingField("subscription"))?;
        let external_customer_id = session
            .customer
            .clone()
            .ok_or(WebhookError::MissingField("customer"))?;

        // Redeliveries of the same checkout must not duplicate records
        if let Some(existing) = self
            .subscriptions
            .find_by_external_id(&external_subscription_id)
            .await?
        {
            tracing::info!(
                subscription_id = %existing.id,
                "checkout already materialized, skipping insert"
            );
            return Ok(ProcessBillingEventResult::CheckoutProcessed {
                subscription_id: existing.id,
            });
        }

        let now = Timestamp::now();
        // A present trial end puts the record in Trialing; billing
        // periods arrive with the first invoice
        let trial_ends_at = session.trial_end.map(Timestamp::from_unix_secs);
        let subscription = Subscription::from_checkout(
            SubscriptionId::new(),
            user_id.clone(),
            external_subscription_id,
            external_customer_id,
            plan,
            None,
            None,
            trial_ends_at,
            now,
        );
        self.subscriptions.insert(&subscription).await?;

        let license =
            LicenseEntitlement::for_subscription(user_id.clone(), SUBSCRIPTION_MAX_SLOTS, now);
        self.licenses.create(&license).await?;

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %user_id.as_str(),
            plan = %plan,
            "subscription created from checkout"
        );

        if let Some(email) = self.recipient_email(&session.customer_email, &user_id).await {
            if let Err(err) = self
                .mailer
                .send_subscription_confirmation(&email, plan, license.key.as_str())
                .await
            {
                tracing::warn!(error = %err, "failed to send subscription confirmation");
            }
        }

        Ok(ProcessBillingEventResult::CheckoutProcessed {
            subscription_id: subscription.id,
        })
    }

    async fn handle_theme_purchase(
        &self,
        session: &CheckoutSessionObject,
    ) -> Result<ProcessBillingEventResult, WebhookError> {
        let user_id = self.resolve_user_id(session).await?;
        let theme_id = session
            .metadata
            .theme_id
            .as_deref()
            .ok_or(WebhookError::MissingMetadata("theme_id"))?;
        let theme_id =
            ThemeId::new(theme_id).map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let now = Timestamp::now();
        let license = LicenseEntitlement::for_theme_purchase(user_id.clone(), theme_id.clone(), now);
        self.licenses.create(&license).await?;

        tracing::info!(
            user_id = %user_id.as_str(),
            theme_id = %theme_id.as_str(),
            "lifetime theme license created"
        );

        if let Some(email) = self.recipient_email(&session.customer_email, &user_id).await {
            if let Err(err) = self
                .mailer
                .send_theme_purchase(&email, &theme_id, license.key.as_str())
                .await
            {
                tracing::warn!(error = %err, "failed to send theme purchase receipt");
            }
        }

        Ok(ProcessBillingEventResult::ThemePurchaseProcessed {
            license_key: license.key.as_str().to_string(),
        })
    }

    async fn handle_invoice_paid(
        &self,
        event: &BillingEvent,
    ) -> Result<ProcessBillingEventResult, WebhookError> {
        let invoice: InvoiceObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let external_id = invoice
            .subscription
            .as_deref()
            .ok_or(WebhookError::MissingField("subscription"))?;

        // SubscriptionNotFound is retryable: the checkout event that
        // creates the record may still be in flight
        let subscription = self
            .subscriptions
            .find_by_external_id(external_id)
            .await?
            .ok_or(WebhookError::SubscriptionNotFound)?;

        let now = Timestamp::now();
        let mut converted_to_lifetime = false;

        if invoice.is_subscription_create() {
            if let Some(period) = invoice.line_period() {
                let mut record = subscription.clone();
                record.current_period_start = Some(Timestamp::from_unix_secs(period.start));
                record.current_period_end = Some(Timestamp::from_unix_secs(period.end));
                record.updated_at = now;
                self.subscriptions.update(&record).await?;
            }

            if subscription.plan == PlanType::Yearly && !subscription.is_lifetime {
                converted_to_lifetime =
                    self.try_claim_lifetime_slot(&subscription.id, now).await?;
            }

            if converted_to_lifetime {
                if let Some(email) = self.lookup_email(&subscription.user_id).await {
                    if let Err(err) = self.mailer.send_lifetime_conversion(&email).await {
                        tracing::warn!(error = %err, "failed to send lifetime conversion note");
                    }
                }
            }
        } else if invoice.is_subscription_cycle() {
            let period = invoice
                .line_period()
                .ok_or(WebhookError::MissingField("lines"))?;
            let reset = self
                .subscriptions
                .reset_billing_period(
                    &subscription.id,
                    Timestamp::from_unix_secs(period.start),
                    Timestamp::from_unix_secs(period.end),
                )
                .await?;
            if !reset {
                return Err(WebhookError::SubscriptionNotFound);
            }
            tracing::info!(
                subscription_id = %subscription.id,
                "billing period rolled forward, credits reset"
            );
        }

        Ok(ProcessBillingEventResult::InvoiceProcessed {
            converted_to_lifetime,
        })
    }

    /// Early-adopter conversion saga: claim a slot, convert the record,
    /// release the slot if conversion does not land.
    async fn try_claim_lifetime_slot(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<bool, WebhookError> {
        if !self.slot_pool.claim_slot().await? {
            return Ok(false);
        }

        match self.subscriptions.convert_to_lifetime(id, now).await {
            Ok(true) => {
                tracing::info!(subscription_id = %id, "early adopter converted to lifetime");
                Ok(true)
            }
            Ok(false) => {
                self.release_claimed_slot(id).await;
                Ok(false)
            }
            Err(err) => {
                self.release_claimed_slot(id).await;
                Err(err.into())
            }
        }
    }

    async fn release_claimed_slot(&self, id: &SubscriptionId) {
        if let Err(err) = self.slot_pool.release_slot().await {
            tracing::error!(
                subscription_id = %id,
                error = %err,
                "failed to release early adopter slot after conversion failure"
            );
        }
    }

    async fn handle_invoice_payment_failed(
        &self,
        event: &BillingEvent,
    ) -> Result<ProcessBillingEventResult, WebhookError> {
        let invoice: InvoiceObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        // Notification only; the provider's dunning flow decides whether
        // the subscription eventually gets deleted
        let email = match &invoice.customer_email {
            Some(email) => Some(email.clone()),
            None => match invoice.subscription.as_deref() {
                Some(external_id) => {
                    match self.subscriptions.find_by_external_id(external_id).await? {
                        Some(subscription) => self.lookup_email(&subscription.user_id).await,
                        None => None,
                    }
                }
                None => None,
            },
        };

        if let Some(email) = email {
            if let Err(err) = self.mailer.send_payment_failed(&email).await {
                tracing::warn!(error = %err, "failed to send payment failure notice");
            }
        } else {
            tracing::warn!(invoice_id = %invoice.id, "no recipient for payment failure notice");
        }

        Ok(ProcessBillingEventResult::PaymentFailureNotified)
    }

    async fn handle_subscription_updated(
        &self,
        event: &BillingEvent,
    ) -> Result<ProcessBillingEventResult, WebhookError> {
        let object: SubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let mut subscription = self
            .subscriptions
            .find_by_external_id(&object.id)
            .await?
            .ok_or(WebhookError::SubscriptionNotFound)?;

        let now = Timestamp::now();
        if let Some(start) = object.current_period_start {
            subscription.current_period_start = Some(Timestamp::from_unix_secs(start));
        }
        if let Some(end) = object.current_period_end {
            subscription.current_period_end = Some(Timestamp::from_unix_secs(end));
        }
        if let Some(trial_end) = object.trial_end {
            subscription.trial_ends_at = Some(Timestamp::from_unix_secs(trial_end));
        }

        if object.cancel_at_period_end && subscription.status.is_live() {
            subscription
                .cancel(now)
                .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
            tracing::info!(subscription_id = %subscription.id, "cancellation scheduled");
        } else if !object.cancel_at_period_end
            && subscription.status == SubscriptionStatus::Canceled
        {
            subscription
                .reverse_cancellation(now)
                .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
            tracing::info!(subscription_id = %subscription.id, "cancellation reversed");
        } else if object.status == "active"
            && subscription.status == SubscriptionStatus::Trialing
        {
            subscription
                .activate(now)
                .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
            tracing::info!(subscription_id = %subscription.id, "trial converted to active");
        }

        subscription.updated_at = now;
        self.subscriptions.update(&subscription).await?;

        Ok(ProcessBillingEventResult::SubscriptionUpdated)
    }

    async fn handle_subscription_deleted(
        &self,
        event: &BillingEvent,
    ) -> Result<ProcessBillingEventResult, WebhookError> {
        let object: SubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let mut subscription = self
            .subscriptions
            .find_by_external_id(&object.id)
            .await?
            .ok_or(WebhookError::SubscriptionNotFound)?;

        // Redeliveries after expiry are acknowledged without a transition
        if subscription.status == SubscriptionStatus::Expired {
            return Ok(ProcessBillingEventResult::SubscriptionExpired);
        }

        let now = Timestamp::now();
        subscription
            .expire(now)
            .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
        self.subscriptions.update(&subscription).await?;

        // Lifetime conversions keep access; their licenses stay active
        if !subscription.is_lifetime {
            for mut license in self.licenses.find_by_user_id(&subscription.user_id).await? {
                if license.kind == LicenseKind::Subscription && license.active {
                    license.deactivate(now);
                    let key = license.key.clone();
                    self.licenses.update(&key, &license).await?;
                }
            }
        }

        tracing::info!(subscription_id = %subscription.id, "subscription expired");
        Ok(ProcessBillingEventResult::SubscriptionExpired)
    }

    async fn handle_trial_will_end(
        &self,
        event: &BillingEvent,
    ) -> Result<ProcessBillingEventResult, WebhookError> {
        let object: SubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let subscription = self
            .subscriptions
            .find_by_external_id(&object.id)
            .await?
            .ok_or(WebhookError::SubscriptionNotFound)?;

        let trial_ends_at = object
            .trial_end
            .map(Timestamp::from_unix_secs)
            .or(subscription.trial_ends_at)
            .ok_or(WebhookError::MissingField("trial_end"))?;

        if let Some(email) = self.lookup_email(&subscription.user_id).await {
            if let Err(err) = self.mailer.send_trial_ending(&email, &trial_ends_at).await {
                tracing::warn!(error = %err, "failed to send trial ending reminder");
            }
        }

        Ok(ProcessBillingEventResult::TrialEndingNotified)
    }

    /// User id from checkout metadata, falling back to an email lookup.
    async fn resolve_user_id(
        &self,
        session: &CheckoutSessionObject,
    ) -> Result<UserId, WebhookError> {
        if let Some(raw) = session.metadata.user_id.as_deref() {
            return UserId::new(raw).map_err(|e| WebhookError::ParseError(e.to_string()));
        }
        if let Some(email) = session.customer_email.as_deref() {
            if let Some(user) = self.users.find_by_email(email).await? {
                return Ok(user.id);
            }
        }
        Err(WebhookError::MissingMetadata("user_id"))
    }

    async fn recipient_email(
        &self,
        session_email: &Option<String>,
        user_id: &UserId,
    ) -> Option<String> {
        if let Some(email) = session_email {
            return Some(email.clone());
        }
        self.lookup_email(user_id).await
    }

    async fn lookup_email(&self, user_id: &UserId) -> Option<String> {
        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => Some(user.email),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "user lookup failed while resolving email");
                None
            }
        }
    }
}

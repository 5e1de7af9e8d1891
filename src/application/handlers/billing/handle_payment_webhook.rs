//! HandlePaymentWebhookHandler - Command handler for Stripe webhook deliveries.
//!
//! Pipeline for one delivery:
//!
//! 1. Verify the signature and decode the typed [`Event`]
//! 2. Skip events already in the processed-event ledger
//! 3. Route by kind and run its side effects, each outbound call bounded by a timeout
//! 4. Record the event id in the ledger
//!
//! Only steps 1 and 2 can fail the request. Once an event is routed, every
//! downstream failure is captured in the [`DispatchReport`] and logged, and the
//! delivery is still acknowledged so Stripe stops retrying it.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::time::timeout;

use crate::domain::billing::{
    BillingUser, DispatchReport, EffectOutcome, EffectStep, Event, EventKind, EventPayload,
    InvoiceObject, StripeWebhookVerifier, SubscriptionObject, WebhookError,
    DEFAULT_CLOCK_SKEW_SECS, DEFAULT_TOLERANCE_SECS,
};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{
    CancelOptions, LedgerError, Notifier, PaymentProvider, ProcessedEventLedger,
    UserSubscriptionStore,
};

use super::subscription_applier::{ApplyOutcome, SubscriptionStateApplier};

/// Subject of the email sent when a renewal payment fails.
pub const PAYMENT_FAILED_SUBJECT: &str = "Payment Failed - Subscription Canceled";

/// Default deadline for each outbound provider or email call.
pub const DEFAULT_OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

fn payment_failed_email_body() -> String {
    [
        "<h1>Payment Failed</h1>",
        "<p>We were unable to process the latest payment for your subscription.</p>",
        "<p>Your subscription has been canceled. You can subscribe again at any time ",
        "from your account settings.</p>",
    ]
    .concat()
}

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value, empty if absent.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone)]
pub enum HandlePaymentWebhookResult {
    /// The event was routed; the report lists every side effect attempted.
    Processed(DispatchReport),
    /// The ledger already holds this event id. Nothing was done.
    AlreadyProcessed { event_id: String },
}

/// Runtime settings for the webhook pipeline.
#[derive(Clone)]
pub struct WebhookSettings {
    /// Stripe signing secret (`whsec_...`). May be empty; requests then fail with 500.
    pub webhook_secret: SecretString,
    /// Replay window for signature timestamps.
    pub signature_tolerance_secs: i64,
    /// How far ahead of the local clock a signature timestamp may be.
    pub clock_skew_secs: i64,
    /// Deadline for each outbound call.
    pub outbound_timeout: Duration,
}

impl WebhookSettings {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: SecretString::new(webhook_secret.into()),
            signature_tolerance_secs: DEFAULT_TOLERANCE_SECS,
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            outbound_timeout: DEFAULT_OUTBOUND_TIMEOUT,
        }
    }

    pub fn with_signature_tolerance_secs(mut self, secs: i64) -> Self {
        self.signature_tolerance_secs = secs;
        self
    }

    pub fn with_clock_skew_secs(mut self, secs: i64) -> Self {
        self.clock_skew_secs = secs;
        self
    }

    pub fn with_outbound_timeout(mut self, outbound_timeout: Duration) -> Self {
        self.outbound_timeout = outbound_timeout;
        self
    }
}

/// Handler for processing Stripe webhooks.
///
/// Verifies, deduplicates and routes each event, then records it as
/// processed. Safe to share across concurrent requests.
pub struct HandlePaymentWebhookHandler {
    ledger: Arc<dyn ProcessedEventLedger>,
    applier: SubscriptionStateApplier,
    payment_provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
    verifier: StripeWebhookVerifier,
    webhook_secret: SecretString,
    outbound_timeout: Duration,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        ledger: Arc<dyn ProcessedEventLedger>,
        store: Arc<dyn UserSubscriptionStore>,
        payment_provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        settings: WebhookSettings,
    ) -> Self {
        Self {
            ledger,
            applier: SubscriptionStateApplier::new(store),
            payment_provider,
            notifier,
            verifier: StripeWebhookVerifier::new(settings.signature_tolerance_secs)
                .with_clock_skew_secs(settings.clock_skew_secs),
            webhook_secret: settings.webhook_secret,
            outbound_timeout: settings.outbound_timeout,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        // 1. Verify signature and decode
        let event = self
            .verifier
            .verify(
                &cmd.payload,
                &cmd.signature,
                self.webhook_secret.expose_secret(),
            )
            .map_err(|err| {
                log_rejection(&err);
                err
            })?;

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.kind,
            livemode = event.livemode,
            created = event.created.map(|t| t.as_unix_secs()),
            "Verified webhook event"
        );

        // 2. Deduplicate
        let seen = self
            .ledger
            .already_processed(&event.id)
            .await
            .map_err(|err| {
                tracing::error!(
                    event_id = %event.id,
                    error = %err,
                    "Failed to read processed webhook events"
                );
                WebhookError::Storage(err.to_string())
            })?;

        if seen {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.kind,
                "Webhook event already processed, skipping"
            );
            return Ok(HandlePaymentWebhookResult::AlreadyProcessed { event_id: event.id });
        }

        // 3. Route
        let mut report = self.route(&event).await;

        // 4. Record
        let recorded = match self
            .ledger
            .record_processed(&event.id, Timestamp::now())
            .await
        {
            Ok(()) => EffectOutcome::Succeeded,
            Err(LedgerError::DuplicateKey(_)) => {
                tracing::warn!(
                    event_id = %event.id,
                    "Webhook event was recorded by a concurrent delivery"
                );
                EffectOutcome::skipped("recorded by a concurrent delivery")
            }
            Err(err) => {
                tracing::error!(
                    event_id = %event.id,
                    error = %err,
                    "Failed to record processed webhook event"
                );
                EffectOutcome::failed(err)
            }
        };
        report.push(EffectStep::RecordProcessed, recorded);

        log_report(&report);
        Ok(HandlePaymentWebhookResult::Processed(report))
    }

    async fn route(&self, event: &Event) -> DispatchReport {
        let mut report = DispatchReport::new(event.id.clone(), event.kind.clone());

        match (&event.kind, &event.payload) {
            (
                EventKind::SubscriptionCreated | EventKind::SubscriptionUpdated,
                EventPayload::Subscription(subscription),
            ) => {
                let result = self.applier.apply_update(subscription).await;
                report.push(
                    EffectStep::ApplyUpdate,
                    apply_outcome(&event.id, EffectStep::ApplyUpdate, result),
                );
            }
            (EventKind::SubscriptionDeleted, EventPayload::Subscription(subscription)) => {
                let result = self.applier.apply_cancellation(subscription).await;
                report.push(
                    EffectStep::ApplyCancellation,
                    apply_outcome(&event.id, EffectStep::ApplyCancellation, result),
                );
            }
            (EventKind::InvoicePaymentSucceeded, EventPayload::Invoice(invoice)) => {
                self.handle_invoice_paid(invoice, &mut report).await;
            }
            (EventKind::InvoicePaymentFailed, EventPayload::Invoice(invoice)) => {
                self.handle_invoice_payment_failed(invoice, &mut report)
                    .await;
            }
            (EventKind::Unknown(event_type), _) => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event_type,
                    "Unhandled webhook event type"
                );
                report.push(EffectStep::Ignore, EffectOutcome::skipped("unhandled event type"));
            }
            (kind, payload) => {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %kind,
                    payload = payload.label(),
                    "Webhook payload does not match its event type"
                );
                report.push(
                    EffectStep::Ignore,
                    EffectOutcome::skipped(format!("unexpected {} payload", payload.label())),
                );
            }
        }

        report
    }

    // ════════════════════════════════════════════════════════════════════════════
    // invoice.payment_succeeded
    // ════════════════════════════════════════════════════════════════════════════

    async fn handle_invoice_paid(&self, invoice: &InvoiceObject, report: &mut DispatchReport) {
        let Some(subscription_id) = invoice.subscription_id.as_deref() else {
            tracing::debug!(invoice_id = %invoice.id, "Paid invoice has no subscription");
            report.push(
                EffectStep::FetchSubscription,
                EffectOutcome::skipped("invoice has no subscription"),
            );
            return;
        };

        // The invoice does not carry the new period end; re-read the subscription.
        let Some(subscription) = self.fetch_subscription(subscription_id, report).await else {
            return;
        };

        let result = self.applier.apply_update(&subscription).await;
        let outcome = apply_outcome(&report.event_id, EffectStep::ApplyUpdate, result);
        report.push(EffectStep::ApplyUpdate, outcome);
    }

    async fn fetch_subscription(
        &self,
        subscription_id: &str,
        report: &mut DispatchReport,
    ) -> Option<SubscriptionObject> {
        let fetched = timeout(
            self.outbound_timeout,
            self.payment_provider.get_subscription(subscription_id),
        )
        .await;

        let (outcome, subscription) = match fetched {
            Ok(Ok(Some(subscription))) => (EffectOutcome::Succeeded, Some(subscription)),
            Ok(Ok(None)) => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    "Subscription not found at Stripe"
                );
                (EffectOutcome::failed("subscription not found at provider"), None)
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    error = %err,
                    "Failed to fetch subscription from Stripe"
                );
                (EffectOutcome::failed(err), None)
            }
            Err(_) => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    timeout_ms = self.outbound_timeout.as_millis() as u64,
                    "Timed out fetching subscription from Stripe"
                );
                (EffectOutcome::TimedOut, None)
            }
        };

        report.push(EffectStep::FetchSubscription, outcome);
        subscription
    }

    // ════════════════════════════════════════════════════════════════════════════
    // invoice.payment_failed
    // ════════════════════════════════════════════════════════════════════════════

    async fn handle_invoice_payment_failed(
        &self,
        invoice: &InvoiceObject,
        report: &mut DispatchReport,
    ) {
        let Some(subscription_id) = invoice.subscription_id.as_deref() else {
            tracing::debug!(invoice_id = %invoice.id, "Failed invoice has no subscription");
            report.push(
                EffectStep::MarkCanceled,
                EffectOutcome::skipped("invoice has no subscription"),
            );
            return;
        };

        match self.applier.find_by_subscription_id(subscription_id).await {
            Ok(Some(user)) => {
                let marked = match self.applier.mark_payment_failed(&user, Timestamp::now()).await {
                    Ok(()) => {
                        tracing::info!(
                            user_id = %user.id,
                            subscription_id = subscription_id,
                            "Subscription canceled locally after failed payment"
                        );
                        EffectOutcome::Succeeded
                    }
                    Err(err) => {
                        tracing::warn!(
                            user_id = %user.id,
                            error = %err,
                            "Failed to cancel subscription locally"
                        );
                        EffectOutcome::failed(err)
                    }
                };
                report.push(EffectStep::MarkCanceled, marked);

                let notified = self.notify_payment_failed(&user).await;
                report.push(EffectStep::NotifyUser, notified);
            }
            Ok(None) => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    "User not found for Stripe subscription"
                );
                report.push(
                    EffectStep::MarkCanceled,
                    EffectOutcome::skipped("no local user for subscription"),
                );
                report.push(
                    EffectStep::NotifyUser,
                    EffectOutcome::skipped("no local user for subscription"),
                );
            }
            Err(err) => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    error = %err,
                    "Failed to look up user for Stripe subscription"
                );
                report.push(EffectStep::MarkCanceled, EffectOutcome::failed(&err));
                report.push(
                    EffectStep::NotifyUser,
                    EffectOutcome::skipped("user lookup failed"),
                );
            }
        }

        // Runs whatever happened locally: Stripe must stop billing.
        self.cancel_at_provider(subscription_id, report).await;
    }

    async fn notify_payment_failed(&self, user: &BillingUser) -> EffectOutcome {
        let body = payment_failed_email_body();
        let sent = timeout(
            self.outbound_timeout,
            self.notifier
                .send_email(&user.email, PAYMENT_FAILED_SUBJECT, &body),
        )
        .await;

        match sent {
            Ok(Ok(())) => EffectOutcome::Succeeded,
            Ok(Err(err)) => {
                tracing::warn!(
                    user_id = %user.id,
                    error = %err,
                    "Failed to send payment failure email"
                );
                EffectOutcome::failed(err)
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %user.id,
                    timeout_ms = self.outbound_timeout.as_millis() as u64,
                    "Timed out sending payment failure email"
                );
                EffectOutcome::TimedOut
            }
        }
    }

    async fn cancel_at_provider(&self, subscription_id: &str, report: &mut DispatchReport) {
        let fetched = timeout(
            self.outbound_timeout,
            self.payment_provider.get_subscription(subscription_id),
        )
        .await;

        match fetched {
            Ok(Ok(Some(remote))) if remote.is_canceled() => {
                report.push(EffectStep::FetchSubscription, EffectOutcome::Succeeded);
                report.push(
                    EffectStep::CancelAtProvider,
                    EffectOutcome::skipped("already canceled at provider"),
                );
                return;
            }
            Ok(Ok(Some(_))) => {
                report.push(EffectStep::FetchSubscription, EffectOutcome::Succeeded);
            }
            Ok(Ok(None)) => {
                report.push(EffectStep::FetchSubscription, EffectOutcome::Succeeded);
                report.push(
                    EffectStep::CancelAtProvider,
                    EffectOutcome::skipped("subscription not found at provider"),
                );
                return;
            }
            // The status is unknown; cancel anyway and let Stripe decide.
            Ok(Err(err)) => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    error = %err,
                    "Failed to fetch subscription before cancel, attempting cancel anyway"
                );
                report.push(EffectStep::FetchSubscription, EffectOutcome::failed(err));
            }
            Err(_) => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    "Timed out fetching subscription before cancel, attempting cancel anyway"
                );
                report.push(EffectStep::FetchSubscription, EffectOutcome::TimedOut);
            }
        }

        let canceled = timeout(
            self.outbound_timeout,
            self.payment_provider.cancel_subscription(
                subscription_id,
                CancelOptions::without_invoice_or_proration(),
            ),
        )
        .await;

        let outcome = match canceled {
            Ok(Ok(_)) => EffectOutcome::Succeeded,
            Ok(Err(err)) if err.is_already_canceled() => {
                tracing::debug!(
                    subscription_id = subscription_id,
                    "Subscription was already canceled at Stripe"
                );
                EffectOutcome::Succeeded
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    error = %err,
                    "Failed to cancel subscription at Stripe"
                );
                EffectOutcome::failed(err)
            }
            Err(_) => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    timeout_ms = self.outbound_timeout.as_millis() as u64,
                    "Timed out canceling subscription at Stripe"
                );
                EffectOutcome::TimedOut
            }
        };
        report.push(EffectStep::CancelAtProvider, outcome);
    }
}

fn apply_outcome(
    event_id: &str,
    step: EffectStep,
    result: Result<ApplyOutcome, DomainError>,
) -> EffectOutcome {
    match result {
        Ok(ApplyOutcome::Applied { .. }) => EffectOutcome::Succeeded,
        Ok(ApplyOutcome::UserNotFound) => EffectOutcome::skipped("no local user for customer"),
        Err(err) => {
            tracing::warn!(
                event_id = event_id,
                step = step.as_str(),
                error = %err,
                "Failed to update subscription state"
            );
            EffectOutcome::failed(err)
        }
    }
}

fn log_rejection(err: &WebhookError) {
    match err {
        WebhookError::MissingSecret => {
            tracing::error!("Stripe webhook secret is not configured");
        }
        WebhookError::MissingSignature => {
            tracing::warn!("Missing Stripe signature");
        }
        other => {
            tracing::warn!(error = %other, "Stripe webhook rejected");
        }
    }
}

fn log_report(report: &DispatchReport) {
    let effects = report.summary();
    if report.has_failures() {
        tracing::warn!(
            event_id = %report.event_id,
            event_type = %report.kind,
            effects = %effects,
            "Webhook event processed with failures"
        );
    } else if report.changed_anything() {
        tracing::info!(
            event_id = %report.event_id,
            event_type = %report.kind,
            effects = %effects,
            "Webhook event processed"
        );
    } else {
        tracing::debug!(
            event_id = %report.event_id,
            event_type = %report.kind,
            effects = %effects,
            "Webhook event processed without changes"
        );
    }
}

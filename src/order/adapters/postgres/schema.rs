//! Diesel schema for durable order storage.

diesel::table! {
    /// Orders that reached payer interaction.
    orders (id) {
        /// Internal order identifier.
        id -> Uuid,
        /// Client idempotency key.
        #[max_length = 128]
        order_reference -> Varchar,
        /// Payment provider name.
        #[max_length = 16]
        provider -> Varchar,
        /// `PayPal` order id, when paid through `PayPal`.
        #[max_length = 255]
        paypal_order_id -> Nullable<Varchar>,
        /// Stripe payment intent id, when paid through Stripe.
        #[max_length = 255]
        stripe_payment_intent_id -> Nullable<Varchar>,
        /// Mollie payment id, when paid through Mollie.
        #[max_length = 255]
        mollie_payment_id -> Nullable<Varchar>,
        /// Payment status.
        #[max_length = 32]
        status -> Varchar,
        /// Fulfillment status.
        #[max_length = 32]
        fulfillment_status -> Varchar,
        /// Cart snapshot.
        items -> Jsonb,
        /// Order total as a decimal string.
        total_amount -> Text,
        /// ISO 4217 currency code.
        #[max_length = 3]
        currency -> Varchar,
        /// Named measurements.
        measurements -> Nullable<Jsonb>,
        /// Recipient and shipping address.
        delivery_details -> Nullable<Jsonb>,
        /// Customer contact details.
        customer -> Jsonb,
        /// Whether funds were captured.
        is_paid -> Bool,
        /// When funds were captured.
        paid_at -> Nullable<Timestamptz>,
        /// Append-only provider audit log.
        payment_attempts -> Jsonb,
        /// Whether the current status was notified.
        status_email_sent -> Bool,
        /// Initial reminder delivery time.
        initial_reminder_sent_at -> Nullable<Timestamptz>,
        /// Follow-up reminder delivery time.
        followup_reminder_sent_at -> Nullable<Timestamptz>,
        /// Cancellation reason.
        cancellation_reason -> Nullable<Text>,
        /// Cancellation time.
        cancelled_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

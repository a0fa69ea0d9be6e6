//! Diesel schema for reminder task storage.

diesel::table! {
    /// Delayed reminder deliveries.
    reminder_tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Payment identifier of the reminded order.
        #[max_length = 255]
        order_payment_id -> Varchar,
        /// `initial_reminder` or `followup_reminder`.
        #[max_length = 32]
        task_type -> Varchar,
        /// Due time.
        scheduled_for -> Timestamptz,
        /// `pending`, `completed`, or `cancelled`.
        #[max_length = 16]
        status -> Varchar,
        /// Delivery time.
        executed_at -> Nullable<Timestamptz>,
        /// Last failure or cancellation reason.
        error -> Nullable<Text>,
        /// Failed execution count.
        attempts -> Int4,
        /// Claim lease expiry.
        lease_expires_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

//! API Routes
//!
//! Route definitions for all API endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// Create API v1 routes
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Catalogue (public reads, authenticated writes)
        .nest("/listings", listing_routes())
        // Negotiation
        .nest("/messages", message_routes())
        // Fees and payments
        .route("/fees/current", get(handlers::fees::current_fees))
        .nest("/payments", payment_routes())
        // Reputation
        .nest("/ratings", rating_routes())
        // Administration
        .nest("/admin", admin_routes())
}

fn listing_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::listing::search_listings))
        .route("/", post(handlers::listing::create_listing))
        .route("/mine", get(handlers::listing::my_listings))
        .route("/favorites", get(handlers::listing::my_favorites))
        .route("/:id", get(handlers::listing::get_listing))
        .route("/:id", put(handlers::listing::update_listing))
        .route("/:id", delete(handlers::listing::delete_listing))
        .route("/:id/favorite", post(handlers::listing::toggle_favorite))
        .route("/:id/flag", post(handlers::listing::flag_listing))
        .route("/:id/contact-seller", post(handlers::message::contact_seller))
        .route("/:id/payments", get(handlers::payment::payments_for_item))
}

fn message_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/send", post(handlers::message::send_message))
        .route("/inbox", get(handlers::message::inbox))
        .route("/:id/accept", post(handlers::message::accept_offer))
        .route("/:id/reject", post(handlers::message::reject_offer))
        .route("/:id/withdraw", post(handlers::message::withdraw_offer))
        .route("/:id/received", post(handlers::message::mark_received))
        .route("/:id/read", post(handlers::message::mark_read))
        .route(
            "/conversation/:item_id/:other_user_id",
            get(handlers::message::conversation),
        )
        .route("/offers/:item_id", get(handlers::message::active_offers))
}

fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/posting-fee", post(handlers::payment::create_posting_fee))
        .route("/extension-fee", post(handlers::payment::create_extension_fee))
        .route("/mine", get(handlers::payment::my_payments))
        .route("/:id/process", post(handlers::payment::process_payment))
        .route("/:id/cancel", post(handlers::payment::cancel_payment))
}

fn rating_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seller", post(handlers::rating::rate_seller))
        .route("/buyer", post(handlers::rating::rate_buyer))
        .route("/seller/:seller_id", get(handlers::rating::seller_reviews))
}

/// Administration routes; every handler requires the admin role
fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/listings", get(handlers::admin::moderation_queue))
        .route("/listings/:id/status", post(handlers::admin::set_listing_status))
        .route(
            "/listings/:id/override-status",
            post(handlers::admin::override_status),
        )
        .route("/listings/:id/flags", get(handlers::admin::listing_flags))
        .route(
            "/listings/:id/flags/resolve",
            post(handlers::admin::resolve_flags),
        )
        .route("/listings/:id/feature", post(handlers::admin::feature_listing))
        .route("/fees", post(handlers::admin::create_fee_config))
        .route("/fees", get(handlers::admin::list_fee_configs))
        .route("/payments/:id/refund", post(handlers::admin::refund_payment))
        .route(
            "/ratings/seller/:id/status",
            post(handlers::admin::moderate_seller_rating),
        )
        .route("/sweep-expired", post(handlers::admin::sweep_expired))
        .route("/revenue", get(handlers::admin::revenue))
}

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;

use pitchpoint_gateway::connection;
use pitchpoint_types::models::Role;

use crate::middleware::{require_role, require_session};
use crate::state::AppState;
use crate::{
    analytics, auth, content, messages, profiles, reports, settings, users, verifications,
};

/// Every HTTP and WebSocket route. Transport layers (CORS, tracing) are added
/// by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/signup/entrepreneur", post(auth::signup_entrepreneur))
        .route("/auth/signup/investor", post(auth::signup_investor))
        .route("/auth/signin", post(auth::signin))
        .route("/realtime", get(ws_upgrade))
        .route("/health", get(health));

    let admin_routes = Router::new()
        .route("/dashboard/admin", get(profiles::admin_dashboard))
        .route("/admin/analytics", get(analytics::get_analytics))
        .route("/admin/users", get(users::list_users))
        .route("/admin/verifications", get(verifications::list))
        .route("/admin/verifications/{id}/approve", post(verifications::approve))
        .route("/admin/verifications/{id}/reject", post(verifications::reject))
        .route("/admin/reports", get(reports::list))
        .route("/admin/reports/{id}/status", post(reports::update_status))
        .route("/admin/content", get(content::list).post(content::create))
        .route(
            "/admin/content/{id}",
            get(content::get).patch(content::update).delete(content::delete),
        )
        .route("/admin/content/{id}/toggle-publish", post(content::toggle_publish))
        .route("/admin/messages", get(messages::list).post(messages::send))
        .route("/admin/messages/{id}", delete(messages::delete))
        .route("/admin/messages/{id}/reply", post(messages::reply))
        .route("/admin/messages/{id}/star", post(messages::star))
        .route("/admin/messages/{id}/archive", post(messages::archive))
        .route("/admin/messages/{id}/read", post(messages::mark_read))
        .route("/admin/settings", get(settings::get_settings).put(settings::put_settings))
        .route_layer(middleware::from_fn_with_state(Role::Admin, require_role));

    let entrepreneur_routes = Router::new()
        .route("/dashboard/entrepreneur", get(profiles::entrepreneur_dashboard))
        .route_layer(middleware::from_fn_with_state(Role::Entrepreneur, require_role));

    let investor_routes = Router::new()
        .route("/dashboard/investor", get(profiles::investor_dashboard))
        .route_layer(middleware::from_fn_with_state(Role::Investor, require_role));

    // Any signed-in user
    let session_routes = Router::new()
        .route("/auth/signout", post(auth::signout))
        .route("/auth/user", get(auth::current_user))
        .route("/auth/session", get(auth::current_session))
        .route("/profile", get(profiles::get_profile).patch(profiles::update_profile))
        .route("/verifications", post(verifications::submit))
        .route("/reports", post(reports::file))
        .route("/messages", get(messages::list))
        .route("/messages/{id}/reply", post(messages::reply))
        .route("/messages/{id}/read", post(messages::mark_read))
        .merge(admin_routes)
        .merge(entrepreneur_routes)
        .merge(investor_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// The client identifies over the socket itself, so the upgrade is public.
async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(
            socket,
            state.dispatcher.clone(),
            state.db.clone(),
            state.jwt_secret.clone(),
        )
    })
}

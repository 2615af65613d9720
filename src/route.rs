//! Route definitions for the listings API
//!
//! Public routes serve the property sites and the lead form. Dashboard
//! routes sit behind the token middleware and require a principal.

use axum::routing::{delete, get, patch, post, put};
use axum::{middleware, Router};

use crate::database::AppState;
use crate::handler::{
    broker_properties, create_broker, create_builder, create_lead, create_property,
    create_ticket, delete_lead, delete_ticket, get_property, list_leads, list_tickets,
    saved_properties, search_properties, set_broker_portfolio, set_broker_visibility,
    set_builder_visibility, set_property_visibility, update_lead_status, update_ticket_status,
};
use crate::middleware::auth_middleware;

/// Creates the application router
///
/// # Public
///
/// - `GET /api/properties` - search visible listings
/// - `GET /api/properties/saved?ids=..` - visible listings among saved ids
/// - `GET /api/properties/{id}` - one visible listing by id or slug
/// - `GET /api/brokers/{id}/properties` - broker page
/// - `POST /api/leads` - lead form
///
/// # Dashboard (under `/api/dashboard`)
///
/// - `POST /builders`, `POST /brokers`
/// - `PATCH /builders/{id}/visibility`, `PATCH /brokers/{id}/visibility`
/// - `PUT /brokers/{id}/portfolio`
/// - `POST /properties`, `PATCH /properties/{id}/visibility`
/// - `GET /leads`, `PATCH /leads/{id}/status`, `DELETE /leads/{id}`
/// - `GET|POST /tickets`, `PATCH /tickets/{id}/status`, `DELETE /tickets/{id}`
pub fn create_app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/properties", get(search_properties))
        .route("/properties/saved", get(saved_properties))
        .route("/properties/{id}", get(get_property))
        .route("/brokers/{id}/properties", get(broker_properties))
        .route("/leads", post(create_lead));

    let dashboard_routes = Router::new()
        .route("/builders", post(create_builder))
        .route("/builders/{id}/visibility", patch(set_builder_visibility))
        .route("/brokers", post(create_broker))
        .route("/brokers/{id}/visibility", patch(set_broker_visibility))
        .route("/brokers/{id}/portfolio", put(set_broker_portfolio))
        .route("/properties", post(create_property))
        .route("/properties/{id}/visibility", patch(set_property_visibility))
        .route("/leads", get(list_leads))
        .route("/leads/{id}/status", patch(update_lead_status))
        .route("/leads/{id}", delete(delete_lead))
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route("/tickets/{id}/status", patch(update_ticket_status))
        .route("/tickets/{id}", delete(delete_ticket))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api", public_routes)
        .with_state(state)
}

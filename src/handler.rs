//! HTTP request handlers for the listings API
//!
//! Public handlers serve listing search, single listings, broker pages,
//! saved-listing lookups and the lead-capture form. Dashboard handlers take
//! an explicit [`Principal`] and enforce role/ownership before touching the
//! store.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::database::{AppState, Collection, DocumentStore};
use crate::error::{ApiError, ApiResult, StoreError};
use crate::listing;
use crate::model::{
    fields, CreateLeadRequest, CreateOwnerRequest, CreatePropertyRequest, CreateTicketRequest,
    Lead, LeadStatus, Owner, OwnerKind, PortfolioRequest, Property, SavedParams, SearchParams,
    StatusFlow, StatusRequest, Ticket, TicketStatus, VisibilityRequest,
};
use crate::principal::{Principal, Role};
use crate::query::Filter;
use crate::search::{apply_filters, SearchCriteria};

fn to_document<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(record)?)
}

async fn load<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    label: &str,
) -> ApiResult<T> {
    match store.get(collection, id).await? {
        Some(doc) => Ok(doc.into_record()?),
        None => Err(ApiError::NotFound(format!("{} not found", label))),
    }
}

fn check_transition<S: StatusFlow>(current: S, next: S) -> ApiResult<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(ApiError::Conflict(format!(
            "Cannot change status from {:?} to {:?}",
            current, next
        )))
    }
}

fn listing_response(properties: Vec<Property>) -> Json<Value> {
    Json(json!({
        "total": properties.len(),
        "data": properties,
    }))
}

/// Searches the publicly visible listings
///
/// # Query Parameters
///
/// - `type` - comma-separated property types, `all`/`todos` for any
/// - `state` - state code
/// - `cities`, `neighborhoods` - comma-separated names
/// - `rooms` - comma-separated room tokens, `N+` meaning "at least N"
/// - `price` - maximum price
///
/// # Example Request
///
/// `GET /api/properties?cities=Recife&rooms=2,3%2B&price=600000`
pub async fn search_properties(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<impl IntoResponse> {
    let criteria = SearchCriteria::from_params(&params);
    let candidates = listing::public_properties(state.store.as_ref()).await?;
    let results = apply_filters(&candidates, &criteria);

    info!(
        candidates = candidates.len(),
        matched = results.len(),
        "property search"
    );
    Ok(listing_response(results))
}

/// Returns the visible listings among a client's saved ids (`?ids=a,b`)
pub async fn saved_properties(
    State(state): State<AppState>,
    Query(params): Query<SavedParams>,
) -> ApiResult<impl IntoResponse> {
    let ids: Vec<String> = params
        .ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    let properties = listing::saved_properties(state.store.as_ref(), &ids).await?;
    Ok(listing_response(properties))
}

/// Returns one listing by id or slug
///
/// # Response
///
/// - **200 OK** - the listing
/// - **404 Not Found** - unknown, or hidden (itself or its owner)
pub async fn get_property(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    match listing::find_public_property(state.store.as_ref(), &id).await? {
        Some(property) => Ok(Json(property)),
        None => Err(ApiError::NotFound("Property not found".to_string())),
    }
}

/// A broker's public page: portfolio plus owned listings
pub async fn broker_properties(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    match listing::broker_page(state.store.as_ref(), &id).await? {
        Some(properties) => Ok(listing_response(properties)),
        None => Err(ApiError::NotFound("Broker not found".to_string())),
    }
}

/// Lead-capture form submission
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Ana",
///   "email": "ana@example.com",
///   "phone": "+55 11 90000-0000",
///   "message": "Tenho interesse",
///   "propertyId": "a1B2c3"
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - lead stored, routed to the listing owner
/// - **400 Bad Request** - missing name or contact
/// - **404 Not Found** - `propertyId` is not a public listing
pub async fn create_lead(
    State(state): State<AppState>,
    Json(payload): Json<CreateLeadRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate().map_err(ApiError::Validation)?;

    let property_id = payload.property_id.filter(|id| !id.trim().is_empty());
    let owner_id = match &property_id {
        Some(pid) => {
            let property = listing::find_public_property(state.store.as_ref(), pid)
                .await?
                .ok_or_else(|| ApiError::NotFound("Property not found".to_string()))?;
            Some(property.owner_id)
        }
        None => None,
    };

    let mut lead = Lead {
        id: String::new(),
        name: payload.name.trim().to_string(),
        email: payload.email.filter(|e| !e.trim().is_empty()),
        phone: payload.phone.filter(|p| !p.trim().is_empty()),
        message: payload.message,
        property_id,
        owner_id,
        status: LeadStatus::New,
        created_at: Utc::now(),
    };

    let doc = state.store.insert(Collection::Leads, to_document(&lead)?).await?;
    lead.id = doc.id;

    info!(lead = %lead.id, owner = ?lead.owner_id, "lead captured");
    Ok((StatusCode::CREATED, Json(lead)))
}

async fn create_owner(
    state: &AppState,
    principal: &Principal,
    kind: OwnerKind,
    payload: CreateOwnerRequest,
) -> ApiResult<Owner> {
    principal.require_admin()?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let mut owner = Owner {
        id: String::new(),
        name: payload.name.trim().to_string(),
        slug: payload.slug.filter(|s| !s.trim().is_empty()),
        is_visible_on_site: payload.is_visible_on_site,
        portfolio: Vec::new(),
        created_at: Utc::now(),
    };

    let doc = state.store.insert(kind.collection(), to_document(&owner)?).await?;
    owner.id = doc.id;

    info!(kind = %kind, owner = %owner.id, "owner created");
    Ok(owner)
}

/// Creates a builder (admin only)
pub async fn create_builder(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateOwnerRequest>,
) -> ApiResult<impl IntoResponse> {
    let owner = create_owner(&state, &principal, OwnerKind::Builder, payload).await?;
    Ok((StatusCode::CREATED, Json(owner)))
}

/// Creates a broker (admin only)
pub async fn create_broker(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateOwnerRequest>,
) -> ApiResult<impl IntoResponse> {
    let owner = create_owner(&state, &principal, OwnerKind::Broker, payload).await?;
    Ok((StatusCode::CREATED, Json(owner)))
}

async fn set_owner_visibility(
    state: &AppState,
    principal: &Principal,
    kind: OwnerKind,
    id: &str,
    visible: bool,
) -> ApiResult<Owner> {
    principal.require_admin()?;

    let mut owner: Owner = load(state.store.as_ref(), kind.collection(), id, "Owner").await?;
    owner.is_visible_on_site = visible;
    state
        .store
        .put(kind.collection(), id, to_document(&owner)?)
        .await?;

    info!(kind = %kind, owner = id, visible, "owner visibility changed");
    Ok(owner)
}

/// Shows or hides a builder and, with it, all of its listings (admin only)
pub async fn set_builder_visibility(
    Path(id): Path<String>,
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<VisibilityRequest>,
) -> ApiResult<impl IntoResponse> {
    let owner = set_owner_visibility(
        &state,
        &principal,
        OwnerKind::Builder,
        &id,
        payload.is_visible_on_site,
    )
    .await?;
    Ok(Json(owner))
}

/// Shows or hides a broker and its page (admin only)
pub async fn set_broker_visibility(
    Path(id): Path<String>,
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<VisibilityRequest>,
) -> ApiResult<impl IntoResponse> {
    let owner = set_owner_visibility(
        &state,
        &principal,
        OwnerKind::Broker,
        &id,
        payload.is_visible_on_site,
    )
    .await?;
    Ok(Json(owner))
}

/// Replaces the curated portfolio of a broker
///
/// Only that broker or an admin may do this. Ids are de-duplicated in the
/// order given; ids that do not resolve to public listings are kept but
/// simply never shown.
pub async fn set_broker_portfolio(
    Path(id): Path<String>,
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<PortfolioRequest>,
) -> ApiResult<impl IntoResponse> {
    let is_self = principal.role == Role::Broker && principal.user_id == id;
    if !(is_self || principal.is_admin()) {
        return Err(ApiError::Forbidden(
            "You are not authorized to edit this portfolio".to_string(),
        ));
    }

    let mut broker: Owner = load(state.store.as_ref(), Collection::Brokers, &id, "Broker").await?;

    let mut portfolio: Vec<String> = Vec::with_capacity(payload.property_ids.len());
    for pid in payload.property_ids {
        let pid = pid.trim().to_string();
        if !pid.is_empty() && !portfolio.contains(&pid) {
            portfolio.push(pid);
        }
    }
    broker.portfolio = portfolio;

    state
        .store
        .put(Collection::Brokers, &id, to_document(&broker)?)
        .await?;

    info!(broker = %id, size = broker.portfolio.len(), "portfolio updated");
    Ok(Json(broker))
}

/// Creates a listing
///
/// Builders and brokers create listings they own. Admins must name the
/// owner with `ownerId`. Clients cannot create listings.
///
/// # Response
///
/// - **201 Created** - listing stored
/// - **400 Bad Request** - invalid payload or unknown owner
/// - **403 Forbidden** - caller may not create listings
pub async fn create_property(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreatePropertyRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate().map_err(ApiError::Validation)?;

    let owner_id = match principal.role {
        Role::Builder | Role::Broker => principal.user_id.clone(),
        Role::Admin => payload
            .owner_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::Validation("ownerId is required".to_string()))?,
        Role::Client => {
            return Err(ApiError::Forbidden(
                "You are not authorized to create listings".to_string(),
            ))
        }
    };

    if listing::find_owner(state.store.as_ref(), &owner_id)
        .await?
        .is_none()
    {
        return Err(ApiError::Validation(format!("unknown owner: {}", owner_id)));
    }

    let mut property = payload.into_property(owner_id);
    let doc = state
        .store
        .insert(Collection::Properties, to_document(&property)?)
        .await?;
    property.id = doc.id;

    info!(property = %property.id, owner = %property.owner_id, "property created");
    Ok((StatusCode::CREATED, Json(property)))
}

/// Shows or hides a listing (owner or admin)
pub async fn set_property_visibility(
    Path(id): Path<String>,
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<VisibilityRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut property: Property =
        load(state.store.as_ref(), Collection::Properties, &id, "Property").await?;

    if !principal.can_manage(Some(property.owner_id.as_str())) {
        return Err(ApiError::Forbidden(
            "You are not authorized to edit this listing".to_string(),
        ));
    }

    property.is_visible_on_site = payload.is_visible_on_site;
    state
        .store
        .put(Collection::Properties, &id, to_document(&property)?)
        .await?;

    info!(property = %id, visible = property.is_visible_on_site, "property visibility changed");
    Ok(Json(property))
}

/// Lists leads: all of them for admins, their own for builders and brokers
pub async fn list_leads(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let filters = match principal.role {
        Role::Admin => vec![],
        Role::Builder | Role::Broker => vec![Filter::eq(fields::OWNER_ID, principal.user_id.as_str())],
        Role::Client => {
            return Err(ApiError::Forbidden(
                "You are not authorized to view leads".to_string(),
            ))
        }
    };

    let mut leads = state
        .store
        .query(Collection::Leads, &filters)
        .await?
        .into_iter()
        .map(|doc| doc.into_record::<Lead>())
        .collect::<Result<Vec<_>, _>>()?;
    leads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    Ok(Json(json!({
        "total": leads.len(),
        "data": leads,
    })))
}

/// Moves a lead along its status flow
///
/// # Response
///
/// - **200 OK** - updated lead
/// - **403 Forbidden** - lead belongs to another owner
/// - **409 Conflict** - transition not allowed from the current status
pub async fn update_lead_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<StatusRequest<LeadStatus>>,
) -> ApiResult<impl IntoResponse> {
    let mut lead: Lead = load(state.store.as_ref(), Collection::Leads, &id, "Lead").await?;

    if !principal.can_manage(lead.owner_id.as_deref()) {
        return Err(ApiError::Forbidden(
            "You are not authorized to update this lead".to_string(),
        ));
    }

    check_transition(lead.status, payload.status)?;
    lead.status = payload.status;
    state
        .store
        .put(Collection::Leads, &id, to_document(&lead)?)
        .await?;

    info!(lead = %id, status = ?lead.status, "lead status changed");
    Ok(Json(lead))
}

/// Deletes a lead (admin only)
pub async fn delete_lead(
    Path(id): Path<String>,
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    principal.require_admin()?;

    if !state.store.delete(Collection::Leads, &id).await? {
        return Err(ApiError::NotFound("Lead not found".to_string()));
    }

    warn!(lead = %id, admin = %principal.user_id, "lead deleted");
    Ok(Json(json!({
        "message": "Lead deleted successfully",
        "deleted_id": id
    })))
}

/// Opens a support ticket authored by the caller
pub async fn create_ticket(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateTicketRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.subject.trim().is_empty() {
        return Err(ApiError::Validation("subject is required".to_string()));
    }

    let mut ticket = Ticket {
        id: String::new(),
        author_id: principal.user_id.clone(),
        subject: payload.subject.trim().to_string(),
        message: payload.message,
        status: TicketStatus::Open,
        created_at: Utc::now(),
    };

    let doc = state
        .store
        .insert(Collection::Tickets, to_document(&ticket)?)
        .await?;
    ticket.id = doc.id;

    info!(ticket = %ticket.id, author = %ticket.author_id, "ticket opened");
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Lists tickets: all of them for admins, the caller's own otherwise
pub async fn list_tickets(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let filters = if principal.is_admin() {
        vec![]
    } else {
        vec![Filter::eq(fields::AUTHOR_ID, principal.user_id.as_str())]
    };

    let mut tickets = state
        .store
        .query(Collection::Tickets, &filters)
        .await?
        .into_iter()
        .map(|doc| doc.into_record::<Ticket>())
        .collect::<Result<Vec<_>, _>>()?;
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    Ok(Json(json!({
        "total": tickets.len(),
        "data": tickets,
    })))
}

/// Moves a ticket along its status flow (admin only)
pub async fn update_ticket_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<StatusRequest<TicketStatus>>,
) -> ApiResult<impl IntoResponse> {
    principal.require_admin()?;

    let mut ticket: Ticket = load(state.store.as_ref(), Collection::Tickets, &id, "Ticket").await?;
    check_transition(ticket.status, payload.status)?;
    ticket.status = payload.status;
    state
        .store
        .put(Collection::Tickets, &id, to_document(&ticket)?)
        .await?;

    info!(ticket = %id, status = ?ticket.status, "ticket status changed");
    Ok(Json(ticket))
}

/// Deletes a ticket (admin only)
pub async fn delete_ticket(
    Path(id): Path<String>,
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    principal.require_admin()?;

    if !state.store.delete(Collection::Tickets, &id).await? {
        return Err(ApiError::NotFound("Ticket not found".to_string()));
    }

    warn!(ticket = %id, admin = %principal.user_id, "ticket deleted");
    Ok(Json(json!({
        "message": "Ticket deleted successfully",
        "deleted_id": id
    })))
}

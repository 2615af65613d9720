//! Data models for the listings application
//!
//! Records are stored camelCase, matching the field names used in queries
//! (`ownerId`, `isVisibleOnSite`, ...). Loosely typed stored values are
//! normalized here, at deserialization time, so nothing past this module has
//! to care whether rooms were saved as `"3"`, `3` or `["2", "3+"]`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::database::Collection;

/// Field names used in store queries.
pub mod fields {
    pub const OWNER_ID: &str = "ownerId";
    pub const AUTHOR_ID: &str = "authorId";
    pub const IS_VISIBLE_ON_SITE: &str = "isVisibleOnSite";
    pub const SLUG: &str = "slug";
}

/// One real-estate listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    /// e.g. "Apartamento", "Casa"
    #[serde(default)]
    pub property_type: String,

    /// e.g. "Lançamento", "Pronto"
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// `None` means the price is not disclosed
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Option<f64>,

    /// Bedroom counts offered; a unit mix has several entries
    #[serde(default, deserialize_with = "deserialize_rooms")]
    pub rooms: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garage_spaces: Option<u32>,

    /// Free-form floor area, may be a range ("54 a 72 m²")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,

    /// Absolute media URLs; the first one is the cover
    #[serde(default)]
    pub media: Vec<String>,

    /// Owning builder or broker
    pub owner_id: String,

    #[serde(default)]
    pub is_visible_on_site: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Property {
    pub fn cover(&self) -> Option<&str> {
        self.media.first().map(String::as_str)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoomToken {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRooms {
    One(RoomToken),
    Many(Vec<RoomToken>),
}

impl RoomToken {
    fn normalize(self) -> Option<String> {
        let text = match self {
            RoomToken::Text(s) => s,
            RoomToken::Number(n) => match n.as_u64() {
                Some(whole) => whole.to_string(),
                None => n.to_string(),
            },
        };
        let room = text.trim().trim_end_matches('+').trim();
        (!room.is_empty()).then(|| room.to_string())
    }
}

/// Accepts a single string, a number, a list of either, or null, and returns
/// the room values with any trailing `+` removed.
fn deserialize_rooms<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawRooms>::deserialize(deserializer)?;
    Ok(match raw {
        None => Vec::new(),
        Some(RawRooms::One(token)) => token.normalize().into_iter().collect(),
        Some(RawRooms::Many(tokens)) => tokens.into_iter().filter_map(RoomToken::normalize).collect(),
    })
}

/// Accepts a number, a numeric string, or null. Anything else is treated as
/// an undisclosed price.
fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let price = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(price.filter(|p| p.is_finite()))
}

/// Builder and broker records share a shape; they live in separate collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    Builder,
    Broker,
}

impl OwnerKind {
    pub fn collection(self) -> Collection {
        match self {
            OwnerKind::Builder => Collection::Builders,
            OwnerKind::Broker => Collection::Brokers,
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerKind::Builder => write!(f, "builder"),
            OwnerKind::Broker => write!(f, "broker"),
        }
    }
}

/// A builder or broker that owns listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub is_visible_on_site: bool,
    /// Property ids a broker curates for their public page
    #[serde(default)]
    pub portfolio: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Status values that may only move forward through a fixed flow.
pub trait StatusFlow: Copy + PartialEq + fmt::Debug {
    fn can_transition_to(self, next: Self) -> bool;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Closed,
}

impl StatusFlow for LeadStatus {
    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (LeadStatus::New, LeadStatus::Contacted)
                | (LeadStatus::New, LeadStatus::Closed)
                | (LeadStatus::Contacted, LeadStatus::Closed)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl StatusFlow for TicketStatus {
    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Open, TicketStatus::InProgress)
                | (TicketStatus::Open, TicketStatus::Closed)
                | (TicketStatus::InProgress, TicketStatus::Closed)
        )
    }
}

/// A contact-form submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    /// Builder or broker the lead is routed to; `None` goes to admins only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// A support ticket opened from a dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(default)]
    pub id: String,
    pub author_id: String,
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Raw search query string, e.g.
/// `?type=Apartamento,Casa&state=SP&cities=São Paulo&rooms=2,3+&price=500000`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub state: Option<String>,
    pub cities: Option<String>,
    pub neighborhoods: Option<String>,
    pub rooms: Option<String>,
    pub price: Option<String>,
}

/// `?ids=a,b,c` for the saved-properties lookup
#[derive(Debug, Default, Deserialize)]
pub struct SavedParams {
    pub ids: Option<String>,
}

/// Payload for creating a listing from a dashboard.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRequest {
    pub slug: Option<String>,
    pub property_type: String,
    #[serde(default)]
    pub status: String,
    pub state: String,
    pub city: String,
    #[serde(default)]
    pub neighborhood: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_rooms")]
    pub rooms: Vec<String>,
    pub garage_spaces: Option<u32>,
    pub area: Option<String>,
    #[serde(default)]
    pub media: Vec<String>,
    /// Required when an admin creates a listing on someone's behalf
    pub owner_id: Option<String>,
    pub is_visible_on_site: Option<bool>,
}

impl CreatePropertyRequest {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("propertyType", &self.property_type),
            ("state", &self.state),
            ("city", &self.city),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} is required", name));
            }
        }
        if self.price.is_some_and(|p| p < 0.0) {
            return Err("price must not be negative".to_string());
        }
        if let Some(url) = self
            .media
            .iter()
            .find(|url| !(url.starts_with("https://") || url.starts_with("http://")))
        {
            return Err(format!("media URL must be absolute: {}", url));
        }
        Ok(())
    }

    pub fn into_property(self, owner_id: String) -> Property {
        Property {
            id: String::new(),
            slug: self.slug.filter(|s| !s.trim().is_empty()),
            property_type: self.property_type.trim().to_string(),
            status: self.status.trim().to_string(),
            state: self.state.trim().to_string(),
            city: self.city.trim().to_string(),
            neighborhood: self.neighborhood.trim().to_string(),
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            price: self.price,
            rooms: self.rooms,
            garage_spaces: self.garage_spaces,
            area: self.area,
            media: self.media,
            owner_id,
            is_visible_on_site: self.is_visible_on_site.unwrap_or(true),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    pub is_visible_on_site: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOwnerRequest {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub is_visible_on_site: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRequest {
    pub property_ids: Vec<String>,
}

/// Public lead-capture form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
    pub property_id: Option<String>,
}

impl CreateLeadRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }

        let email = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
        let phone = self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

        match (email, phone) {
            (None, None) => Err("an email or a phone number is required".to_string()),
            (Some(email), _) if !is_plausible_email(email) => {
                Err(format!("invalid email address: {}", email))
            }
            _ => Ok(()),
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest<S> {
    pub status: S,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn property_json(rooms: serde_json::Value) -> serde_json::Value {
        json!({
            "propertyType": "Apartamento",
            "city": "Recife",
            "ownerId": "b1",
            "rooms": rooms,
        })
    }

    #[test]
    fn rooms_single_string_is_wrapped() {
        let p: Property = serde_json::from_value(property_json(json!("3"))).unwrap();
        assert_eq!(p.rooms, vec!["3"]);
    }

    #[test]
    fn rooms_trailing_plus_is_stripped() {
        let p: Property = serde_json::from_value(property_json(json!(["2", "4+"]))).unwrap();
        assert_eq!(p.rooms, vec!["2", "4"]);
    }

    #[test]
    fn rooms_numbers_and_null() {
        let p: Property = serde_json::from_value(property_json(json!([1, 2]))).unwrap();
        assert_eq!(p.rooms, vec!["1", "2"]);

        let p: Property = serde_json::from_value(property_json(json!(null))).unwrap();
        assert!(p.rooms.is_empty());
    }

    #[test]
    fn price_is_coerced_at_ingestion() {
        let mut value = property_json(json!("2"));
        value["price"] = json!("450000");
        let p: Property = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(p.price, Some(450000.0));

        value["price"] = json!("sob consulta");
        let p: Property = serde_json::from_value(value).unwrap();
        assert_eq!(p.price, None);
    }

    #[test]
    fn cover_is_first_media_url() {
        let mut value = property_json(json!("2"));
        value["media"] = json!(["https://cdn.example/a.jpg", "https://cdn.example/b.jpg"]);
        let p: Property = serde_json::from_value(value).unwrap();
        assert_eq!(p.cover(), Some("https://cdn.example/a.jpg"));
    }

    #[test]
    fn lead_status_moves_forward_only() {
        assert!(LeadStatus::New.can_transition_to(LeadStatus::Contacted));
        assert!(LeadStatus::Contacted.can_transition_to(LeadStatus::Closed));
        assert!(!LeadStatus::Closed.can_transition_to(LeadStatus::New));
        assert!(!LeadStatus::Contacted.can_transition_to(LeadStatus::Contacted));
    }

    #[test]
    fn ticket_status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(TicketStatus::InProgress).unwrap(), json!("in_progress"));
        assert!(TicketStatus::Open.can_transition_to(TicketStatus::InProgress));
        assert!(!TicketStatus::Closed.can_transition_to(TicketStatus::Open));
    }

    #[test]
    fn lead_requires_a_contact() {
        let lead = CreateLeadRequest {
            name: "Ana".to_string(),
            email: None,
            phone: Some("  ".to_string()),
            message: String::new(),
            property_id: None,
        };
        assert!(lead.validate().is_err());

        let lead = CreateLeadRequest {
            email: Some("ana@example.com".to_string()),
            ..lead
        };
        assert!(lead.validate().is_ok());
    }

    #[test]
    fn lead_rejects_malformed_email() {
        let lead = CreateLeadRequest {
            name: "Ana".to_string(),
            email: Some("ana.example.com".to_string()),
            phone: None,
            message: String::new(),
            property_id: None,
        };
        assert!(lead.validate().is_err());
    }

    #[test]
    fn property_request_rejects_relative_media() {
        let req: CreatePropertyRequest = serde_json::from_value(json!({
            "propertyType": "Casa",
            "state": "SP",
            "city": "Campinas",
            "media": ["/uploads/a.jpg"],
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}

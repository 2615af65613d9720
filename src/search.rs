//! In-memory property search
//!
//! [`SearchCriteria`] is parsed from the public search query string and
//! applied to an already-loaded list of visible properties. A property must
//! pass every criterion that is set; room filters inside that criterion are
//! alternatives (any one may match).

use crate::model::{Property, SearchParams};

/// `type` values that mean "any type".
const ANY_TYPE: [&str; 2] = ["all", "todos"];

/// One requested bedroom filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomFilter {
    /// `"2"`: one of the property's room values is exactly this token
    Exact(String),
    /// `"3+"`: one of the property's room values is at least N
    AtLeast(u32),
    /// `"x+"`: a lower bound that did not parse; matches nothing
    Unparsable,
}

impl RoomFilter {
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.strip_suffix('+') {
            Some(bound) => bound
                .trim()
                .parse()
                .map(RoomFilter::AtLeast)
                .unwrap_or(RoomFilter::Unparsable),
            None => RoomFilter::Exact(token.to_string()),
        }
    }

    fn matches(&self, rooms: &[String]) -> bool {
        match self {
            RoomFilter::Exact(wanted) => rooms.iter().any(|r| r == wanted),
            RoomFilter::AtLeast(min) => rooms
                .iter()
                .filter_map(|r| leading_number(r))
                .any(|r| r >= *min),
            RoomFilter::Unparsable => false,
        }
    }
}

/// The integer a room value starts with, so the unit mix `"2 e 3"` reads as 2.
/// `None` when the value does not start with a digit.
fn leading_number(room: &str) -> Option<u32> {
    let room = room.trim_start();
    let end = room
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(room.len());
    room[..end].parse().ok()
}

/// Parsed, request-scoped search filters. Empty fields are unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub types: Vec<String>,
    pub state: Option<String>,
    pub cities: Vec<String>,
    pub neighborhoods: Vec<String>,
    pub rooms: Vec<RoomFilter>,
    pub max_price: Option<u64>,
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl SearchCriteria {
    pub fn from_params(params: &SearchParams) -> Self {
        let types = match params.property_type.as_deref().map(str::trim) {
            Some(t) if ANY_TYPE.iter().any(|any| t.eq_ignore_ascii_case(any)) => Vec::new(),
            other => split_list(other),
        };

        let state = params
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let rooms = split_list(params.rooms.as_deref())
            .iter()
            .map(|token| RoomFilter::parse(token))
            .collect();

        // A ceiling that does not parse is ignored
        let max_price = params
            .price
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok());

        Self {
            types,
            state,
            cities: split_list(params.cities.as_deref()),
            neighborhoods: split_list(params.neighborhoods.as_deref()),
            rooms,
            max_price,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.state.is_none()
            && self.cities.is_empty()
            && self.neighborhoods.is_empty()
            && self.rooms.is_empty()
            && self.max_price.is_none()
    }

    /// Returns true if `property` passes every criterion that is set.
    pub fn matches(&self, property: &Property) -> bool {
        if !self.types.is_empty() && !self.types.contains(&property.property_type) {
            return false;
        }
        if let Some(state) = &self.state {
            if &property.state != state {
                return false;
            }
        }
        if !self.cities.is_empty() && !self.cities.contains(&property.city) {
            return false;
        }
        if !self.neighborhoods.is_empty() && !self.neighborhoods.contains(&property.neighborhood) {
            return false;
        }
        if !self.rooms.is_empty() && !self.rooms.iter().any(|f| f.matches(&property.rooms)) {
            return false;
        }
        // Listings without a price are never excluded by the ceiling
        if let (Some(max), Some(price)) = (self.max_price, property.price) {
            if price > max as f64 {
                return false;
            }
        }
        true
    }
}

/// Returns the properties matching `criteria`, in their original order.
pub fn apply_filters(properties: &[Property], criteria: &SearchCriteria) -> Vec<Property> {
    if criteria.is_empty() {
        return properties.to_vec();
    }

    properties
        .iter()
        .filter(|p| criteria.matches(p))
        .cloned()
        .collect()
}

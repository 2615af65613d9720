//! Public visibility rules for listings
//!
//! A property is public only when its own `isVisibleOnSite` flag is set AND
//! its owning builder or broker is visible. Every public read path in this
//! module goes through that rule.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, warn};

use crate::batch::{fetch_by_ids, fetch_in_batches};
use crate::database::{Collection, Document, DocumentStore};
use crate::error::StoreError;
use crate::model::{fields, Owner, OwnerKind, Property};
use crate::query::{FieldPath, Filter};

fn visible() -> Filter {
    Filter::eq(fields::IS_VISIBLE_ON_SITE, true)
}

/// Decodes stored properties. Documents that fail to deserialize are logged
/// and left out of the result.
fn decode_properties(docs: Vec<Document>) -> Vec<Property> {
    docs.into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match doc.into_record::<Property>() {
                Ok(property) => Some(property),
                Err(e) => {
                    warn!(property = %id, error = %e, "skipping undecodable property");
                    None
                }
            }
        })
        .collect()
}

/// Sorts newest first; ties broken by id so output is deterministic.
fn sort_newest_first(properties: &mut [Property]) {
    properties.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Ids of every visible builder and broker.
pub async fn visible_owner_ids<S>(store: &S) -> Result<Vec<String>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let filters = [visible()];
    let (builders, brokers) = futures::try_join!(
        store.query(Collection::Builders, &filters),
        store.query(Collection::Brokers, &filters),
    )?;

    Ok(builders.into_iter().chain(brokers).map(|doc| doc.id).collect())
}

/// Of the given owner ids, the ones belonging to a visible builder or broker.
async fn visible_among<S>(store: &S, owner_ids: &[String]) -> Result<HashSet<String>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let filters = [visible()];
    let (builders, brokers) = futures::try_join!(
        fetch_by_ids(store, Collection::Builders, owner_ids, &filters),
        fetch_by_ids(store, Collection::Brokers, owner_ids, &filters),
    )?;

    Ok(builders.into_iter().chain(brokers).map(|doc| doc.id).collect())
}

/// Drops properties whose owner is hidden (or gone).
async fn retain_visible_owners<S>(
    store: &S,
    properties: Vec<Property>,
) -> Result<Vec<Property>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let mut owner_ids: Vec<String> = properties.iter().map(|p| p.owner_id.clone()).collect();
    owner_ids.sort();
    owner_ids.dedup();

    let visible_owners = visible_among(store, &owner_ids).await?;
    Ok(properties
        .into_iter()
        .filter(|p| visible_owners.contains(&p.owner_id))
        .collect())
}

/// Every publicly visible property, newest first.
pub async fn public_properties<S>(store: &S) -> Result<Vec<Property>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let owner_ids: Vec<Value> = visible_owner_ids(store)
        .await?
        .into_iter()
        .map(Value::String)
        .collect();

    let docs = fetch_in_batches(
        store,
        Collection::Properties,
        FieldPath::field(fields::OWNER_ID),
        &owner_ids,
        &[visible()],
    )
    .await?;

    let mut properties = decode_properties(docs);
    sort_newest_first(&mut properties);

    debug!(
        owners = owner_ids.len(),
        properties = properties.len(),
        "loaded public properties"
    );
    Ok(properties)
}

/// A single public property looked up by id, falling back to slug.
///
/// Slugs are not unique. Among the listings sharing a slug only the public
/// ones are considered, newest first.
pub async fn find_public_property<S>(store: &S, id_or_slug: &str) -> Result<Option<Property>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let candidates: Vec<Property> = match store.get(Collection::Properties, id_or_slug).await? {
        Some(doc) => decode_properties(vec![doc])
            .into_iter()
            .filter(|p| p.is_visible_on_site)
            .collect(),
        None => {
            let filters = [Filter::eq(fields::SLUG, id_or_slug), visible()];
            decode_properties(store.query(Collection::Properties, &filters).await?)
        }
    };

    let mut properties = retain_visible_owners(store, candidates).await?;
    sort_newest_first(&mut properties);
    Ok(properties.into_iter().next())
}

/// Loads a builder or broker record.
pub async fn load_owner<S>(store: &S, kind: OwnerKind, id: &str) -> Result<Option<Owner>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    store
        .get(kind.collection(), id)
        .await?
        .map(Document::into_record::<Owner>)
        .transpose()
}

/// Finds the builder or broker with `id`, whichever collection holds it.
pub async fn find_owner<S>(store: &S, id: &str) -> Result<Option<(OwnerKind, Owner)>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let (builder, broker) = futures::try_join!(
        load_owner(store, OwnerKind::Builder, id),
        load_owner(store, OwnerKind::Broker, id),
    )?;

    Ok(builder
        .map(|o| (OwnerKind::Builder, o))
        .or(broker.map(|o| (OwnerKind::Broker, o))))
}

/// A broker's public page: the curated portfolio plus the listings the
/// broker owns directly, de-duplicated by id. Returns `None` when the broker
/// does not exist or is hidden.
pub async fn broker_page<S>(store: &S, broker_id: &str) -> Result<Option<Vec<Property>>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let Some(broker) = load_owner(store, OwnerKind::Broker, broker_id).await? else {
        return Ok(None);
    };
    if !broker.is_visible_on_site {
        return Ok(None);
    }

    let visible_only = [visible()];
    let owned_filters = [Filter::eq(fields::OWNER_ID, broker_id), visible()];
    let (portfolio, owned) = futures::try_join!(
        fetch_by_ids(store, Collection::Properties, &broker.portfolio, &visible_only),
        store.query(Collection::Properties, &owned_filters),
    )?;

    let mut seen = HashSet::new();
    let merged: Vec<Property> = decode_properties(portfolio.into_iter().chain(owned).collect())
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect();

    // Portfolio entries may belong to other builders, hidden ones drop out
    let mut properties = retain_visible_owners(store, merged).await?;
    sort_newest_first(&mut properties);
    Ok(Some(properties))
}

/// Resolves a client's saved property ids under the same visibility rule as
/// every other public read. Unknown or hidden ids are silently dropped.
pub async fn saved_properties<S>(store: &S, ids: &[String]) -> Result<Vec<Property>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let mut unique: Vec<String> = ids.to_vec();
    unique.sort();
    unique.dedup();

    let docs = fetch_by_ids(store, Collection::Properties, &unique, &[visible()]).await?;
    let mut properties = retain_visible_owners(store, decode_properties(docs)).await?;
    sort_newest_first(&mut properties);
    Ok(properties)
}

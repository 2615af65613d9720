//! Membership lookups over arbitrarily long value lists
//!
//! The store caps membership filters at [`MAX_IN_VALUES`] values, so a long
//! list is split into consecutive chunks and one query is issued per chunk.
//! All chunk queries run concurrently; the first failure fails the lookup.

use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::database::{Collection, Document, DocumentStore};
use crate::error::StoreError;
use crate::query::{FieldPath, Filter, MAX_IN_VALUES};

/// Fetches every document of `collection` whose `field` is one of `values`
/// and which also passes every filter in `extra_filters`.
///
/// Result order is unspecified. Documents are not de-duplicated across
/// separate calls; callers merging several lookups must do that by id.
pub async fn fetch_in_batches<S>(
    store: &S,
    collection: Collection,
    field: FieldPath,
    values: &[Value],
    extra_filters: &[Filter],
) -> Result<Vec<Document>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    // An empty membership filter is not a valid query
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let chunks: Vec<Vec<Filter>> = values
        .chunks(MAX_IN_VALUES)
        .map(|chunk| {
            let mut filters = Vec::with_capacity(extra_filters.len() + 1);
            filters.push(Filter::is_in(field.clone(), chunk.to_vec()));
            filters.extend_from_slice(extra_filters);
            filters
        })
        .collect();

    debug!(
        collection = collection.name(),
        values = values.len(),
        chunks = chunks.len(),
        "issuing batched membership lookup"
    );

    let results = try_join_all(
        chunks
            .iter()
            .map(|filters| store.query(collection, filters)),
    )
    .await?;

    Ok(results.into_iter().flatten().collect())
}

/// Convenience wrapper for lookups keyed by document id.
pub async fn fetch_by_ids<S>(
    store: &S,
    collection: Collection,
    ids: &[String],
    extra_filters: &[Filter],
) -> Result<Vec<Document>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let values: Vec<Value> = ids.iter().cloned().map(Value::String).collect();
    fetch_in_batches(store, collection, FieldPath::DocumentId, &values, extra_filters).await
}

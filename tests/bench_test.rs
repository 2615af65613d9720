//! Benchmark tests for the search pipeline and batched lookups
//!
//! Run with: cargo test --release --test bench_test -- --ignored --nocapture

use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tempfile::NamedTempFile;

use listings::batch::fetch_by_ids;
use listings::database::{Collection, DocumentStore, RedbStore};
use listings::model::{Property, SearchParams};
use listings::search::{apply_filters, SearchCriteria};

/// Benchmark helper to measure execution time
fn report(name: &str, iterations: usize, start: Instant) {
    let duration = start.elapsed();
    let avg_ms = duration.as_millis() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn sample_properties(count: usize) -> Vec<Property> {
    let cities = ["São Paulo", "Santos", "Campinas", "Recife"];
    (0..count)
        .map(|i| Property {
            id: format!("p{}", i),
            slug: None,
            property_type: (if i % 2 == 0 { "Apartamento" } else { "Casa" }).to_string(),
            status: "Pronto".to_string(),
            state: "SP".to_string(),
            city: cities[i % cities.len()].to_string(),
            neighborhood: format!("Bairro {}", i % 25),
            address: None,
            latitude: None,
            longitude: None,
            price: (i % 7 != 0).then(|| (100_000 + (i % 50) * 20_000) as f64),
            rooms: vec![(1 + i % 4).to_string()],
            garage_spaces: Some((i % 3) as u32),
            area: None,
            media: vec![],
            owner_id: format!("owner{}", i % 40),
            is_visible_on_site: true,
            created_at: Utc::now(),
        })
        .collect()
}

#[test]
#[ignore] // Run explicitly with: cargo test bench --release -- --ignored --nocapture
fn bench_apply_filters() {
    println!("\n=== Benchmark: Property search ===\n");

    let properties = sample_properties(10_000);
    let criteria = SearchCriteria::from_params(&SearchParams {
        property_type: Some("Apartamento".to_string()),
        cities: Some("São Paulo,Santos".to_string()),
        rooms: Some("2,3+".to_string()),
        price: Some("600000".to_string()),
        ..Default::default()
    });

    let iterations = 200;
    let start = Instant::now();
    let mut matched = 0;
    for _ in 0..iterations {
        matched = apply_filters(&properties, &criteria).len();
    }
    report("Filter 10k properties", iterations, start);
    println!("  matched per run: {}", matched);
}

#[tokio::test]
#[ignore]
async fn bench_batched_lookup() {
    println!("\n=== Benchmark: Batched lookup ===\n");

    let temp_db = NamedTempFile::new().unwrap();
    let store = RedbStore::open(temp_db.path().to_str().unwrap()).unwrap();

    let mut ids = Vec::new();
    for i in 0..1_000 {
        let doc = store
            .insert(
                Collection::Properties,
                json!({ "ownerId": format!("owner{}", i % 40), "isVisibleOnSite": true }),
            )
            .await
            .unwrap();
        ids.push(doc.id);
    }
    let wanted: Vec<String> = ids.iter().step_by(3).cloned().collect();

    let iterations = 50;
    let start = Instant::now();
    for _ in 0..iterations {
        let docs = fetch_by_ids(&store, Collection::Properties, &wanted, &[])
            .await
            .unwrap();
        assert_eq!(docs.len(), wanted.len());
    }
    report("Lookup 334 ids in chunks of 30", iterations, start);
}

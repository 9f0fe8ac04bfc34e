pub mod client;
pub mod query;
pub mod response;

pub use client::ElasticClient;
pub use query::{AggregationSpec, CompositeSource, Earliest, Interval};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;

/// Black-box document store: one aggregation request in, raw JSON out.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn execute(&self, spec: &AggregationSpec) -> Result<Value>;
}

/// Run a composite aggregation, following `after_key` until the store stops returning one.
/// Stops after `max_pages` pages and logs the truncation.
pub async fn fetch_composite_buckets(
    store: &dyn DocumentStore,
    spec: &AggregationSpec,
    max_pages: usize,
) -> Result<Vec<Value>> {
    let mut buckets = Vec::new();
    let mut page_spec = spec.clone();

    for page in 1..=max_pages {
        let raw = store.execute(&page_spec).await?;
        let page_buckets = response::aggregation_buckets(&raw, &spec.name)?;
        let fetched = page_buckets.len();
        buckets.extend(page_buckets);

        let next = match response::after_key(&raw, &spec.name) {
            Some(key) if fetched > 0 => key,
            _ => {
                debug!(
                    aggregation = %spec.name,
                    pages = page,
                    buckets = buckets.len(),
                    "composite complete"
                );
                return Ok(buckets);
            }
        };

        if page == max_pages {
            warn!(
                aggregation = %spec.name,
                pages = max_pages,
                buckets = buckets.len(),
                "composite page limit reached; remaining buckets dropped"
            );
            break;
        }
        page_spec = spec.after(next);
    }

    Ok(buckets)
}

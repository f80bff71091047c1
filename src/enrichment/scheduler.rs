//! Bounded-concurrency enrichment of a record list.

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, warn};

use super::resolver::ImageResolver;
use crate::geo::Attraction;

/// Runs the resolver chain over the first `max_items` records, with at most
/// `concurrency` chains in flight.
///
/// Records are mutated in place, so their order and identity are preserved
/// whatever order the chains complete in.
pub async fn enrich_all(
    records: &mut [Attraction],
    resolver: &ImageResolver,
    concurrency: usize,
    max_items: usize,
) {
    let limit = concurrency.max(1);
    stream::iter(records.iter_mut().take(max_items))
        .for_each_concurrent(limit, |record| resolver.resolve(record))
        .await;
}

/// [`enrich_all`] bounded by an overall time budget.
///
/// When the budget runs out the records keep whatever was resolved so far.
/// Returns whether the fan-out completed.
pub async fn enrich_within(
    records: &mut [Attraction],
    resolver: &ImageResolver,
    concurrency: usize,
    max_items: usize,
    budget: Duration,
) -> bool {
    let target = records.len().min(max_items);
    match tokio::time::timeout(budget, enrich_all(records, resolver, concurrency, max_items)).await
    {
        Ok(()) => {
            debug!("Enriched {} records", target);
            true
        }
        Err(_) => {
            warn!(
                "Enrichment budget of {}ms exhausted, returning partial results",
                budget.as_millis()
            );
            false
        }
    }
}

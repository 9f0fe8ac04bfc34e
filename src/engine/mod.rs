pub mod mood;
pub mod ranking;
pub mod reshape;
pub mod rolling;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::config::{agg_names, fields, Config, ENTITY_PAGE_SIZE, TIME_PAGE_SIZE};
use crate::error::Result;
use crate::lookback::LookbackRegistry;
use crate::store::response::aggregation_buckets;
use crate::store::{
    fetch_composite_buckets, AggregationSpec, CompositeSource, DocumentStore, Earliest, Interval,
};
use crate::types::{HistoryPoint, MoodLabel, MoodPools, RankedEntity, SentimentPoint};

/// Composite source names used in every query the engine issues.
const TIME_SOURCE: &str = "created_at";
const DAY_SOURCE: &str = "date";
const ENTITY_SOURCE: &str = "player";
const LABEL_SOURCE: &str = "sentiment";

/// Turns store aggregations into mood, series and ranking outputs.
/// Holds no per-request state; every call re-queries the store.
pub struct SentimentEngine {
    store: Arc<dyn DocumentStore>,
    lookbacks: LookbackRegistry,
    roster: HashSet<String>,
    moods: MoodPools,
    composite_max_pages: usize,
    rng: Mutex<StdRng>,
}

impl SentimentEngine {
    pub fn new(store: Arc<dyn DocumentStore>, cfg: &Config) -> Self {
        Self {
            store,
            lookbacks: LookbackRegistry::new(cfg.season_start),
            roster: cfg.roster.iter().cloned().collect(),
            moods: cfg.moods.clone(),
            composite_max_pages: cfg.composite_max_pages,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the symbol RNG, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn lookbacks(&self) -> &LookbackRegistry {
        &self.lookbacks
    }

    pub fn roster(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roster.iter().cloned().collect();
        names.sort();
        names
    }

    /// Mood over `[earliest, now)`.
    pub async fn mood_snapshot(&self, earliest: &Earliest) -> Result<MoodLabel> {
        let spec = AggregationSpec::terms(agg_names::MOOD, fields::SENTIMENT_LABEL)
            .since(earliest)
            .until_now();
        let raw = self.store.execute(&spec).await?;
        let (pos, neg) = mood::label_totals(&aggregation_buckets(&raw, agg_names::MOOD)?);
        debug!(window = %earliest, pos, neg, "mood snapshot");

        let window = earliest.to_query_value();
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        mood::mood_label(pos, neg, &self.moods, &mut *rng, &window)
    }

    /// Smoothed series for a registered period, ascending by bucket start.
    pub async fn sentiment_series(&self, period: &str) -> Result<Vec<SentimentPoint>> {
        let profile = self.lookbacks.resolve(period)?;
        let spec = AggregationSpec::composite(
            agg_names::SERIES,
            vec![
                CompositeSource::date_histogram(
                    TIME_SOURCE,
                    fields::CREATED_AT,
                    profile.bucket_interval.clone(),
                ),
                CompositeSource::terms(LABEL_SOURCE, fields::SENTIMENT_LABEL),
            ],
            TIME_PAGE_SIZE,
        )
        .since(&profile.earliest)
        .until_now();

        let raw = self.fetch_all(&spec).await?;
        let buckets = reshape::time_buckets(&raw, TIME_SOURCE, LABEL_SOURCE);
        debug!(
            period,
            buckets = buckets.len(),
            window = profile.smoothing_window,
            "sentiment series"
        );
        Ok(rolling::sentiment_series(&buckets, profile.smoothing_window))
    }

    /// Roster entities ranked by POS minus NEG over a registered period.
    pub async fn entity_rankings(&self, period: &str) -> Result<Vec<RankedEntity>> {
        let profile = self.lookbacks.resolve(period)?;
        let spec = AggregationSpec::composite(
            agg_names::ENTITIES,
            vec![
                CompositeSource::terms(ENTITY_SOURCE, fields::ENTITIES),
                CompositeSource::terms(LABEL_SOURCE, fields::SENTIMENT_LABEL),
            ],
            ENTITY_PAGE_SIZE,
        )
        .since(&profile.earliest)
        .until_now();

        let raw = self.fetch_all(&spec).await?;
        let entities = ranking::entity_sentiments(&raw, ENTITY_SOURCE, LABEL_SOURCE, &self.roster);
        debug!(period, entities = entities.len(), "entity rankings");
        Ok(ranking::rank_entities(entities))
    }

    /// Daily signed sentiment for one entity over its whole history.
    pub async fn entity_history(&self, entity: &str) -> Result<Vec<HistoryPoint>> {
        let spec = AggregationSpec::composite(
            agg_names::HISTORY,
            vec![
                CompositeSource::date_histogram(DAY_SOURCE, fields::CREATED_AT, Interval::days(1)),
                CompositeSource::terms(LABEL_SOURCE, fields::SENTIMENT_LABEL),
            ],
            TIME_PAGE_SIZE,
        )
        .matching(fields::ENTITIES, entity);

        let raw = self.fetch_all(&spec).await?;
        let days = reshape::time_buckets(&raw, DAY_SOURCE, LABEL_SOURCE);
        Ok(rolling::signed_history(&days))
    }

    async fn fetch_all(&self, spec: &AggregationSpec) -> Result<Vec<serde_json::Value>> {
        fetch_composite_buckets(self.store.as_ref(), spec, self.composite_max_pages).await
    }
}

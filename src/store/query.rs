//! Typed request bodies for the document store's `_search` endpoint.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::config::fields;

/// Lower bound of a query window: store date-math (`now-12h/h`) or a fixed instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Earliest {
    DateMath(String),
    At(DateTime<Utc>),
}

impl Earliest {
    pub fn to_query_value(&self) -> String {
        match self {
            Earliest::DateMath(expr) => expr.clone(),
            Earliest::At(at) => at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl std::fmt::Display for Earliest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_query_value())
    }
}

/// Histogram bucket width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interval {
    /// `fixed_interval`, e.g. "15m".
    Fixed(String),
    /// `calendar_interval`, e.g. "1d".
    Calendar(String),
}

impl Interval {
    pub fn minutes(n: u32) -> Self {
        Interval::Fixed(format!("{n}m"))
    }

    pub fn days(n: u32) -> Self {
        Interval::Calendar(format!("{n}d"))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Interval::Fixed(s) | Interval::Calendar(s) => s,
        }
    }

    fn param_name(&self) -> &'static str {
        match self {
            Interval::Fixed(_) => "fixed_interval",
            Interval::Calendar(_) => "calendar_interval",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompositeSource {
    Terms { name: String, field: String },
    DateHistogram { name: String, field: String, interval: Interval },
}

impl CompositeSource {
    pub fn terms(name: &str, field: &str) -> Self {
        CompositeSource::Terms {
            name: name.to_string(),
            field: field.to_string(),
        }
    }

    pub fn date_histogram(name: &str, field: &str, interval: Interval) -> Self {
        CompositeSource::DateHistogram {
            name: name.to_string(),
            field: field.to_string(),
            interval,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            CompositeSource::Terms { name, field } => {
                json!({ name: { "terms": { "field": field } } })
            }
            CompositeSource::DateHistogram {
                name,
                field,
                interval,
            } => json!({
                name: {
                    "date_histogram": { "field": field, interval.param_name(): interval.as_str() }
                }
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Terms { field: String },
    Composite {
        sources: Vec<CompositeSource>,
        size: usize,
        /// Cursor from the previous page's `after_key`.
        after: Option<Value>,
    },
}

/// One store query: filters plus a single named aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSpec {
    pub name: String,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub term: Option<(String, String)>,
    pub exclude_opposing: bool,
    pub aggregation: Aggregation,
}

impl AggregationSpec {
    pub fn terms(name: &str, field: &str) -> Self {
        Self::new(name, Aggregation::Terms { field: field.to_string() })
    }

    pub fn composite(name: &str, sources: Vec<CompositeSource>, size: usize) -> Self {
        Self::new(name, Aggregation::Composite { sources, size, after: None })
    }

    fn new(name: &str, aggregation: Aggregation) -> Self {
        Self {
            name: name.to_string(),
            gte: None,
            lt: None,
            term: None,
            exclude_opposing: true,
            aggregation,
        }
    }

    pub fn since(mut self, earliest: &Earliest) -> Self {
        self.gte = Some(earliest.to_query_value());
        self
    }

    pub fn until_now(mut self) -> Self {
        self.lt = Some("now".to_string());
        self
    }

    pub fn matching(mut self, field: &str, value: &str) -> Self {
        self.term = Some((field.to_string(), value.to_string()));
        self
    }

    /// Next-page copy of a composite spec. No-op for `terms`.
    pub fn after(&self, after_key: Value) -> Self {
        let mut next = self.clone();
        if let Aggregation::Composite { after, .. } = &mut next.aggregation {
            *after = Some(after_key);
        }
        next
    }

    pub fn to_body(&self) -> Value {
        let mut must = Vec::new();
        if self.gte.is_some() || self.lt.is_some() {
            let mut range = Map::new();
            if let Some(gte) = &self.gte {
                range.insert("gte".to_string(), json!(gte));
            }
            if let Some(lt) = &self.lt {
                range.insert("lt".to_string(), json!(lt));
            }
            must.push(json!({ "range": { fields::CREATED_AT: range } }));
        }
        if let Some((field, value)) = &self.term {
            must.push(json!({ "term": { field: value } }));
        }

        let mut must_not = Vec::new();
        if self.exclude_opposing {
            must_not.push(json!({ "term": { fields::OPPOSING_FAN: "true" } }));
        }

        let agg = match &self.aggregation {
            Aggregation::Terms { field } => json!({ "terms": { "field": field } }),
            Aggregation::Composite { sources, size, after } => {
                let mut composite = Map::new();
                composite.insert(
                    "sources".to_string(),
                    Value::Array(sources.iter().map(CompositeSource::to_json).collect()),
                );
                composite.insert("size".to_string(), json!(size));
                if let Some(after) = after {
                    composite.insert("after".to_string(), after.clone());
                }
                json!({ "composite": composite })
            }
        };

        json!({
            "size": 0,
            "query": { "bool": { "must": must, "must_not": must_not } },
            "aggs": { self.name.as_str(): agg }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn terms_body_matches_store_contract() {
        let body = AggregationSpec::terms("window_sentiment", fields::SENTIMENT_LABEL)
            .since(&Earliest::DateMath("now-1d".to_string()))
            .until_now()
            .to_body();

        assert_eq!(body["size"], 0);
        let range = &body["query"]["bool"]["must"][0]["range"]["created_at"];
        assert_eq!(range["gte"], "now-1d");
        assert_eq!(range["lt"], "now");
        assert_eq!(body["query"]["bool"]["must_not"][0]["term"]["is_opposing_fan"], "true");
        assert_eq!(body["aggs"]["window_sentiment"]["terms"]["field"], "sentiment.label");
    }

    #[test]
    fn composite_body_carries_sources_in_order() {
        let spec = AggregationSpec::composite(
            "sentiment_buckets",
            vec![
                CompositeSource::date_histogram(
                    "created_at",
                    fields::CREATED_AT,
                    Interval::minutes(15),
                ),
                CompositeSource::terms("sentiment", fields::SENTIMENT_LABEL),
            ],
            5000,
        );
        let body = spec.to_body();
        let composite = &body["aggs"]["sentiment_buckets"]["composite"];
        assert_eq!(composite["size"], 5000);
        assert_eq!(
            composite["sources"][0]["created_at"]["date_histogram"]["fixed_interval"],
            "15m"
        );
        assert_eq!(composite["sources"][1]["sentiment"]["terms"]["field"], "sentiment.label");
        assert!(composite.get("after").is_none());
        // No window given, so no range clause.
        assert_eq!(body["query"]["bool"]["must"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn after_key_is_threaded_into_next_page() {
        let spec = AggregationSpec::composite(
            "player_buckets",
            vec![CompositeSource::terms("player", fields::ENTITIES)],
            10,
        );
        let next = spec.after(json!({ "player": "Pete Alonso" }));
        assert_eq!(
            next.to_body()["aggs"]["player_buckets"]["composite"]["after"]["player"],
            "Pete Alonso"
        );
    }

    #[test]
    fn calendar_interval_and_term_filter() {
        let body = AggregationSpec::composite(
            "daily_sentiment",
            vec![CompositeSource::date_histogram("date", fields::CREATED_AT, Interval::days(1))],
            5000,
        )
        .matching(fields::ENTITIES, "Jeff McNeil")
        .to_body();
        assert_eq!(body["query"]["bool"]["must"][0]["term"]["player_entities"], "Jeff McNeil");
        assert_eq!(
            body["aggs"]["daily_sentiment"]["composite"]["sources"][0]["date"]["date_histogram"]
                ["calendar_interval"],
            "1d"
        );
    }

    #[test]
    fn fixed_instant_renders_as_rfc3339() {
        let at = Utc.with_ymd_and_hms(2022, 6, 20, 0, 0, 0).unwrap();
        assert_eq!(Earliest::At(at).to_query_value(), "2022-06-20T00:00:00Z");
    }

    #[test]
    fn earliest_displays_as_its_query_value() {
        let at = Earliest::At(Utc.with_ymd_and_hms(2022, 6, 20, 0, 0, 0).unwrap());
        assert_eq!(at.to_string(), "2022-06-20T00:00:00Z");
        assert_eq!(Earliest::DateMath("now-12h/h".into()).to_string(), "now-12h/h");
    }
}

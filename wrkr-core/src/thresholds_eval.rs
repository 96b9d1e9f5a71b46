use crate::{ThresholdAgg, ThresholdOp, ThresholdSet, ThresholdViolation, parse_threshold_expr};
use wrkr_metrics::{KeyId, MetricKind, Registry, TagSet};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid threshold expression for metric `{metric}`: {error}")]
    InvalidThresholdExpr { metric: String, error: String },
}

pub fn evaluate_thresholds(
    metrics: &Registry,
    sets: &[ThresholdSet],
) -> Result<Vec<ThresholdViolation>> {
    let mut out: Vec<ThresholdViolation> = Vec::new();

    for set in sets {
        let Some((metric_id, kind)) = metrics.lookup_metric(&set.metric) else {
            // Missing metric => all expressions fail.
            for expr in &set.expressions {
                out.push(ThresholdViolation {
                    metric: set.metric.clone(),
                    tags: set.tags.clone(),
                    expression: expr.clone(),
                    observed: None,
                });
            }
            continue;
        };

        let selector = tag_selector(metrics, &set.tags);

        for expr_raw in &set.expressions {
            let expr =
                parse_threshold_expr(expr_raw).map_err(|error| Error::InvalidThresholdExpr {
                    metric: set.metric.clone(),
                    error,
                })?;

            let observed = observed_value(metrics, metric_id, kind, &expr.agg, &selector);

            let passed = observed.is_some_and(|v| compare(v, expr.op, expr.value));
            if !passed {
                out.push(ThresholdViolation {
                    metric: set.metric.clone(),
                    tags: set.tags.clone(),
                    expression: expr_raw.clone(),
                    observed,
                });
            }
        }
    }

    Ok(out)
}

/// Resolves a threshold's tag selector to interned keys once, so each expression in the set
/// reuses the same predicate instead of re-interning per expression.
fn tag_selector(metrics: &Registry, selector: &[(String, String)]) -> Vec<(KeyId, KeyId)> {
    selector
        .iter()
        .map(|(k, v)| (metrics.resolve_key(k), metrics.resolve_key(v)))
        .collect()
}

fn selector_matches(selector: &[(KeyId, KeyId)], tags: &TagSet) -> bool {
    selector.iter().all(|(k, v)| tags.get(*k) == Some(*v))
}

fn observed_value(
    metrics: &Registry,
    metric_id: wrkr_metrics::MetricId,
    kind: MetricKind,
    agg: &ThresholdAgg,
    selector: &[(KeyId, KeyId)],
) -> Option<f64> {
    let pred = |tags: &TagSet| selector_matches(selector, tags);

    match agg {
        ThresholdAgg::Count => match kind {
            MetricKind::Counter => Some(metrics.fold_counter_sum(metric_id, pred) as f64),
            MetricKind::Rate => {
                let (total, _hits, _rate) = metrics.fold_rate_sum(metric_id, pred);
                Some(total as f64)
            }
            MetricKind::Trend => metrics
                .fold_histogram_summary(metric_id, pred)
                .map(|h| h.count as f64),
            MetricKind::Gauge => None,
        },

        ThresholdAgg::Rate => match kind {
            MetricKind::Rate => {
                let (_total, _hits, rate) = metrics.fold_rate_sum(metric_id, pred);
                rate
            }
            _ => None,
        },

        ThresholdAgg::Avg => match kind {
            MetricKind::Trend => metrics
                .fold_histogram_summary(metric_id, pred)
                .and_then(|h| h.mean),
            _ => None,
        },

        ThresholdAgg::Min => match kind {
            MetricKind::Trend => metrics
                .fold_histogram_summary(metric_id, pred)
                .and_then(|h| h.min),
            _ => None,
        },

        ThresholdAgg::Max => match kind {
            MetricKind::Trend => metrics
                .fold_histogram_summary(metric_id, pred)
                .and_then(|h| h.max),
            _ => None,
        },

        ThresholdAgg::P(p) => match kind {
            MetricKind::Trend => metrics
                .fold_histogram_summary(metric_id, pred)
                .and_then(|h| match *p {
                    50 => h.p50,
                    75 => h.p75,
                    90 => h.p90,
                    95 => h.p95,
                    99 => h.p99,
                    _ => None,
                }),
            _ => None,
        },
    }
}

fn compare(observed: f64, op: ThresholdOp, expected: f64) -> bool {
    match op {
        ThresholdOp::Lt => observed < expected,
        ThresholdOp::Lte => observed <= expected,
        ThresholdOp::Gt => observed > expected,
        ThresholdOp::Gte => observed >= expected,
        ThresholdOp::Eq => observed == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use wrkr_metrics::{MetricHandle, MetricKind, TagSet};

    #[test]
    fn missing_metric_fails_threshold() {
        let metrics = Registry::default();
        let sets = vec![ThresholdSet {
            metric: "nope".to_string(),
            tags: Vec::new(),
            expressions: vec!["count>0".to_string()],
        }];

        let v = match evaluate_thresholds(&metrics, &sets) {
            Ok(v) => v,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].metric, "nope");
        assert!(v[0].observed.is_none());
    }

    #[test]
    fn counter_count_uses_sum() {
        let metrics = Registry::default();
        let id = metrics.register("my_counter", MetricKind::Counter);
        let tags = TagSet::from_sorted_iter([]);
        if let Some(MetricHandle::Counter(c)) = metrics.get_handle(id, tags) {
            c.fetch_add(2, Ordering::Relaxed);
        }

        let sets = vec![ThresholdSet {
            metric: "my_counter".to_string(),
            tags: Vec::new(),
            expressions: vec!["count==2".to_string()],
        }];

        let v = match evaluate_thresholds(&metrics, &sets) {
            Ok(v) => v,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert!(v.is_empty());
    }

    #[test]
    fn rate_rate_uses_hits_over_total() {
        let metrics = Registry::default();
        let id = metrics.register("http_req_failed", MetricKind::Rate);
        let tags = TagSet::from_sorted_iter([]);
        if let Some(MetricHandle::Rate(r)) = metrics.get_handle(id, tags) {
            r.total.fetch_add(10, Ordering::Relaxed);
            r.hits.fetch_add(1, Ordering::Relaxed);
        }

        let sets = vec![ThresholdSet {
            metric: "http_req_failed".to_string(),
            tags: Vec::new(),
            expressions: vec!["rate<0.2".to_string()],
        }];

        let v = match evaluate_thresholds(&metrics, &sets) {
            Ok(v) => v,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert!(v.is_empty());
    }

    #[test]
    fn tag_selector_scopes_observed_value_to_matching_series() {
        let metrics = Registry::default();
        let id = metrics.register("http_req_duration", MetricKind::Trend);

        let scenario_k = metrics.resolve_key("scenario");
        let a = metrics.resolve_key("a");
        let b = metrics.resolve_key("b");

        let tags_a = TagSet::from_sorted_iter([(scenario_k, a)]);
        let tags_b = TagSet::from_sorted_iter([(scenario_k, b)]);

        if let Some(MetricHandle::Trend(h)) = metrics.get_handle(id, tags_a) {
            let mut h = h.lock();
            let _ = h.record(10);
        }
        if let Some(MetricHandle::Trend(h)) = metrics.get_handle(id, tags_b) {
            let mut h = h.lock();
            let _ = h.record(10_000);
        }

        let sets = vec![ThresholdSet {
            metric: "http_req_duration".to_string(),
            tags: vec![("scenario".to_string(), "a".to_string())],
            expressions: vec!["max<100".to_string()],
        }];

        let v = match evaluate_thresholds(&metrics, &sets) {
            Ok(v) => v,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert!(v.is_empty(), "expected scenario=a series to pass: {v:?}");
    }
}

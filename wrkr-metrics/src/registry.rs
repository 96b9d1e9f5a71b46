// use std::sync::Arc;
use dashmap::DashMap;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::key::{Interner, KeyId};
use crate::metrics::{
    HistogramSummary, MetricHandle, MetricKind, MetricSeriesSummary, MetricStorage, MetricValue,
    new_default_histogram, summarize_histogram,
};
use crate::tags::TagSet;
use std::sync::atomic::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricId(u32);

#[derive(Debug)]
pub struct MetricDef {
    pub name: KeyId,
    pub kind: MetricKind,
}

#[derive(Debug, Default)]
pub struct Registry {
    interner: Interner,
    defs: RwLock<Vec<MetricDef>>,
    storage: DashMap<MetricId, DashMap<TagSet, MetricStorage>>,
}

impl Registry {
    pub fn register(&self, name: &str, kind: MetricKind) -> MetricId {
        let name_id = self.interner.get_or_intern(name);

        let mut defs = self.defs.write();
        if let Some((idx, _)) = defs.iter().enumerate().find(|(_, d)| d.name == name_id) {
            return MetricId(idx as u32);
        }

        let id = MetricId(defs.len() as u32);
        defs.push(MetricDef {
            name: name_id,
            kind,
        });
        self.storage.insert(id, DashMap::new());
        id
    }

    pub fn resolve_key(&self, key: &str) -> KeyId {
        self.interner.get_or_intern(key)
    }

    pub fn resolve_key_id(&self, id: KeyId) -> Option<Arc<str>> {
        self.interner.resolve(id)
    }

    /// Looks up a previously-registered metric by name without interning it, so unknown metric
    /// names (e.g. a typo in a threshold) resolve to `None` instead of creating a dangling def.
    pub fn lookup_metric(&self, name: &str) -> Option<(MetricId, MetricKind)> {
        let defs = self.defs.read();
        defs.iter().enumerate().find_map(|(idx, d)| {
            let resolved = self.interner.resolve(d.name)?;
            (resolved.as_ref() == name).then_some((MetricId(idx as u32), d.kind))
        })
    }

    pub fn query(&self, metric: MetricId) -> crate::agg::Query<'_> {
        crate::agg::Query::new(self, metric)
    }

    pub(crate) fn visit_series(&self, metric: MetricId, mut f: impl FnMut(&TagSet, &MetricStorage)) {
        if let Some(series_map) = self.storage.get(&metric) {
            for entry in series_map.iter() {
                f(entry.key(), entry.value());
            }
        }
    }

    pub fn fold_counter_sum(&self, metric: MetricId, predicate: impl Fn(&TagSet) -> bool) -> u64 {
        let mut total = 0u64;
        self.visit_series(metric, |tags, storage| {
            if !predicate(tags) {
                return;
            }
            if let MetricStorage::Counter(c) = storage {
                total = total.saturating_add(c.load(Ordering::Relaxed));
            }
        });
        total
    }

    pub fn fold_rate_sum(
        &self,
        metric: MetricId,
        predicate: impl Fn(&TagSet) -> bool,
    ) -> (u64, u64, Option<f64>) {
        let mut total = 0u64;
        let mut hits = 0u64;
        self.visit_series(metric, |tags, storage| {
            if !predicate(tags) {
                return;
            }
            if let MetricStorage::Rate(r) = storage {
                total = total.saturating_add(r.total.load(Ordering::Relaxed));
                hits = hits.saturating_add(r.hits.load(Ordering::Relaxed));
            }
        });
        let rate = (total > 0).then(|| hits as f64 / total as f64);
        (total, hits, rate)
    }

    pub fn fold_histogram_summary(
        &self,
        metric: MetricId,
        predicate: impl Fn(&TagSet) -> bool,
    ) -> Option<HistogramSummary> {
        let mut acc: Option<Histogram<u64>> = None;
        self.visit_series(metric, |tags, storage| {
            if !predicate(tags) {
                return;
            }
            let MetricStorage::Trend(h) = storage else {
                return;
            };
            let h = h.lock();
            match acc.as_mut() {
                Some(a) => {
                    let _ = a.add(&*h);
                }
                None => {
                    let mut new_h = new_default_histogram();
                    let _ = new_h.add(&*h);
                    acc = Some(new_h);
                }
            }
        });
        acc.as_ref().map(summarize_histogram)
    }

    pub fn resolve_tags(&self, tags: &[(&str, &str)]) -> TagSet {
        let mut resolved: Vec<(KeyId, KeyId)> = tags
            .iter()
            .map(|(k, v)| (self.resolve_key(k), self.resolve_key(v)))
            .collect();
        resolved.sort_unstable();
        TagSet::from_sorted_iter(resolved)
    }

    pub fn get_handle(&self, metric: MetricId, tags: TagSet) -> Option<MetricHandle> {
        let series_map = self.storage.get(&metric)?;

        if let Some(storage) = series_map.get(&tags) {
            return Some(self.storage_to_handle(storage.value()));
        }

        let kind = {
            let defs = self.defs.read();
            defs.get(metric.0 as usize)?.kind
        };

        let new_storage = MetricStorage::new(kind);
        let handle = self.storage_to_handle(&new_storage);
        series_map.insert(tags, new_storage);

        Some(handle)
    }

    fn storage_to_handle(&self, s: &MetricStorage) -> MetricHandle {
        match s {
            MetricStorage::Counter(a) => MetricHandle::Counter(a.clone()),
            MetricStorage::Gauge(a) => MetricHandle::Gauge(a.clone()),
            MetricStorage::Rate(a) => MetricHandle::Rate(a.clone()),
            MetricStorage::Trend(a) => MetricHandle::Trend(a.clone()),
        }
    }

    pub fn summarize(&self) -> Vec<MetricSeriesSummary> {
        let mut out = Vec::new();
        let defs = self.defs.read();

        for entry in self.storage.iter() {
            let metric_id = entry.key();
            let series_map = entry.value();

            let def = match defs.get(metric_id.0 as usize) {
                Some(d) => d,
                None => continue,
            };

            let name_str = self
                .interner
                .resolve(def.name)
                .map(|s| s.to_string())
                .unwrap_or_default();

            for series in series_map.iter() {
                let tags = series.key();
                let storage = series.value();

                let tag_vec: Vec<(String, String)> = tags
                    .tags
                    .iter()
                    .map(|(k, v)| {
                        (
                            self.interner
                                .resolve(*k)
                                .map(|s| s.to_string())
                                .unwrap_or_default(),
                            self.interner
                                .resolve(*v)
                                .map(|s| s.to_string())
                                .unwrap_or_default(),
                        )
                    })
                    .collect();

                let values = match storage {
                    MetricStorage::Counter(a) => MetricValue::Counter(a.load(Ordering::Relaxed)),
                    MetricStorage::Gauge(a) => MetricValue::Gauge(a.load(Ordering::Relaxed)),
                    MetricStorage::Rate(r) => {
                        let total = r.total.load(Ordering::Relaxed);
                        let hits = r.hits.load(Ordering::Relaxed);
                        let rate = if total > 0 {
                            Some(hits as f64 / total as f64)
                        } else {
                            None
                        };
                        MetricValue::Rate { total, hits, rate }
                    }
                    MetricStorage::Trend(h) => MetricValue::Trend(summarize_histogram(&h.lock())),
                };

                out.push(MetricSeriesSummary {
                    name: name_str.clone(),
                    kind: def.kind,
                    tags: tag_vec,
                    values,
                });
            }
        }

        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

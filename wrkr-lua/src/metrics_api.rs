use std::sync::Arc;

use mlua::{Lua, Table, UserData, UserDataMethods, Value};

use crate::modules::group::current_group;
use crate::{Error, Result};

fn parse_tags(tags: Option<Table>) -> mlua::Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    let Some(tags) = tags else {
        return Ok(out);
    };

    for pair in tags.pairs::<Value, Value>() {
        let (k, v) = pair?;
        let k = match k {
            Value::String(s) => s.to_string_lossy().to_string(),
            _ => continue,
        };
        let v = match v {
            Value::String(s) => s.to_string_lossy().to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            _ => continue,
        };
        out.push((k, v));
    }

    Ok(out)
}

#[derive(Clone)]
struct LuaMetric {
    metrics: Arc<wrkr_metrics::Registry>,
    metrics_ctx: wrkr_core::MetricsContext,
    metric_id: wrkr_metrics::MetricId,
    kind: wrkr_metrics::MetricKind,
}

impl LuaMetric {
    fn handle(&self, lua: &Lua, tags: Option<Table>) -> mlua::Result<wrkr_metrics::MetricHandle> {
        let mut tags = parse_tags(tags)?;
        self.metrics_ctx.merge_base_tags_if_missing(&mut tags, &["group"]);
        if let Some(group) = current_group(lua)
            && !tags.iter().any(|(k, _)| k == "group")
        {
            tags.push(("group".to_string(), group));
        }

        let tag_refs: Vec<(&str, &str)> = tags.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let tagset = self.metrics.resolve_tags(&tag_refs);
        self.metrics
            .get_handle(self.metric_id, tagset)
            .ok_or_else(|| mlua::Error::external(Error::InvalidMetricName))
    }
}

impl UserData for LuaMetric {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("add", |lua, this, args: mlua::MultiValue| {
            let mut it = args.into_iter();
            let first = it
                .next()
                .ok_or_else(|| mlua::Error::external(Error::InvalidMetricValue))?;

            let tags_tbl = it.next().and_then(|v| match v {
                Value::Table(t) => Some(t),
                _ => None,
            });

            match this.kind {
                wrkr_metrics::MetricKind::Rate => {
                    let value = match first {
                        Value::Boolean(b) => b,
                        _ => return Err(mlua::Error::external(Error::InvalidMetricValue)),
                    };
                    let handle = this.handle(lua, tags_tbl)?;
                    handle.add_rate(if value { 1 } else { 0 }, 1);
                }
                wrkr_metrics::MetricKind::Counter => {
                    let value = lua_number(first)?;
                    let handle = this.handle(lua, tags_tbl)?;
                    handle.increment(value.max(0.0) as u64);
                }
                wrkr_metrics::MetricKind::Gauge => {
                    let value = lua_number(first)?;
                    let handle = this.handle(lua, tags_tbl)?;
                    handle.set_gauge(value as i64);
                }
                wrkr_metrics::MetricKind::Trend => {
                    let value = lua_number(first)?;
                    let handle = this.handle(lua, tags_tbl)?;
                    handle.observe_trend(value.max(0.0) as u64);
                }
            }

            Ok(())
        });
    }
}

fn lua_number(v: Value) -> mlua::Result<f64> {
    match v {
        Value::Integer(i) => Ok(i as f64),
        Value::Number(n) => Ok(n),
        _ => Err(mlua::Error::external(Error::InvalidMetricValue)),
    }
}

pub fn create_metrics_module(
    lua: &Lua,
    metrics: Arc<wrkr_metrics::Registry>,
    metrics_ctx: wrkr_core::MetricsContext,
) -> Result<Table> {
    let t = lua.create_table()?;

    let mk = |kind: wrkr_metrics::MetricKind| {
        let metrics = metrics.clone();
        let metrics_ctx = metrics_ctx.clone();
        lua.create_function(move |lua, name: String| {
            if name.trim().is_empty() {
                return Err(mlua::Error::external(Error::InvalidMetricName));
            }
            let metric_id = metrics.register(&name, kind);
            lua.create_userdata(LuaMetric {
                metrics: metrics.clone(),
                metrics_ctx: metrics_ctx.clone(),
                metric_id,
                kind,
            })
        })
    };

    t.set("Trend", mk(wrkr_metrics::MetricKind::Trend)?)?;
    t.set("Counter", mk(wrkr_metrics::MetricKind::Counter)?)?;
    t.set("Gauge", mk(wrkr_metrics::MetricKind::Gauge)?)?;
    t.set("Rate", mk(wrkr_metrics::MetricKind::Rate)?)?;

    Ok(t)
}

use std::sync::Arc;

use mlua::Lua;

use crate::Result;
use crate::metrics_api::create_metrics_module;

pub(super) fn register_runtime(
    lua: &Lua,
    metrics: Arc<wrkr_metrics::Registry>,
    metrics_ctx: wrkr_core::MetricsContext,
) -> Result<()> {
    let loader = {
        let metrics = metrics.clone();
        let metrics_ctx = metrics_ctx.clone();
        lua.create_function(move |lua, ()| {
            create_metrics_module(lua, metrics.clone(), metrics_ctx.clone())
                .map_err(mlua::Error::external)
        })?
    };
    super::preload_set(lua, "wrkr/metrics", loader)
}

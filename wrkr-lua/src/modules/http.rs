use std::sync::Arc;

use mlua::Lua;

use crate::Result;
use crate::http_api::create_http_module;

pub(super) fn register_runtime(
    lua: &Lua,
    run_ctx: &wrkr_core::RunScenariosContext,
    metrics_ctx: wrkr_core::MetricsContext,
    client: Arc<wrkr_core::HttpClient>,
) -> Result<()> {
    let run_ctx = Arc::new(run_ctx.clone());
    let loader = {
        let run_ctx = run_ctx.clone();
        let metrics_ctx = metrics_ctx.clone();
        let client = client.clone();
        lua.create_function(move |lua, ()| {
            create_http_module(lua, run_ctx.clone(), metrics_ctx.clone(), client.clone())
                .map_err(mlua::Error::external)
        })?
    };
    super::preload_set(lua, "wrkr/http", loader)
}

use std::sync::Arc;

use mlua::Lua;

use crate::Result;
use crate::http_api::create_check_function;

pub(super) fn register_runtime(
    lua: &Lua,
    run_ctx: &wrkr_core::RunScenariosContext,
    metrics_ctx: wrkr_core::MetricsContext,
) -> Result<()> {
    let run_ctx = Arc::new(run_ctx.clone());
    let loader = {
        let run_ctx = run_ctx.clone();
        let metrics_ctx = metrics_ctx.clone();
        lua.create_function(move |lua, ()| {
            let f = create_check_function(lua, run_ctx.clone(), metrics_ctx.clone())
                .map_err(mlua::Error::external)?;
            Ok::<mlua::Value, mlua::Error>(mlua::Value::Function(f))
        })?
    };
    super::preload_set(lua, "wrkr/check", loader)
}

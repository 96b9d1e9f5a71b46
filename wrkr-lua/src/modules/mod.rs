use mlua::{Lua, Table};

use crate::Result;

mod check;
mod debug;
mod env;
mod fs;
mod group;
#[cfg(feature = "grpc")]
mod grpc;
mod http;
mod json;
mod metrics;
mod shared;
mod uuid;
mod vu;
mod wrkr;

fn preload_set(lua: &Lua, name: &str, loader: mlua::Function) -> Result<()> {
    let package: Table = lua.globals().get("package")?;
    let preload: Table = package.get("preload")?;
    preload.set(name, loader)?;
    Ok(())
}

pub struct RegisterContext<'a> {
    pub vu_id: u64,
    pub max_vus: u64,
    pub metrics_ctx: wrkr_core::MetricsContext,
    pub run_ctx: &'a wrkr_core::RunScenariosContext,
}

pub fn register(lua: &Lua, ctx: RegisterContext<'_>) -> Result<()> {
    #[cfg(feature = "http")]
    http::register_runtime(
        lua,
        ctx.run_ctx,
        ctx.metrics_ctx.clone(),
        ctx.run_ctx.client.clone(),
    )?;
    #[cfg(feature = "grpc")]
    grpc::register_runtime(
        lua,
        ctx.run_ctx,
        ctx.metrics_ctx.clone(),
        &ctx.run_ctx.script_path,
        ctx.max_vus,
    )?;
    check::register_runtime(lua, ctx.run_ctx, ctx.metrics_ctx.clone())?;
    metrics::register_runtime(lua, ctx.run_ctx.metrics.clone(), ctx.metrics_ctx.clone())?;
    env::register_runtime(lua, &ctx.run_ctx.env)?;
    fs::register(lua, ctx.run_ctx.script_path.as_path())?;
    debug::register(lua)?;
    json::register(lua)?;
    uuid::register(lua)?;
    vu::register(lua, ctx.vu_id)?;
    group::register(lua)?;
    shared::register_runtime(lua, ctx.run_ctx)?;
    wrkr::register(lua)?;
    Ok(())
}

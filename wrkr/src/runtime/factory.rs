use std::path::Path;
use std::sync::Arc;

use wrkr_core::{ScriptSource, load_bytes};

use super::ScriptRuntime;
use crate::cli::RunnerType;

#[derive(Debug, thiserror::Error)]
pub enum CreateRuntimeError {
    #[error(transparent)]
    Source(#[from] wrkr_core::SourceError),

    #[error(transparent)]
    Archive(#[from] super::archive::ArchiveError),

    #[error("unsupported script extension `{ext}`: {path}")]
    UnsupportedExtension { ext: String, path: String },

    #[error("script at `{path}` is not valid UTF-8")]
    NotUtf8 { path: String },

    #[error("unknown runner type `{0:?}` (no script runtimes compiled in for it)")]
    UnknownType(RunnerType),

    #[error(transparent)]
    RuntimeInit(#[from] anyhow::Error),
}

/// Resolves a script spec (`-`/stdin, an `http(s)://` URL, a local path, or a tar archive) into
/// a runnable [`ScriptRuntime`]. Without an explicit `type_hint`, archives are auto-detected by
/// a `.tar` extension or the ustar magic bytes; otherwise dispatch falls back to file extension.
pub async fn create_runtime(
    spec: &Path,
    type_hint: Option<RunnerType>,
) -> Result<Arc<dyn ScriptRuntime>, CreateRuntimeError> {
    let source = ScriptSource::classify(&spec.to_string_lossy());
    let ext = match &source {
        ScriptSource::File(p) => p
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_default(),
        _ => String::new(),
    };

    let (bytes, label) = load_bytes(&source).await?;

    let is_archive = matches!(type_hint, Some(RunnerType::Archive))
        || (type_hint.is_none() && (ext == "tar" || super::archive::looks_like_tar(&bytes)));

    if is_archive {
        let loaded = super::archive::load_archive(&bytes)?;
        let entry_label = label.join(&loaded.entry_path);
        return match loaded.runner_type.as_str() {
            #[cfg(feature = "lua")]
            "lua" => Ok(Arc::new(super::lua::LuaRuntime::new(
                &entry_label,
                loaded.entry_script,
            )?) as Arc<dyn ScriptRuntime>),
            _ => Err(CreateRuntimeError::UnknownType(RunnerType::Archive)),
        };
    }

    let text = String::from_utf8(bytes).map_err(|_| CreateRuntimeError::NotUtf8 {
        path: label.display().to_string(),
    })?;

    match (type_hint, ext.as_str()) {
        #[cfg(feature = "lua")]
        (Some(RunnerType::Lua), _) | (None, "lua") => {
            Ok(Arc::new(super::lua::LuaRuntime::new(&label, text)?) as Arc<dyn ScriptRuntime>)
        }
        #[cfg(not(feature = "lua"))]
        (Some(RunnerType::Lua), _) => Err(CreateRuntimeError::UnknownType(RunnerType::Lua)),
        (Some(RunnerType::Archive), _) => unreachable!("handled by is_archive above"),
        (None, other) => Err(CreateRuntimeError::UnsupportedExtension {
            ext: other.to_string(),
            path: label.display().to_string(),
        }),
    }
}

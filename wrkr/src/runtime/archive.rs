use std::collections::HashMap;
use std::io::Read as _;

const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

#[derive(Debug, serde::Deserialize)]
struct Manifest {
    /// Archive-relative path of the entry script.
    entry: String,
    #[serde(default = "default_runner_type")]
    r#type: String,
}

fn default_runner_type() -> String {
    "lua".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to read tar archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive is missing a top-level manifest.json")]
    MissingManifest,

    #[error("invalid manifest.json: {0}")]
    InvalidManifest(#[from] serde_json::Error),

    #[error("manifest entry `{0}` not found in archive")]
    MissingEntry(String),

    #[error("manifest entry `{0}` is not valid UTF-8")]
    EntryNotUtf8(String),

    #[error("unsupported archive runner type `{0}` (expected `lua`)")]
    UnsupportedRunnerType(String),
}

pub struct LoadedArchive {
    pub entry_path: String,
    pub entry_script: String,
    pub runner_type: String,
}

/// Sniffs the POSIX ustar magic at byte offset 257. Used for extension-less `-`/stdin/URL
/// sources where a `.tar` suffix isn't available to dispatch on.
#[must_use]
pub fn looks_like_tar(bytes: &[u8]) -> bool {
    bytes.len() >= TAR_MAGIC_OFFSET + TAR_MAGIC.len()
        && &bytes[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()] == TAR_MAGIC
}

/// Unpacks a tar archive fully into memory, reads its `manifest.json`, and resolves the
/// entry script it names. The manifest's `type` field picks the runner (currently `lua` only).
pub fn load_archive(bytes: &[u8]) -> Result<LoadedArchive, ArchiveError> {
    let mut files: HashMap<String, Vec<u8>> = HashMap::new();
    let mut ar = tar::Archive::new(bytes);
    for entry in ar.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().into_owned();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        files.insert(path, buf);
    }

    let manifest_bytes = files.get("manifest.json").ok_or(ArchiveError::MissingManifest)?;
    let manifest: Manifest = serde_json::from_slice(manifest_bytes)?;

    if manifest.r#type != "lua" {
        return Err(ArchiveError::UnsupportedRunnerType(manifest.r#type));
    }

    let entry_bytes = files
        .get(&manifest.entry)
        .ok_or_else(|| ArchiveError::MissingEntry(manifest.entry.clone()))?;
    let entry_script = String::from_utf8(entry_bytes.clone())
        .map_err(|_| ArchiveError::EntryNotUtf8(manifest.entry.clone()))?;

    Ok(LoadedArchive {
        entry_path: manifest.entry,
        entry_script,
        runner_type: manifest.r#type,
    })
}

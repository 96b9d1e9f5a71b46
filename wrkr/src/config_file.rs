use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use wrkr_core::FileConfig;
use wrkr_core::thresholds::ThresholdSet;

const FILE_NAME: &str = "wrkr.toml";

#[derive(Debug, Deserialize, Default)]
struct RawFileConfig {
    vus: Option<u64>,
    iterations: Option<u64>,
    #[serde(default, with = "humantime_serde_option")]
    duration: Option<Duration>,
    #[serde(default)]
    thresholds: BTreeMap<String, RawThresholdExprs>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawThresholdExprs {
    One(String),
    Many(Vec<String>),
}

impl From<RawThresholdExprs> for Vec<String> {
    fn from(raw: RawThresholdExprs) -> Self {
        match raw {
            RawThresholdExprs::One(s) => vec![s],
            RawThresholdExprs::Many(v) => v,
        }
    }
}

/// Locates `wrkr.toml` next to the script first, falling back to the current directory, and
/// parses it into the `wrkr_core::config::resolve` file layer. Returns the empty default (no
/// error) when no `wrkr.toml` exists anywhere — the file layer is always optional.
pub fn load(script_path: &Path) -> anyhow::Result<FileConfig> {
    let Some(path) = locate(script_path) else {
        return Ok(FileConfig::default());
    };

    let text = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw: RawFileConfig = toml::from_str(&text)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;

    let mut thresholds = Vec::with_capacity(raw.thresholds.len());
    for (key, exprs) in raw.thresholds {
        let (metric, tags) = wrkr_core::parse_threshold_metric_key(&key)
            .map_err(|e| anyhow::anyhow!("{}: invalid threshold key `{key}`: {e}", path.display()))?;
        let expressions: Vec<String> = exprs.into();
        if expressions.is_empty() {
            anyhow::bail!("{}: threshold `{key}` has no expressions", path.display());
        }
        thresholds.push(ThresholdSet {
            metric,
            tags,
            expressions,
        });
    }

    Ok(FileConfig {
        vus: raw.vus,
        iterations: raw.iterations,
        duration: raw.duration,
        thresholds,
    })
}

fn locate(script_path: &Path) -> Option<PathBuf> {
    let next_to_script = script_path.parent().unwrap_or_else(|| Path::new(".")).join(FILE_NAME);
    if next_to_script.is_file() {
        return Some(next_to_script);
    }

    let in_cwd = PathBuf::from(FILE_NAME);
    in_cwd.is_file().then_some(in_cwd)
}

/// `humantime`-backed `Option<Duration>` (de)serialization for TOML string fields like `"30s"`.
mod humantime_serde_option {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

use std::time::Duration;

use super::ScriptOptions;
use crate::thresholds::ThresholdSet;

/// Values read from an optional `wrkr.toml`, the lowest-priority override layer above the
/// hardcoded defaults: CLI > env > script > file > defaults.
///
/// `wrkr::config_file` is the only producer of this type; it owns locating and parsing the
/// TOML file, this module only owns precedence.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    pub vus: Option<u64>,
    pub iterations: Option<u64>,
    pub duration: Option<Duration>,
    pub thresholds: Vec<ThresholdSet>,
}

/// Fills in whatever the script's top-level `options` table left unset from `file`.
///
/// `file` never overrides a value the script itself set — it only backstops values the script
/// omitted, which in turn CLI/env (applied later, in `scenarios_from_options`) can still
/// override. Per-scenario fields (`opts.scenarios[*]`) are script-only; the file layer only
/// covers the top-level scalars and thresholds named in `wrkr.toml`.
pub fn apply_file_config(mut opts: ScriptOptions, file: FileConfig) -> ScriptOptions {
    opts.vus = opts.vus.or(file.vus);
    opts.iterations = opts.iterations.or(file.iterations);
    opts.duration = opts.duration.or(file.duration);
    if opts.thresholds.is_empty() {
        opts.thresholds = file.thresholds;
    }
    opts
}

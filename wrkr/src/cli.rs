use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "wrkr",
    author,
    version,
    about = "Fast, scriptable load testing tool",
    long_about = "wrkr is a fast, scriptable load testing tool.\n\nA test script defines an `options` table (iterations/vus/duration/scenarios) and an entry function to execute per virtual user.\n\nThe current script runtime is Lua and built-in APIs are available via `require(\"wrkr/...\")`.\n\nBy default, environment variables from the current process are visible to the script; use `--env KEY=VALUE` to add/override values.",
    after_help = "Examples:\n  wrkr run examples/plaintext.lua\n  wrkr run examples/plaintext.lua --vus 50 --duration 30s\n  wrkr run examples/json_aggregate.lua --iterations 1000 --output json\n  wrkr run examples/plaintext.lua --env BASE_URL=https://example.com\n\nDocs & examples: https://github.com/nogcio/wrkr"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test script
    #[command(
        long_about = "Run a test script and execute its entry function with the configured number of virtual users.\n\nCLI flags override values from the script's `options` table."
    )]
    Run(RunArgs),

    /// Scaffold a Lua scripting workspace (LuaLS stubs, .luarc.json, and an example script)
    Init(InitArgs),

    /// Resolve a script's `options` into a standalone scenario YAML file
    #[command(
        name = "export-scenario",
        long_about = "Evaluate a script's `options` table (without running it) and write the resolved scenario/threshold configuration as YAML."
    )]
    ExportScenario(ExportScenarioArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Target directory to initialize (created if missing)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,

    /// Create VS Code recommendations under .vscode/
    #[arg(long)]
    pub vscode: bool,

    /// Script filename to create in the target directory
    #[arg(long, default_value = "script.lua")]
    pub script: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the script (.lua), an archive, or `-` for stdin
    pub script: PathBuf,

    /// Override iterations (otherwise use `options.iterations` or default=1)
    #[arg(short = 'i', long, env = "WRKR_ITERATIONS")]
    pub iterations: Option<u64>,

    /// Number of virtual users
    #[arg(short = 'u', long, env = "WRKR_VUS")]
    pub vus: Option<u64>,

    /// Test duration (e.g. 10s, 250ms, 1m)
    #[arg(short = 'd', long, value_parser = parse_duration, env = "WRKR_DURATION")]
    pub duration: Option<Duration>,

    /// Maximum number of VUs the run may ramp up to (defaults to the run's own peak)
    #[arg(short = 'm', long = "max", env = "WRKR_MAX")]
    pub max_vus: Option<u64>,

    /// Ramping stage `DURATION[:TARGET]` (repeatable); an omitted target holds the
    /// previous stage's target. Building at least one `--stage` defines a synthetic
    /// ramping-vus scenario that takes priority over the script's own scenarios.
    #[arg(short = 's', long = "stage", value_name = "DUR[:TARGET]")]
    pub stage: Vec<String>,

    /// Collector backend `TYPE[=ARG]` (e.g. `json-file=out.ndjson`, `stdout`)
    #[arg(short = 'o', long = "out", env = "WRKR_OUT")]
    pub out: Option<String>,

    /// Force the runner type instead of auto-detecting from the script path
    #[arg(short = 't', long = "type", value_enum, env = "WRKR_TYPE")]
    pub runner_type: Option<RunnerType>,

    /// Start the run paused; resume it via the Control API
    #[arg(long)]
    pub paused: bool,

    /// Keep the process (and its Control API) alive after the run completes, until SIGINT
    #[arg(long)]
    pub linger: bool,

    /// Parse thresholds but never evaluate them (the run can never be tainted)
    #[arg(long)]
    pub no_thresholds: bool,

    /// Skip the best-effort anonymous usage-report beacon sent at run start
    #[arg(long, env = "WRKR_NO_USAGE_REPORT")]
    pub no_usage_report: bool,

    /// Suppress progress output (summary/collector output is unaffected)
    #[arg(long, env = "WRKR_QUIET")]
    pub quiet: bool,

    /// Bind address for the Control API (loopback-only unless explicitly overridden)
    #[arg(long, env = "WRKR_ADDRESS")]
    pub address: Option<String>,

    /// Add/override env vars visible to the script (repeatable, KEY=VALUE).
    /// CLI-provided vars override the current process env.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunnerType {
    Lua,
    Archive,
}

#[derive(Debug, Args)]
pub struct ExportScenarioArgs {
    /// Path to the script (.lua)
    pub script: PathBuf,

    /// Output YAML file path
    #[arg(short = 'o', long = "out", default_value = "scenario.yaml")]
    pub out: PathBuf,

    /// Override iterations (otherwise use `options.iterations` or default=1)
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Number of virtual users
    #[arg(long)]
    pub vus: Option<u64>,

    /// Test duration (e.g. 10s, 250ms, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Add/override env vars visible to the script (repeatable, KEY=VALUE)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_with_iterations() {
        let parsed = Cli::try_parse_from([
            "wrkr",
            "run",
            "bench.lua",
            "--iterations",
            "10",
            "--vus",
            "2",
            "--duration",
            "250ms",
            "--env",
            "FOO=bar",
            "--env",
            "EMPTY=",
            "--output",
            "human-readable",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.script, PathBuf::from("bench.lua"));
                assert_eq!(args.iterations, Some(10));
                assert_eq!(args.vus, Some(2));
                assert_eq!(args.duration, Some(Duration::from_millis(250)));
                assert_eq!(args.env, vec!["FOO=bar".to_string(), "EMPTY=".to_string()]);
                assert!(matches!(args.output, OutputFormat::HumanReadable));
            }
            Command::Init(_) => panic!("expected run command"),
            Command::ExportScenario(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_parses_run_with_new_flags() {
        let parsed = Cli::try_parse_from([
            "wrkr",
            "run",
            "bench.lua",
            "--max",
            "50",
            "--stage",
            "10s:10",
            "--stage",
            "20s:0",
            "--out",
            "json-file=out.ndjson",
            "--type",
            "lua",
            "--paused",
            "--linger",
            "--no-thresholds",
            "--no-usage-report",
            "--quiet",
            "--address",
            "127.0.0.1:6565",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.max_vus, Some(50));
                assert_eq!(args.stage, vec!["10s:10".to_string(), "20s:0".to_string()]);
                assert_eq!(args.out, Some("json-file=out.ndjson".to_string()));
                assert!(matches!(args.runner_type, Some(RunnerType::Lua)));
                assert!(args.paused);
                assert!(args.linger);
                assert!(args.no_thresholds);
                assert!(args.no_usage_report);
                assert!(args.quiet);
                assert_eq!(args.address, Some("127.0.0.1:6565".to_string()));
            }
            Command::Init(_) => panic!("expected run command"),
            Command::ExportScenario(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_parses_init_defaults() {
        let parsed = Cli::try_parse_from(["wrkr", "init"]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.dir, PathBuf::from("."));
                assert!(!args.force);
                assert!(!args.vscode);
                assert_eq!(args.script, "script.lua".to_string());
            }
            Command::Run(_) => panic!("expected init command"),
            Command::ExportScenario(_) => panic!("expected init command"),
        }
    }
}

use std::path::Path;

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::report;
use crate::run_error::RunError;
use crate::run_support::{classify_runtime_create_error, classify_runtime_error, merged_env};
use crate::runtime;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let env = merged_env(&args.env).map_err(RunError::InvalidInput)?;

    let runtime = runtime::create_runtime(&args.script, args.runner_type)
        .await
        .map_err(|e| classify_runtime_create_error(anyhow::Error::new(e)))?;
    let run_ctx = runtime.create_run_context(&env);

    let mut opts = runtime
        .parse_script_options(&run_ctx)
        .map_err(|e| classify_runtime_error("failed to parse script options", e))?;

    if !args.stage.is_empty() {
        opts.scenarios = vec![staged_scenario_from_cli(&args.stage)?];
    }

    let file_cfg = crate::config_file::load(&args.script).map_err(RunError::InvalidInput)?;
    opts = wrkr_core::apply_file_config(opts, file_cfg);

    let cfg = wrkr_core::RunConfig {
        iterations: args.iterations,
        vus: args.vus,
        duration: args.duration,
    };

    let thresholds = if args.no_thresholds {
        Vec::new()
    } else {
        opts.thresholds.clone()
    };

    let mut scenarios = wrkr_core::scenarios_from_options(opts, cfg).map_err(|e| {
        RunError::InvalidInput(anyhow::Error::new(e).context("invalid scenario config"))
    })?;

    if let Some(max_vus) = args.max_vus {
        clamp_scenarios_to_max_vus(&mut scenarios, max_vus);
    }

    if !args.no_usage_report {
        let vus_max = scenarios.iter().map(scenario_peak_vus).max().unwrap_or(1);
        let iterations = scenarios.iter().find_map(|s| s.iterations);
        let duration = scenarios.iter().find_map(|s| s.duration);
        report::send_usage_report(vus_max, duration, iterations);
    }

    let formatter = crate::output::formatter(args.output);
    formatter.print_header(&args.script, &scenarios);
    let progress = (!args.quiet).then(|| formatter.progress()).flatten();

    let collectors = crate::output::collectors::build_collectors(args.out.as_deref())
        .map_err(RunError::InvalidInput)?;

    runtime
        .run_setup(&run_ctx)
        .map_err(|e| classify_runtime_error("setup() failed", e))?;

    let teardown_ctx = run_ctx.clone();
    let vu_runtime = runtime.clone();
    let pause = std::sync::Arc::new(wrkr_core::PauseGate::new(args.paused));
    let cancel = wrkr_core::CancellationToken::new();

    // A second, later Ctrl-C forces an immediate exit even mid-drain; the first just
    // requests a graceful stop via the cancellation token.
    let sigint_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("SIGINT received, draining run gracefully");
                cancel.cancel();
            }
        })
    };

    let control_api = match &args.address {
        Some(address) => Some(
            crate::api::ControlApi::bind(address, pause.clone(), cancel.clone())
                .await
                .map_err(RunError::InvalidInput)?,
        ),
        None => None,
    };

    let summary = wrkr_core::run_scenarios(
        scenarios,
        run_ctx,
        &thresholds,
        move |ctx| {
            let vu_runtime = vu_runtime.clone();
            async move { vu_runtime.run_vu(ctx).await }
        },
        progress,
        pause,
        cancel,
        collectors,
    )
    .await
    .map_err(classify_core_error)?;

    sigint_handle.abort();
    if let Some(control_api) = control_api {
        control_api.shutdown();
    }

    runtime
        .run_teardown(&teardown_ctx)
        .map_err(|e| classify_runtime_error("teardown() failed", e))?;

    if let Some(outputs) = runtime
        .run_handle_summary(&teardown_ctx, &summary)
        .map_err(|e| classify_runtime_error("handleSummary() failed", e))?
    {
        if let Some(stdout) = outputs.stdout {
            print!("{stdout}");
        }
        if let Some(stderr) = outputs.stderr {
            eprint!("{stderr}");
        }
        if !outputs.files.is_empty() {
            let base_dir = teardown_ctx
                .script_path
                .parent()
                .unwrap_or_else(|| Path::new("."));
            wrkr_core::write_output_files(base_dir, &outputs.files).map_err(|e| {
                RunError::RuntimeError(
                    anyhow::Error::new(e).context("writing handleSummary() output files"),
                )
            })?;
        }
    }

    formatter
        .print_summary(&summary)
        .map_err(RunError::RuntimeError)?;

    if args.linger {
        tracing::info!("run finished, lingering until SIGINT (--linger)");
        let _ = tokio::signal::ctrl_c().await;
    }

    Ok(ExitCode::from_tainted(summary.tainted()))
}

fn scenario_peak_vus(s: &wrkr_core::ScenarioConfig) -> u64 {
    match &s.executor {
        wrkr_core::ScenarioExecutor::ConstantVus { vus } => *vus,
        wrkr_core::ScenarioExecutor::RampingVus { start_vus, stages } => stages
            .iter()
            .map(|st| st.target)
            .max()
            .unwrap_or(0)
            .max(*start_vus),
        wrkr_core::ScenarioExecutor::RampingArrivalRate { max_vus, .. } => *max_vus,
    }
}

/// Clamps every scenario's effective VU ceiling to `max_vus`, matching §4.E's "stage target
/// clamped to vus_max" rule. Never lowers below 1 VU.
fn clamp_scenarios_to_max_vus(scenarios: &mut [wrkr_core::ScenarioConfig], max_vus: u64) {
    let max_vus = max_vus.max(1);
    for s in scenarios {
        match &mut s.executor {
            wrkr_core::ScenarioExecutor::ConstantVus { vus } => {
                if *vus > max_vus {
                    tracing::warn!(
                        scenario = s.metrics_ctx.scenario(),
                        requested = *vus,
                        max_vus,
                        "clamping vus to --max"
                    );
                    *vus = max_vus;
                }
            }
            wrkr_core::ScenarioExecutor::RampingVus { start_vus, stages } => {
                if *start_vus > max_vus {
                    *start_vus = max_vus;
                }
                for st in stages.iter_mut() {
                    if st.target > max_vus {
                        tracing::warn!(
                            scenario = s.metrics_ctx.scenario(),
                            requested = st.target,
                            max_vus,
                            "clamping stage target to --max"
                        );
                        st.target = max_vus;
                    }
                }
            }
            wrkr_core::ScenarioExecutor::RampingArrivalRate {
                pre_allocated_vus,
                max_vus: scenario_max,
                ..
            } => {
                if *scenario_max > max_vus {
                    tracing::warn!(
                        scenario = s.metrics_ctx.scenario(),
                        requested = *scenario_max,
                        max_vus,
                        "clamping max_vus to --max"
                    );
                    *scenario_max = max_vus;
                }
                if *pre_allocated_vus > *scenario_max {
                    *pre_allocated_vus = *scenario_max;
                }
            }
        }
    }
}

/// Builds a single synthetic ramping-vus scenario from repeated `-s/--stage DUR[:TARGET]`
/// flags. An omitted target holds the previous stage's target (0 for the first stage).
fn staged_scenario_from_cli(
    raw_stages: &[String],
) -> Result<wrkr_core::ScenarioOptions, RunError> {
    let mut stages = Vec::with_capacity(raw_stages.len());
    let mut prev_target = 0u64;

    for raw in raw_stages {
        let (dur_str, target) = match raw.split_once(':') {
            Some((d, t)) => {
                let t: u64 = t.parse().map_err(|_| invalid_stage(raw))?;
                (d, t)
            }
            None => (raw.as_str(), prev_target),
        };

        let duration = humantime::parse_duration(dur_str).map_err(|_| invalid_stage(raw))?;
        prev_target = target;
        stages.push(wrkr_core::Stage { duration, target });
    }

    Ok(wrkr_core::ScenarioOptions {
        name: "Default".to_string(),
        exec: None,
        tags: Vec::new(),
        executor: Some("ramping-vus".to_string()),
        vus: None,
        iterations: None,
        duration: None,
        start_vus: Some(0),
        stages,
        start_rate: None,
        time_unit: None,
        pre_allocated_vus: None,
        max_vus: None,
    })
}

fn invalid_stage(raw: &str) -> RunError {
    RunError::InvalidInput(anyhow::anyhow!(
        "invalid --stage `{raw}` (expected DURATION or DURATION:TARGET, e.g. `30s:10`)"
    ))
}

fn classify_core_error(err: wrkr_core::Error) -> RunError {
    match err {
        wrkr_core::Error::InvalidVus
        | wrkr_core::Error::InvalidIterations
        | wrkr_core::Error::InvalidExecutor
        | wrkr_core::Error::InvalidStages
        | wrkr_core::Error::InvalidStartVus
        | wrkr_core::Error::InvalidStartRate
        | wrkr_core::Error::InvalidTimeUnit
        | wrkr_core::Error::InvalidPreAllocatedVus
        | wrkr_core::Error::InvalidMaxVus
        | wrkr_core::Error::InvalidOutputPath(_) => RunError::InvalidInput(anyhow::Error::new(err)),
        wrkr_core::Error::Vu(_) | wrkr_core::Error::Io(_) | wrkr_core::Error::Join(_) => {
            RunError::RuntimeError(anyhow::Error::new(err))
        }
        wrkr_core::Error::Threshold(_) => RunError::RuntimeError(anyhow::Error::new(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_scenario_fills_missing_target_from_previous_stage() {
        let scenario = match staged_scenario_from_cli(&["10s:5".to_string(), "10s".to_string()]) {
            Ok(s) => s,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(scenario.stages.len(), 2);
        assert_eq!(scenario.stages[0].target, 5);
        assert_eq!(scenario.stages[1].target, 5);
    }

    #[test]
    fn invalid_stage_spec_is_rejected() {
        assert!(staged_scenario_from_cli(&["not-a-duration".to_string()]).is_err());
    }

}

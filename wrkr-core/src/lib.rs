pub mod collector;
pub mod config;
pub mod error;
pub mod gate;
pub mod iteration_metrics;
pub mod metrics_agg;
pub mod metrics_context;
pub mod outputs;
pub mod pacer;
pub mod pause;
pub mod progress;
pub mod request_metrics;
pub mod run;
pub mod schedule;
pub mod source;
pub mod summary;
pub mod thresholds;
pub mod thresholds_eval;
pub mod vu;

pub use collector::{Collector, CollectorError};
pub use config::{
    RunConfig, ScenarioConfig, ScenarioExecutor, ScenarioExecutorKind, ScenarioOptions,
    ScriptOptions, Stage,
};
pub use config::resolve::{FileConfig, apply_file_config};
pub use error::{Error, Result};
pub use gate::IterationGate;
pub use iteration_metrics::{IterationMetricIds, IterationSample};
pub use metrics_context::MetricsContext;
pub use outputs::write_output_files;
pub use pacer::ArrivalPacer;
pub use pause::PauseGate;
pub use progress::{LiveMetrics, ProgressFn, ProgressUpdate, ScenarioProgress, StageProgress};
pub use request_metrics::{Protocol, RequestMetricIds, RequestSample};
pub use run::{RunScenariosContext, run_scenarios, scenarios_from_options};
pub use schedule::{RampingU64Schedule, StageSnapshot};
pub use source::{ScriptSource, SourceError, load_bytes, load_script};
pub use summary::{RunSummary, ScenarioSummary};
pub use thresholds::{
    ThresholdAgg, ThresholdExpr, ThresholdOp, ThresholdSet, ThresholdTracker, ThresholdViolation,
    parse_threshold_expr, parse_threshold_metric_key,
};
pub use vu::{EnvVars, StartSignal, VuContext, VuWork};
pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "grpc")]
pub use wrkr_grpc::{
    ConnectOptions as GrpcConnectOptions, Error as GrpcError, GrpcClient, GrpcMethod,
    GrpcTransportErrorKind, InvokeOptions as GrpcInvokeOptions, ProtoSchema,
    SharedGrpcRegistry, TlsConfig as GrpcTlsConfig, UnaryResult as GrpcUnaryResult,
    encode_unary_request as grpc_encode_unary_request,
};
#[cfg(feature = "http")]
pub use wrkr_http::{
    Error as HttpError, HttpClient, HttpRequest, HttpResponse, HttpTransportErrorKind,
    Result as HttpResult, estimate_http_request_bytes,
};

pub fn process_env_snapshot() -> EnvVars {
    let vars: Vec<(std::sync::Arc<str>, std::sync::Arc<str>)> = std::env::vars()
        .map(|(k, v)| (std::sync::Arc::<str>::from(k), std::sync::Arc::<str>::from(v)))
        .collect();
    std::sync::Arc::from(vars.into_boxed_slice())
}

//! JointBlend simulator CLI
//!
//! Runs engine scenarios against the synthetic calibration grid, or solves a
//! single target from a recorded dataset.

use clap::Parser;
use jointblend_core::{EngineConfig, InterpolationMethod, PoseDataset, PoseDriver};
use jointblend_env::{DirectoryRecorder, DirectorySource, PoseRecorder, PoseSource, SamplePoint};
use jointblend_sim::scenarios::ScenarioId;
use jointblend_sim::{CalibrationGrid, ScenarioResult, ScenarioRunner, SimError, SimExport, SimFrame};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// JointBlend pose interpolation simulator
#[derive(Parser, Debug)]
#[command(name = "jointblend-sim")]
#[command(about = "Run pose interpolation scenarios for JointBlend", long_about = None)]
struct Args {
    /// Seed for the calibration grid and random targets
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (midpoint, grid_sweep, leave_one_out, duplicate_samples, empty_dataset, latency, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Folder of recorded poses (defaults to the synthetic grid)
    #[arg(short, long)]
    dataset: Option<String>,

    /// Engine configuration JSON file
    #[arg(short, long)]
    config: Option<String>,

    /// Solve a single target instead of running scenarios ("x,y,z")
    #[arg(short, long)]
    target: Option<String>,

    /// Interpolation method (idw, rbf); overrides the config file
    #[arg(short, long)]
    method: Option<InterpolationMethod>,

    /// Neighbors per query; overrides the config file
    #[arg(short)]
    k: Option<usize>,

    /// Gaussian noise on synthetic samples (degrees)
    #[arg(long, default_value = "0")]
    noise: f64,

    /// Random targets per sweep
    #[arg(long, default_value = "200")]
    targets: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export solved poses to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Write the synthetic grid as pose records into this folder and exit
    #[arg(long)]
    record_dir: Option<String>,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    if !args.json {
        info!("JointBlend Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    }
}

/// Returns whether everything that ran passed.
fn run(args: &Args) -> Result<bool, SimError> {
    let config = load_config(args)?;

    if let Some(folder) = &args.record_dir {
        let mut grid = CalibrationGrid::new(args.seed).with_noise(args.noise);
        let mut recorder = DirectoryRecorder::create(folder)?;
        let records = grid.records();
        for record in &records {
            recorder.append(record)?;
        }
        info!("Recorded {} poses to {}", records.len(), folder);
        return Ok(true);
    }

    let dataset = match &args.dataset {
        Some(folder) => {
            let records = DirectorySource::new(folder).load()?;
            let dataset = PoseDataset::from_records(&records);
            info!(
                "Loaded {} samples ({} joints) from {}",
                dataset.len(),
                dataset.max_joint_count(),
                folder
            );
            Some(dataset)
        }
        None => None,
    };

    if let Some(target) = &args.target {
        let target = parse_target(target)?;
        return solve_single(args, config, dataset, target);
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().map_err(SimError::UnknownScenario)?]
    };

    let mut runner = ScenarioRunner::new(args.seed)
        .with_config(config)
        .with_noise(args.noise)
        .with_targets(args.targets);
    if let Some(dataset) = dataset {
        runner = runner.with_dataset(dataset);
    }

    let results: Vec<ScenarioResult> = scenarios
        .iter()
        .map(|scenario| {
            let result = runner.run(*scenario);
            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), result.seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            result
        })
        .collect();

    if let Some(path) = &args.export {
        let export = runner.sweep_export(&args.scenario);
        export.write_to_file(path)?;
        info!("Exported {} frames to {}", export.frames.len(), path);
    }

    let total = results.len();
    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed,
            "failed": failed,
            "method": runner.config().method.name(),
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{:#}", summary);
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed == 0 {
            info!("✅ All {} scenarios passed!", total);
        } else {
            error!("❌ {}/{} scenarios failed!", failed, total);
        }
    }

    Ok(failed == 0)
}

/// Config file first, then command-line overrides.
fn load_config(args: &Args) -> Result<EngineConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(method) = args.method {
        config.method = method;
    }
    if let Some(k) = args.k {
        config.k = k;
    }
    config.validate()?;
    Ok(config)
}

fn parse_target(text: &str) -> Result<SamplePoint, SimError> {
    let coords: Vec<f64> = text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| SimError::InvalidTarget(text.to_string()))?;

    match coords.as_slice() {
        [x, y, z] if coords.iter().all(|c| c.is_finite()) => Ok(SamplePoint::new(*x, *y, *z)),
        _ => Err(SimError::InvalidTarget(text.to_string())),
    }
}

fn solve_single(
    args: &Args,
    config: EngineConfig,
    dataset: Option<PoseDataset>,
    target: SamplePoint,
) -> Result<bool, SimError> {
    let dataset = match dataset {
        Some(dataset) => dataset,
        None => CalibrationGrid::new(args.seed).with_noise(args.noise).dataset(),
    };
    let convention = config.euler_convention;
    let method = config.method;
    let driver = PoseDriver::new(config);

    let solution = driver.solve(&dataset, &target);
    let frame = SimFrame::from_solution(&solution, dataset.joint_names(), convention);

    if args.json {
        println!("{:#}", serde_json::json!(frame));
    } else {
        info!(
            "Target ({:.3}, {:.3}, {:.3}): {} neighbors",
            target.x, target.y, target.z, solution.neighbor_count
        );
        for joint in &frame.joints {
            info!(
                "  {:<10} ({:8.3}, {:8.3}, {:8.3}) {}",
                joint.name, joint.euler[0], joint.euler[1], joint.euler[2], joint.status
            );
        }
    }

    if let Some(path) = &args.export {
        let mut export = SimExport::new("target", args.seed, method.name());
        export.add_frame(frame);
        export.finalize(solution.is_clean(), None);
        export.write_to_file(path)?;
        info!("Exported solution to {}", path);
    }

    Ok(solution.failures().count() == 0)
}

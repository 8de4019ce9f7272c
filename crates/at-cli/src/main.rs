// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Command Line
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `at`: Ambrosio-Tortorelli segmentation of a grayscale image.
//!
//! Writes `<output>.txt` (energy report, one row per λ) and, per λ,
//! `<output>-l<λ>-u.pgm` (smoothed image) and `<output>-l<λ>-v.pgm`
//! (edge field on the doubled grid).

#![deny(unsafe_code)]

mod io;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use at_solver::{AlternatingSolver, ImageFieldMapper, SolverBackend};
use at_types::ATConfig;

use crate::io::{output_paths, read_raster, write_pgm, ReportWriter};

#[derive(Parser, Debug)]
#[command(name = "at")]
#[command(about = "Ambrosio-Tortorelli segmentation: joint smoothing and edge detection.\n\
Minimises  a.(u-g)^2 + v^2 |grad u|^2 + le.|grad v|^2 + (l/4e).(1-v)^2\n\
over a decreasing schedule of l values.", long_about = None)]
struct Args {
    /// Input grayscale image (PGM, PNG)
    #[arg(short, long, required = true)]
    input: PathBuf,

    /// Output basename
    #[arg(short, long, default_value = "AT")]
    output: String,

    /// Run a single l value (sets lambda-1 = lambda-2)
    #[arg(short = 'l', long = "lambda")]
    lambda: Option<f64>,

    /// Initial l value [default: 0.3125]
    #[arg(short = '1', long = "lambda-1")]
    lambda_1: Option<f64>,

    /// Final l value, clamped to at most lambda-1 [default: 0.00005]
    #[arg(short = '2', long = "lambda-2")]
    lambda_2: Option<f64>,

    /// Division ratio between l values, must be > 1 [default: sqrt(2)]
    #[arg(short = 'r', long = "lambda-ratio")]
    lambda_ratio: Option<f64>,

    /// Fidelity weight a [default: 1.0]
    #[arg(short, long)]
    alpha: Option<f64>,

    /// Base edge width e [default: 1.0]
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Grid step h [default: 1.0]
    #[arg(short, long = "gridstep")]
    gridstep: Option<f64>,

    /// Maximum u/v iterations per (l, e) [default: 10]
    #[arg(short, long = "nbiter")]
    nbiter: Option<usize>,

    /// Linear solver: ldl or cg
    #[arg(short, long, default_value = "ldl")]
    solver: SolverBackend,

    /// Clamp v to [0, 1] after every v-solve
    #[arg(long)]
    clamp_v: bool,

    /// JSON parameter file; flags given on the command line override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Config file (or defaults), then explicit flags, then `--lambda`.
    fn to_config(&self) -> Result<ATConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                ATConfig::from_json(&json)?
            }
            None => ATConfig::default(),
        };
        if let Some(x) = self.lambda_1 {
            cfg.lambda_1 = x;
        }
        if let Some(x) = self.lambda_2 {
            cfg.lambda_2 = x;
        }
        if let Some(x) = self.lambda_ratio {
            cfg.lambda_ratio = x;
        }
        if let Some(x) = self.alpha {
            cfg.alpha = x;
        }
        if let Some(x) = self.epsilon {
            cfg.epsilon = x;
        }
        if let Some(x) = self.gridstep {
            cfg.grid_step = x;
        }
        if let Some(x) = self.nbiter {
            cfg.max_iterations = x;
        }
        if self.clamp_v {
            cfg.clamp_edge_field = true;
        }
        if let Some(l) = self.lambda {
            cfg = cfg.with_single_lambda(l);
        }
        Ok(cfg)
    }
}

fn run(args: &Args) -> Result<()> {
    let cfg = args.to_config()?;

    log::info!("reading {}", args.input.display());
    let raster = read_raster(&args.input)
        .with_context(|| format!("reading input image {}", args.input.display()))?;

    let mut solver = AlternatingSolver::with_backend(&raster, cfg, args.solver)?;
    log::info!(
        "{}x{} image, {} solver",
        raster.width(),
        raster.height(),
        solver.solver_name()
    );
    let complex = solver.bundle().calculus().complex().clone();
    let mapper = ImageFieldMapper::new(&complex);

    let report_path = PathBuf::from(format!("{}.txt", args.output));
    let mut report = ReportWriter::create(&report_path)
        .with_context(|| format!("creating report {}", report_path.display()))?;

    let logs = solver.run(|entry, u, v| {
        report.append(&entry.energies)?;
        let (u_path, v_path) = output_paths(&args.output, entry.lambda);
        log::info!("writing {}", u_path.display());
        write_pgm(&u_path, &mapper.intensity_raster(u)?)?;
        log::info!("writing {}", v_path.display());
        write_pgm(&v_path, &mapper.edge_raster(v)?)?;
        Ok(())
    })?;

    let failed = logs.iter().filter(|l| l.has_failure()).count();
    if failed > 0 {
        log::warn!("{failed} of {} lambda values had a failed linear solve", logs.len());
    }
    log::info!("done: {} lambda values, report in {}", logs.len(), report_path.display());
    Ok(())
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e.render());
            std::process::exit(1);
        }
    };

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&args) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

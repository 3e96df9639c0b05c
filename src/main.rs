use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod bench;
mod bias;
mod error;
mod model;
mod smt;
mod stats;

use bench::{DisjStrategy, EngineFlags, ProcessEngine, ResultStore, SweepConfig, list_dataset};
use bias::{BiasLevel, format_bias, select_bias};
use error::Error;
use model::Configuration;
use smt::{Oracle, OracleConfig, ProcessBackend, Relation, SmtBackend, Z3Backend};
use stats::Summary;

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "precond-bench")]
#[command(about = "precond-bench - Benchmark harness for precondition inference")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

/// CLI bias level selection
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum CliBiasLevel {
    /// Concrete atoms occurring in the ground truth
    Min,
    /// Templates with an atom occurring in the ground truth
    Avg,
    /// The whole catalogue
    #[default]
    Max,
}

impl From<CliBiasLevel> for BiasLevel {
    fn from(cli: CliBiasLevel) -> Self {
        match cli {
            CliBiasLevel::Min => BiasLevel::Min,
            CliBiasLevel::Avg => BiasLevel::Avg,
            CliBiasLevel::Max => BiasLevel::Max,
        }
    }
}

/// CLI relation selection
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliRelation {
    /// Candidate and ground truth accept the same inputs
    Equiv,
    /// Candidate accepts only inputs the ground truth accepts
    Implies,
}

impl From<CliRelation> for Relation {
    fn from(cli: CliRelation) -> Self {
        match cli {
            CliRelation::Equiv => Relation::Equiv,
            CliRelation::Implies => Relation::Implies,
        }
    }
}

/// CLI solver selection
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum CliSolver {
    /// Linked Z3 library
    #[default]
    Z3,
    /// External SMT-LIB solver fed on stdin
    Process,
}

/// Solver options shared by the commands that query the oracle
#[derive(clap::Args, Debug)]
struct SolverArgs {
    /// Solver to use
    #[arg(long, value_enum, default_value = "z3")]
    solver: CliSolver,
    /// Executable of the external solver
    #[arg(long, default_value = "z3")]
    solver_cmd: String,
    /// Timeout of each solver query, in seconds
    #[arg(long, default_value = "60")]
    solver_timeout: u64,
}

impl SolverArgs {
    fn oracle(&self) -> Oracle<Box<dyn SmtBackend>> {
        let backend: Box<dyn SmtBackend> = match self.solver {
            CliSolver::Z3 => Box::new(Z3Backend),
            CliSolver::Process => Box::new(ProcessBackend::new(self.solver_cmd.clone())),
        };
        Oracle::new(
            backend,
            OracleConfig::default().with_timeout_secs(self.solver_timeout),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the acquisition engine over a dataset and check what it learns
    Bench {
        /// Directory holding the configuration files (*.txt)
        #[arg(long)]
        dataset: PathBuf,
        /// Result log, created or resumed
        #[arg(long)]
        out: PathBuf,
        /// Timeout of each membership query, in seconds
        #[arg(long)]
        emulto: u64,
        /// Global engine timeout, in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Runs per configuration file
        #[arg(long, default_value = "1")]
        nruns: usize,
        /// Disjunction strategy
        #[arg(long, default_value = "auto")]
        disj: DisjStrategy,
        /// Use the query generation strategy
        #[arg(long)]
        strat: bool,
        /// Use background knowledge
        #[arg(long)]
        back: bool,
        /// Passive learning
        #[arg(long)]
        passive: bool,
        /// Bias level handed to the engine
        #[arg(long, value_enum, default_value = "max")]
        biaslvl: CliBiasLevel,
        /// Restrict the catalogue to the IJCAI'22 set
        #[arg(long)]
        ijcai22: bool,
        /// Engine launcher
        #[arg(long, default_value = "./scripts/launch_preca.sh")]
        engine: PathBuf,
        /// Seconds the engine may overrun its timeout before it is killed
        #[arg(long, default_value = "30")]
        grace: u64,
        #[command(flatten)]
        solver: SolverArgs,
    },
    /// Print the bias offered to the engine for one configuration
    Bias {
        /// Configuration file with a `bias` field
        #[arg(long)]
        file: PathBuf,
        /// Bias level
        #[arg(long, value_enum, default_value = "max")]
        lvl: CliBiasLevel,
        /// Restrict the catalogue to the IJCAI'22 set
        #[arg(long)]
        ijcai22: bool,
    },
    /// Compare one formula with the ground truth of a configuration
    Check {
        /// Configuration file
        #[arg(long)]
        file: PathBuf,
        /// Candidate formula (SMT-LIB)
        #[arg(long)]
        candidate: String,
        /// Relation to decide
        #[arg(long, value_enum, default_value = "equiv")]
        relation: CliRelation,
        #[command(flatten)]
        solver: SolverArgs,
    },
    /// Summarize a result log
    Stats {
        /// Result log
        #[arg(long)]
        file: PathBuf,
        /// Count runs converging after this many seconds as timed out
        #[arg(long)]
        timeout: Option<f64>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<(), Error> {
    match command {
        Commands::Bench {
            dataset,
            out,
            emulto,
            timeout,
            nruns,
            disj,
            strat,
            back,
            passive,
            biaslvl,
            ijcai22,
            engine,
            grace,
            solver,
        } => {
            let flags = EngineFlags::default()
                .with_disj(disj)
                .with_emulto(emulto)
                .with_strat(strat)
                .with_back(back)
                .with_passive(passive)
                .with_timeout_option(timeout)
                .with_bias_level(biaslvl.into())
                .with_ijcai22(ijcai22);
            let config = SweepConfig::default()
                .with_dataset(list_dataset(&dataset)?)
                .with_nruns(nruns)
                .with_flags(flags);
            let engine = ProcessEngine::new(engine).with_grace(Duration::from_secs(grace));
            let oracle = solver.oracle();

            let mut store = ResultStore::open(&out)?;
            let summary = bench::run_sweep(&config, &engine, &oracle, &mut store)?;
            tracing::info!(
                processed = summary.processed,
                skipped = summary.skipped,
                "sweep finished"
            );

            println!(
                "{}",
                Summary::from_records(store.records().map(|(_, r)| r), timeout.map(|t| t as f64))
            );
        }
        Commands::Bias { file, lvl, ijcai22 } => {
            let conf = Configuration::load(&file)?;
            let bias = select_bias(&conf, lvl.into(), ijcai22)?;
            println!("{}", format_bias(&bias));
        }
        Commands::Check {
            file,
            candidate,
            relation,
            solver,
        } => {
            let conf = Configuration::load(&file)?;
            let result = solver.oracle().decide(
                &candidate,
                conf.ground_truth()?,
                &conf.arguments,
                relation.into(),
            )?;
            println!("{}", result);
        }
        Commands::Stats { file, timeout } => {
            let store = ResultStore::open(&file)?;
            println!(
                "{}",
                Summary::from_records(store.records().map(|(_, r)| r), timeout)
            );
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

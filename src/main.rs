use std::fs::write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bottleneck::model::{self, Model};
use bottleneck::report::{Format, render};
use bottleneck::{Bottleneck, Engine, Error, Options, Problem};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Solve bottleneck (minimax) assignment problems")]
struct Cli {
    /// Problem document (.yaml or .json)
    problem: PathBuf,

    /// Engine to solve with
    #[arg(long, value_enum)]
    engine: Option<Engine>,

    /// Which bottleneck the objective targets
    #[arg(long, value_enum)]
    objective: Option<Bottleneck>,

    /// Stop the engine after this many seconds
    #[arg(long, value_name = "SECONDS")]
    time_limit: Option<f64>,

    /// Treat bin capacities as hard limits
    #[arg(long)]
    enforce_capacities: bool,

    /// Leave the bottleneck variable bounded only below by zero
    #[arg(long)]
    no_tighten: bool,

    /// Also write the model in CPLEX LP format
    #[arg(long, value_name = "PATH")]
    write_lp: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Debug logging and engine output
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    /// Command line flags win over the document's `options:` section.
    fn apply_overrides(&self, mut options: Options) -> Options {
        if let Some(engine) = self.engine {
            options = options.with_engine(engine);
        }
        if let Some(objective) = self.objective {
            options = options.with_objective(objective);
        }
        if let Some(seconds) = self.time_limit {
            options = options.with_time_limit(seconds);
        }
        if self.enforce_capacities {
            options = options.with_enforced_capacities(true);
        }
        if self.no_tighten {
            options = options.with_tightened_bounds(false);
        }
        if self.verbose {
            options = options.with_verbose(true);
        }
        options
    }
}

fn init_logging(verbose: bool) {
    let directive = if verbose {
        "bottleneck=debug"
    } else {
        "bottleneck=info"
    };
    let filter = match directive.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_lp_file(path: &Path, model: &Model) -> Result<(), Error> {
    write(path, model.to_lp_string()).map_err(|err| Error::Output {
        target: path.display().to_string(),
        reason: err.to_string(),
    })
}

fn run(cli: &Cli) -> Result<String, Error> {
    let mut problem = Problem::from_path(&cli.problem)?;
    problem.options = cli.apply_overrides(problem.options.clone());

    if let Some(lp_path) = &cli.write_lp {
        let built = model::build(&problem, &problem.options)?;
        write_lp_file(lp_path, built.model())?;
    }

    let solution = problem.solve()?;
    render(&problem, &solution, cli.format)
}

/// 2 marks an infeasible problem, which is an answer rather than a failure.
fn exit_status(err: &Error) -> u8 {
    match err {
        Error::Infeasible => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    // Exit code 2 is reserved for infeasible problems, not usage errors
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            print!("{err}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprint!("{err}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            print!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            if err == Error::Infeasible {
                println!("infeasible");
            } else {
                error!(code = err.code(), retryable = err.is_retryable(), "{err}");
            }
            ExitCode::from(exit_status(&err))
        }
    }
}

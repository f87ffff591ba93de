use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use simplelog::LevelFilter;

use flops_rs::binding::ParameterBinding;
use flops_rs::count::{Context, CountConfig};
use flops_rs::estimate::Estimator;
use flops_rs::frontend::ScopExtractor;
use flops_rs::input::{load_model, InputError};
use flops_rs::projection::ProjectionCounter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Static FLOP estimation for affine loop nests")]
struct Cli {
    /// Source file containing a `#pragma scop` region
    input: PathBuf,

    /// Parameter values, as NAME=VALUE
    params: Vec<String>,

    /// More diagnostics (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Fewer diagnostics (-q warnings, -qq errors only)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "verbose")]
    quiet: u8,

    /// Maximum number of constraints kept while projecting a domain
    #[arg(long)]
    max_constraints: Option<usize>,

    /// Maximum number of iteration points walked one by one in an evaluation
    #[arg(long)]
    eval_budget: Option<u64>,
}

impl Cli {
    fn level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (0, 0) => LevelFilter::Info,
            (0, 1) => LevelFilter::Debug,
            (0, _) => LevelFilter::Trace,
            (1, _) => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    }

    fn config(&self) -> CountConfig {
        let mut config = CountConfig::default();
        if let Some(max_constraints) = self.max_constraints {
            config = config.with_max_constraints(max_constraints);
        }
        if let Some(eval_budget) = self.eval_budget {
            config = config.with_eval_budget(eval_budget);
        }
        config
    }
}

/// One-line message for a fatal error: the error and its causes, without backtrace.
fn report(err: InputError) -> String {
    format!("{:#}", color_eyre::Report::new(err))
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    simplelog::TermLogger::init(
        cli.level(),
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let model = match load_model(&ScopExtractor, &cli.input) {
        Ok(model) => model,
        Err(e) => {
            error!("{}", report(e));
            std::process::exit(1);
        }
    };

    let binding = ParameterBinding::from_args(&cli.params);
    info!("Parameters: {}", binding);

    let total = {
        let ctx = Context::new(cli.config());
        Estimator::new(&ProjectionCounter, &ctx, &binding).run(&model).total
    };

    println!("{}", total);
    Ok(())
}

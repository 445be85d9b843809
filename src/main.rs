use clap::{Parser, Subcommand};
use mapstyle::{CliError, EvaluationContext, JsonFeature, Type, compile, describe, errors_to_json};
use serde_json::Value as Json;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Check and evaluate map style expressions")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and type-check an expression, printing its type
    Check(Input),

    /// Evaluate an expression for a zoom level and feature
    Eval {
        #[command(flatten)]
        input: Input,

        /// Zoom level for zoom-dependent expressions
        #[arg(long)]
        zoom: Option<f64>,

        /// Path to a GeoJSON feature for feature-dependent expressions
        #[arg(long)]
        feature: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct Input {
    /// Expression JSON, a file containing it, or `-` for stdin
    expression: String,

    /// Type the result must have, e.g. `Number` or `Array<Number, 2>`
    #[arg(long)]
    expected: Option<Type>,

    /// Treat the input as a legacy stop function
    #[arg(long, default_value_t = false)]
    legacy: bool,
}

impl Input {
    fn read_json(&self) -> Result<Json, CliError> {
        let text = if self.expression == "-" {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        } else if Path::new(&self.expression).is_file() {
            fs::read_to_string(&self.expression)?
        } else {
            self.expression.clone()
        };
        Ok(serde_json::from_str(&text)?)
    }
}

fn main() -> ExitCode {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "mapstyle=info");
        }
    }
    env_logger::init();

    let args = Args::parse();
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Compile(errors)) => {
            println!("{}", errors_to_json(&errors));
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Check(input) => {
            let expression = compile(&input.read_json()?, input.expected.as_ref(), input.legacy)?;
            println!("{}", describe(&expression));
        }
        Command::Eval { input, zoom, feature } => {
            let expression = compile(&input.read_json()?, input.expected.as_ref(), input.legacy)?;
            let feature: Option<JsonFeature> = match feature {
                Some(path) => Some(serde_json::from_str(&fs::read_to_string(path)?)?),
                None => None,
            };
            let ctx = EvaluationContext {
                zoom,
                feature: feature.as_ref().map(|f| f as &dyn mapstyle::Feature),
            };
            log::info!("Evaluating {} expression with {:?}", expression.ty(), ctx);
            let value = expression.evaluate(&ctx)?;
            println!("{}", value.to_json());
        }
    }
    Ok(())
}

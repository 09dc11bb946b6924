//! qsobj CLI
//!
//! A small driver for the object model: import JSON values and inspect how
//! the runtime enumerates and mutates them.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use quicksilver_objects::{Runtime, RuntimeConfig, Value, VERSION};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qsobj")]
#[command(author, version = VERSION, about = "Inspect the Quicksilver object model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Force array builtins onto the generic per-index path
    #[arg(long, global = true)]
    no_fast_paths: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the enumeration order of an object's keys
    Keys {
        /// A JSON object
        json: String,
    },

    /// Call an Array.prototype method on a JSON receiver
    Call {
        /// The receiver, as JSON
        json: String,
        /// Method name, e.g. `splice`
        method: String,
        /// Arguments, each as JSON
        args: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = RuntimeConfig::new().with_fast_paths(!cli.no_fast_paths);
    let runtime = Runtime::with_config(config);

    match cli.command {
        Commands::Keys { json } => print_keys(&runtime, &json),
        Commands::Call { json, method, args } => call_method(&runtime, &json, &method, &args),
    }
}

fn setup_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if let Err(err) = builder.try_init() {
        eprintln!("failed to install tracing subscriber: {err}");
    }
}

/// Lift an engine error into anyhow. Engine errors hold `Rc` values and are not `Send`.
fn engine<T>(result: quicksilver_objects::Result<T>) -> anyhow::Result<T> {
    result.map_err(|err| anyhow!("{err}"))
}

fn import(runtime: &Runtime, text: &str) -> anyhow::Result<Value> {
    let json: serde_json::Value =
        serde_json::from_str(text).with_context(|| format!("invalid JSON: {text}"))?;
    engine(runtime.import_json(&json))
}

fn print_keys(runtime: &Runtime, text: &str) -> anyhow::Result<()> {
    let value = import(runtime, text)?;
    let Some(obj) = value.as_object() else {
        bail!("expected a JSON object or array, got {value}");
    };
    let keys: Vec<String> = engine(obj.keys())?.iter().map(|k| k.to_string()).collect();
    println!("{}", serde_json::to_string(&keys)?);
    Ok(())
}

fn call_method(runtime: &Runtime, text: &str, method: &str, raw_args: &[String]) -> anyhow::Result<()> {
    let receiver = import(runtime, text)?;
    let func = engine(runtime.array_prototype().get(method))?;
    let Some(func) = func.as_object().filter(|f| f.is_callable()) else {
        bail!("Array.prototype.{method} is not a function");
    };
    let args = raw_args
        .iter()
        .map(|arg| import(runtime, arg))
        .collect::<anyhow::Result<Vec<_>>>()?;
    debug!(method, argc = args.len(), "calling array method");

    let result = engine(func.call(&receiver, &args))?;
    let result = engine(runtime.export_value(&result))?;
    let receiver = engine(runtime.export_value(&receiver))?;
    println!("{}", serde_json::to_string(&result)?);
    println!("{}", serde_json::to_string(&receiver)?);
    Ok(())
}

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use easel_contracts::events::EventWriter;
use easel_contracts::interpret::Provenance;
use easel_contracts::routing::route;
use easel_contracts::schema::normalize;
use easel_contracts::tiers::{DeploymentFlags, SubscriptionTier, TierContext, TierRegistry};
use easel_engine::{llm_ready, Interpreter};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(
    name = "easel",
    version,
    about = "Turn free-text commands into renderable visualization descriptions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the interpretation tier chain on a command
    Interpret(InterpretArgs),
    /// Coerce a candidate description into the canonical schema
    Normalize(IoArgs),
    /// Select the rendering engine family for a description
    Route(IoArgs),
}

#[derive(Debug, Parser)]
struct InterpretArgs {
    /// Free-text visualization command
    #[arg(long)]
    command: String,
    /// Subscription tier supplied by the account collaborator
    #[arg(long, default_value = "FREE")]
    tier: String,
    /// What the user is working on; adjusts style, never subject
    #[arg(long)]
    user_context: Option<String>,
    /// Append interpretation events to this JSONL file
    #[arg(long)]
    events: Option<PathBuf>,
    /// Force the offline dry-run collaborators
    #[arg(long)]
    offline: bool,
}

#[derive(Debug, Parser)]
struct IoArgs {
    /// JSON file to read; stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("easel error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Interpret(args) => run_interpret(args),
        Command::Normalize(args) => {
            let spec = normalize(&read_candidate(args.input)?);
            println!("{}", serde_json::to_string_pretty(&spec)?);
            Ok(0)
        }
        Command::Route(args) => {
            let spec = normalize(&read_candidate(args.input)?);
            let assignment = route(&spec).context("cannot render this description")?;
            println!("{}", serde_json::to_string_pretty(&assignment)?);
            Ok(0)
        }
    }
}

fn run_interpret(args: InterpretArgs) -> Result<i32> {
    let flags = DeploymentFlags::from_env();
    let events = args.events.map(EventWriter::new);
    let interpreter = if args.offline || !llm_ready() {
        Interpreter::dryrun(flags, events)
    } else {
        Interpreter::openai(flags, events)
    };

    let registry = TierRegistry::default();
    let tier = SubscriptionTier::parse(&args.tier);
    let context = TierContext::for_tier(tier, &registry, flags);

    let result = interpreter.interpret(&args.command, args.user_context.as_deref(), &context);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.source == Provenance::Error { 1 } else { 0 })
}

fn read_candidate(input: Option<PathBuf>) -> Result<Value> {
    let text = match input {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };
    serde_json::from_str(&text).context("input is not valid JSON")
}

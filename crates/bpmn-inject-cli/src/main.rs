use std::io::{self, Write};
use std::path::PathBuf;

use bpmn_inject_config::{Config, LoadOptions};
use bpmn_inject_core::{
    inject_service_tasks, insert_task_between, ExitCode, InjectError, InjectOptions,
    InjectResult, InjectorSettings, InsertRequest, TaskAttributes,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Splice service tasks into BPMN process graphs", long_about = None)]
struct Cli {
    /// Configuration file layered over ./.bpmn-inject.toml
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log to stderr (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress informational output (diffs, success messages)
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert service tasks after every start event and before every end event
    Inject(InjectArgs),
    /// Insert a custom service task between two flow nodes
    InsertBetween(InsertArgs),
}

#[derive(Args, Debug)]
struct InjectArgs {
    /// Path to the BPMN document
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the result (defaults to rewriting INPUT)
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Skip the task after start events
    #[arg(long = "no-pre")]
    no_pre: bool,

    /// Skip the task before end events
    #[arg(long = "no-post")]
    no_post: bool,

    /// Name of the task inserted after start events
    #[arg(long = "pre-name", value_name = "NAME")]
    pre_name: Option<String>,

    /// Name of the task inserted before end events
    #[arg(long = "post-name", value_name = "NAME")]
    post_name: Option<String>,

    #[command(flatten)]
    write: WriteArgs,
}

#[derive(Args, Debug)]
struct InsertArgs {
    /// Path to the BPMN document
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Node the new task follows
    #[arg(value_name = "AFTER")]
    after: String,

    /// Node the new task precedes
    #[arg(value_name = "BEFORE")]
    before: String,

    /// Display name of the new task
    #[arg(long = "name", value_name = "NAME")]
    name: String,

    /// Execution type written to the vendor type attribute
    #[arg(long = "type", value_name = "TYPE")]
    task_type: Option<String>,

    /// Routing topic written to the vendor topic attribute
    #[arg(long = "topic", value_name = "TOPIC")]
    topic: Option<String>,

    /// Extra attribute copied verbatim onto the task (repeatable)
    #[arg(long = "attr", value_name = "KEY=VALUE")]
    attrs: Vec<String>,

    /// Fail unless AFTER and BEFORE name nodes of the process
    #[arg(long = "strict")]
    strict: bool,

    /// Where to write the result (defaults to rewriting INPUT)
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    write: WriteArgs,
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Print diff without writing changes
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Keep the replaced output as <OUTPUT>.bak
    #[arg(long = "backup")]
    backup: bool,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let exit = match run(cli) {
        Ok(exit) => exit,
        Err(err) => {
            handle_error(&err);
            err.exit_code()
        }
    };
    std::process::ExitCode::from(exit as u8)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> InjectResult<ExitCode> {
    let config = load_config(&cli)?;
    match &cli.command {
        Command::Inject(args) => run_inject(&cli, &config, args),
        Command::InsertBetween(args) => run_insert(&cli, &config, args),
    }
}

fn load_config(cli: &Cli) -> InjectResult<Config> {
    let mut options = LoadOptions::default();
    if let Some(path) = &cli.config {
        options = options.with_override_path(path.clone());
    }
    Ok(Config::load(options)?)
}

fn run_inject(cli: &Cli, config: &Config, args: &InjectArgs) -> InjectResult<ExitCode> {
    let mut options = InjectOptions::from_config(config);
    if args.no_pre {
        options.add_pre_process_task = false;
    }
    if args.no_post {
        options.add_post_process_task = false;
    }
    if let Some(name) = &args.pre_name {
        options.pre_process_task_name = require_non_empty("--pre-name", name)?;
    }
    if let Some(name) = &args.post_name {
        options.post_process_task_name = require_non_empty("--post-name", name)?;
    }
    options.dry_run = args.write.dry_run;
    options.backup = args.write.backup;

    let output = args.output.clone().unwrap_or_else(|| args.input.clone());
    let outcome = inject_service_tasks(&args.input, &output, &options)?;

    if !cli.quiet {
        print_diff(outcome.diff.as_deref(), args.write.dry_run);
        if !args.write.dry_run {
            println!(
                "Injected {} pre-process and {} post-process service task(s) into {}",
                outcome.pre_process_tasks.len(),
                outcome.post_process_tasks.len(),
                output.display()
            );
        }
    }
    Ok(outcome.exit_code)
}

fn run_insert(cli: &Cli, config: &Config, args: &InsertArgs) -> InjectResult<ExitCode> {
    let attributes = build_attributes(args)?;
    let request = InsertRequest {
        input: args.input.clone(),
        output: args.output.clone().unwrap_or_else(|| args.input.clone()),
        after: args.after.clone(),
        before: args.before.clone(),
        attributes,
        strict: args.strict,
        settings: InjectorSettings::from(config),
        dry_run: args.write.dry_run,
        backup: args.write.backup,
    };

    let outcome = insert_task_between(&request)?;
    if !cli.quiet {
        print_diff(outcome.diff.as_deref(), args.write.dry_run);
    }
    println!("{}", outcome.task_id);
    Ok(outcome.exit_code)
}

fn build_attributes(args: &InsertArgs) -> InjectResult<TaskAttributes> {
    let mut attributes = TaskAttributes::new(require_non_empty("--name", &args.name)?);
    if let Some(task_type) = &args.task_type {
        attributes.insert(TaskAttributes::TYPE, task_type.as_str());
    }
    if let Some(topic) = &args.topic {
        attributes.insert(TaskAttributes::TOPIC, topic.as_str());
    }

    for raw in &args.attrs {
        match raw.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                attributes.insert(key.trim(), value);
            }
            _ => {
                return Err(InjectError::InvalidArguments(format!(
                    "--attr expects KEY=VALUE, got '{raw}'"
                )))
            }
        }
    }

    Ok(attributes)
}

/// Trims `value` the same way configured task names are trimmed.
fn require_non_empty(flag: &str, value: &str) -> InjectResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InjectError::InvalidArguments(format!("{flag} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn print_diff(diff: Option<&str>, dry_run: bool) {
    match diff {
        Some(diff) => {
            print!("{diff}");
            io::stdout().flush().ok();
        }
        None if dry_run => println!("No changes (dry run)"),
        None => {}
    }
}

fn handle_error(err: &InjectError) {
    match err {
        InjectError::UnknownNode { id } => {
            eprintln!("No flow node with id '{id}' in the process.");
            eprintln!("Drop --strict to insert the task anyway.");
        }
        InjectError::Io(io_err) => eprintln!("I/O error: {io_err}"),
        InjectError::Config(config_err) => eprintln!("Configuration error: {config_err}"),
        other => eprintln!("{other}"),
    }
}

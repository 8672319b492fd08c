use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use nu_ansi_term::Color;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use sable_types::sync::Arc;
use sable_types::Value;
use sable_vm::{Program, Vm, VmConfig, VmError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod repl_helper;

use repl_helper::ReplHelper;

/// Sable - an embeddable scripting language
#[derive(Parser)]
#[command(name = "sable")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run, check and inspect Sable scripts", long_about = "Sable Development Toolkit\n\nProvides tools for running and debugging Sable programs:\n  - Script execution with resource limits\n  - Syntax and compilation checking\n  - Bytecode disassembly\n  - An interactive REPL")]
struct Cli {
    /// Script file (.ts) to run or expression to evaluate
    #[arg(value_name = "INPUT")]
    input: Option<String>,

    /// Evaluate an expression directly
    #[arg(short, long, value_name = "EXPR")]
    eval: Option<String>,

    /// Show disassembled bytecode before running
    #[arg(long)]
    debug_bytecode: bool,

    #[command(flatten)]
    limits: Limits,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Limits {
    /// JSON file with the VM limits
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum instructions to execute
    #[arg(long, global = true)]
    max_steps: Option<u64>,

    /// Maximum allocation units
    #[arg(long, global = true)]
    max_allocations: Option<u64>,

    /// Maximum nested call frames
    #[arg(long, global = true)]
    max_frames: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script file
    Run {
        /// Path to the script file
        file: PathBuf,
        /// Function to call instead of main
        #[arg(long)]
        func: Option<String>,
        /// Arguments passed to the function as strings
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Evaluate an expression
    Eval {
        /// Expression to evaluate
        expression: String,
    },
    /// Check syntax and compilation without executing
    Check {
        /// File to check
        file: PathBuf,
    },
    /// Disassemble bytecode
    Disassemble {
        /// File to disassemble
        file: PathBuf,
        /// Also list registers and their live ranges
        #[arg(long)]
        registers: bool,
    },
    /// Start an interactive session
    Repl,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(err) = dispatch(cli) {
        eprintln!("{}", Color::Red.paint(format!("{:#}", err)));
        std::process::exit(1);
    }
}

/// Logs go to stderr. `SABLE_LOG` takes precedence over `RUST_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_env("SABLE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(&cli.limits)?;
    debug!(?config, "vm limits");

    if let Some(command) = cli.command {
        return match command {
            Commands::Run { file, func, args } => {
                run_file(&file, func.as_deref(), &args, config, cli.debug_bytecode)
            }
            Commands::Eval { expression } => run_expression(&expression, config),
            Commands::Check { file } => check_command(&file),
            Commands::Disassemble { file, registers } => disassemble_command(&file, registers),
            Commands::Repl => repl(config),
        };
    }

    if let Some(expr) = cli.eval {
        return run_expression(&expr, config);
    }

    match cli.input {
        None => repl(config),
        Some(input) if input.ends_with(".ts") => run_file(Path::new(&input), None, &[], config, cli.debug_bytecode),
        Some(input) => run_expression(&input, config),
    }
}

fn load_config(limits: &Limits) -> Result<VmConfig> {
    let mut config = match &limits.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Error reading config '{}'", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Invalid config '{}'", path.display()))?
        }
        None => VmConfig::default(),
    };

    if let Some(steps) = limits.max_steps {
        config.max_steps = steps;
    }
    if let Some(allocations) = limits.max_allocations {
        config.max_allocations = allocations;
    }
    if let Some(frames) = limits.max_frames {
        config.max_frames = frames;
    }
    Ok(config)
}

fn compile_file(path: &Path) -> Result<Program> {
    if !path.exists() {
        bail!("Error reading file '{}': not found", path.display());
    }
    Ok(sable_vm::compile_path(path)?)
}

fn check_command(path: &Path) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("Error reading file '{}'", path.display()))?;

    if let Err(err) = sable_parser::parse(&source) {
        bail!("✗ Syntax error in '{}':\n{}", path.display(), err);
    }
    println!("{}", Color::Green.paint("✓ Syntax OK"));

    match compile_file(path) {
        Ok(program) => {
            println!("{}", Color::Green.paint("✓ Compilation OK"));
            println!(
                "\n{} functions, {} classes, {} constants",
                program.functions.len(),
                program.classes.len(),
                program.constants.len()
            );
            Ok(())
        }
        Err(err) => bail!("✗ Compilation error in '{}':\n{:#}", path.display(), err),
    }
}

fn disassemble_command(path: &Path, registers: bool) -> Result<()> {
    let program = compile_file(path)?;
    println!("Disassembly of '{}':", path.display());
    println!();
    print!("{}", sable_vm::dump_program(&program));
    if registers {
        println!();
        print!("{}", sable_vm::bytecode_debug::dump_registers(&program, true));
    }
    Ok(())
}

fn run_file(path: &Path, func: Option<&str>, args: &[String], config: VmConfig, debug_bytecode: bool) -> Result<()> {
    let program = compile_file(path)?;
    if debug_bytecode {
        eprint!("{}", sable_vm::dump_program(&program));
    }

    let args: Vec<Value> = args.iter().map(|a| Value::from(a.as_str())).collect();
    let mut vm = Vm::with_config(Arc::new(program), config);
    let result = match func {
        Some(name) => vm.initialize().and_then(|_| vm.run_func(name, &args)),
        None => vm.run(&args),
    };
    debug!(steps = vm.steps(), allocations = vm.allocations(), "run finished");

    match result {
        Ok(Value::Null | Value::Undefined) => Ok(()),
        Ok(value) => {
            println!("{}", format_value(&value));
            Ok(())
        }
        Err(err) => Err(runtime_error(err)),
    }
}

fn run_expression(expr: &str, config: VmConfig) -> Result<()> {
    let mut vm = Vm::with_config(Arc::new(sable_vm::compile_str("")?), config);
    match vm.eval(expr) {
        Ok(Some(value)) => {
            println!("{}", format_value(&value));
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => Err(runtime_error(err)),
    }
}

fn runtime_error(err: VmError) -> anyhow::Error {
    match err {
        VmError::Script(e) => anyhow::anyhow!("Runtime error: {}\n{}", e.message, e.stack_trace()),
        other => other.into(),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null | Value::Undefined => Color::DarkGray.paint(value.to_string()).to_string(),
        Value::Int(_) | Value::Float(_) => Color::Yellow.paint(value.to_string()).to_string(),
        Value::Bool(_) => Color::Purple.paint(value.to_string()).to_string(),
        Value::String(s) => Color::Green.paint(format!("{:?}", s.as_ref())).to_string(),
        _ => value.to_string(),
    }
}

// ============================================================================
// REPL
// ============================================================================

fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("sable").join("history.txt"))
}

fn repl(config: VmConfig) -> Result<()> {
    let mut vm = Vm::with_config(Arc::new(sable_vm::compile_str("")?), config);
    vm.initialize()?;

    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ReplHelper::new()));

    let history = history_path();
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    println!("Sable {} - type .exit to quit", env!("CARGO_PKG_VERSION"));

    loop {
        match rl.readline("sable> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                match line {
                    ".exit" | ".quit" => break,
                    ".globals" => {
                        for (i, v) in vm.globals().iter().enumerate() {
                            println!("  [{}] {}", i, format_value(v));
                        }
                        continue;
                    }
                    _ => {}
                }

                vm.reset_steps();
                match vm.eval(line) {
                    Ok(Some(value)) => println!("{}", format_value(&value)),
                    Ok(None) => {}
                    Err(err) => eprintln!("{}", Color::Red.paint(format!("{:#}", runtime_error(err)))),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(path) = &history {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        rl.save_history(path)?;
    }
    Ok(())
}

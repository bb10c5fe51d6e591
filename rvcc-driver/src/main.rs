//! RISC-V TAC Compiler Driver
//!
//! Reads three-address IR (text, or JSON with `--json`) and writes RV32IM
//! assembly.

use clap::{Parser, Subcommand};
use log::info;
use rvcc_backend::{cfg, AllocPolicy, BackendOptions, NameGenerator};
use rvcc_common::CompilerError;
use rvcc_ir::{display_program, IrNode};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rvcc")]
#[command(about = "RISC-V TAC Compiler")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an IR file to assembly
    Compile {
        /// Input IR file
        input: PathBuf,

        /// Output assembly file, `-` for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the read/write support routines for the Venus simulator
        #[arg(long)]
        venus: bool,

        /// Keep every value in memory instead of running liveness allocation
        #[arg(long)]
        spill_everywhere: bool,

        /// Do not pad frames to 16 bytes
        #[arg(long)]
        no_align: bool,

        /// Input is a JSON array of IR nodes
        #[arg(long)]
        json: bool,

        /// Print the IR after block construction before compiling
        #[arg(long)]
        print_ir: bool,
    },

    /// Print the IR after block construction
    Ir {
        /// Input IR file
        input: PathBuf,

        /// Input is a JSON array of IR nodes
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Compile {
            input,
            output,
            venus,
            spill_everywhere,
            no_align,
            json,
            print_ir,
        } => {
            let options = BackendOptions {
                policy: if spill_everywhere {
                    AllocPolicy::SpillEverywhere
                } else {
                    AllocPolicy::Liveness
                },
                venus,
                align_frames: !no_align,
            };
            compile_file(&input, output.as_deref(), json, print_ir, &options)
        }
        Commands::Ir { input, json } => print_ir_file(&input, json),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn compile_file(
    input: &Path,
    output: Option<&Path>,
    json: bool,
    print_ir: bool,
    options: &BackendOptions,
) -> Result<(), CompilerError> {
    let nodes = read_ir(input, json)?;

    if print_ir {
        println!("{}", relinearized(nodes.clone())?);
    }

    let asm = rvcc_backend::compile(nodes, options)?;

    let path = output_path(input, output);
    if path == Path::new("-") {
        print!("{}", asm);
    } else {
        fs::write(&path, asm)?;
        info!("Assembly written to {}", path.display());
    }
    Ok(())
}

fn print_ir_file(input: &Path, json: bool) -> Result<(), CompilerError> {
    let nodes = read_ir(input, json)?;
    print!("{}", relinearized(nodes)?);
    Ok(())
}

fn read_ir(input: &Path, json: bool) -> Result<Vec<IrNode>, CompilerError> {
    let source = fs::read_to_string(input)
        .map_err(|e| CompilerError::IoError { message: format!("{}: {}", input.display(), e) })?;
    let parser = rvcc_ir::Parser::new(&input.display().to_string());
    if is_json_input(input, json) {
        parser.parse_json(&source)
    } else {
        parser.parse_source(&source)
    }
}

/// IR after block construction, exit unification included
fn relinearized(nodes: Vec<IrNode>) -> Result<String, CompilerError> {
    let module = cfg::build(nodes, &mut NameGenerator::new())?;
    Ok(display_program(&module.ir()))
}

fn is_json_input(input: &Path, json: bool) -> bool {
    json || input.extension().is_some_and(|ext| ext == "json")
}

/// Next to the input with a `.s` extension unless given
fn output_path(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension("s"),
    }
}

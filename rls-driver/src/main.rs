//! IR Scripting Toolkit Driver
//!
//! Command-line front end over the built-in sample programs: list them,
//! print their IR (as text or JSON), verify them and run them on the
//! reference interpreter.

mod samples;

use clap::{Parser, Subcommand};
use rls_ir::ExecConfig;
use rls_script::Program;

use crate::samples::{Sample, SAMPLES};

#[derive(Parser)]
#[command(name = "rls")]
#[command(about = "Generate, inspect and run IR sample programs")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in samples
    List,

    /// Print the IR of a sample
    Dump {
        /// Sample name
        sample: String,

        /// Print the module as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run a sample's main function
    Run {
        /// Sample name
        sample: String,

        /// Maximum number of executed instructions
        #[arg(long, default_value_t = ExecConfig::default().step_limit)]
        step_limit: u64,
    },

    /// Check a sample's IR for structural errors
    Verify {
        /// Sample name
        sample: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List => {
            list();
            Ok(())
        }
        Commands::Dump { sample, json } => dump(&sample, json),
        Commands::Run { sample, step_limit } => run(&sample, step_limit),
        Commands::Verify { sample } => verify(&sample),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn list() {
    for sample in SAMPLES {
        println!("{:<12} {}", sample.name, sample.description);
    }
}

fn build(name: &str) -> Result<Program, Box<dyn std::error::Error>> {
    let sample: &Sample = samples::find(name).ok_or_else(|| format!("Unknown sample: {}", name))?;
    log::debug!("building sample {}", sample.name);
    let program = (sample.build)()?;
    program.reporter().print_diagnostics();
    Ok(program)
}

fn dump(name: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let program = build(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(program.module())?);
    } else {
        print!("{}", program.dump());
    }
    Ok(())
}

fn run(name: &str, step_limit: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut program = build(name)?;
    let config = ExecConfig {
        step_limit,
        ..ExecConfig::default()
    };
    let code = program.run_with(config)?;
    print!("{}", program.output());
    println!("exit code: {}", code);
    Ok(())
}

fn verify(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let program = build(name)?;
    program.verify()?;
    println!("{}: ok", name);
    Ok(())
}

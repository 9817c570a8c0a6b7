//! Run a dataflow pass over quad programs stored as JSON.
//!
//! ```bash
//! flow null-checks program.json
//! flow move-null-checks program.json --output optimized.json
//! RUST_LOG=debug flow reaching-definitions a.json b.json
//! flow null-checks program.json --print
//! flow --list
//! ```

use clap::Parser;
use error_chain::bail;
use quadflow::driver;
use quadflow::error::*;
use quadflow::ir::Program;
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Iterative dataflow analysis over quad control flow graphs", long_about = None)]
struct Cli {
    /// Pass to run
    #[arg(required_unless_present = "list")]
    pass: Option<String>,

    /// Programs to analyze
    #[arg(required_unless_present = "list")]
    programs: Vec<PathBuf>,

    /// List the registered passes
    #[arg(long)]
    list: bool,

    /// Print the quads of every function after the pass
    #[arg(long)]
    print: bool,

    /// Write the optimized program here
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<()> {
    if cli.list {
        for name in driver::PASSES.keys() {
            println!("{}", name);
        }
        return Ok(());
    }

    let name = match cli.pass {
        Some(name) => name,
        None => bail!("no pass given"),
    };
    if cli.output.is_some() && cli.programs.len() != 1 {
        bail!("--output needs exactly one program");
    }

    for path in &cli.programs {
        let json = fs::read_to_string(path)
            .chain_err(|| format!("Failed to read {}", path.display()))?;
        let mut program = Program::from_json(&json)
            .chain_err(|| format!("Failed to load {}", path.display()))?;

        println!("Now analyzing {}", path.display());
        for report in driver::optimize(&mut program, &name)? {
            println!("{}", report);
        }
        if cli.print {
            for function in program.functions() {
                print!("{}", function);
            }
        }

        if let Some(output) = &cli.output {
            fs::write(output, program.to_json()?)
                .chain_err(|| format!("Failed to write {}", output.display()))?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {}", e);
        for cause in e.iter().skip(1) {
            eprintln!("caused by: {}", cause);
        }
        process::exit(1);
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{warn, LevelFilter};
use simple_logger::SimpleLogger;

use lc3_vm::loader::Image;
use lc3_vm::terminal::{self, RawMode, StdConsole};
use lc3_vm::vm::{VirtualMachine, VmError};

/// Status for a run stopped by Ctrl-C.
const EXIT_INTERRUPTED: u8 = 254;

#[derive(Parser, Debug)]
#[command(name = "lc3")]
#[command(about = "Run LC-3 program images", long_about = None)]
struct Args {
    /// Image files, loaded in order. Later images overwrite earlier ones.
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Leave the terminal in its current mode.
    #[arg(long, action = ArgAction::SetTrue)]
    no_raw: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to initialise logging: {}", e);
    }

    // 1. Loading
    let mut vm = VirtualMachine::new(StdConsole::new());
    for path in &args.images {
        let loaded = Image::read(path)
            .map_err(anyhow::Error::from)
            .and_then(|image| vm.load_image(&image).map_err(anyhow::Error::from));
        if let Err(e) = loaded {
            eprintln!("failed to load image: {}", path.display());
            eprintln!("{:#}", e);
            return ExitCode::from(1);
        }
    }

    // 2. Execution
    match run(&mut vm, !args.no_raw) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<VmError>() {
            Some(VmError::Interrupted) => {
                println!();
                ExitCode::from(EXIT_INTERRUPTED)
            }
            _ => {
                eprintln!("\n--- VM Runtime Error ---");
                eprintln!("{:#}", e);
                ExitCode::from(1)
            }
        },
    }
}

/// Runs the machine with the terminal held in raw mode. The guard is dropped
/// before this returns, on every path.
fn run(vm: &mut VirtualMachine<StdConsole>, raw: bool) -> Result<()> {
    terminal::install_interrupt_handler().context("installing SIGINT handler")?;

    let _raw_mode = if raw {
        match RawMode::enable() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("stdin is not a terminal, running without raw mode: {}", e);
                None
            }
        }
    } else {
        None
    };

    vm.run()?;
    Ok(())
}

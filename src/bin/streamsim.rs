//! CLI entry point.
//!
//! Grounded on `original_source/src/main.py`'s `--config/--key_gen/--stream/
//! --logs` argparse surface, re-expressed with `clap`'s derive API. `clap`
//! is pulled from `Dicklesworthstone-glibc_rust` / `monokrome-foiacquire`,
//! since `rust_gds` has no CLI story of its own (it is consumed through
//! N-API bindings, not a binary). Exit codes: usage errors exit 2, everything
//! else that reaches here exits 1.

use std::path::PathBuf;

use clap::Parser;
use streamsim::config::SimulationConfigDto;
use streamsim::error::SimulationError;
use streamsim::keygen::{FileKeySource, KeySource};
use streamsim::logging::FileLogSink;
use streamsim::simulator::Simulator;

#[derive(Parser, Debug)]
#[command(name = "streamsim", about = "Discrete-step stream-processing dataflow simulator")]
struct Cli {
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    #[arg(long = "key-gen", value_name = "PATH")]
    key_gen: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    stream: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    logs: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(report) => {
            log::info!("simulation complete");
            println!("{report}");
        }
        Err(err) => {
            eprintln!("streamsim: {err}");
            std::process::exit(err.exit_code());
        }
    }
}

fn run(cli: Cli) -> Result<String, SimulationError> {
    if cli.key_gen.is_some() == cli.stream.is_some() {
        return Err(SimulationError::Usage(
            "exactly one of --key-gen or --stream must be supplied".into(),
        ));
    }

    let raw = std::fs::read_to_string(&cli.config)?;
    let dto: SimulationConfigDto = serde_json::from_str(&raw)
        .map_err(|e| SimulationError::InvalidFormat(e.to_string()))?;
    let (topology, keygen_config) = dto.build()?;

    let mut source: Box<dyn KeySource> = if let Some(stream_path) = &cli.stream {
        Box::new(FileKeySource::open(stream_path)?)
    } else {
        let key_gen_path = cli.key_gen.as_ref().expect("checked above");
        let seed = 0xC0FF_EE00_u64;
        let paths = streamsim::keygen::write_streams(key_gen_path, &keygen_config, seed)?;
        let first = paths.first().expect("write_streams always returns >=1 path");
        Box::new(FileKeySource::open(first)?)
    };

    let log_dir = cli.logs.unwrap_or_else(|| PathBuf::from("logs").join("log_run"));
    let mut sink = FileLogSink::new(&log_dir)?;

    let mut simulator = Simulator::new(topology);
    Ok(simulator.run(source.as_mut(), &mut sink))
}

//! CLI driver: load a network descriptor, run the simulation to completion
//! or a step budget, print a summary.

use clap::Parser;
use netsim_rs::config::NetworkDescriptor;
use netsim_rs::net::Network;
use netsim_rs::sim::Simulator;
use netsim_rs::stats::VecSink;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "netsim", about = "Discrete-event packet-network simulator")]
struct Args {
    /// Path to a JSON network descriptor (spec §6.1).
    descriptor: PathBuf,

    /// Step budget; 0 means run until completion or the queue empties.
    #[arg(long, default_value_t = 0)]
    max_steps: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();

    let descriptor = match NetworkDescriptor::load(&args.descriptor) {
        Ok(d) => d,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let (mut network, initial) =
        match Network::bootstrap(&descriptor, Box::new(VecSink::default())) {
            Ok(built) => built,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        };

    let mut sim = Simulator::new();
    for (at, target, kind) in initial {
        if let Err(err) = sim.enqueue(at, target, kind) {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    }

    let outcome = match sim.run(&mut network, args.max_steps) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{err} at step {}", sim.now());
            return ExitCode::FAILURE;
        }
    };

    println!("finished at {} after {} steps: {outcome:?}", sim.now(), outcome.steps());
    ExitCode::SUCCESS
}

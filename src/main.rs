mod config;
mod ffx;
mod orchestrator;
mod outputs;
mod runner;
mod runner_errors;
mod target;
mod test_server;
mod utils;

use config::cli_args::CliArgs;

fn main() {
    let args = CliArgs::parse_args();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.get_log_level()),
    )
    .init();

    std::process::exit(orchestrator::run(args));
}

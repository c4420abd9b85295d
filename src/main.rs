use clap::Parser;
use log::{debug, info, warn};
use snafu::ErrorCompat;

mod args;
mod pollw;

fn main() {
    let args = args::Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    debug!("args: {:?}", args);

    if let Err(e) = pollw::run_analysis(&args) {
        warn!("run_analysis failed: {:?}", e);
        eprintln!("An error occured: {}", pollw::report(e.as_ref()));
        if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
            eprintln!("{}", bt);
        }
        std::process::exit(1);
    }
    info!("done");
}

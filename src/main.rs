use clap::Parser;
use tls_scan::cli;

fn main() {
    let args = cli::Args::parse();
    std::process::exit(cli::dispatch(args));
}

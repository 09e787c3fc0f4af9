use std::{env, process};

use finbot_core::{
    cli::{self, CliOptions},
    utils,
};

#[tokio::main]
async fn main() {
    utils::init_tracing_with("finbot_core=warn");

    let options = match CliOptions::parse(env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{}", cli::usage());
            process::exit(2);
        }
    };
    if options.help {
        println!("{}", cli::usage());
        return;
    }

    if let Err(err) = cli::run_cli(options).await {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

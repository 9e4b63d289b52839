use std::io::{self, BufWriter};
use std::process::ExitCode;

use nulldc::{Command, GIT_HASH, USAGE};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("nulldc: {}", e);
            return ExitCode::from(2);
        }
    };

    match command {
        Command::Help => {
            println!("{}", USAGE);
            ExitCode::SUCCESS
        }
        Command::Version => {
            println!("nulldc {}", GIT_HASH);
            ExitCode::SUCCESS
        }
        Command::Disassemble(opts) => {
            let mut out = BufWriter::new(io::stdout().lock());
            match nulldc::run(&opts, &mut out) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    log::error!("{}", e);
                    eprintln!("nulldc: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

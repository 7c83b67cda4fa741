use clap::Parser;
use scanpdfa::cli;
use scanpdfa::error::{EXIT_BAD_ARGS, EXIT_OK};
use tracing::error;

fn main() {
    let args = match cli::Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { EXIT_BAD_ARGS } else { EXIT_OK };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    match cli::dispatch(args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            if tracing::dispatcher::has_been_set() {
                error!("{err:#}");
            } else {
                eprintln!("error: {err:#}");
            }
            std::process::exit(err.exit_code());
        }
    }
}

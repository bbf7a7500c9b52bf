use log::info;

use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use snafu::ErrorCompat;

use fm_record::OutputEncoding;

mod args;
mod fm;

use crate::args::Args;
use crate::fm::params_reader;

fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    // Big-5 is the default the upload system expects; --utf8 overrides it
    // and --big5 just states the default explicitly.
    let encoding = match (args.utf8, args.big5) {
        (true, _) => OutputEncoding::Utf8,
        _ => OutputEncoding::Big5,
    };
    info!("output encoding: {}", encoding.label());

    let params = match &args.params {
        Some(path) => params_reader::read_params(path),
        None => {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            params_reader::prompt_params(&mut stdin.lock(), &mut stdout)
        }
    };
    let params = match params {
        Ok(p) => p,
        Err(e) => report(e),
    };

    let request = fm::ConversionRequest {
        long_path: args.long.clone(),
        short_path: args.short.clone(),
        params,
        encoding,
        outdir: PathBuf::from(&args.outdir),
    };

    match fm::run_conversion(&request) {
        Ok(written) => {
            for path in &written {
                println!("{}", path.display());
            }
            info!("conversion complete: {} file(s)", written.len());
        }
        Err(e) => report(e),
    }
}

fn report(e: fm::FmError) -> ! {
    eprintln!("Error: {}", e);
    if let Some(bt) = ErrorCompat::backtrace(&e) {
        eprintln!("trace: {}", bt);
    }
    process::exit(1);
}

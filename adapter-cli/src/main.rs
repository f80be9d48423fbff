//! The outer CLI of the `safe-run` artifact inspection engine.

#![forbid(unsafe_code)]

mod args;
mod capture;

use clap::Parser;
use log::debug;

use args::SafeRunArgs;

fn main() {
    let args = SafeRunArgs::parse();

    env_logger::Builder::new().filter_level(args.verbose.log_level_filter()).init();

    debug!("safe-run args = {args:?}");

    if args.list_adapters {
        let report = adapter_core::list_adapters();
        print_json(&report, args.pretty);
        return;
    }

    let capture = capture::build(&args.input);
    let selection: adapter_core::Selection = args.selection.into();
    let result = adapter_core::run_adapter(selection, &args.plugin, &args.input, &capture);

    let exit_code = if result.is_ok() { 0 } else { 1 };
    print_json(&result, args.pretty);
    std::process::exit(exit_code);
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("failed to serialize result: {e}");
            std::process::exit(1);
        }
    }
}

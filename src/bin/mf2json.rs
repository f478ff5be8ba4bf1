// Minimal facade CLI (spec.md §6: "an implementation is expected to
// expose the core behind a minimal facade and a JSON serializer").
//
// Reads HTML from a file path argument, or stdin if none is given, and
// prints the extracted `Document` as JSON. HTML fetching over the network
// and HTML tokenization beyond html5ever's default parse remain out of
// scope, matching the crate's Non-goals.

use std::io::{self, Read};
use std::process::ExitCode;

fn usage() -> ! {
    eprintln!("usage: mf2json [--base URL] [FILE]");
    std::process::exit(2);
}

fn main() -> ExitCode {
    let mut base = "https://example.com/".to_string();
    let mut path: Option<String> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--base" => base = args.next().unwrap_or_else(|| usage()),
            "-h" | "--help" => usage(),
            other if path.is_none() => path = Some(other.to_string()),
            _ => usage(),
        }
    }

    let html = match path {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("mf2json: reading {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut s = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut s) {
                eprintln!("mf2json: reading stdin: {e}");
                return ExitCode::FAILURE;
            }
            s
        }
    };

    match microformats::parse_microformats(&html, &base, &microformats::Options::default()) {
        Ok(doc) => {
            println!("{}", serde_json::to_string_pretty(&doc).expect("Document serializes"));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("mf2json: {e}");
            ExitCode::FAILURE
        }
    }
}

//! Purpose: `connect-shim` CLI entry point for inspecting result envelopes.
//! Role: Binary crate root; parses args, runs the decoder over malloc-owned buffers, emits JSON.
//! Invariants: Success payloads go to stdout; errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `to_exit_code`.
//! Invariants: Verify-callback notifications are reported on stderr, never stdout.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use connect_shim::{
    Error, ErrorKind, KNOWN_DISCRIMINANTS, MallocRuntime, ResultDecoder, VerifyContext,
    to_exit_code,
};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "connect-shim",
    version,
    about = "Decode libsuseconnect result envelopes into payloads or typed errors"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one result envelope (stdin by default) and print the payload
    Decode(DecodeArgs),
    /// Print the err_type -> error kind -> exit code table
    Kinds,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    #[arg(
        long,
        help = "Read the envelope from a file instead of stdin",
        value_hint = ValueHint::FilePath,
        conflicts_with = "envelope_json"
    )]
    input: Option<PathBuf>,
    #[arg(long, help = "Envelope text given inline")]
    envelope_json: Option<String>,
    #[arg(long, default_value = "json", value_enum, help = "Payload output format: json|pretty")]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let code = if err.kind() == ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                {
                    2
                } else {
                    0
                };
                return Ok(code);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("run `connect-shim --help` for usage"));
            }
        },
    };

    match cli.command {
        Command::Decode(args) => run_decode(args),
        Command::Kinds => {
            println!("{}", kinds_json());
            Ok(0)
        }
    }
}

fn run_decode(args: DecodeArgs) -> Result<i32, Error> {
    let bytes = read_envelope(&args)?;
    let decoder = ResultDecoder::new(MallocRuntime).with_verify_callback(report_verify_failure);
    let handle = decoder.runtime().alloc_bytes(&bytes)?;
    // SAFETY: `handle` was just allocated by the decoder's runtime and is not used afterwards.
    let value = unsafe { decoder.decode(handle) }?;
    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string(&value),
        OutputFormat::Pretty => serde_json::to_string_pretty(&value),
    }
    .map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to encode payload")
            .with_source(err)
    })?;
    println!("{rendered}");
    Ok(0)
}

// Raw bytes: UTF-8 validation belongs to the decoder, as it would for a real foreign buffer.
fn read_envelope(args: &DecodeArgs) -> Result<Vec<u8>, Error> {
    if let Some(inline) = &args.envelope_json {
        return Ok(inline.clone().into_bytes());
    }
    if let Some(path) = &args.input {
        return fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read {}", path.display()))
                .with_source(err)
        });
    }
    let mut bytes = Vec::new();
    io::stdin().read_to_end(&mut bytes).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read stdin")
            .with_source(err)
    })?;
    Ok(bytes)
}

fn report_verify_failure(accepted: bool, context: &VerifyContext) {
    let value = json!({ "verify": { "accepted": accepted, "context": context } });
    eprintln!("{value}");
}

fn kinds_json() -> Value {
    let mut rows: Vec<Value> = KNOWN_DISCRIMINANTS
        .iter()
        .map(|(err_type, kind)| {
            json!({
                "err_type": err_type,
                "kind": format!("{kind:?}"),
                "exit_code": to_exit_code(*kind),
            })
        })
        .collect();
    rows.push(json!({
        "err_type": "*",
        "kind": format!("{:?}", ErrorKind::Generic),
        "exit_code": to_exit_code(ErrorKind::Generic),
    }));
    Value::Array(rows)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .next()
        .map(|line| line.trim_start_matches("error: ").to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn emit_error(err: &Error) {
    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Generic\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert(
        "message".to_string(),
        json!(err.message().unwrap_or(err.kind().default_message())),
    );
    if let Some(code) = err.code() {
        inner.insert("code".to_string(), json!(code));
    }
    if let Some(body) = err.body() {
        inner.insert("body".to_string(), body.clone());
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

//! erc8128 CLI - Command-line tools for ERC-8128 HTTP message signatures.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{base, digest, inspect, keyid};

#[derive(Parser)]
#[command(name = "erc8128")]
#[command(about = "Inspect and reproduce ERC-8128 HTTP message signatures")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Content-Digest header value for a body
    Digest {
        /// Body file (or stdin if not provided)
        input: Option<String>,
    },
    /// Format or parse key identifiers
    Keyid {
        #[command(subcommand)]
        action: KeyidAction,
    },
    /// List the signature candidates carried by a pair of headers
    Inspect {
        /// Signature-Input header value
        #[arg(long)]
        signature_input: String,
        /// Signature header value
        #[arg(long)]
        signature: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the signature base for one Signature-Input member
    Base {
        /// HTTP method
        #[arg(long)]
        method: String,
        /// Absolute request URL
        #[arg(long)]
        url: String,
        /// Request header as 'name: value' (repeatable)
        #[arg(long = "header")]
        headers: Vec<String>,
        /// File holding the request body
        #[arg(long)]
        body_file: Option<String>,
        /// Signature-Input header value
        #[arg(long)]
        signature_input: String,
        /// Member label (default: first member)
        #[arg(long)]
        label: Option<String>,
    },
}

#[derive(Subcommand)]
enum KeyidAction {
    /// Build a key identifier from a chain id and address
    Format {
        /// Chain id
        #[arg(long)]
        chain_id: u64,
        /// 0x-prefixed account address
        #[arg(long)]
        address: String,
    },
    /// Split a key identifier into chain id and address
    Parse {
        /// Key identifier
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Digest { input } => digest::run(input),
        Commands::Keyid { action } => match action {
            KeyidAction::Format { chain_id, address } => keyid::format(chain_id, address),
            KeyidAction::Parse { value, json } => keyid::parse(value, json),
        },
        Commands::Inspect {
            signature_input,
            signature,
            json,
        } => inspect::run(signature_input, signature, json),
        Commands::Base {
            method,
            url,
            headers,
            body_file,
            signature_input,
            label,
        } => base::run(method, url, headers, body_file, signature_input, label),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

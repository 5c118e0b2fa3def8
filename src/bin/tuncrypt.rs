//! tuncrypt CLI - datagram encryption from the command line
//!
//! Seals files with the same cipher, key derivation and framing a tunnel
//! peer uses for its datagrams, which makes it handy for checking that two
//! ends agree on cipher and passphrase.

use clap::{Parser, Subcommand};
use std::error::Error as StdError;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tuncrypt::cipher::{self, CipherKind};
use tuncrypt::file_ops;
use tuncrypt::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};
use tuncrypt::TuncryptError;

/// Exit status for broken internal invariants (EX_SOFTWARE).
const EXIT_INVARIANT: i32 = 70;

#[derive(Parser)]
#[command(name = "tuncrypt")]
#[command(version)]
#[command(about = "Passphrase-keyed datagram encryption.", long_about = None)]
struct Cli {
    /// Read passphrase from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Emit log lines as JSON (filter with RUST_LOG)
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file as a single sealed datagram
    #[command(alias = "e")]
    Encrypt {
        /// Cipher to use (see `tuncrypt ciphers`)
        #[arg(short, long, value_name = "CIPHER", default_value = "aes-128")]
        cipher: String,

        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the encrypted text to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Decrypt a file produced by `encrypt`
    #[command(alias = "d")]
    Decrypt {
        /// Require this cipher instead of trusting the file's header
        #[arg(short, long, value_name = "CIPHER")]
        cipher: Option<String>,

        /// Path to the file whose contents is to be decrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the unencrypted text to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// List supported ciphers
    Ciphers,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let result = match cli.command {
        Commands::Encrypt {
            cipher: name,
            input,
            output,
        } => cipher::lookup(&name).and_then(|kind| {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::encrypt_file(&input, &output, kind, &mut *reader)
        }),
        Commands::Decrypt {
            cipher: name,
            input,
            output,
        } => name
            .as_deref()
            .map(cipher::lookup)
            .transpose()
            .and_then(|expected| {
                let mut reader = get_passphrase_reader(cli.passphrase_stdin);
                file_ops::decrypt_file(&input, &output, expected, &mut *reader)
            }),
        Commands::Ciphers => {
            list_ciphers();
            Ok(())
        }
    };

    if let Err(e) = result {
        exit_with(e);
    }
}

fn list_ciphers() {
    println!("{:<10} {:>9} {:>11}", "NAME", "KEY BYTES", "BLOCK BYTES");
    for kind in CipherKind::ALL {
        let desc = kind.descriptor();
        println!(
            "{:<10} {:>9} {:>11}",
            kind.name(),
            desc.key_length,
            desc.padding_block()
        );
    }
}

fn exit_with(err: TuncryptError) -> ! {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }

    if err.is_invariant_violation() {
        tracing::error!(category = ?err.category, "internal invariant violated: {}", msg);
        eprintln!("Error: internal invariant violated: {}", msg);
        process::exit(EXIT_INVARIANT);
    }

    tracing::debug!(category = ?err.category, kind = ?err.kind, "command failed");
    eprintln!("Error: {}", msg);
    process::exit(1);
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader)
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing(log_json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

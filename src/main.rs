use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use mnemonikey::pgp::UserId;
use mnemonikey::{pipeline, MnemonikeyError, Result};

#[derive(Parser)]
#[command(name = "mnemonikey")]
#[command(about = "Deterministic backup and recovery of PGP keys through a recovery phrase")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new PGP key and print its recovery phrase
    Generate {
        /// Display name for the key's user ID
        #[arg(long)]
        name: String,
        /// Email address for the key's user ID
        #[arg(long)]
        email: String,
        /// Optional user ID comment
        #[arg(long)]
        comment: Option<String>,
        /// Key lifetime in days; omit for a key that never expires
        #[arg(long)]
        ttl: Option<u32>,
        /// Protect the recovery phrase with a password
        #[arg(long)]
        encrypt_phrase: bool,
        /// Protect the exported secret key material with a password
        #[arg(long)]
        encrypt_key: bool,
        /// Write the recovery phrase here instead of stdout
        #[arg(long)]
        out_word_file: Option<PathBuf>,
        /// Write the armored key here instead of stdout
        #[arg(long)]
        out_key_file: Option<PathBuf>,
    },
    /// Rebuild a PGP key from its recovery phrase
    Recover {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long)]
        ttl: Option<u32>,
        /// Read the phrase from this file instead of prompting
        #[arg(long)]
        in_word_file: Option<PathBuf>,
        /// Protect the exported secret key material with a password
        #[arg(long)]
        encrypt_key: bool,
        /// Write the armored key here instead of stdout
        #[arg(long)]
        out_key_file: Option<PathBuf>,
    },
    /// Convert a recovery phrase between plaintext and encrypted form
    Convert {
        /// Read the phrase from this file instead of prompting
        #[arg(long)]
        in_word_file: Option<PathBuf>,
        /// Encrypt the phrase with a new password
        #[arg(long, conflicts_with = "decrypt_phrase")]
        encrypt_phrase: bool,
        /// Strip the password from an encrypted phrase
        #[arg(long)]
        decrypt_phrase: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut rng = rand::rngs::OsRng;
    match cli.command {
        Commands::Generate {
            name,
            email,
            comment,
            ttl,
            encrypt_phrase,
            encrypt_key,
            out_word_file,
            out_key_file,
        } => {
            let user_id = UserId::new(&name, &email, comment.as_deref())?;
            let phrase_password = if encrypt_phrase {
                Some(prompt_password("Phrase password: ")?)
            } else {
                None
            };
            let key_password = if encrypt_key {
                Some(prompt_password("Key password: ")?)
            } else {
                None
            };

            let mut options = pipeline::GenerateOptions::new(user_id);
            options.ttl_seconds = ttl_seconds(ttl)?;
            options.phrase_password = phrase_password.as_ref().map(|p| p.as_slice());
            options.key_password = key_password.as_ref().map(|p| p.as_slice());
            let identity = pipeline::generate(options, &mut rng)?;

            emit("recovery phrase", &identity.phrase, out_word_file.as_deref())?;
            emit("armored key", &identity.armored_key, out_key_file.as_deref())?;
            eprintln!("fingerprint: {}", hex::encode(identity.fingerprint));
            Ok(())
        }
        Commands::Recover {
            name,
            email,
            comment,
            ttl,
            in_word_file,
            encrypt_key,
            out_key_file,
        } => {
            let user_id = UserId::new(&name, &email, comment.as_deref())?;
            let phrase = read_phrase(in_word_file.as_deref())?;
            let key_password = if encrypt_key {
                Some(prompt_password("Key password: ")?)
            } else {
                None
            };

            let ttl = ttl_seconds(ttl)?;
            let recovered = match pipeline::recover(
                &phrase,
                None,
                &user_id,
                ttl,
                key_password.as_ref().map(|p| p.as_slice()),
                &mut rng,
            ) {
                Err(MnemonikeyError::PasswordRequired) => {
                    let password = prompt_password("Phrase password: ")?;
                    pipeline::recover(
                        &phrase,
                        Some(password.as_slice()),
                        &user_id,
                        ttl,
                        key_password.as_ref().map(|p| p.as_slice()),
                        &mut rng,
                    )?
                }
                other => other?,
            };

            emit("armored key", &recovered.armored_key, out_key_file.as_deref())?;
            eprintln!("fingerprint: {}", hex::encode(recovered.fingerprint));
            Ok(())
        }
        Commands::Convert {
            in_word_file,
            encrypt_phrase,
            decrypt_phrase,
        } => {
            if !encrypt_phrase && !decrypt_phrase {
                return Err(MnemonikeyError::InputValidation(
                    "pass --encrypt-phrase or --decrypt-phrase".into(),
                ));
            }
            let phrase = read_phrase(in_word_file.as_deref())?;
            let new_password = if encrypt_phrase {
                Some(prompt_password("New phrase password: ")?)
            } else {
                None
            };

            let new_password = new_password.as_ref().map(|p| p.as_slice());
            let converted = match pipeline::convert(&phrase, None, new_password) {
                Err(MnemonikeyError::PasswordRequired) => {
                    let old = prompt_password("Current phrase password: ")?;
                    pipeline::convert(&phrase, Some(old.as_slice()), new_password)?
                }
                other => other?,
            };

            println!("{converted}");
            Ok(())
        }
    }
}

fn ttl_seconds(days: Option<u32>) -> Result<Option<u32>> {
    days.map(|d| {
        d.checked_mul(86_400)
            .ok_or_else(|| MnemonikeyError::InputValidation(format!("TTL of {d} days is too large")))
    })
    .transpose()
}

fn read_phrase(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            eprint!("Enter recovery phrase: ");
            std::io::stderr().flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        }
    }
}

fn prompt_password(prompt: &str) -> Result<Zeroizing<Vec<u8>>> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;
    let mut line = Zeroizing::new(String::new());
    std::io::stdin().lock().read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        return Err(MnemonikeyError::InputValidation("empty password".into()));
    }
    Ok(Zeroizing::new(trimmed.as_bytes().to_vec()))
}

fn emit(label: &str, content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)?;
            eprintln!("{label} written to {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

//! Keyvault CLI
//!
//! Generates passphrase-protected BLS signing keys and checks that stored
//! keys can be unlocked.
//!
//! ```text
//! keyvault [--key-dir DIR] [--passphrase-file FILE] generate [--format legacy|argon2id]
//! keyvault [--key-dir DIR] [--passphrase-file FILE] load <FILE>
//! keyvault [--key-dir DIR] list
//! ```
//!
//! Private keys are never printed. `load` prints the public key of the
//! unlocked key, which is enough to prove the passphrase is right.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Report, WrapErr};
use color_eyre::Section;
use keyvault_core::crypto::{
    ARGON2_ITERATIONS, ARGON2_MEMORY_KIB, ARGON2_PARALLELISM, MAX_ARGON2_ITERATIONS,
    MAX_ARGON2_MEMORY_KIB, MAX_ARGON2_PARALLELISM,
};
use keyvault_core::{Argon2Params, Bls12381, KeyFileFormat, KeyScheme, KeyVault, VaultConfig};
use zeroize::Zeroizing;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "keyvault", version, about = "Passphrase-protected BLS key storage")]
struct Args {
    /// Directory key files are written to and read from
    #[arg(long, default_value = ".", env = "KEYVAULT_DIR")]
    key_dir: PathBuf,

    /// Read the passphrase from this file instead of prompting.
    /// A single trailing newline is ignored.
    #[arg(long, env = "KEYVAULT_PASSPHRASE_FILE")]
    passphrase_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new key and store it encrypted under a passphrase
    Generate {
        /// Key file layout
        #[arg(long, value_enum, default_value_t = FormatArg::Argon2id, env = "KEYVAULT_FORMAT")]
        format: FormatArg,

        /// Argon2id memory cost in KiB
        #[arg(long, default_value_t = ARGON2_MEMORY_KIB, env = "KEYVAULT_ARGON2_MEMORY_KIB")]
        argon2_memory_kib: u32,

        /// Argon2id pass count
        #[arg(long, default_value_t = ARGON2_ITERATIONS, env = "KEYVAULT_ARGON2_ITERATIONS")]
        argon2_iterations: u32,

        /// Argon2id lane count
        #[arg(long, default_value_t = ARGON2_PARALLELISM, env = "KEYVAULT_ARGON2_PARALLELISM")]
        argon2_parallelism: u32,
    },

    /// Unlock a stored key and print its public key
    Load {
        /// Key file name, relative to the key directory, or a full path
        file: PathBuf,
    },

    /// List the key files in the key directory
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Unsalted, readable by older tooling
    Legacy,
    /// Salted, memory-hard (recommended)
    #[value(name = "argon2id")]
    Argon2id,
}

impl Command {
    fn key_file_format(&self) -> color_eyre::Result<KeyFileFormat> {
        match self {
            Command::Generate {
                format: FormatArg::Legacy,
                ..
            } => Ok(KeyFileFormat::Legacy),
            Command::Generate {
                format: FormatArg::Argon2id,
                argon2_memory_kib,
                argon2_iterations,
                argon2_parallelism,
            } => {
                let params = Argon2Params {
                    memory_kib: *argon2_memory_kib,
                    iterations: *argon2_iterations,
                    parallelism: *argon2_parallelism,
                };
                params.validate().map_err(explain)?;
                Ok(KeyFileFormat::Argon2id(params))
            }
            _ => Ok(KeyFileFormat::default()),
        }
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Logs go to stderr so stdout stays scriptable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyvault=info,keyvault_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = VaultConfig {
        key_dir: args.key_dir.clone(),
        format: args.command.key_file_format()?,
    };
    tracing::debug!(?config, "Starting keyvault v{}", keyvault_core::version());

    let vault = KeyVault::new(Bls12381, config);

    match &args.command {
        Command::Generate { .. } => {
            let passphrase = read_passphrase(args.passphrase_file.as_deref(), true)?;
            let (private_key, file_name) = vault.generate_and_store(&passphrase).map_err(explain)?;

            println!("{}", vault.config().key_dir.join(file_name.as_str()).display());
            println!("public key: {}", Bls12381.public_key_to_hex(&private_key.public_key()));
        }
        Command::Load { file } => {
            let passphrase = read_passphrase(args.passphrase_file.as_deref(), false)?;
            let private_key = vault
                .load_from_file(file, &passphrase)
                .map_err(explain)
                .wrap_err_with(|| format!("Could not unlock {}", file.display()))?;

            println!("public key: {}", Bls12381.public_key_to_hex(&private_key.public_key()));
        }
        Command::List => {
            for name in vault.list_keys().map_err(explain)? {
                println!("{}  {}  {}", name.created_at().to_rfc3339(), name.public_key_hex(), name);
            }
        }
    }

    Ok(())
}

// ── Passphrase Input ──────────────────────────────────────────────────────────

fn read_passphrase(file: Option<&Path>, confirm: bool) -> color_eyre::Result<Zeroizing<String>> {
    if let Some(path) = file {
        let content = Zeroizing::new(
            fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read passphrase file {}", path.display()))?,
        );
        return Ok(Zeroizing::new(trim_line_ending(&content).to_string()));
    }

    let passphrase = Zeroizing::new(rpassword::prompt_password("Passphrase: ")?);
    if confirm {
        let repeated = Zeroizing::new(rpassword::prompt_password("Repeat passphrase: ")?);
        if *repeated != *passphrase {
            return Err(eyre!("Passphrases do not match"));
        }
    }
    Ok(passphrase)
}

fn trim_line_ending(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

fn explain(err: keyvault_core::Error) -> Report {
    use keyvault_core::Error;

    let hint: Option<String> = match &err {
        Error::AuthenticationFailed => Some("Wrong passphrase, or the key file has been corrupted or tampered with".into()),
        Error::KeyFileNotFound(_) => Some("Check --key-dir and the file name; `keyvault list` shows the stored keys".into()),
        Error::KeyFileExists(_) => Some("A key file with this name already exists and was left untouched".into()),
        Error::PermissionDenied(_) => Some("Key files are owner-only; run as the user that created them".into()),
        Error::InvalidKdfParams(_) => Some(argon2_limits()),
        _ => None,
    };

    let code = err.code();
    let report = Report::new(err).note(format!("error code {}", code));
    match hint {
        Some(hint) => report.suggestion(hint),
        None => report,
    }
}

fn argon2_limits() -> String {
    format!(
        "Argon2id accepts parallelism 1-{}, iterations 1-{}, and memory from 8 KiB per lane up to {} KiB",
        MAX_ARGON2_PARALLELISM, MAX_ARGON2_ITERATIONS, MAX_ARGON2_MEMORY_KIB
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending("secret\n"), "secret");
        assert_eq!(trim_line_ending("secret\r\n"), "secret");
        assert_eq!(trim_line_ending("secret\n\n"), "secret\n");
        assert_eq!(trim_line_ending(" secret "), " secret ");
        assert_eq!(trim_line_ending(""), "");
    }

    #[test]
    fn test_generate_defaults_to_argon2id() {
        let args = Args::try_parse_from(["keyvault", "generate"]).unwrap();
        assert_eq!(
            args.command.key_file_format().unwrap(),
            KeyFileFormat::Argon2id(Argon2Params::default())
        );
        assert_eq!(args.key_dir, PathBuf::from("."));
    }

    #[test]
    fn test_generate_legacy_and_custom_params() {
        let args = Args::try_parse_from(["keyvault", "generate", "--format", "legacy"]).unwrap();
        assert_eq!(args.command.key_file_format().unwrap(), KeyFileFormat::Legacy);

        let args = Args::try_parse_from([
            "keyvault",
            "--key-dir",
            "/tmp/keys",
            "generate",
            "--argon2-memory-kib",
            "1024",
            "--argon2-iterations",
            "2",
            "--argon2-parallelism",
            "1",
        ])
        .unwrap();
        assert_eq!(
            args.command.key_file_format().unwrap(),
            KeyFileFormat::Argon2id(Argon2Params {
                memory_kib: 1024,
                iterations: 2,
                parallelism: 1,
            })
        );
    }

    #[test]
    fn test_invalid_argon2_params_rejected() {
        let args = Args::try_parse_from(["keyvault", "generate", "--argon2-parallelism", "0"]).unwrap();
        assert!(args.command.key_file_format().is_err());
    }

    #[test]
    fn test_out_of_range_argon2_params_rejected() {
        let too_many_passes = (MAX_ARGON2_ITERATIONS + 1).to_string();
        let args = Args::try_parse_from(["keyvault", "generate", "--argon2-iterations", too_many_passes.as_str()]).unwrap();
        assert!(args.command.key_file_format().is_err());

        let too_much_memory = (MAX_ARGON2_MEMORY_KIB + 1).to_string();
        let args = Args::try_parse_from(["keyvault", "generate", "--argon2-memory-kib", too_much_memory.as_str()]).unwrap();
        assert!(args.command.key_file_format().is_err());
    }

    #[test]
    fn test_argon2_hint_names_every_limit() {
        let hint = argon2_limits();
        assert!(hint.contains(&format!("1-{}", MAX_ARGON2_PARALLELISM)));
        assert!(hint.contains(&format!("iterations 1-{}", MAX_ARGON2_ITERATIONS)));
        assert!(hint.contains(&format!("{} KiB", MAX_ARGON2_MEMORY_KIB)));
    }

    #[test]
    fn test_passphrase_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pass");
        fs::write(&path, "correct-horse\n").unwrap();

        let passphrase = read_passphrase(Some(&path), true).unwrap();
        assert_eq!(passphrase.as_str(), "correct-horse");
    }

    #[test]
    fn test_load_requires_file() {
        assert!(Args::try_parse_from(["keyvault", "load"]).is_err());
        let args = Args::try_parse_from(["keyvault", "load", "UTC--x"]).unwrap();
        assert!(matches!(args.command, Command::Load { .. }));
    }
}

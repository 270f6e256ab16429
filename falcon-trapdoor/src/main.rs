use std::{
    process::ExitCode,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use falcon_trapdoor::{
    FalconLevel, PublicKey, SecretKey, Signature, TrapdoorError,
    dsa::falcon::ParameterError,
    utils::{
        Deserializable, DeserializationError, HexParseError, Serializable, bytes_to_hex_string,
        hex_to_bytes, zeroize::Zeroizing,
    },
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "falcon-trapdoor", about = "Falcon key generation, signing and verification")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generates a key pair and prints the hex-encoded public and secret keys.
    Keygen {
        #[arg(short, long, default_value = "512", value_parser = parse_level)]
        level: FalconLevel,
        /// 32-byte hex seed for reproducible keys; OS randomness is used when omitted.
        #[arg(long)]
        seed: Option<String>,
    },
    /// Signs a hex-encoded message and prints the hex-encoded signature.
    Sign {
        #[arg(long)]
        secret_key: String,
        #[arg(long)]
        message: String,
    },
    /// Checks a hex-encoded signature; exits with a non-zero status if it does not verify.
    Verify {
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        signature: String,
    },
    /// Times key generation.
    BenchKeygen {
        #[arg(short, long, default_value = "512", value_parser = parse_level)]
        level: FalconLevel,
        #[arg(short, long, default_value_t = 10)]
        count: u32,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid hex for {what}: {source}")]
    Hex {
        what: &'static str,
        source: HexParseError,
    },
    #[error("invalid {what}: {reason}")]
    Decoding {
        what: &'static str,
        reason: DeserializationError,
    },
    #[error("seed must be 32 bytes, found {0}")]
    SeedLength(usize),
    #[error(transparent)]
    Trapdoor(#[from] TrapdoorError),
}

fn parse_level(value: &str) -> Result<FalconLevel, String> {
    let level: u16 = value.parse().map_err(|_| format!("'{value}' is not a number"))?;
    FalconLevel::try_from(level).map_err(|err: ParameterError| err.to_string())
}

fn decode_hex(what: &'static str, value: &str) -> Result<Vec<u8>, CliError> {
    hex_to_bytes(value).map_err(|source| CliError::Hex { what, source })
}

fn decode<T: Deserializable>(what: &'static str, value: &str) -> Result<T, CliError> {
    let bytes = Zeroizing::new(decode_hex(what, value)?);
    T::read_from_bytes(&bytes).map_err(|reason| CliError::Decoding { what, reason })
}

fn run(command: Command) -> Result<bool, CliError> {
    match command {
        Command::Keygen { level, seed } => {
            let sk = match seed {
                Some(seed) => {
                    let seed = Zeroizing::new(decode_hex("seed", &seed)?);
                    let seed: [u8; 32] = seed
                        .as_slice()
                        .try_into()
                        .map_err(|_| CliError::SeedLength(seed.len()))?;
                    SecretKey::with_rng(level, &mut ChaCha20Rng::from_seed(seed))?
                },
                None => SecretKey::new(level)?,
            };
            println!("public key: {}", bytes_to_hex_string(&sk.public_key().to_bytes()));
            println!("secret key: {}", bytes_to_hex_string(&Zeroizing::new(sk.to_bytes())));
        },
        Command::Sign { secret_key, message } => {
            let sk: SecretKey = decode("secret key", &secret_key)?;
            let message = decode_hex("message", &message)?;
            let signature = sk.sign(&message)?;
            println!("{}", bytes_to_hex_string(&signature.to_bytes()));
        },
        Command::Verify { public_key, message, signature } => {
            let pk: PublicKey = decode("public key", &public_key)?;
            let signature: Signature = decode("signature", &signature)?;
            let message = decode_hex("message", &message)?;
            let valid = pk.verify(&message, &signature);
            println!("{}", if valid { "valid" } else { "invalid" });
            return Ok(valid);
        },
        Command::BenchKeygen { level, count } => {
            let mut total = Duration::ZERO;
            for _ in 0..count {
                let start = Instant::now();
                SecretKey::new(level)?;
                total += start.elapsed();
            }
            println!("{level}: {count} keys in {total:?} ({:?} per key)", total / count.max(1));
        },
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        },
    }
}

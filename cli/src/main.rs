//! rgoose-tool - R-GOOSE message security on packet files
//!
//! Reads a raw R-GOOSE message from a file, applies one transform and writes
//! the result back (or to `--out`). Keys and IVs are hex strings, taken from
//! flags or from `RGOOSE_KEY` / `RGOOSE_IV`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, LevelFilter};

use rgoose_core::prelude::*;

/// R-GOOSE message security tool
#[derive(Parser, Debug)]
#[command(name = "rgoose-tool")]
#[command(version = "0.1.0")]
#[command(about = "Dissect, authenticate and encrypt R-GOOSE messages")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (default info, -v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every header field of a message
    Dissect {
        /// Packet file
        packet: PathBuf,

        /// Emit JSON instead of the text dump
        #[arg(long)]
        json: bool,
    },

    /// Build an unsecured message around a GOOSE PDU
    Build {
        /// GOOSE PDU bytes as hex
        #[arg(long)]
        pdu: String,

        /// APPID field
        #[arg(long, default_value = "1")]
        appid: u16,

        /// SpduNumber field
        #[arg(long, default_value = "0")]
        spdu_number: u32,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Append an HMAC tag (MAC ids 1, 2, 3, 6, 7)
    InsertHmac {
        #[command(flatten)]
        io: PacketIo,

        /// MacAlgorithmId
        #[arg(short, long, default_value = "2")]
        alg: u8,

        #[command(flatten)]
        key: KeyArg,

        #[command(flatten)]
        epoch: EpochArgs,
    },

    /// Append a GMAC tag (MAC ids 4, 5, 8, 9)
    InsertGmac {
        #[command(flatten)]
        io: PacketIo,

        /// MacAlgorithmId
        #[arg(short, long, default_value = "5")]
        alg: u8,

        #[command(flatten)]
        key: KeyArg,

        #[command(flatten)]
        iv: IvArgs,

        #[command(flatten)]
        epoch: EpochArgs,
    },

    /// Check the tag of a message (family taken from the header)
    Validate {
        /// Packet file
        packet: PathBuf,

        #[command(flatten)]
        key: KeyArg,

        #[command(flatten)]
        iv: IvArgs,
    },

    /// Encrypt the GOOSE PDU in place and store the GCM tag
    Encrypt {
        #[command(flatten)]
        io: PacketIo,

        /// EncryptionAlgorithmId (0 none, 1 AES-128-GCM, 2 AES-256-GCM)
        #[arg(short, long, default_value = "2")]
        alg: u8,

        #[command(flatten)]
        key: KeyArg,

        #[command(flatten)]
        iv: IvArgs,

        #[command(flatten)]
        epoch: EpochArgs,

        /// Where to write the 16-byte GCM tag (default: <packet>.tag)
        #[arg(long)]
        tag_file: Option<PathBuf>,
    },

    /// Decrypt the GOOSE PDU using a stored GCM tag
    Decrypt {
        #[command(flatten)]
        io: PacketIo,

        #[command(flatten)]
        key: KeyArg,

        #[command(flatten)]
        iv: IvArgs,

        /// GCM tag file written by `encrypt` (default: <packet>.tag)
        #[arg(long)]
        tag_file: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct PacketIo {
    /// Packet file
    packet: PathBuf,

    /// Write the result here instead of overwriting the packet
    #[arg(short, long)]
    out: Option<PathBuf>,
}

impl PacketIo {
    fn target(&self) -> &Path {
        self.out.as_deref().unwrap_or(&self.packet)
    }
}

#[derive(Args, Debug)]
struct KeyArg {
    /// Key as hex
    #[arg(short, long, env = "RGOOSE_KEY", hide_env_values = true)]
    key: String,
}

impl KeyArg {
    fn bytes(&self) -> Result<Vec<u8>> {
        parse_hex(&self.key).context("parsing key")
    }
}

#[derive(Args, Debug)]
struct IvArgs {
    /// 12-byte IV as hex
    #[arg(long, env = "RGOOSE_IV")]
    iv: Option<String>,

    /// Treat --iv as a base IV and derive the per-message IV from SpduNumber
    #[arg(long)]
    derive: bool,
}

impl IvArgs {
    fn resolve(&self, message: &[u8]) -> Result<[u8; IV_LEN_12]> {
        let raw = self.iv.as_deref().context("an IV is required (--iv or RGOOSE_IV)")?;
        let iv = iv_from_slice(&parse_hex(raw).context("parsing IV")?)?;
        if !self.derive {
            return Ok(iv);
        }
        let derived = iv_for_message(&iv, message)?;
        debug!("derived IV {}", hex::encode(derived));
        Ok(derived)
    }
}

#[derive(Args, Debug)]
struct EpochArgs {
    /// TimeOfCurrentKey
    #[arg(long, default_value = "0")]
    time_of_current_key: u32,

    /// TimeToNextKey
    #[arg(long, default_value = "0")]
    time_to_next_key: u16,

    /// KeyId
    #[arg(long, default_value = "0")]
    key_id: u32,
}

impl EpochArgs {
    fn epoch(&self) -> KeyEpoch {
        KeyEpoch::new(self.time_of_current_key, self.time_to_next_key, self.key_id)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(command: Command) -> Result<ExitCode> {
    let engine = SecurityEngine::new();

    match command {
        Command::Dissect { packet, json } => {
            let header = dissect(&read_packet(&packet)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&header)?);
            } else {
                print!("{}", header);
            }
        }

        Command::Build { pdu, appid, spdu_number, out } => {
            let fields = RGooseFields { appid, spdu_number, ..RGooseFields::default() };
            let message = RGooseMessage::build(&fields, &parse_hex(&pdu).context("parsing PDU")?)?;
            write_packet(&out, message.as_bytes())?;
            println!("built {} bytes", message.len());
        }

        Command::InsertHmac { io, alg, key, epoch } => {
            let mut message = RGooseMessage::from_bytes(read_packet(&io.packet)?);
            let len = engine.insert_hmac(&mut message, &key.bytes()?, alg, &epoch.epoch())?;
            write_packet(io.target(), message.as_bytes())?;
            println!("tagged with {}: {} bytes", describe_mac(alg), len);
        }

        Command::InsertGmac { io, alg, key, iv, epoch } => {
            let mut message = RGooseMessage::from_bytes(read_packet(&io.packet)?);
            let iv = iv.resolve(message.as_bytes())?;
            let len = engine.insert_gmac(&mut message, &key.bytes()?, alg, &iv, &epoch.epoch())?;
            write_packet(io.target(), message.as_bytes())?;
            println!("tagged with {}: {} bytes", describe_mac(alg), len);
        }

        Command::Validate { packet, key, iv } => {
            let bytes = read_packet(&packet)?;
            let key = key.bytes()?;
            let verdict = match mac_family_of(&bytes) {
                Some(MacFamily::Gmac) => engine.validate_gmac(&bytes, &key, &iv.resolve(&bytes)?),
                _ => engine.validate_hmac(&bytes, &key),
            };
            println!("{}", verdict);
            return Ok(match verdict {
                Verification::Valid | Verification::Unsecured => ExitCode::SUCCESS,
                Verification::Invalid => ExitCode::from(2),
                Verification::Error(_) => ExitCode::FAILURE,
            });
        }

        Command::Encrypt { io, alg, key, iv, epoch, tag_file } => {
            let mut message = RGooseMessage::from_bytes(read_packet(&io.packet)?);
            let iv = iv.resolve(message.as_bytes())?;
            match engine.encrypt_payload(&mut message, &key.bytes()?, alg, &iv, &epoch.epoch())? {
                EncryptOutcome::NoOp => println!("encryption algorithm cleared, payload unchanged"),
                EncryptOutcome::Encrypted { alg, tag } => {
                    let tag_path = tag_file.unwrap_or_else(|| tag_path_for(&io.packet));
                    write_packet(&tag_path, &tag)?;
                    println!("encrypted with {:?}, tag {} -> {}", alg, hex::encode(tag), tag_path.display());
                }
            }
            write_packet(io.target(), message.as_bytes())?;
        }

        Command::Decrypt { io, key, iv, tag_file } => {
            let mut message = RGooseMessage::from_bytes(read_packet(&io.packet)?);
            let iv = iv.resolve(message.as_bytes())?;
            let tag_path = tag_file.unwrap_or_else(|| tag_path_for(&io.packet));
            let tag: GcmTag = read_packet(&tag_path)?
                .as_slice()
                .try_into()
                .with_context(|| format!("{} is not a {}-byte GCM tag", tag_path.display(), GCM_TAG_LEN))?;
            match engine.decrypt_payload(&mut message, &key.bytes()?, &iv, &tag)? {
                DecryptOutcome::NoOp => println!("payload is not encrypted"),
                DecryptOutcome::Decrypted { alg } => {
                    write_packet(io.target(), message.as_bytes())?;
                    println!("decrypted with {:?}", alg);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_packet(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    info!("read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

fn write_packet(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn tag_path_for(packet: &Path) -> PathBuf {
    let mut name = packet.as_os_str().to_owned();
    name.push(".tag");
    PathBuf::from(name)
}

fn mac_family_of(message: &[u8]) -> Option<MacFamily> {
    let raw = *message.get(offsets::MAC_ALG)?;
    MacAlgorithm::verify(raw).ok().map(MacAlgorithm::family)
}

fn describe_mac(raw: u8) -> String {
    MacAlgorithm::verify(raw)
        .map(|alg| format!("{:?} ({}-byte tag)", alg, alg.tag_len()))
        .unwrap_or_else(|_| format!("0x{:02x}", raw))
}

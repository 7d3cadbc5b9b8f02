use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use alloy_primitives::{Address, Bytes, U256};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use k256::ecdsa::SigningKey;
use lsp6_encoder::{
    encode_controller_setup, encode_relay_call, encode_set_data_batch, sign_relay_call,
    signer_address, RelayCallEnvelope,
};
use lsp6_key_manager::{
    utils::bytes::join_u128_pair, KeyManager, KeyManagerConfig, MemoryAccount,
};
use regex::Regex;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod output;
mod setup;

use output::{emit, now_rfc3339};
use setup::{seed_account, SetupFile};

/// Tooling for LSP6 key managers: encode controller setups, sign LSP25 relay calls and dry-run
/// payloads against a local copy of a permission setup.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode the data keys and `setDataBatch` payload registering one controller.
    Controller(ControllerArgs),
    /// Sign a payload as an LSP25 relay call.
    SignRelay(SignRelayArgs),
    /// Check whether a caller may run a payload, without running it.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct ControllerArgs {
    /// Controller setup JSON file.
    #[arg(long)]
    setup: PathBuf,

    /// Current length of `AddressPermissions[]` on the account.
    #[arg(long, default_value_t = 0)]
    current_length: u64,

    /// Where to write the result; stdout if omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct KeyManagerArgs {
    /// Address of the key manager (intended validator of the signature).
    #[arg(long, env = "KEY_MANAGER")]
    key_manager: Address,

    #[arg(long, env = "CHAIN_ID")]
    chain_id: u64,
}

#[derive(Args, Debug)]
struct SignRelayArgs {
    #[command(flatten)]
    key_manager: KeyManagerArgs,

    /// Path to a file containing the signer private key.
    #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key")]
    private_key_path: Option<PathBuf>,

    /// Signer private key (hex string, 0x...).
    #[arg(long, env = "PKEY", conflicts_with = "private_key_path")]
    private_key: Option<String>,

    /// Account payload to relay (hex).
    #[arg(long)]
    payload: Bytes,

    /// Nonce channel.
    #[arg(long, default_value_t = 0)]
    channel: u128,

    /// Sequence number within the channel (see the key manager's `getNonce`).
    #[arg(long, default_value_t = 0)]
    sequence: u128,

    /// Unix time from which the call is valid; 0 for no lower bound.
    #[arg(long, default_value_t = 0)]
    valid_from: u64,

    /// Unix time after which the call expires; 0 for no expiry.
    #[arg(long, default_value_t = 0)]
    valid_until: u64,

    /// Value the relayer must forward with the call (wei).
    #[arg(long, default_value = "0")]
    msg_value: U256,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    key_manager: KeyManagerArgs,

    /// Controller setup JSON files to seed the account with. Repeatable.
    #[arg(long = "setup", required = true)]
    setups: Vec<PathBuf>,

    /// Caller of `execute`.
    #[arg(long)]
    caller: Address,

    /// Account payload (hex).
    #[arg(long)]
    payload: Bytes,

    #[arg(long, default_value = "0")]
    msg_value: U256,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Controller(args) => run_controller(&args),
        Command::SignRelay(args) => run_sign_relay(&args),
        Command::Check(args) => run_check(&args),
    }
}

fn run_controller(args: &ControllerArgs) -> Result<ExitCode> {
    let setup = SetupFile::read(&args.setup)?.to_controller_setup()?;
    let entries = encode_controller_setup(&setup, u128::from(args.current_length))
        .context("failed encoding controller setup")?;
    let payload = encode_set_data_batch(&entries);
    info!(controller = %setup.controller, keys = entries.len(), "controller setup encoded");

    let value = json!({
        "controller": setup.controller,
        "permissions": setup.permissions.to_string(),
        "dataKeys": entries.data_keys,
        "dataValues": entries.data_values,
        "payload": Bytes::from(payload),
        "generated_at": now_rfc3339(),
    });
    emit(args.out.as_deref(), &value)?;
    Ok(ExitCode::SUCCESS)
}

fn run_sign_relay(args: &SignRelayArgs) -> Result<ExitCode> {
    let signing_key =
        load_signing_key(args.private_key_path.as_deref(), args.private_key.as_deref())?;
    let signer = signer_address(&signing_key);

    let mut envelope = RelayCallEnvelope {
        key_manager: args.key_manager.key_manager,
        chain_id: args.key_manager.chain_id,
        nonce: join_u128_pair(args.channel, args.sequence),
        validity_timestamps: join_u128_pair(
            u128::from(args.valid_from),
            u128::from(args.valid_until),
        ),
        msg_value: args.msg_value,
        payload: args.payload.to_vec(),
        signature: Vec::new(),
    };
    sign_relay_call(&mut envelope, &signing_key).map_err(|e| anyhow!("signing failed: {e}"))?;
    debug!(%signer, nonce = %envelope.nonce, "relay call signed");

    let value = json!({
        "signer": signer,
        "keyManager": envelope.key_manager,
        "chainId": envelope.chain_id,
        "nonce": envelope.nonce,
        "validityTimestamps": envelope.validity_timestamps,
        "msgValue": envelope.msg_value,
        "payload": args.payload,
        "signature": Bytes::from(envelope.signature.clone()),
        "calldata": Bytes::from(encode_relay_call(&envelope)),
    });
    emit(args.out.as_deref(), &value)?;
    Ok(ExitCode::SUCCESS)
}

fn run_check(args: &CheckArgs) -> Result<ExitCode> {
    let config = KeyManagerConfig::new(args.key_manager.key_manager, args.key_manager.chain_id);
    let account = MemoryAccount::new(Address::ZERO, config.address);
    for path in &args.setups {
        let setup = SetupFile::read(path)?.to_controller_setup()?;
        seed_account(&account, &setup)?;
    }
    let key_manager = KeyManager::new(config, account);

    let verdict = key_manager.authorize(args.caller, args.msg_value, &args.payload);
    let value = match &verdict {
        Ok(()) => json!({ "caller": args.caller, "authorized": true }),
        Err(err) => json!({
            "caller": args.caller,
            "authorized": false,
            "error": err.to_string(),
            "revertData": Bytes::from(err.abi_encode()),
        }),
    };
    emit(None, &value)?;
    Ok(if verdict.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_signing_key(path: Option<&Path>, inline: Option<&str>) -> Result<SigningKey> {
    let raw = match (path, inline) {
        (Some(path), _) => fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?,
        (None, Some(key)) => key.to_string(),
        (None, None) => {
            return Err(anyhow!(
                "missing signer key: provide --private-key-path or --private-key (or set PRIV_KEY_PATH/PKEY)"
            ))
        }
    };
    let re_key = Regex::new(r"^(?:0x)?([a-fA-F0-9]{64})$")?;
    let hex_key = re_key
        .captures(raw.trim())
        .and_then(|c| c.get(1))
        .ok_or_else(|| anyhow!("private key must be 32 bytes of hex"))?;
    let bytes = hex::decode(hex_key.as_str()).context("invalid private key hex")?;
    SigningKey::from_slice(&bytes).map_err(|e| anyhow!("invalid private key: {e}"))
}

use std::path::Path;

use omniverse_chain::{
    Backend, ChainAdapter, EvmAdapter, HttpLedgerClient, InkAdapter, Member, OmniverseClient,
    Receipt, SubstrateAdapter, SwapAdapter,
};
use omniverse_core::{encode_hex, parse_amount, KeyPair, PublicKey, TransactionEnvelope};
use serde_json::json;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::{generate_sample_config, ChainConfig, NetworkConfig};
use crate::error::CliError;
use crate::faucet;
use crate::secret::SecretFile;

/// Ledger connection for one chain from the config
pub enum Connection {
    Substrate(SubstrateAdapter<HttpLedgerClient>),
    Ink(InkAdapter<HttpLedgerClient>),
    Evm(EvmAdapter<HttpLedgerClient>),
}

impl Connection {
    pub fn open(chain: &ChainConfig, pallet: &str) -> Result<Self, CliError> {
        let client = HttpLedgerClient::new(&chain.node_address);
        let contract = || {
            chain.contract_address.as_deref().ok_or_else(|| {
                CliError::Config(format!("{} chain needs a contract_address", chain.backend))
            })
        };
        Ok(match chain.backend {
            Backend::Substrate => Connection::Substrate(SubstrateAdapter::new(client, pallet)),
            Backend::Ink => Connection::Ink(InkAdapter::new(client, contract()?)?),
            Backend::Evm => Connection::Evm(EvmAdapter::new(client, contract()?)?),
        })
    }

    pub fn adapter(&self) -> &dyn ChainAdapter {
        match self {
            Connection::Substrate(adapter) => adapter,
            Connection::Ink(adapter) => adapter,
            Connection::Evm(adapter) => adapter,
        }
    }

    /// The swap, liquidity and uniques pallets only exist on Substrate chains
    pub fn substrate(&self) -> Result<&SubstrateAdapter<HttpLedgerClient>, CliError> {
        match self {
            Connection::Substrate(adapter) => Ok(adapter),
            other => Err(CliError::Validation(format!(
                "operation needs a substrate chain, this one is {}",
                other.adapter().backend()
            ))),
        }
    }

    pub fn ink(&self) -> Result<&InkAdapter<HttpLedgerClient>, CliError> {
        match self {
            Connection::Ink(adapter) => Ok(adapter),
            other => Err(CliError::Validation(format!(
                "operation needs an ink chain, this one is {}",
                other.adapter().backend()
            ))),
        }
    }
}

/// Everything a chain command needs, loaded before any network I/O
struct Session {
    chain: ChainConfig,
    secret: SecretFile,
    connection: Connection,
}

impl Session {
    fn open(cli: &Cli, network: &str, pallet: &str) -> Result<Self, CliError> {
        let config = NetworkConfig::load(&cli.config)?;
        let chain = config.chain(network)?.clone();
        let secret = SecretFile::load(&cli.secret)?;
        let connection = Connection::open(&chain, pallet)?;
        info!("Using {} chain {} ({})", chain.backend, network, chain.node_address);
        Ok(Session {
            chain,
            secret,
            connection,
        })
    }
}

fn parse_key(s: &str) -> Result<PublicKey, CliError> {
    Ok(PublicKey::from_hex(s)?)
}

fn print_receipt(receipt: &Receipt) {
    if let Some(envelope) = &receipt.envelope {
        println!("Envelope hash: {}", envelope.hash());
        println!("Nonce: {}", envelope.nonce());
    }
    println!("Result: {:?}", receipt.inclusion);
}

fn print_envelope(label: &str, envelope: &TransactionEnvelope) {
    let payload = envelope.payload();
    let body = json!({
        "nonce": envelope.nonce().to_string(),
        "chainId": envelope.chain_id(),
        "initiator": envelope.initiator().to_wire(),
        "from": envelope.from().to_hex(),
        "op": payload.kind.as_str(),
        "exData": encode_hex(&payload.ex_data),
        "amount": payload.amount.to_string(),
        "hash": envelope.hash().to_hex(),
        "signature": envelope.signature().to_hex(),
    });
    println!("{}: {}", label, serde_json::to_string_pretty(&body).unwrap_or_default());
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match &cli.command {
        Commands::InitConfig { output } => {
            let path = output.as_deref().unwrap_or(&cli.config);
            generate_sample_config().save(path)?;
            info!("Configuration saved to {:?}", path);
            println!("Configuration file created: {}", path.display());
        }

        Commands::Keygen => keygen(&cli.secret)?,

        Commands::Account => {
            let secret = SecretFile::load(&cli.secret)?;
            for account in secret.accounts()? {
                println!("##########################################################");
                println!("Account {}{}", account.index, if account.active { " (active)" } else { "" });
                println!("  Omniverse account:  {}", account.omniverse);
                println!("  Compressed key:     {}", account.compressed);
                println!("  EVM address:        {}", account.evm_address);
            }
            if let Some(mpc) = secret.mpc_key()? {
                println!("MPC account: {}", mpc);
            }
        }

        Commands::Switch { index } => {
            let mut secret = SecretFile::load(&cli.secret)?;
            secret.switch(*index)?;
            secret.save(&cli.secret)?;
            println!("Active key is now {}", index);
        }

        Commands::Transfer { network, pallet, token, to, amount }
        | Commands::Mint { network, pallet, token, to, amount } => {
            let to = parse_key(to)?;
            let amount = parse_amount(amount)?;
            let session = Session::open(&cli, network, pallet)?;
            let ctx = session.secret.signing_context(session.chain.omniverse_chain_id)?;
            let client = OmniverseClient::new(session.connection.adapter(), &ctx);
            let receipt = if matches!(cli.command, Commands::Mint { .. }) {
                client.mint(token, &to, amount).await?
            } else {
                client.transfer(token, &to, amount).await?
            };
            print_receipt(&receipt);
        }

        Commands::Burn { network, pallet, token, amount } => {
            let amount = parse_amount(amount)?;
            let session = Session::open(&cli, network, pallet)?;
            let ctx = session.secret.signing_context(session.chain.omniverse_chain_id)?;
            let client = OmniverseClient::new(session.connection.adapter(), &ctx);
            print_receipt(&client.burn(token, amount).await?);
        }

        Commands::OmniBalance { network, pallet, token, account } => {
            let session = Session::open(&cli, network, pallet)?;
            let ctx = session.secret.signing_context(session.chain.omniverse_chain_id)?;
            let account = match account {
                Some(account) => parse_key(account)?,
                None => *ctx.public_key(),
            };
            let client = OmniverseClient::new(session.connection.adapter(), &ctx);
            println!("Balance: {}", client.omni_balance(token, &account).await?);
        }

        Commands::SwapBalance { network, token, account } => {
            let session = Session::open(&cli, network, "assets")?;
            let ctx = session.secret.signing_context(session.chain.omniverse_chain_id)?;
            let account = match account {
                Some(account) => parse_key(account)?,
                None => *ctx.public_key(),
            };
            let adapter = session.connection.substrate()?;
            println!("Swap balance: {}", adapter.swap_balance(token, &account).await?);
        }

        Commands::Faucet { network, pallet, token, item } => {
            let session = Session::open(&cli, network, pallet)?;
            let public = session.secret.active_secret()?.public_key();
            let body = faucet::request_tokens(
                &session.chain.faucet_service_url,
                &public,
                token,
                pallet,
                item.as_deref(),
            )
            .await?;
            println!("{}", body);
        }

        Commands::CreateToken { network, pallet, token } => {
            let session = Session::open(&cli, network, pallet)?;
            let owner = session.secret.active_secret()?.public_key();
            let inclusion = session
                .connection
                .substrate()?
                .create_token(&owner, token)
                .await?
                .into_result()?;
            println!("Result: {:?}", inclusion);
        }

        Commands::OwnerOf { network, token, item } => {
            let session = Session::open(&cli, network, "uniques")?;
            let owner = session.connection.substrate()?.owner_of(token, item).await?;
            println!("owner: {}", owner);
        }

        Commands::Deposit { network, token, amount } => {
            let amount = parse_amount(amount)?;
            let session = Session::open(&cli, network, "assets")?;
            let ctx = session.secret.signing_context(session.chain.omniverse_chain_id)?;
            let client = OmniverseClient::new(session.connection.substrate()?, &ctx);
            print_receipt(&client.deposit(token, amount).await?);
        }

        Commands::Withdraw { network, token, amount } => {
            let amount = parse_amount(amount)?;
            let session = Session::open(&cli, network, "assets")?;
            let ctx = session.secret.signing_context(session.chain.omniverse_chain_id)?;
            let client = OmniverseClient::new(session.connection.substrate()?, &ctx);
            print_receipt(&client.withdraw(token, amount).await?);
        }

        Commands::AddLiquidity { network, pair, x_token, x_amount, y_token, y_amount } => {
            let x_amount = parse_amount(x_amount)?;
            let y_amount = parse_amount(y_amount)?;
            let session = Session::open(&cli, network, "assets")?;
            let ctx = session.secret.signing_context(session.chain.omniverse_chain_id)?;
            let client = OmniverseClient::new(session.connection.substrate()?, &ctx);
            print_receipt(&client.add_liquidity(pair, x_token, x_amount, y_token, y_amount).await?);
        }

        Commands::SwapX2y { network, pair, amount } | Commands::SwapY2x { network, pair, amount } => {
            let amount = parse_amount(amount)?;
            let session = Session::open(&cli, network, "assets")?;
            let ctx = session.secret.signing_context(session.chain.omniverse_chain_id)?;
            let client = OmniverseClient::new(session.connection.substrate()?, &ctx);
            let receipt = if matches!(cli.command, Commands::SwapX2y { .. }) {
                client.swap_x_to_y(pair, amount).await?
            } else {
                client.swap_y_to_x(pair, amount).await?
            };
            print_receipt(&receipt);
        }

        Commands::GenerateTx { network, x_token, x_amount, y_token, y_amount } => {
            let x_amount = parse_amount(x_amount)?;
            let y_amount = parse_amount(y_amount)?;
            let session = Session::open(&cli, network, "assets")?;
            let ctx = session.secret.signing_context(session.chain.omniverse_chain_id)?;
            let client = OmniverseClient::new(session.connection.substrate()?, &ctx);
            let (x, y) = client.generate_tx_data(x_token, x_amount, y_token, y_amount).await?;
            print_envelope("X", &x);
            print_envelope("Y", &y);
        }

        Commands::Initialize { network, cooling_down, members } => {
            let members = members
                .iter()
                .map(|m| Member::parse(m))
                .collect::<Result<Vec<_>, _>>()?;
            let session = Session::open(&cli, network, "assets")?;
            let cooling_down = cooling_down.or(session.chain.cooling_down).ok_or_else(|| {
                CliError::Validation("cooling down period not given and not configured".to_string())
            })?;
            let inclusion = session
                .connection
                .ink()?
                .initialize(cooling_down, &members)
                .await?
                .into_result()?;
            println!("Result: {:?}", inclusion);
        }
    }

    Ok(())
}

/// Generate a key and append it to the key file, creating the file if needed
fn keygen(path: &Path) -> Result<(), CliError> {
    let mut secret = if path.exists() {
        SecretFile::load(path)?
    } else {
        SecretFile::default()
    };
    let keypair = KeyPair::generate();
    let index = secret.push_key(&keypair.secret);
    secret.save(path)?;

    println!("Generated key {}:", index);
    println!("  Omniverse account: {}", keypair.public.to_hex());
    println!("\nWARNING: Keep your key file safe! Do not share it with anyone.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(backend: Backend, contract: Option<&str>) -> ChainConfig {
        ChainConfig {
            backend,
            node_address: "http://127.0.0.1:9944".to_string(),
            omniverse_chain_id: 1,
            faucet_service_url: String::new(),
            contract_address: contract.map(str::to_string),
            cooling_down: None,
        }
    }

    #[test]
    fn test_connection_per_backend() {
        let substrate = Connection::open(&chain(Backend::Substrate, None), "assets").unwrap();
        assert_eq!(substrate.adapter().backend(), Backend::Substrate);
        assert!(substrate.substrate().is_ok());
        assert!(substrate.ink().is_err());

        let evm = Connection::open(
            &chain(Backend::Evm, Some("0x5fbdb2315678afecb367f032d93f642f64180aa3")),
            "assets",
        )
        .unwrap();
        assert_eq!(evm.adapter().backend(), Backend::Evm);
        assert!(matches!(evm.substrate(), Err(CliError::Validation(_))));
    }

    #[test]
    fn test_contract_backend_needs_address() {
        assert!(matches!(
            Connection::open(&chain(Backend::Ink, None), "assets"),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_keygen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".secret");
        keygen(&path).unwrap();
        keygen(&path).unwrap();
        let secret = SecretFile::load(&path).unwrap();
        assert_eq!(secret.sks.len(), 2);
        assert_eq!(secret.index, 0);
    }
}

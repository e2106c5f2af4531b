use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Omniverse - sign and submit omniverse transactions
#[derive(Parser)]
#[command(name = "omniverse")]
#[command(about = "Omniverse token and swap utilities")]
#[command(version)]
pub struct Cli {
    /// Network configuration file
    #[arg(long, global = true, default_value = "config/default.json")]
    pub config: PathBuf,

    /// Key material file
    #[arg(long, global = true, default_value = ".secret")]
    pub secret: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a sample network configuration
    InitConfig {
        /// Output path, defaults to --config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a key and append it to the key file
    Keygen,

    /// Show the addresses of every key in the key file
    Account,

    /// Make another key the active one
    Switch {
        /// Index into the key list
        index: usize,
    },

    /// Transfer omniverse tokens
    Transfer {
        /// Chain name from the config
        #[arg(short, long)]
        network: String,
        /// Asset pallet (substrate only)
        #[arg(short, long, default_value = "assets")]
        pallet: String,
        /// Token id
        #[arg(short, long)]
        token: String,
        /// Recipient public key hex
        #[arg(long)]
        to: String,
        amount: String,
    },

    /// Mint omniverse tokens
    Mint {
        #[arg(short, long)]
        network: String,
        #[arg(short, long, default_value = "assets")]
        pallet: String,
        #[arg(short, long)]
        token: String,
        /// Recipient public key hex
        #[arg(long)]
        to: String,
        amount: String,
    },

    /// Burn omniverse tokens
    Burn {
        #[arg(short, long)]
        network: String,
        #[arg(short, long, default_value = "assets")]
        pallet: String,
        #[arg(short, long)]
        token: String,
        amount: String,
    },

    /// Query an omniverse token balance
    OmniBalance {
        #[arg(short, long)]
        network: String,
        #[arg(short, long, default_value = "assets")]
        pallet: String,
        #[arg(short, long)]
        token: String,
        /// Account public key hex, defaults to the active key
        #[arg(long)]
        account: Option<String>,
    },

    /// Query a balance held by the swap module
    SwapBalance {
        #[arg(short, long)]
        network: String,
        #[arg(short, long)]
        token: String,
        /// Account public key hex, defaults to the active key
        #[arg(long)]
        account: Option<String>,
    },

    /// Request tokens from the chain's faucet
    Faucet {
        #[arg(short, long)]
        network: String,
        #[arg(short, long, default_value = "assets")]
        pallet: String,
        #[arg(short, long)]
        token: String,
        /// Item id, for non-fungible collections
        #[arg(long)]
        item: Option<String>,
    },

    /// Register a token id owned by the active key
    CreateToken {
        #[arg(short, long)]
        network: String,
        #[arg(short, long, default_value = "assets")]
        pallet: String,
        #[arg(short, long)]
        token: String,
    },

    /// Show the owner of a collection item
    OwnerOf {
        #[arg(short, long)]
        network: String,
        #[arg(short, long)]
        token: String,
        #[arg(long)]
        item: String,
    },

    /// Deposit omniverse tokens into the swap module
    Deposit {
        #[arg(short, long)]
        network: String,
        #[arg(short, long)]
        token: String,
        amount: String,
    },

    /// Withdraw tokens from the swap module
    Withdraw {
        #[arg(short, long)]
        network: String,
        #[arg(short, long)]
        token: String,
        amount: String,
    },

    /// Add liquidity to a trading pair, creating it if needed
    AddLiquidity {
        #[arg(short, long)]
        network: String,
        /// Trading pair id
        #[arg(long)]
        pair: String,
        #[arg(long)]
        x_token: String,
        #[arg(long)]
        x_amount: String,
        #[arg(long)]
        y_token: String,
        #[arg(long)]
        y_amount: String,
    },

    /// Sell token X for token Y
    SwapX2y {
        #[arg(short, long)]
        network: String,
        #[arg(long)]
        pair: String,
        amount: String,
    },

    /// Sell token Y for token X
    SwapY2x {
        #[arg(short, long)]
        network: String,
        #[arg(long)]
        pair: String,
        amount: String,
    },

    /// Print two signed deposit envelopes without submitting them
    GenerateTx {
        #[arg(short, long)]
        network: String,
        #[arg(long)]
        x_token: String,
        #[arg(long)]
        x_amount: String,
        #[arg(long)]
        y_token: String,
        #[arg(long)]
        y_amount: String,
    },

    /// Set the cooling-down period and members of an ink! contract
    Initialize {
        #[arg(short, long)]
        network: String,
        /// Cooling-down period, defaults to the config value
        #[arg(long)]
        cooling_down: Option<u64>,
        /// Member contracts as <chain id>|<address>
        #[arg(long = "member")]
        members: Vec<String>,
    },
}

//! Omniverse Chain - ledger adapters and envelope workflows
//!
//! A [`ChainAdapter`] translates the backend-agnostic
//! [`omniverse_core::TransactionEnvelope`] into one ledger's call shape and
//! opcode numbering. The workflows in [`ops`] drive adapters through a
//! [`LedgerClient`] transport, over HTTP or, with the `test-util` feature,
//! in memory.

pub mod adapter;
pub mod adapters;
pub mod error;
pub mod http;
pub mod ledger;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod nonce;
pub mod ops;
mod wire;

pub use adapter::{
    AddLiquidityRequest, Backend, ChainAdapter, SwapAdapter, SwapDirection, SwapRequest,
};
pub use adapters::{EvmAdapter, InkAdapter, Member, SubstrateAdapter};
pub use error::{ChainError, DispatchError};
pub use http::HttpLedgerClient;
pub use ledger::{InclusionResult, LedgerCall, LedgerClient};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryLedger;
pub use nonce::{NonceKey, NonceReservations, NonceSequencer, Reservation};
pub use ops::{OmniverseClient, Receipt};

pub mod evm;
pub mod ink;
pub mod substrate;

pub use evm::EvmAdapter;
pub use ink::{InkAdapter, Member};
pub use substrate::SubstrateAdapter;

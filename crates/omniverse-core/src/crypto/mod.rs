pub mod hash;
pub mod keys;
pub mod signature;

pub use hash::{keccak256, Hash};
pub use keys::{KeyPair, PublicKey, SecretKey};
pub use signature::{recover, sign, verify, Sig};

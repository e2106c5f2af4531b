use crate::crypto::{KeyPair, PublicKey, SecretKey};
use crate::error::CoreError;
use crate::types::{Fungible, Initiator, OpcodeTable, TransactionEnvelope, UnsignedEnvelope};

/// Everything needed to sign for one process run: the active key, the
/// destination chain id and the swap counterparty key.
///
/// Built once at startup and passed by reference to every operation.
#[derive(Debug, Clone)]
pub struct SigningContext {
    keypair: KeyPair,
    chain_id: u32,
    mpc: Option<PublicKey>,
}

impl SigningContext {
    pub fn new(secret: SecretKey, chain_id: u32, mpc: Option<PublicKey>) -> Self {
        SigningContext {
            keypair: KeyPair::from_secret(secret),
            chain_id,
            mpc,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.keypair.public
    }

    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    /// Counterparty key that receives swap deposits
    pub fn mpc(&self) -> Option<&PublicKey> {
        self.mpc.as_ref()
    }

    /// Build and sign an envelope from this context's key
    pub fn sign_envelope(
        &self,
        nonce: u128,
        initiator: Initiator,
        payload: Fungible,
        table: &OpcodeTable,
    ) -> Result<TransactionEnvelope, CoreError> {
        UnsignedEnvelope::new(nonce, self.chain_id, initiator, self.keypair.public, payload)
            .sign(&self.keypair.secret, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PayloadKind;

    const PALLET: OpcodeTable = OpcodeTable::new("pallet", Some(0), Some(1), Some(2));

    #[test]
    fn test_sign_envelope_uses_context() {
        let secret = SecretKey::generate();
        let ctx = SigningContext::new(secret.clone(), 42, None);
        let envelope = ctx
            .sign_envelope(
                5,
                Initiator::token("TKN"),
                Fungible::new(PayloadKind::Transfer, vec![1u8; 64], 10),
                &PALLET,
            )
            .unwrap();

        assert_eq!(envelope.chain_id(), 42);
        assert_eq!(envelope.from(), &secret.public_key());
        assert_eq!(envelope.nonce(), 5);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secret = SecretKey::generate();
        let ctx = SigningContext::new(secret.clone(), 1, None);
        let rendered = format!("{:?}", ctx);
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains(&secret.to_hex()[2..]));
    }
}

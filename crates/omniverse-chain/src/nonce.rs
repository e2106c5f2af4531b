//! Nonce sequencing
//!
//! [`NonceSequencer`] re-reads the ledger's transaction count on every call
//! and keeps nothing locally. Two calls made before the first envelope is
//! included return the same nonce, and only one of the two envelopes can be
//! accepted. Callers issuing several envelopes for the same
//! `(account, namespace, asset)` must either wait for inclusion in between
//! or opt into [`NonceReservations`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use omniverse_core::PublicKey;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::adapter::ChainAdapter;
use crate::error::ChainError;

/// Stateless view of the ledger's nonce counter
pub struct NonceSequencer<'a, A: ChainAdapter + ?Sized> {
    adapter: &'a A,
}

impl<'a, A: ChainAdapter + ?Sized> NonceSequencer<'a, A> {
    pub fn new(adapter: &'a A) -> Self {
        NonceSequencer { adapter }
    }

    /// Current stored count for the key; never cached, never incremented
    pub async fn next_nonce(
        &self,
        account: &PublicKey,
        namespace: &str,
        asset_id: &str,
    ) -> Result<u128, ChainError> {
        self.adapter.get_nonce(account, namespace, asset_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonceKey {
    pub account: PublicKey,
    pub namespace: String,
    pub asset_id: String,
}

impl NonceKey {
    pub fn new(account: &PublicKey, namespace: &str, asset_id: &str) -> Self {
        NonceKey {
            account: *account,
            namespace: namespace.to_string(),
            asset_id: asset_id.to_string(),
        }
    }
}

/// A nonce handed out by [`NonceReservations::reserve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub key: NonceKey,
    pub nonce: u128,
}

/// Client-side reserved-nonce ledger.
///
/// Unlike [`NonceSequencer`], consecutive reservations for the same key
/// return increasing nonces even before the ledger has included anything.
/// Each key tracks the nonces handed out and not yet confirmed or released;
/// a reservation takes the lowest nonce at or above the ledger's count that
/// is not outstanding. With nothing outstanding it is exactly the ledger
/// count, so abandoned reservations never push later ones out of reach.
/// Each key has its own lock, held across the ledger read so that the
/// read-compare-advance step is atomic per key.
#[derive(Default)]
pub struct NonceReservations {
    slots: RwLock<HashMap<NonceKey, Arc<Mutex<BTreeSet<u128>>>>>,
}

impl NonceReservations {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: &NonceKey) -> Arc<Mutex<BTreeSet<u128>>> {
        if let Some(slot) = self.slots.read().await.get(key) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(BTreeSet::new())))
            .clone()
    }

    async fn existing_slot(&self, key: &NonceKey) -> Option<Arc<Mutex<BTreeSet<u128>>>> {
        self.slots.read().await.get(key).cloned()
    }

    /// Reserve the lowest nonce at or above the ledger's count that no
    /// outstanding reservation holds
    pub async fn reserve<A: ChainAdapter + ?Sized>(
        &self,
        adapter: &A,
        account: &PublicKey,
        namespace: &str,
        asset_id: &str,
    ) -> Result<Reservation, ChainError> {
        let key = NonceKey::new(account, namespace, asset_id);
        let slot = self.slot(&key).await;
        let mut outstanding = slot.lock().await;

        let on_ledger = adapter.get_nonce(account, namespace, asset_id).await?;
        // Nonces below the ledger count are spent
        outstanding.retain(|nonce| *nonce >= on_ledger);

        let mut nonce = on_ledger;
        while outstanding.contains(&nonce) {
            nonce = nonce
                .checked_add(1)
                .ok_or_else(|| ChainError::Validation("nonce space exhausted".to_string()))?;
        }
        outstanding.insert(nonce);

        debug!(
            "Reserved nonce {} for {}/{} (ledger at {}, {} outstanding)",
            nonce,
            namespace,
            asset_id,
            on_ledger,
            outstanding.len()
        );
        Ok(Reservation { key, nonce })
    }

    /// Give back a reservation that will not be submitted or was rejected;
    /// its nonce becomes available again. Returns whether it was outstanding.
    pub async fn release(&self, reservation: &Reservation) -> bool {
        let Some(slot) = self.existing_slot(&reservation.key).await else {
            return false;
        };
        let released = slot.lock().await.remove(&reservation.nonce);
        if released {
            debug!("Released nonce {}", reservation.nonce);
        }
        released
    }

    /// Mark a reservation as included; the ledger count now covers it
    pub async fn confirm(&self, reservation: &Reservation) -> bool {
        let Some(slot) = self.existing_slot(&reservation.key).await else {
            return false;
        };
        let mut outstanding = slot.lock().await;
        outstanding.remove(&reservation.nonce)
    }

    /// Nonces reserved for a key and neither confirmed nor released
    pub async fn outstanding(&self, account: &PublicKey, namespace: &str, asset_id: &str) -> Vec<u128> {
        let key = NonceKey::new(account, namespace, asset_id);
        match self.existing_slot(&key).await {
            Some(slot) => slot.lock().await.iter().copied().collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SubstrateAdapter;
    use crate::memory::MemoryLedger;
    use omniverse_core::KeyPair;

    #[tokio::test]
    async fn test_sequencer_rereads_without_increment() {
        let kp = KeyPair::generate();
        let adapter = SubstrateAdapter::new(MemoryLedger::new(), "assets");
        let sequencer = NonceSequencer::new(&adapter);

        let first = sequencer.next_nonce(&kp.public, "assets", "TKN1").await.unwrap();
        let second = sequencer.next_nonce(&kp.public, "assets", "TKN1").await.unwrap();
        assert_eq!(first, 0);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_reservations_advance_locally() {
        let kp = KeyPair::generate();
        let adapter = SubstrateAdapter::new(MemoryLedger::new(), "assets");
        let reservations = NonceReservations::new();

        let a = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        let b = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        let other = reservations.reserve(&adapter, &kp.public, "assets", "TKN2").await.unwrap();
        assert_eq!(a.nonce, 0);
        assert_eq!(b.nonce, 1);
        assert_eq!(other.nonce, 0);
    }

    #[tokio::test]
    async fn test_released_nonce_is_reused() {
        let kp = KeyPair::generate();
        let adapter = SubstrateAdapter::new(MemoryLedger::new(), "assets");
        let reservations = NonceReservations::new();

        let a = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        let b = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        assert!(reservations.release(&a).await);
        assert!(!reservations.release(&a).await);
        assert_eq!(reservations.outstanding(&kp.public, "assets", "TKN1").await, vec![1]);

        // The gap left by the released nonce is filled first
        let again = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        assert_eq!(again.nonce, 0);

        assert!(reservations.release(&b).await);
        assert!(reservations.release(&again).await);
        let fresh = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        assert_eq!(fresh.nonce, 0);
    }

    #[tokio::test]
    async fn test_abandoned_reservations_pruned_by_ledger() {
        let kp = KeyPair::generate();
        let ledger = Arc::new(MemoryLedger::new());
        let adapter = SubstrateAdapter::new(ledger.clone(), "assets");
        let reservations = NonceReservations::new();

        for _ in 0..3 {
            reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        }
        ledger.set_nonce(&kp.public, "assets", "TKN1", 2).await;

        let next = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        assert_eq!(next.nonce, 3);
        assert_eq!(reservations.outstanding(&kp.public, "assets", "TKN1").await, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_confirmed_reservation_falls_back_to_ledger() {
        let kp = KeyPair::generate();
        let ledger = Arc::new(MemoryLedger::new());
        let adapter = SubstrateAdapter::new(ledger.clone(), "assets");
        let reservations = NonceReservations::new();

        let a = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        assert!(reservations.confirm(&a).await);
        ledger.set_nonce(&kp.public, "assets", "TKN1", 1).await;
        assert!(reservations.outstanding(&kp.public, "assets", "TKN1").await.is_empty());

        let b = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        assert_eq!(b.nonce, 1);
    }

    #[tokio::test]
    async fn test_ledger_ahead_of_local() {
        let kp = KeyPair::generate();
        let ledger = Arc::new(MemoryLedger::new());
        let adapter = SubstrateAdapter::new(ledger.clone(), "assets");
        let reservations = NonceReservations::new();

        reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        ledger.set_nonce(&kp.public, "assets", "TKN1", 5).await;
        let next = reservations.reserve(&adapter, &kp.public, "assets", "TKN1").await.unwrap();
        assert_eq!(next.nonce, 5);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_are_distinct() {
        let kp = KeyPair::generate();
        let adapter = Arc::new(SubstrateAdapter::new(MemoryLedger::new(), "assets"));
        let reservations = Arc::new(NonceReservations::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let adapter = adapter.clone();
            let reservations = reservations.clone();
            let account = kp.public;
            handles.push(tokio::spawn(async move {
                reservations
                    .reserve(adapter.as_ref(), &account, "assets", "TKN1")
                    .await
                    .unwrap()
                    .nonce
            }));
        }

        let mut nonces = Vec::new();
        for handle in handles {
            nonces.push(handle.await.unwrap());
        }
        nonces.sort();
        assert_eq!(nonces, (0..8).collect::<Vec<u128>>());
    }
}

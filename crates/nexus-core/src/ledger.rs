//! Audit Ledger
//!
//! Append-only, hash-linked sequence of assessment records.
//!
//! Each block's `hash` is the hex SHA-256 of the canonical JSON (sorted keys,
//! no whitespace) of `{data, index, previousHash, timestamp}`. Block `i`
//! stores block `i-1`'s hash as `previousHash`; genesis stores `"0"`.
//!
//! Hashes are restored verbatim on load and never recomputed, so a tampered
//! file fails [`AuditLedger::verify`] instead of being silently re-sealed.

use crate::{NexusError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// `previousHash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// One immutable ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditBlock {
    pub index: u64,
    /// Seconds since the Unix epoch, microsecond precision
    pub timestamp: f64,
    pub data: Value,
    pub previous_hash: String,
    pub hash: String,
}

impl AuditBlock {
    fn sealed(index: u64, timestamp: f64, data: Value, previous_hash: String) -> Self {
        let mut block = AuditBlock {
            index,
            timestamp,
            data,
            previous_hash,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    fn genesis() -> Self {
        Self::sealed(
            0,
            now_seconds(),
            json!({"message": "Genesis Block"}),
            GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    /// Digest over every field except `hash`
    pub fn compute_hash(&self) -> String {
        let body = json!({
            "data": self.data,
            "index": self.index,
            "previousHash": self.previous_hash,
            "timestamp": self.timestamp,
        });
        let mut canonical = String::new();
        write_canonical(&body, &mut canonical);
        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }

    pub fn is_sealed(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Compact JSON with object keys sorted at every level
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Hash-linked audit chain, optionally persisted to a JSON file
///
/// `append` holds the write lock across read-head, seal, push and persist, so
/// concurrent appends are strictly ordered; `verify` and `all` take the read
/// lock and never observe a half-finished append.
///
/// The file is only written when the chain changed, so opening and verifying
/// a chain leaves its bytes untouched.
#[derive(Debug)]
pub struct AuditLedger {
    path: Option<PathBuf>,
    chain: RwLock<Vec<AuditBlock>>,
    /// In-memory chain differs from the file
    dirty: AtomicBool,
}

impl AuditLedger {
    /// Ledger that lives only in memory
    pub fn in_memory() -> Self {
        AuditLedger {
            path: None,
            chain: RwLock::new(vec![AuditBlock::genesis()]),
            dirty: AtomicBool::new(false),
        }
    }

    /// Open or create a ledger file
    ///
    /// A missing, unparseable or empty file is replaced by a fresh chain
    /// holding only genesis. The corruption is logged, not returned.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let loaded = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<AuditBlock>>(&text) {
                Ok(chain) if !chain.is_empty() => Some(chain),
                Ok(_) => {
                    log::warn!("Audit chain {} is empty; starting a new chain", path.display());
                    None
                }
                Err(e) => {
                    log::warn!(
                        "Audit chain {} is corrupted ({}); starting a new chain",
                        path.display(),
                        e
                    );
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No audit chain at {}; creating genesis", path.display());
                None
            }
            Err(e) => return Err(NexusError::io(&path, e)),
        };

        let ledger = match loaded {
            Some(chain) => {
                log::info!("Loaded audit chain with {} blocks from {}", chain.len(), path.display());
                AuditLedger {
                    path: Some(path),
                    chain: RwLock::new(chain),
                    dirty: AtomicBool::new(false),
                }
            }
            None => {
                let ledger = AuditLedger {
                    path: Some(path),
                    chain: RwLock::new(vec![AuditBlock::genesis()]),
                    dirty: AtomicBool::new(true),
                };
                ledger.flush()?;
                ledger
            }
        };
        Ok(ledger)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<AuditBlock>> {
        self.chain.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AuditBlock>> {
        self.chain.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a payload and return the new block's hash
    ///
    /// The chain is persisted before returning. If persisting fails the block
    /// is removed again and the error is returned.
    pub fn append(&self, payload: Value) -> Result<String> {
        let mut chain = self.write();
        if chain.is_empty() {
            chain.push(AuditBlock::genesis());
        }
        let (index, previous_hash) = match chain.last() {
            Some(head) => (head.index + 1, head.hash.clone()),
            None => (1, GENESIS_PREVIOUS_HASH.to_string()),
        };

        let block = AuditBlock::sealed(index, now_seconds(), payload, previous_hash);
        let hash = block.hash.clone();
        chain.push(block);
        self.dirty.store(true, Ordering::SeqCst);

        if let Err(e) = self.persist(&chain) {
            chain.pop();
            self.dirty.store(false, Ordering::SeqCst);
            return Err(e);
        }
        log::debug!("Appended audit block {} ({})", index, hash);
        Ok(hash)
    }

    /// Serialize a record and append it
    pub fn append_record<T: Serialize>(&self, record: &T) -> Result<String> {
        self.append(serde_json::to_value(record)?)
    }

    /// Check genesis and every hash link
    pub fn verify(&self) -> bool {
        verify_chain(&self.read())
    }

    /// Snapshot of the whole chain
    pub fn all(&self) -> Vec<AuditBlock> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn head_hash(&self) -> Option<String> {
        self.read().last().map(|b| b.hash.clone())
    }

    /// Write the chain to disk if it changed since the last write
    ///
    /// No-op in memory and for a chain that was only read or verified.
    pub fn flush(&self) -> Result<()> {
        if !self.dirty.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.persist(&self.read())
    }

    /// Atomically replace the chain file via a temp file and rename
    fn persist(&self, chain: &[AuditBlock]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| NexusError::io(parent, e))?;
        }
        let text = serde_json::to_string_pretty(chain)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, text).map_err(|e| NexusError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| NexusError::io(path, e))?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Genesis shape, then for every later block its seal and its link
pub fn verify_chain(chain: &[AuditBlock]) -> bool {
    let Some(genesis) = chain.first() else {
        return false;
    };
    if genesis.index != 0 || genesis.previous_hash != GENESIS_PREVIOUS_HASH || !genesis.is_sealed() {
        return false;
    }
    chain.windows(2).all(|pair| {
        let (prev, block) = (&pair[0], &pair[1]);
        block.is_sealed() && block.previous_hash == prev.hash
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_genesis_invariant() {
        let ledger = AuditLedger::in_memory();
        let chain = ledger.all();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].index, 0);
        assert_eq!(chain[0].previous_hash, "0");
        assert_eq!(chain[0].data, json!({"message": "Genesis Block"}));
        assert!(ledger.verify());
    }

    #[test]
    fn test_append_links_blocks() {
        let ledger = AuditLedger::in_memory();
        let genesis_hash = ledger.head_hash().unwrap();
        let h1 = ledger.append(json!({"drugs": ["warfarin"]})).unwrap();
        let h2 = ledger.append(json!({"drugs": ["aspirin"]})).unwrap();

        let chain = ledger.all();
        assert_eq!(chain[1].previous_hash, genesis_hash);
        assert_eq!(chain[1].hash, h1);
        assert_eq!(chain[2].previous_hash, h1);
        assert_eq!(chain[2].index, 2);
        assert_eq!(ledger.head_hash(), Some(h2));
        assert!(ledger.verify());
    }

    #[test]
    fn test_payload_tamper_detected() {
        let ledger = AuditLedger::in_memory();
        ledger.append(json!({"global_risk": 0.8})).unwrap();
        ledger.write()[1].data = json!({"global_risk": 0.1});
        assert!(!ledger.verify());
    }

    #[test]
    fn test_genesis_tamper_detected() {
        let ledger = AuditLedger::in_memory();
        ledger.write()[0].data = json!({"message": "Not Genesis"});
        assert!(!ledger.verify());
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let mut out = String::new();
        write_canonical(&json!({"b": {"z": 1, "a": [true, null]}, "a": "x"}), &mut out);
        assert_eq!(out, r#"{"a":"x","b":{"a":[true,null],"z":1}}"#);
    }

    #[test]
    fn test_persist_and_reload_preserves_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit_chain.json");

        let ledger = AuditLedger::open(&path).unwrap();
        ledger.append(json!({"drugs": ["warfarin", "aspirin"], "global_risk": 1.0})).unwrap();
        let before = ledger.all();
        drop(ledger);

        let reopened = AuditLedger::open(&path).unwrap();
        assert_eq!(reopened.all(), before);
        assert!(reopened.verify());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"previousHash\""));
    }

    #[test]
    fn test_computed_floats_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit_chain.json");

        let ledger = AuditLedger::open(&path).unwrap();
        ledger.append(json!({"global_risk": 1.1177323570150615_f64})).unwrap();
        ledger.append(json!({"global_risk": 0.24563485157606918_f64})).unwrap();
        ledger.append(json!({"global_risk": (0.65_f64 * 1.3).min(1.0)})).unwrap();
        let before = ledger.all();
        drop(ledger);

        let reopened = AuditLedger::open(&path).unwrap();
        assert_eq!(reopened.all(), before);
        assert!(reopened.verify());
    }

    #[test]
    fn test_verify_and_flush_leave_tampered_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit_chain.json");

        let ledger = AuditLedger::open(&path).unwrap();
        ledger.append(json!({"drugs": ["warfarin", "aspirin"]})).unwrap();
        drop(ledger);

        let text = std::fs::read_to_string(&path).unwrap().replace("aspirin", "acetaminophen");
        std::fs::write(&path, &text).unwrap();

        let reopened = AuditLedger::open(&path).unwrap();
        assert!(!reopened.verify());
        reopened.flush().unwrap();
        drop(reopened);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn test_corrupted_file_resets_to_genesis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit_chain.json");
        std::fs::write(&path, "{ not json").unwrap();

        let ledger = AuditLedger::open(&path).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.verify());
    }

    #[test]
    fn test_missing_fields_reset_to_genesis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit_chain.json");
        std::fs::write(&path, r#"[{"index": 0, "data": {}}]"#).unwrap();

        let ledger = AuditLedger::open(&path).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.all()[0].previous_hash, "0");
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let path = data_dir.join("audit_chain.json");
        let ledger = AuditLedger::open(&path).unwrap();

        // a regular file where the data directory should be
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, b"blocker").unwrap();

        assert!(ledger.append(json!({"drugs": []})).is_err());
        assert_eq!(ledger.len(), 1);
        assert!(ledger.verify());
    }

    #[test]
    fn test_concurrent_appends_stay_linked() {
        let ledger = Arc::new(AuditLedger::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        ledger.append(json!({"thread": t, "i": i})).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let chain = ledger.all();
        assert_eq!(chain.len(), 81);
        assert!(chain.iter().enumerate().all(|(i, b)| b.index == i as u64));
        assert!(ledger.verify());
    }

    fn flip_hex(s: &str, pos: usize) -> String {
        let mut bytes = s.as_bytes().to_vec();
        let pos = pos % bytes.len();
        bytes[pos] = if bytes[pos] == b'a' { b'b' } else { b'a' };
        String::from_utf8(bytes).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_single_byte_flip_detected(
            payloads in proptest::collection::vec(any::<u32>(), 1..8),
            target in any::<proptest::sample::Index>(),
            pos in 0usize..64,
            in_link in any::<bool>(),
        ) {
            let ledger = AuditLedger::in_memory();
            for p in &payloads {
                ledger.append(json!({"value": p})).unwrap();
            }
            prop_assert!(ledger.verify());

            {
                let mut chain = ledger.write();
                let i = target.index(chain.len());
                let block = &mut chain[i];
                if in_link {
                    block.previous_hash = flip_hex(&block.previous_hash, pos);
                } else {
                    block.hash = flip_hex(&block.hash, pos);
                }
            }
            prop_assert!(!ledger.verify());
        }

        #[test]
        fn prop_float_payloads_verify_after_reopen(
            payloads in proptest::collection::vec(
                (proptest::num::f64::NORMAL, 0.0f64..1.0),
                1..6,
            ),
        ) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("audit_chain.json");

            let ledger = AuditLedger::open(&path).unwrap();
            for (value, severity) in &payloads {
                ledger.append(json!({
                    "value": value,
                    "severity": severity,
                    "amplified": (severity * 1.3).min(1.0),
                })).unwrap();
            }
            let before = ledger.all();
            drop(ledger);

            let reopened = AuditLedger::open(&path).unwrap();
            prop_assert_eq!(reopened.all(), before);
            prop_assert!(reopened.verify());
        }
    }
}

//! Collaborator implementations: in-memory ones for tests and one-shot runs,
//! and a RocksDB-backed record store behind the `storage-rocksdb` feature.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

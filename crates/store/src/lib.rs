//! Record store implementations for WalletKit.
//!
//! The core crate defines narrow async store traits; this crate provides
//! concrete backends. [`MemoryStore`] is the in-process implementation used
//! by tests and by embedders that persist through their own snapshotting.

pub mod memory;

pub use memory::MemoryStore;

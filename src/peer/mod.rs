//! Peer set subsystem.
//!
//! # Data Flow
//! ```text
//! Agent config ([[peers]])  ──reload──▶ SharedDirectory (arc-swap)
//! Peers file (TOML)         ──per call─▶ FileDirectory
//!                                           │
//!                                           ▼
//!                              PeerDirectory::peers()
//!                                           │
//!                                           ▼
//!                              PeerHealthPoller (one cycle)
//! ```
//!
//! # Design Decisions
//! - Membership is decided elsewhere; directories only report it
//! - A directory call returns an owned snapshot, immutable for the cycle
//! - The local agent never appears in its own peer set

pub mod directory;
pub mod file;
pub mod types;

pub use directory::{DirectoryError, PeerDirectory, SharedDirectory, StaticDirectory};
pub use file::FileDirectory;
pub use types::Peer;

//! # Mempool Gossip Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── dissemination.rs  # broadcast, sender dedup, catch-up, cleanup
//!     ├── protocol.rs       # inbound batches and protocol violations
//!     └── lifecycle.rs      # peer ids, start/stop, disabled broadcast
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gossip-tests
//! cargo test -p gossip-tests integration::protocol::
//! ```

#![allow(dead_code)]

//! User storage.
//!
//! The provisioning service only talks to storage through the [`UserStore`]
//! trait. [`MemoryUserStore`] is the bundled implementation used by the
//! server binary and the test suite.

mod error;
pub mod memory;
pub mod repos;

pub use error::*;
pub use memory::MemoryUserStore;
pub use repos::UserStore;

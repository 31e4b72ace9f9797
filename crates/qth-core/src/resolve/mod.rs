//! Resolution of directories and topic behaviours from retained listings.
//!
//! Nothing is cached: each call subscribes to the listing topics it needs,
//! waits for their retained snapshots, and unsubscribes again before
//! returning, whether it succeeded or not.

mod directory;
mod leaf;

pub use directory::{Directory, resolve};
pub use leaf::{detect, verify};

#[cfg(test)]
mod tests;

//! Integration test common infrastructure.
//!
//! Provides a scripted IRC server for ith to connect to, and a helper that
//! runs the `ith` binary against it.

pub mod process;
pub mod server;

#[allow(unused_imports)]
pub use process::IthProcess;
#[allow(unused_imports)]
pub use server::{FakeIrcServer, ServerConnection, parse_line};

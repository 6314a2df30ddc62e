#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! sw-providers: the SBOM Producer and Vulnerability Matcher contracts (spec §4.6),
//! plus process-exec adapters around a `syft`-shaped and a `grype`-shaped CLI.
//!
//! Neither adapter pulls from a remote registry or ships a bundled scanner;
//! both shell out to a binary the host is expected to provide, the same way
//! the runtime watcher shells out to its own agent CLI rather than linking
//! a client library.

mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
mod sbom;
mod vuln;

pub use error::{ProviderError, Result};
pub use sbom::{ProduceContext, SbomProducer, SyftProducer};
pub use vuln::{DbInfo, GrypeMatcher, VulnMatcher};

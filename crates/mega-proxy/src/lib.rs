//! Deterministic proxy factory and permissioned execution proxy for the `MegaETH` EVM.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod constants;

mod address;
pub use address::*;

mod error;
pub use error::*;

mod factory;
pub use factory::*;

mod host;
pub use host::*;

mod interfaces;
pub use interfaces::*;

mod memory;
pub use memory::*;

mod permission;
pub use permission::*;

mod proxy;
pub use proxy::*;

mod seed;
pub use seed::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

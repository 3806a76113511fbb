//! Shared types for the Kolab directory libraries. These are the names, constants and
//! errors that a consumer of the directory layer needs without pulling in the server
//! library itself.

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![allow(clippy::unreachable)]

pub mod attribute;
pub mod constants;
pub mod internal;

//! The Kolab directory library. This maps typed Kolab objects (users, groups, shared folders,
//! administrators) onto entries of a hierarchical directory, and provides the criteria
//! language that compiles to and from directory filter strings.

#![deny(warnings)]
#![recursion_limit = "512"]
#![warn(unused_extern_crates)]
// Enable some groups of clippy lints.
#![deny(clippy::suspicious)]
#![deny(clippy::perf)]
// Specific lints to enforce.
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::manual_let_else)]
#![allow(clippy::unreachable)]

#[macro_use]
extern crate tracing;
#[macro_use]
extern crate lazy_static;

pub mod be;
pub mod config;
pub mod entry;
pub mod filter;
pub mod object;
pub mod resolver;
pub mod schema;
pub mod session;
#[cfg(any(test, feature = "test"))]
pub mod testkit;

/// A prelude of imports that should be imported by all other modules to
/// help make imports cleaner.
pub mod prelude {
    pub use kolab_proto::attribute::*;
    pub use kolab_proto::constants::*;
    pub use kolab_proto::internal::{AuthError, FilterError, OperationError};
    pub use sketching::{
        admin_debug, admin_error, admin_info, filter_trace, filter_warn, request_info,
        request_trace, request_warn, security_debug, security_error, security_info,
    };

    pub use crate::be::{Backend, SearchParams, SearchScope};
    pub use crate::entry::{Eattrs, Entry};
    pub use crate::filter::{
        c_and, c_begins, c_eq, c_not, c_op, c_or, c_pres, Criteria, Leaf, Operator,
    };
    pub use crate::schema::ObjectType;
    pub use crate::session::{DirectorySession, ResultArity};
}

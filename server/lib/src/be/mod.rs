//! The backend is the interface to the directory itself. The session compiles every
//! query to a wire filter and hands it to a [`Backend`], which may evaluate it remotely
//! or, with the [`memory`] backend, parse it back and evaluate it in process.

use crate::prelude::*;

pub mod eval;
pub mod memory;

pub use self::memory::{MemoryBackend, MemoryStore, MemoryStoreReadTxn};

/// How far below the search base a search reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Only the base entry.
    Base,
    /// Direct children of the base.
    One,
    /// The base and everything below it.
    #[default]
    Sub,
}

impl SearchScope {
    /// Dn comparison is case insensitive.
    pub fn contains(self, base: &str, dn: &str) -> bool {
        let base = base.trim().to_lowercase();
        let dn = dn.trim().to_lowercase();

        match self {
            SearchScope::Base => dn == base,
            SearchScope::Sub => dn == base || dn.ends_with(&format!(",{}", base)),
            SearchScope::One => dn
                .strip_suffix(&format!(",{}", base))
                .map(|rdn| !rdn.is_empty() && !has_unescaped_comma(rdn))
                .unwrap_or(false),
        }
    }
}

fn has_unescaped_comma(rdn: &str) -> bool {
    let mut escaped = false;
    for c in rdn.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Attributes to return. Empty means all of them.
    pub attributes: Vec<String>,
    pub scope: SearchScope,
}

impl SearchParams {
    pub fn with_attributes(attributes: &[&str]) -> Self {
        SearchParams {
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            scope: SearchScope::Sub,
        }
    }
}

pub trait Backend {
    fn bind(&mut self, dn: &str, pw: &str) -> Result<(), OperationError>;

    fn unbind(&mut self);

    fn read(&self, dn: &str, attrs: &[String]) -> Result<Entry, OperationError>;

    fn search(
        &self,
        filter: &str,
        params: &SearchParams,
        base: Option<&str>,
    ) -> Result<Vec<Entry>, OperationError>;

    /// Create the entry, or replace it entirely if it exists.
    fn save(&mut self, dn: &str, attrs: Eattrs) -> Result<(), OperationError>;

    fn delete(&mut self, dn: &str) -> Result<(), OperationError>;
}

//! An in process directory. Entries live in a transactional [`BptreeMap`], so every
//! search sees one consistent snapshot and every write is committed atomically.
//!
//! Filters handed to this backend are parsed back into criteria and run through the
//! [evaluator](super::eval), which makes it a faithful stand in for a real directory
//! in tests. A read or search checks the bound principal and reads its entries through
//! the same read transaction.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use concread::bptree::{BptreeMap, BptreeMapReadTxn};
use serde::Deserialize;

use crate::be::eval::evaluate;
use crate::filter::{parse_with_charset, Charset};
use crate::prelude::*;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureValue {
    Many(Vec<String>),
    One(String),
}

impl From<FixtureValue> for Vec<String> {
    fn from(v: FixtureValue) -> Self {
        match v {
            FixtureValue::Many(vs) => vs,
            FixtureValue::One(v) => vec![v],
        }
    }
}

/// One entry of a json fixture, `{ "dn": "...", "data": { "attr": ["v"] } }`.
#[derive(Debug, Deserialize)]
struct FixtureEntry {
    dn: Option<String>,
    #[serde(default)]
    data: BTreeMap<String, FixtureValue>,
}

fn dn_key(dn: &str) -> String {
    dn.trim().to_lowercase()
}

/// A consistent view of a [`MemoryStore`] that later writes don't disturb.
pub struct MemoryStoreReadTxn<'a> {
    inner: BptreeMapReadTxn<'a, String, Entry>,
}

impl MemoryStoreReadTxn<'_> {
    pub fn get(&self, dn: &str) -> Option<&Entry> {
        self.inner.get(&dn_key(dn))
    }

    pub fn contains(&self, dn: &str) -> bool {
        self.inner.contains_key(&dn_key(dn))
    }

    /// Every entry, in dn order.
    pub fn snapshot(&self) -> Vec<Entry> {
        self.inner.iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The entries of a directory, keyed by their normalised dn.
pub struct MemoryStore {
    entries: BptreeMap<String, Entry>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            entries: BptreeMap::new(),
        }
    }

    /// Load a store from a json fixture. Scalar values are accepted and become single
    /// valued attributes.
    pub fn from_fixture_str(json: &str) -> Result<Self, OperationError> {
        let fixture: BTreeMap<String, FixtureEntry> = serde_json::from_str(json).map_err(|e| {
            admin_error!(?e, "unable to parse directory fixture");
            OperationError::FixtureError(e.to_string())
        })?;

        let store = MemoryStore::new();
        {
            let mut wr = store.entries.write();
            for (key, fe) in fixture {
                let dn = fe.dn.unwrap_or(key);
                let e = Entry::from_attrs(
                    &dn,
                    fe.data.into_iter().map(|(k, v)| (k, Vec::<String>::from(v))),
                );
                wr.insert(dn_key(&dn), e);
            }
            wr.commit();
        }
        admin_debug!(entries = store.len(), "loaded directory fixture");
        Ok(store)
    }

    pub fn from_fixture_path<P: AsRef<Path>>(path: P) -> Result<Self, OperationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            admin_error!(?e, "unable to read fixture {:?}", path);
            OperationError::FixtureError(format!("{:?}: {}", path, e))
        })?;
        Self::from_fixture_str(&contents)
    }

    pub fn read(&self) -> MemoryStoreReadTxn<'_> {
        MemoryStoreReadTxn {
            inner: self.entries.read(),
        }
    }

    pub fn get(&self, dn: &str) -> Option<Entry> {
        self.read().get(dn).cloned()
    }

    pub fn contains(&self, dn: &str) -> bool {
        self.read().contains(dn)
    }

    pub fn snapshot(&self) -> Vec<Entry> {
        self.read().snapshot()
    }

    pub fn insert(&self, entry: Entry) {
        let mut wr = self.entries.write();
        wr.insert(dn_key(entry.get_dn()), entry);
        wr.commit();
    }

    pub fn remove(&self, dn: &str) -> bool {
        let mut wr = self.entries.write();
        let removed = wr.remove(&dn_key(dn)).is_some();
        wr.commit();
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`Backend`] over a shared [`MemoryStore`].
pub struct MemoryBackend {
    store: Arc<MemoryStore>,
    bound: Option<String>,
    no_anonymous_bind: bool,
    charset: Charset,
}

impl MemoryBackend {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        MemoryBackend {
            store,
            bound: None,
            no_anonymous_bind: false,
            charset: Charset::default(),
        }
    }

    pub fn set_no_anonymous_bind(mut self, no_anonymous_bind: bool) -> Self {
        self.no_anonymous_bind = no_anonymous_bind;
        self
    }

    /// The charset escaped filter values are decoded with.
    pub fn set_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn bound_dn(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    fn check_bound(&self, txn: &MemoryStoreReadTxn<'_>) -> Result<(), OperationError> {
        match self.bound.as_deref() {
            None => Err(OperationError::NotAuthenticated),
            // Anonymous
            Some("") => Ok(()),
            Some(dn) if txn.contains(dn) => Ok(()),
            Some(dn) => {
                security_info!(%dn, "bound principal no longer exists");
                Err(OperationError::SessionExpired)
            }
        }
    }
}

impl Backend for MemoryBackend {
    fn bind(&mut self, dn: &str, pw: &str) -> Result<(), OperationError> {
        self.bound = None;

        if dn.is_empty() {
            if self.no_anonymous_bind {
                security_info!("rejecting anonymous bind");
                return Err(OperationError::Authentication(
                    AuthError::AnonymousNotAllowed,
                ));
            }
            self.bound = Some(String::new());
            return Ok(());
        }

        let entry = self.store.get(dn).ok_or_else(|| {
            security_info!(%dn, "bind to missing principal");
            OperationError::Authentication(AuthError::NoSuchPrincipal(dn.to_string()))
        })?;

        let stored_pw = entry
            .get_ava_single(Attribute::UserPassword.as_str())
            .ok_or_else(|| {
                security_info!(%dn, "principal has no password");
                OperationError::Authentication(AuthError::NoPassword(dn.to_string()))
            })?;

        if stored_pw != pw {
            security_info!(%dn, "incorrect password");
            return Err(OperationError::Authentication(
                AuthError::InvalidCredentials(dn.to_string()),
            ));
        }

        security_debug!(%dn, "bind success");
        self.bound = Some(dn.to_string());
        Ok(())
    }

    fn unbind(&mut self) {
        self.bound = None;
    }

    fn read(&self, dn: &str, attrs: &[String]) -> Result<Entry, OperationError> {
        let txn = self.store.read();
        self.check_bound(&txn)?;
        txn.get(dn)
            .map(|e| e.reduce_attributes(attrs))
            .ok_or_else(|| OperationError::NoSuchObject(dn.to_string()))
    }

    #[instrument(level = "debug", skip_all)]
    fn search(
        &self,
        filter: &str,
        params: &SearchParams,
        base: Option<&str>,
    ) -> Result<Vec<Entry>, OperationError> {
        let txn = self.store.read();
        self.check_bound(&txn)?;
        request_trace!(%filter, ?base, "memory search");

        let crit = parse_with_charset(filter, self.charset)?;
        let snapshot = txn.snapshot();
        let mut results = evaluate(&crit, &snapshot, &params.attributes)?;

        if let Some(base) = base {
            results.retain(|e| params.scope.contains(base, e.get_dn()));
        }
        Ok(results)
    }

    fn save(&mut self, dn: &str, attrs: Eattrs) -> Result<(), OperationError> {
        self.check_bound(&self.store.read())?;
        self.store.insert(Entry::from_attrs(dn, attrs));
        Ok(())
    }

    fn delete(&mut self, dn: &str) -> Result<(), OperationError> {
        self.check_bound(&self.store.read())?;
        if self.store.remove(dn) {
            Ok(())
        } else {
            Err(OperationError::NoSuchObject(dn.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "cn=admin,dc=example,dc=com": {
            "dn": "cn=admin,dc=example,dc=com",
            "data": {
                "objectClass": ["top", "person"],
                "cn": "admin",
                "userPassword": "secret"
            }
        },
        "cn=nopass,dc=example,dc=com": {
            "dn": "cn=nopass,dc=example,dc=com",
            "data": { "objectClass": ["top"] }
        },
        "cn=other,dc=example,dc=org": {
            "dn": "cn=other,dc=example,dc=org",
            "data": { "objectClass": ["top"] }
        }
    }"#;

    fn backend() -> MemoryBackend {
        sketching::test_init();
        let store = MemoryStore::from_fixture_str(FIXTURE).expect("invalid fixture");
        MemoryBackend::new(Arc::new(store))
    }

    #[test]
    fn test_fixture_scalars_become_lists() {
        let be = backend();
        let e = be
            .store()
            .get("CN=admin,dc=example,dc=com")
            .expect("missing entry");
        assert_eq!(e.get_ava("cn"), Some(&["admin".to_string()][..]));
        assert_eq!(be.store().len(), 3);

        assert_eq!(
            MemoryStore::from_fixture_str("[1, 2]").map(|s| s.len()),
            Err(OperationError::FixtureError(String::new()))
        );
    }

    #[test]
    fn test_fixture_from_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, FIXTURE).expect("write fixture");
        let store = MemoryStore::from_fixture_path(&path).expect("invalid fixture");
        assert!(store.contains("cn=nopass,dc=example,dc=com"));

        assert!(MemoryStore::from_fixture_path(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_bind_states() {
        let mut be = backend();
        assert_eq!(
            be.read("cn=admin,dc=example,dc=com", &[]),
            Err(OperationError::NotAuthenticated)
        );

        assert!(matches!(
            be.bind("cn=missing,dc=example,dc=com", "x"),
            Err(OperationError::Authentication(AuthError::NoSuchPrincipal(_)))
        ));
        assert!(matches!(
            be.bind("cn=nopass,dc=example,dc=com", "x"),
            Err(OperationError::Authentication(AuthError::NoPassword(_)))
        ));
        assert!(matches!(
            be.bind("cn=admin,dc=example,dc=com", "wrong"),
            Err(OperationError::Authentication(AuthError::InvalidCredentials(_)))
        ));
        assert!(be.bound_dn().is_none());

        assert!(be.bind("cn=admin,dc=example,dc=com", "secret").is_ok());
        assert_eq!(be.bound_dn(), Some("cn=admin,dc=example,dc=com"));

        be.unbind();
        assert!(be.bound_dn().is_none());

        assert!(be.bind("", "").is_ok());
        assert!(be.read("cn=admin,dc=example,dc=com", &[]).is_ok());

        let mut be = backend().set_no_anonymous_bind(true);
        assert!(matches!(
            be.bind("", ""),
            Err(OperationError::Authentication(AuthError::AnonymousNotAllowed))
        ));
    }

    #[test]
    fn test_bind_expires_with_principal() {
        let mut be = backend();
        be.bind("cn=admin,dc=example,dc=com", "secret")
            .expect("bind failed");
        be.delete("cn=admin,dc=example,dc=com")
            .expect("delete failed");
        assert_eq!(
            be.read("cn=nopass,dc=example,dc=com", &[]),
            Err(OperationError::SessionExpired)
        );
    }

    #[test]
    fn test_search_scoped_to_base() {
        let mut be = backend();
        be.bind("", "").expect("bind failed");

        let all = be
            .search("(objectClass=top)", &SearchParams::default(), None)
            .expect("search failed");
        assert_eq!(all.len(), 3);

        let scoped = be
            .search(
                "(objectClass=top)",
                &SearchParams::with_attributes(&["cn"]),
                Some("dc=example,dc=com"),
            )
            .expect("search failed");
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|e| e.get_attrs().len() <= 1));

        assert!(matches!(
            be.search("objectClass=top", &SearchParams::default(), None),
            Err(OperationError::FilterSyntax(FilterError::NotEnclosed(_)))
        ));
    }

    #[test]
    fn test_save_replaces_and_delete() {
        let mut be = backend();
        be.bind("", "").expect("bind failed");

        let mut attrs = Eattrs::new();
        attrs.insert(fold_attr("cn"), vec!["new".to_string()]);
        be.save("cn=new,dc=example,dc=com", attrs)
            .expect("save failed");

        let mut attrs = Eattrs::new();
        attrs.insert(fold_attr("sn"), vec!["replaced".to_string()]);
        be.save("cn=new,dc=example,dc=com", attrs)
            .expect("save failed");

        let e = be
            .read("cn=new,dc=example,dc=com", &[])
            .expect("read failed");
        assert!(!e.attribute_pres("cn"));
        assert_eq!(e.get_ava_single("sn"), Some("replaced"));

        be.delete("cn=new,dc=example,dc=com")
            .expect("delete failed");
        assert_eq!(
            be.delete("cn=new,dc=example,dc=com"),
            Err(OperationError::NoSuchObject(String::new()))
        );
    }

    #[test]
    fn test_read_txn_is_stable() {
        let mut be = backend();
        be.bind("cn=admin,dc=example,dc=com", "secret")
            .expect("bind failed");

        let store = be.store().clone();
        let txn = store.read();
        be.delete("cn=admin,dc=example,dc=com")
            .expect("delete failed");

        // The open transaction still sees the principal and its entry together.
        assert!(txn.contains("cn=admin,dc=example,dc=com"));
        assert!(be.check_bound(&txn).is_ok());
        assert_eq!(
            txn.get("cn=admin,dc=example,dc=com")
                .and_then(|e| e.get_ava_single("cn")),
            Some("admin")
        );
        assert_eq!(txn.len(), 3);
        drop(txn);

        assert!(!be.store().contains("cn=admin,dc=example,dc=com"));
        assert_eq!(
            be.check_bound(&be.store().read()),
            Err(OperationError::SessionExpired)
        );
    }

    #[test]
    fn test_search_decodes_with_charset() {
        let store = Arc::new(MemoryStore::new());
        let mut e = Entry::new("cn=mueller,dc=example,dc=com");
        e.add_ava("sn", "Müller");
        store.insert(e);

        let latin1 = Charset::from_label("latin1").expect("latin1 label");
        let mut be = MemoryBackend::new(store).set_charset(latin1);
        be.bind("", "").expect("bind failed");
        let found = be
            .search("(sn=M\\fcller)", &SearchParams::default(), None)
            .expect("search failed");
        assert_eq!(found.len(), 1);
    }
}

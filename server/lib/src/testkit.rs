//! A small Kolab tree and session for tests.

use std::sync::Arc;

use crate::be::{MemoryBackend, MemoryStore};
use crate::config::DirectoryConfig;
use crate::prelude::*;

pub const BASE_DN: &str = "dc=example,dc=com";
pub const MANAGER_DN: &str = "cn=manager,cn=internal,dc=example,dc=com";
pub const MANAGER_PW: &str = "secret";

const FIXTURE: &str = r#"{
    "cn=manager,cn=internal,dc=example,dc=com": {
        "dn": "cn=manager,cn=internal,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "inetOrgPerson", "kolabInetOrgPerson"],
            "cn": "manager",
            "userPassword": "secret"
        }
    },
    "cn=admin,cn=internal,dc=example,dc=com": {
        "dn": "cn=admin,cn=internal,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "kolabGroupOfNames"],
            "cn": "admin",
            "member": ["cn=The Administrator,dc=example,dc=com"]
        }
    },
    "cn=maintainer,cn=internal,dc=example,dc=com": {
        "dn": "cn=maintainer,cn=internal,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "kolabGroupOfNames"],
            "cn": "maintainer",
            "member": ["cn=Mai Ntainer,dc=example,dc=com"]
        }
    },
    "cn=jane doe,dc=example,dc=com": {
        "dn": "cn=Jane Doe,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "inetOrgPerson", "kolabInetOrgPerson"],
            "cn": "Jane Doe",
            "givenName": "Jane",
            "sn": "Doe",
            "uid": "jdoe",
            "mail": "jane@example.com",
            "alias": ["jd@example.com", "Jane.Doe@Example.com"]
        }
    },
    "cn=bob smith,dc=example,dc=com": {
        "dn": "cn=Bob Smith,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "inetOrgPerson", "kolabInetOrgPerson"],
            "cn": "Bob Smith",
            "givenName": "Bob",
            "sn": "Smith",
            "uid": "bsmith",
            "mail": "bob@example.com",
            "alias": "Bobby@example.com",
            "kolabDelegate": "jane@example.com"
        }
    },
    "cn=the administrator,dc=example,dc=com": {
        "dn": "cn=The Administrator,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "inetOrgPerson", "kolabInetOrgPerson"],
            "cn": "The Administrator",
            "givenName": "The",
            "sn": "Administrator",
            "uid": "admin",
            "mail": "admin@example.com"
        }
    },
    "cn=mai ntainer,dc=example,dc=com": {
        "dn": "cn=Mai Ntainer,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "inetOrgPerson", "kolabInetOrgPerson"],
            "cn": "Mai Ntainer",
            "givenName": "Mai",
            "sn": "Ntainer",
            "uid": "maintainer",
            "mail": "maintainer@example.com"
        }
    },
    "cn=ext ernal,cn=external,dc=example,dc=com": {
        "dn": "cn=Ext Ernal,cn=external,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "inetOrgPerson", "kolabInetOrgPerson"],
            "cn": "Ext Ernal",
            "givenName": "Ext",
            "sn": "Ernal",
            "mail": "ext@partner.org"
        }
    },
    "cn=staff@example.com,dc=example,dc=com": {
        "dn": "cn=staff@example.com,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "kolabGroupOfNames"],
            "cn": "staff@example.com",
            "mail": "staff@example.com",
            "member": [
                "cn=Jane Doe,dc=example,dc=com",
                "cn=Bob Smith,dc=example,dc=com"
            ]
        }
    },
    "cn=shared.folder,dc=example,dc=com": {
        "dn": "cn=shared.folder,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "kolabSharedFolder"],
            "cn": "shared.folder",
            "kolabFolderType": "event"
        }
    },
    "cn=printer,dc=example,dc=com": {
        "dn": "cn=printer,dc=example,dc=com",
        "data": {
            "objectClass": ["top", "device"],
            "cn": "printer"
        }
    },
    "cn=bare,dc=example,dc=com": {
        "dn": "cn=bare,dc=example,dc=com",
        "data": {
            "cn": "bare"
        }
    }
}"#;

/// The manager credentials over the test tree.
pub fn test_config() -> DirectoryConfig {
    let mut config = DirectoryConfig::for_base(BASE_DN);
    config.uid = MANAGER_DN.to_string();
    config.pass = MANAGER_PW.to_string();
    config
}

#[allow(clippy::expect_used)]
pub fn setup_test_store() -> Arc<MemoryStore> {
    sketching::test_init();
    Arc::new(MemoryStore::from_fixture_str(FIXTURE).expect("Failed to load test fixture"))
}

#[allow(clippy::expect_used)]
pub fn setup_test_session() -> DirectorySession<MemoryBackend> {
    DirectorySession::memory(setup_test_store(), test_config())
        .expect("Failed to setup test session")
}

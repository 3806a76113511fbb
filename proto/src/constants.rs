//! Directory names that are fixed by the Kolab LDAP schema and tree layout.

/// Matches every entry. Used when a query has no criteria at all.
pub const FILTER_UNIVERSAL: &str = "(objectclass=*)";

// Object classes.
pub const OC_TOP: &str = "top";
pub const OC_PERSON: &str = "person";
pub const OC_ORGANIZATIONAL_PERSON: &str = "organizationalPerson";
pub const OC_INET_ORG_PERSON: &str = "inetOrgPerson";
pub const OC_KOLAB_INET_ORG_PERSON: &str = "kolabInetOrgPerson";
pub const OC_HORDE_PERSON: &str = "hordePerson";
pub const OC_KOLAB_GROUP_OF_NAMES: &str = "kolabGroupOfNames";
pub const OC_KOLAB_SHARED_FOLDER: &str = "kolabSharedFolder";

// Tree layout below the base dn.
pub const BRANCH_INTERNAL: &str = "cn=internal";
pub const BRANCH_EXTERNAL: &str = "cn=external";
pub const BRANCH_GROUPS: &str = "cn=groups";
pub const BRANCH_RESOURCES: &str = "cn=resources";

// Administrative groups, relative to the base dn.
pub const GROUP_ADMIN: &str = "cn=admin,cn=internal";
pub const GROUP_MAINTAINER: &str = "cn=maintainer,cn=internal";
pub const GROUP_DOMAIN_MAINTAINER: &str = "cn=domain-maintainer,cn=internal";

// Keys accepted in the extra information given when synthesising a dn.
pub const INFO_USER_TYPE: &str = "user_type";
pub const INFO_VISIBLE: &str = "visible";

pub const DEFAULT_CHARSET: &str = "UTF-8";
pub const DEFAULT_INVITATION_POLICY: &str = "ACT_MANUAL";
pub const DEFAULT_FOLDER_TYPE: &str = "mail";

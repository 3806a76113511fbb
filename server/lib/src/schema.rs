//! The object type registry.
//!
//! Each [`ObjectType`] has a descriptor that names its directory object classes, the
//! default criteria used to list it, how new objects get an id and a dn, and the
//! attribute bookkeeping of the type: which attributes are derived from others, which
//! have defaults, and which are locked once the object has been stored.
//!
//! Types form a single inheritance chain, but only for the attribute schema. A
//! descriptor declares its own deltas, and the registry composes each chain into one
//! effective [`AttributeSchema`] when it is built. Object classes are never inherited,
//! every descriptor lists them all.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;

use crate::prelude::*;

lazy_static! {
    /// The first rdn of a dn, honouring escaped commas.
    static ref RDN_RE: Regex = {
        #[allow(clippy::expect_used)]
        Regex::new(r"^\s*((?:\\.|[^,\\])*)").expect("Invalid rdn regex")
    };
    pub static ref REGISTRY: Registry = Registry::build();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Object,
    Person,
    OrganizationalPerson,
    InetOrgPerson,
    User,
    Address,
    Administrator,
    Maintainer,
    DomainMaintainer,
    Group,
    DistList,
    SharedFolder,
}

impl ObjectType {
    pub const ALL: [ObjectType; 12] = [
        ObjectType::Object,
        ObjectType::Person,
        ObjectType::OrganizationalPerson,
        ObjectType::InetOrgPerson,
        ObjectType::User,
        ObjectType::Address,
        ObjectType::Administrator,
        ObjectType::Maintainer,
        ObjectType::DomainMaintainer,
        ObjectType::Group,
        ObjectType::DistList,
        ObjectType::SharedFolder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Object => "object",
            ObjectType::Person => "person",
            ObjectType::OrganizationalPerson => "organizationalperson",
            ObjectType::InetOrgPerson => "inetorgperson",
            ObjectType::User => "user",
            ObjectType::Address => "address",
            ObjectType::Administrator => "administrator",
            ObjectType::Maintainer => "maintainer",
            ObjectType::DomainMaintainer => "domainmaintainer",
            ObjectType::Group => "group",
            ObjectType::DistList => "distlist",
            ObjectType::SharedFolder => "sharedfolder",
        }
    }

    pub fn descriptor(self) -> Result<&'static ObjectTypeDescriptor, OperationError> {
        REGISTRY.descriptor(self)
    }

    pub fn schema(self) -> Result<&'static AttributeSchema, OperationError> {
        REGISTRY.schema(self)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_lowercase();
        ObjectType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == folded)
            .ok_or_else(|| OperationError::UnknownObjectType(s.to_string()))
    }
}

const ID_TRIM: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B', ','];

fn join_first_values(attrs: &Eattrs, names: &[&str], sep: &str) -> Option<String> {
    let joined = names
        .iter()
        .map(|n| {
            attrs
                .get(&fold_attr(n))
                .and_then(|vs| vs.first())
                .map(|v| v.as_str())
                .unwrap_or("")
        })
        .collect::<Vec<_>>()
        .join(sep);
    let trimmed = joined.trim_matches(ID_TRIM);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The value of the first rdn of `dn`. A `cn=` prefix is dropped, any other rdn is
/// returned whole.
pub fn rdn_value(dn: &str) -> Option<&str> {
    let rdn = RDN_RE
        .captures(dn)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())?;
    let value = rdn.strip_prefix("cn=").unwrap_or(rdn);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// How a derived attribute is computed from the stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedRule {
    RdnValue,
    /// The first values of some attributes joined by a separator.
    Join {
        attrs: &'static [&'static str],
        sep: &'static str,
    },
}

impl DerivedRule {
    pub fn derive(&self, dn: &str, attrs: &Eattrs) -> Option<Vec<String>> {
        match self {
            DerivedRule::RdnValue => rdn_value(dn).map(|v| vec![v.to_string()]),
            DerivedRule::Join { attrs: names, sep } => {
                join_first_values(attrs, names, sep).map(|v| vec![v])
            }
        }
    }
}

/// How the id of a new object is generated from the attributes it is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdRule {
    Join(&'static [&'static str], &'static str),
    Attr(&'static str),
}

impl IdRule {
    pub fn generate(&self, attrs: &Eattrs) -> Option<String> {
        match self {
            IdRule::Join(names, sep) => join_first_values(attrs, names, sep),
            IdRule::Attr(name) => join_first_values(attrs, &[*name], ""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserType {
    #[default]
    Standard,
    Internal,
    Group,
    Resource,
}

impl UserType {
    /// Unknown values are standard users.
    pub fn from_value(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "1" | "internal" => UserType::Internal,
            "2" | "group" => UserType::Group,
            "3" | "resource" => UserType::Resource,
            _ => UserType::Standard,
        }
    }
}

/// The extra information that selects where a new object is placed in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUidInfo {
    pub user_type: UserType,
    pub visible: bool,
}

impl Default for ServerUidInfo {
    fn default() -> Self {
        ServerUidInfo {
            user_type: UserType::Standard,
            visible: true,
        }
    }
}

impl From<&Eattrs> for ServerUidInfo {
    fn from(info: &Eattrs) -> Self {
        let first = |k: &str| {
            info.get(&fold_attr(k))
                .map(|vs| vs.first().map(|v| v.as_str()).unwrap_or(""))
        };

        let user_type = first(INFO_USER_TYPE)
            .map(UserType::from_value)
            .unwrap_or_default();
        let visible = first(INFO_VISIBLE)
            .map(|v| {
                !matches!(
                    v.trim().to_lowercase().as_str(),
                    "" | "0" | "false" | "no" | "off"
                )
            })
            .unwrap_or(true);

        ServerUidInfo { user_type, visible }
    }
}

/// Where a new object sits below the base: `None` is directly under it, otherwise the
/// branch between the object's rdn and the base.
pub type DnRule = fn(&ServerUidInfo) -> Option<&'static str>;

fn dn_rule_base(_: &ServerUidInfo) -> Option<&'static str> {
    None
}

fn dn_rule_user(info: &ServerUidInfo) -> Option<&'static str> {
    match info.user_type {
        UserType::Standard => None,
        UserType::Internal => Some(BRANCH_INTERNAL),
        UserType::Group => Some(BRANCH_GROUPS),
        UserType::Resource => Some(BRANCH_RESOURCES),
    }
}

fn dn_rule_external(_: &ServerUidInfo) -> Option<&'static str> {
    Some(BRANCH_EXTERNAL)
}

fn dn_rule_visibility(info: &ServerUidInfo) -> Option<&'static str> {
    if info.visible {
        None
    } else {
        Some(BRANCH_INTERNAL)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSchema {
    pub derived: BTreeMap<AttrString, DerivedRule>,
    pub defaults: BTreeMap<AttrString, Vec<String>>,
    pub locked: BTreeSet<AttrString>,
}

impl AttributeSchema {
    fn new(
        derived: &[(&str, DerivedRule)],
        defaults: &[(&str, &str)],
        locked: &[&str],
    ) -> Self {
        AttributeSchema {
            derived: derived.iter().map(|(a, r)| (fold_attr(a), *r)).collect(),
            defaults: defaults
                .iter()
                .map(|(a, v)| (fold_attr(a), vec![v.to_string()]))
                .collect(),
            locked: locked.iter().map(|a| fold_attr(a)).collect(),
        }
    }

    /// Layer `child` over this schema. The child wins where both declare an attribute.
    fn compose(&mut self, child: &AttributeSchema) {
        self.derived
            .extend(child.derived.iter().map(|(k, v)| (k.clone(), *v)));
        self.defaults
            .extend(child.defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.locked.extend(child.locked.iter().cloned());
    }

    pub fn is_derived(&self, attr: &str) -> bool {
        self.derived.contains_key(&fold_attr(attr))
    }

    pub fn is_locked(&self, attr: &str) -> bool {
        self.locked.contains(&fold_attr(attr))
    }
}

#[derive(Debug, Clone)]
pub struct ObjectTypeDescriptor {
    pub tag: ObjectType,
    pub parent: Option<ObjectType>,
    /// Every class an object of this type is written with, in order.
    pub object_classes: &'static [&'static str],
    /// Only this type's own deltas. See [`Registry::schema`] for the composed view.
    pub schema: AttributeSchema,
    pub required_group: Option<&'static str>,
    pub sort_by: Option<&'static str>,
    pub filter: Criteria,
    pub id_rule: Option<IdRule>,
    pub dn_rule: Option<DnRule>,
}

impl ObjectTypeDescriptor {
    /// The dn a new object with `id` would be stored under.
    pub fn generate_server_uid(
        &self,
        id: &str,
        info: &ServerUidInfo,
        base_dn: &str,
    ) -> Result<String, OperationError> {
        let rule = self.dn_rule.ok_or_else(|| {
            OperationError::NotImplemented(format!("no dn rule for type {}", self.tag))
        })?;
        Ok(match rule(info) {
            Some(branch) => format!("cn={},{},{}", id, branch, base_dn),
            None => format!("cn={},{}", id, base_dn),
        })
    }

    pub fn generate_id(&self, attrs: &Eattrs) -> Result<String, OperationError> {
        let rule = self.id_rule.ok_or_else(|| {
            OperationError::NotImplemented(format!("no id rule for type {}", self.tag))
        })?;
        rule.generate(attrs)
            .ok_or_else(|| OperationError::MissingAttribute(format!("id of {}", self.tag)))
    }

    /// The dn of the required group below `base_dn`, if this type has one.
    pub fn required_group_dn(&self, base_dn: &str) -> Option<String> {
        self.required_group.map(|g| format!("{},{}", g, base_dn))
    }
}

const CLASSES_OBJECT: &[&str] = &[OC_TOP];
const CLASSES_PERSON: &[&str] = &[OC_TOP, OC_PERSON];
const CLASSES_ORG_PERSON: &[&str] = &[OC_TOP, OC_PERSON, OC_ORGANIZATIONAL_PERSON];
const CLASSES_INET_ORG_PERSON: &[&str] = &[
    OC_TOP,
    OC_PERSON,
    OC_ORGANIZATIONAL_PERSON,
    OC_INET_ORG_PERSON,
];
const CLASSES_USER: &[&str] = &[
    OC_TOP,
    OC_PERSON,
    OC_ORGANIZATIONAL_PERSON,
    OC_INET_ORG_PERSON,
    OC_KOLAB_INET_ORG_PERSON,
    OC_HORDE_PERSON,
];
const CLASSES_ADDRESS: &[&str] = &[
    OC_TOP,
    OC_PERSON,
    OC_ORGANIZATIONAL_PERSON,
    OC_INET_ORG_PERSON,
    OC_KOLAB_INET_ORG_PERSON,
];
const CLASSES_GROUP: &[&str] = &[OC_TOP, OC_KOLAB_GROUP_OF_NAMES];
const CLASSES_SHARED_FOLDER: &[&str] = &[OC_TOP, OC_KOLAB_SHARED_FOLDER];

const JOIN_FNLN: DerivedRule = DerivedRule::Join {
    attrs: &[ATTR_GIVEN_NAME, ATTR_SN],
    sep: " ",
};
const JOIN_LNFN: DerivedRule = DerivedRule::Join {
    attrs: &[ATTR_SN, ATTR_GIVEN_NAME],
    sep: ", ",
};
const ID_FNLN: IdRule = IdRule::Join(&[ATTR_GIVEN_NAME, ATTR_SN], " ");

fn class_filter(class: &str) -> Criteria {
    c_eq(Attribute::ObjectClass.as_str(), class)
}

fn kolab_person_filter() -> Criteria {
    c_and(vec![
        class_filter(OC_KOLAB_INET_ORG_PERSON),
        c_pres(ATTR_UID),
        c_pres(ATTR_MAIL),
        c_pres(ATTR_SN),
    ])
}

fn admin_filter() -> Criteria {
    c_and(vec![
        class_filter(OC_KOLAB_INET_ORG_PERSON),
        c_pres(ATTR_SN),
        c_not(vec![c_eq(ATTR_CN, "cyrus-admin")]),
    ])
}

fn descriptors() -> Vec<ObjectTypeDescriptor> {
    let admin_like = |tag, parent, group| ObjectTypeDescriptor {
        tag,
        parent: Some(parent),
        object_classes: CLASSES_USER,
        schema: AttributeSchema::default(),
        required_group: Some(group),
        sort_by: Some(ATTR_SN),
        filter: admin_filter(),
        id_rule: Some(ID_FNLN),
        dn_rule: Some(dn_rule_base as DnRule),
    };

    vec![
        ObjectTypeDescriptor {
            tag: ObjectType::Object,
            parent: None,
            object_classes: CLASSES_OBJECT,
            schema: AttributeSchema::new(&[(ATTR_ID, DerivedRule::RdnValue)], &[], &[]),
            required_group: None,
            sort_by: None,
            filter: class_filter(OC_TOP),
            id_rule: None,
            dn_rule: None,
        },
        ObjectTypeDescriptor {
            tag: ObjectType::Person,
            parent: Some(ObjectType::Object),
            object_classes: CLASSES_PERSON,
            schema: AttributeSchema::default(),
            required_group: None,
            sort_by: Some(ATTR_SN),
            filter: class_filter(OC_PERSON),
            id_rule: None,
            dn_rule: None,
        },
        ObjectTypeDescriptor {
            tag: ObjectType::OrganizationalPerson,
            parent: Some(ObjectType::Person),
            object_classes: CLASSES_ORG_PERSON,
            schema: AttributeSchema::default(),
            required_group: None,
            sort_by: Some(ATTR_SN),
            filter: class_filter(OC_ORGANIZATIONAL_PERSON),
            id_rule: Some(ID_FNLN),
            dn_rule: None,
        },
        ObjectTypeDescriptor {
            tag: ObjectType::InetOrgPerson,
            parent: Some(ObjectType::OrganizationalPerson),
            object_classes: CLASSES_INET_ORG_PERSON,
            schema: AttributeSchema::new(
                &[(ATTR_FNLN, JOIN_FNLN), (ATTR_LNFN, JOIN_LNFN)],
                &[],
                &[],
            ),
            required_group: None,
            sort_by: Some(ATTR_SN),
            filter: class_filter(OC_INET_ORG_PERSON),
            id_rule: Some(ID_FNLN),
            dn_rule: None,
        },
        ObjectTypeDescriptor {
            tag: ObjectType::User,
            parent: Some(ObjectType::InetOrgPerson),
            object_classes: CLASSES_USER,
            schema: AttributeSchema::new(
                &[],
                &[(ATTR_KOLAB_INVITATION_POLICY, DEFAULT_INVITATION_POLICY)],
                &[ATTR_MAIL],
            ),
            required_group: None,
            sort_by: Some(ATTR_SN),
            filter: kolab_person_filter(),
            id_rule: Some(ID_FNLN),
            dn_rule: Some(dn_rule_user as DnRule),
        },
        ObjectTypeDescriptor {
            tag: ObjectType::Address,
            parent: Some(ObjectType::InetOrgPerson),
            object_classes: CLASSES_ADDRESS,
            schema: AttributeSchema::default(),
            required_group: None,
            sort_by: Some(ATTR_SN),
            filter: c_and(vec![
                class_filter(OC_KOLAB_INET_ORG_PERSON),
                c_pres(ATTR_SN),
                c_not(vec![c_pres(ATTR_UID)]),
            ]),
            id_rule: Some(ID_FNLN),
            dn_rule: Some(dn_rule_external as DnRule),
        },
        admin_like(ObjectType::Administrator, ObjectType::User, GROUP_ADMIN),
        admin_like(
            ObjectType::Maintainer,
            ObjectType::Administrator,
            GROUP_MAINTAINER,
        ),
        admin_like(
            ObjectType::DomainMaintainer,
            ObjectType::Maintainer,
            GROUP_DOMAIN_MAINTAINER,
        ),
        ObjectTypeDescriptor {
            tag: ObjectType::Group,
            parent: Some(ObjectType::Object),
            object_classes: CLASSES_GROUP,
            schema: AttributeSchema::new(&[], &[], &[ATTR_MAIL]),
            required_group: None,
            sort_by: Some(ATTR_MAIL),
            filter: class_filter(OC_KOLAB_GROUP_OF_NAMES),
            id_rule: Some(IdRule::Attr(ATTR_MAIL)),
            dn_rule: Some(dn_rule_visibility as DnRule),
        },
        ObjectTypeDescriptor {
            tag: ObjectType::DistList,
            parent: Some(ObjectType::Group),
            object_classes: CLASSES_GROUP,
            schema: AttributeSchema::default(),
            required_group: None,
            sort_by: Some(ATTR_MAIL),
            filter: c_and(vec![
                class_filter(OC_KOLAB_GROUP_OF_NAMES),
                c_pres(ATTR_MAIL),
            ]),
            id_rule: Some(IdRule::Attr(ATTR_MAIL)),
            dn_rule: Some(dn_rule_visibility as DnRule),
        },
        ObjectTypeDescriptor {
            tag: ObjectType::SharedFolder,
            parent: Some(ObjectType::Object),
            object_classes: CLASSES_SHARED_FOLDER,
            schema: AttributeSchema::new(
                &[],
                &[(ATTR_KOLAB_FOLDER_TYPE, DEFAULT_FOLDER_TYPE)],
                &[],
            ),
            required_group: None,
            sort_by: Some(ATTR_CN),
            filter: class_filter(OC_KOLAB_SHARED_FOLDER),
            id_rule: Some(IdRule::Attr(ATTR_CN)),
            dn_rule: Some(dn_rule_base as DnRule),
        },
    ]
}

pub struct Registry {
    descriptors: BTreeMap<ObjectType, ObjectTypeDescriptor>,
    effective: BTreeMap<ObjectType, AttributeSchema>,
}

impl Registry {
    fn build() -> Self {
        let descriptors: BTreeMap<_, _> = descriptors().into_iter().map(|d| (d.tag, d)).collect();

        let effective = descriptors
            .keys()
            .map(|tag| {
                // Walk up to the root, then layer the deltas back down.
                let mut chain = Vec::new();
                let mut next = Some(*tag);
                while let Some(t) = next {
                    if chain.contains(&t) || chain.len() > ObjectType::ALL.len() {
                        admin_error!(?tag, "object type chain does not terminate");
                        break;
                    }
                    chain.push(t);
                    next = descriptors.get(&t).and_then(|d| d.parent);
                }

                let mut schema = AttributeSchema::default();
                chain
                    .iter()
                    .rev()
                    .filter_map(|t| descriptors.get(t))
                    .for_each(|d| schema.compose(&d.schema));
                (*tag, schema)
            })
            .collect();

        Registry {
            descriptors,
            effective,
        }
    }

    pub fn descriptor(&self, t: ObjectType) -> Result<&ObjectTypeDescriptor, OperationError> {
        self.descriptors
            .get(&t)
            .ok_or_else(|| OperationError::UnknownObjectType(t.to_string()))
    }

    /// The composed schema of the whole inheritance chain of `t`.
    pub fn schema(&self, t: ObjectType) -> Result<&AttributeSchema, OperationError> {
        self.effective
            .get(&t)
            .ok_or_else(|| OperationError::UnknownObjectType(t.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "dc=example,dc=com";

    fn info(pairs: &[(&str, &str)]) -> ServerUidInfo {
        let attrs: Eattrs = pairs
            .iter()
            .map(|(k, v)| (fold_attr(k), vec![v.to_string()]))
            .collect();
        ServerUidInfo::from(&attrs)
    }

    fn uid(t: ObjectType, id: &str, i: &ServerUidInfo) -> Result<String, OperationError> {
        t.descriptor()?.generate_server_uid(id, i, BASE)
    }

    #[test]
    fn test_registry_is_complete() {
        for t in ObjectType::ALL {
            let d = t.descriptor().expect("missing descriptor");
            assert_eq!(d.tag, t);
            assert!(t.schema().is_ok());
            assert_eq!(t.as_str().parse::<ObjectType>(), Ok(t));
        }
        assert!("nothing".parse::<ObjectType>().is_err());
    }

    #[test]
    fn test_schema_composition() {
        let user = ObjectType::User.schema().expect("no schema");
        // From Object, InetOrgPerson and User itself.
        assert!(user.is_derived("id"));
        assert!(user.is_derived("FNLN"));
        assert!(user.is_locked("mail"));
        assert_eq!(
            user.defaults.get(&fold_attr(ATTR_KOLAB_INVITATION_POLICY)),
            Some(&vec![DEFAULT_INVITATION_POLICY.to_string()])
        );

        let admin = ObjectType::DomainMaintainer.schema().expect("no schema");
        assert!(admin.is_locked("mail"));

        let folder = ObjectType::SharedFolder.schema().expect("no schema");
        assert!(!folder.is_derived("fnln"));
        assert!(!folder.is_locked("mail"));
        assert!(folder.defaults.contains_key(&fold_attr(ATTR_KOLAB_FOLDER_TYPE)));

        // Object classes are explicit, not inherited.
        let d = ObjectType::SharedFolder.descriptor().expect("no descriptor");
        assert_eq!(d.object_classes, &[OC_TOP, OC_KOLAB_SHARED_FOLDER]);
    }

    #[test]
    fn test_generate_server_uid_users() {
        let standard = ServerUidInfo::default();
        assert_eq!(
            uid(ObjectType::User, "jdoe", &standard),
            Ok("cn=jdoe,dc=example,dc=com".to_string())
        );
        assert_eq!(
            uid(ObjectType::User, "jdoe", &info(&[("user_type", "1")])),
            Ok("cn=jdoe,cn=internal,dc=example,dc=com".to_string())
        );
        assert_eq!(
            uid(ObjectType::User, "jdoe", &info(&[("user_type", "group")])),
            Ok("cn=jdoe,cn=groups,dc=example,dc=com".to_string())
        );
        assert_eq!(
            uid(ObjectType::User, "jdoe", &info(&[("user_type", "3")])),
            Ok("cn=jdoe,cn=resources,dc=example,dc=com".to_string())
        );
        assert_eq!(
            uid(ObjectType::User, "jdoe", &info(&[("user_type", "17")])),
            Ok("cn=jdoe,dc=example,dc=com".to_string())
        );
    }

    #[test]
    fn test_generate_server_uid_other_types() {
        let none = ServerUidInfo::default();
        assert_eq!(
            uid(ObjectType::Address, "Jane Doe", &none),
            Ok("cn=Jane Doe,cn=external,dc=example,dc=com".to_string())
        );
        for t in [
            ObjectType::SharedFolder,
            ObjectType::Administrator,
            ObjectType::Maintainer,
            ObjectType::DomainMaintainer,
        ] {
            assert_eq!(uid(t, "x", &none), Ok("cn=x,dc=example,dc=com".to_string()));
        }

        assert_eq!(
            uid(ObjectType::Group, "g@example.com", &none),
            Ok("cn=g@example.com,dc=example,dc=com".to_string())
        );
        assert_eq!(
            uid(ObjectType::DistList, "g", &info(&[("visible", "false")])),
            Ok("cn=g,cn=internal,dc=example,dc=com".to_string())
        );
        assert_eq!(
            uid(ObjectType::Group, "g", &info(&[("visible", "")])),
            Ok("cn=g,cn=internal,dc=example,dc=com".to_string())
        );
        assert_eq!(
            uid(ObjectType::Group, "g", &info(&[("visible", "yes")])),
            Ok("cn=g,dc=example,dc=com".to_string())
        );

        for t in [ObjectType::Object, ObjectType::Person, ObjectType::InetOrgPerson] {
            assert_eq!(
                uid(t, "x", &none),
                Err(OperationError::NotImplemented(String::new()))
            );
        }
    }

    #[test]
    fn test_generate_id() {
        let attrs: Eattrs = [
            (fold_attr("givenName"), vec!["Jane".to_string()]),
            (fold_attr("sn"), vec!["Doe".to_string()]),
            (fold_attr("cn"), vec![" shared, ".to_string()]),
            (fold_attr("mail"), vec!["g@example.com".to_string()]),
        ]
        .into_iter()
        .collect();

        let id = |t: ObjectType| t.descriptor().and_then(|d| d.generate_id(&attrs));
        assert_eq!(id(ObjectType::User), Ok("Jane Doe".to_string()));
        assert_eq!(id(ObjectType::SharedFolder), Ok("shared".to_string()));
        assert_eq!(id(ObjectType::Group), Ok("g@example.com".to_string()));

        let only_sn: Eattrs = [(fold_attr("sn"), vec!["Doe".to_string()])]
            .into_iter()
            .collect();
        let d = ObjectType::Address.descriptor().expect("no descriptor");
        assert_eq!(d.generate_id(&only_sn), Ok("Doe".to_string()));
        assert_eq!(
            d.generate_id(&Eattrs::new()),
            Err(OperationError::MissingAttribute(String::new()))
        );
    }

    #[test]
    fn test_derived_rules() {
        let attrs: Eattrs = [
            (fold_attr("givenName"), vec!["Jane".to_string()]),
            (fold_attr("sn"), vec!["Doe".to_string()]),
        ]
        .into_iter()
        .collect();
        let dn = "cn=Jane Doe,cn=external,dc=example,dc=com";

        assert_eq!(
            DerivedRule::RdnValue.derive(dn, &attrs),
            Some(vec!["Jane Doe".to_string()])
        );
        assert_eq!(
            JOIN_FNLN.derive(dn, &attrs),
            Some(vec!["Jane Doe".to_string()])
        );
        assert_eq!(
            JOIN_LNFN.derive(dn, &attrs),
            Some(vec!["Doe, Jane".to_string()])
        );
        assert_eq!(JOIN_LNFN.derive(dn, &Eattrs::new()), None);
    }

    #[test]
    fn test_rdn_value() {
        assert_eq!(rdn_value("cn=admin,cn=internal,dc=example,dc=com"), Some("admin"));
        assert_eq!(rdn_value("uid=jdoe,dc=example,dc=com"), Some("uid=jdoe"));
        assert_eq!(rdn_value("cn=Doe\\, Jane,dc=example,dc=com"), Some("Doe\\, Jane"));
        assert_eq!(rdn_value(""), None);
    }

    #[test]
    fn test_required_groups() {
        let d = ObjectType::Maintainer.descriptor().expect("no descriptor");
        assert_eq!(
            d.required_group_dn(BASE),
            Some("cn=maintainer,cn=internal,dc=example,dc=com".to_string())
        );
        let d = ObjectType::User.descriptor().expect("no descriptor");
        assert_eq!(d.required_group_dn(BASE), None);
    }
}

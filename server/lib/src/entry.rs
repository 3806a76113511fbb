//! Entries are the records of the directory: a distinguished name and a map of
//! multi-valued attributes.
//!
//! Attribute names are case insensitive, so they are folded on every insert and on
//! every lookup. The case of values is preserved, and values keep the order they were
//! written in.

use std::collections::BTreeMap;

use crate::prelude::*;

pub type Eattrs = BTreeMap<AttrString, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    dn: String,
    attrs: Eattrs,
}

impl Entry {
    pub fn new(dn: &str) -> Self {
        Entry {
            dn: dn.to_string(),
            attrs: Eattrs::new(),
        }
    }

    /// Build an entry from attribute pairs in any case.
    pub fn from_attrs<I, K>(dn: &str, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let mut e = Entry::new(dn);
        attrs
            .into_iter()
            .for_each(|(k, vs)| e.set_ava(k.as_ref(), vs));
        e
    }

    pub fn get_dn(&self) -> &str {
        &self.dn
    }

    pub fn get_attrs(&self) -> &Eattrs {
        &self.attrs
    }

    pub fn into_attrs(self) -> Eattrs {
        self.attrs
    }

    pub fn get_ava(&self, attr: &str) -> Option<&[String]> {
        self.attrs.get(&fold_attr(attr)).map(|vs| vs.as_slice())
    }

    /// The first value of an attribute.
    pub fn get_ava_single(&self, attr: &str) -> Option<&str> {
        self.get_ava(attr)
            .and_then(|vs| vs.first())
            .map(|v| v.as_str())
    }

    pub fn attribute_pres(&self, attr: &str) -> bool {
        self.get_ava(attr).map(|vs| !vs.is_empty()).unwrap_or(false)
    }

    pub fn attribute_equality(&self, attr: &str, value: &str) -> bool {
        self.get_ava(attr)
            .map(|vs| vs.iter().any(|v| v == value))
            .unwrap_or(false)
    }

    /// An empty prefix matches any entry where the attribute has a value.
    pub fn attribute_startswith(&self, attr: &str, prefix: &str) -> bool {
        self.get_ava(attr)
            .map(|vs| vs.iter().any(|v| v.starts_with(prefix)))
            .unwrap_or(false)
    }

    /// Evaluate a single leaf against this entry. Only equality style assertions are
    /// understood, everything else is refused.
    pub fn match_leaf(&self, leaf: &Leaf) -> Result<bool, OperationError> {
        if leaf.op != Operator::Equal {
            return Err(OperationError::NotImplemented(format!(
                "the {} operator is not supported",
                leaf.op
            )));
        }
        if leaf.prefix_only {
            Ok(self.attribute_startswith(&leaf.attr, &leaf.value))
        } else {
            Ok(self.attribute_equality(&leaf.attr, &leaf.value))
        }
    }

    pub fn add_ava(&mut self, attr: &str, value: &str) {
        self.attrs
            .entry(fold_attr(attr))
            .or_default()
            .push(value.to_string());
    }

    pub fn set_ava(&mut self, attr: &str, values: Vec<String>) {
        self.attrs.insert(fold_attr(attr), values);
    }

    pub fn purge_ava(&mut self, attr: &str) {
        self.attrs.remove(&fold_attr(attr));
    }

    /// Project this entry down to the named attributes. The dn is always kept, and an
    /// empty list keeps everything.
    pub fn reduce_attributes(&self, allowed: &[String]) -> Entry {
        if allowed.is_empty() {
            return self.clone();
        }

        let allowed: Vec<AttrString> = allowed.iter().map(|a| fold_attr(a)).collect();
        let attrs = self
            .attrs
            .iter()
            .filter(|(k, _)| allowed.contains(k))
            .map(|(k, vs)| (k.clone(), vs.clone()))
            .collect();

        Entry {
            dn: self.dn.clone(),
            attrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Entry {
        Entry::from_attrs(
            "cn=Jane Doe,dc=example,dc=com",
            vec![
                (
                    "objectClass",
                    vec!["top".to_string(), "kolabInetOrgPerson".to_string()],
                ),
                ("mail", vec!["jane@example.com".to_string()]),
                (
                    "alias",
                    vec!["jd@example.com".to_string(), "doe@example.com".to_string()],
                ),
                ("sn", vec![]),
            ],
        )
    }

    #[test]
    fn test_entry_attr_case_folding() {
        let e = person();
        assert_eq!(e.get_dn(), "cn=Jane Doe,dc=example,dc=com");
        assert!(e.attribute_pres("OBJECTCLASS"));
        assert_eq!(e.get_ava_single("Mail"), Some("jane@example.com"));
        assert!(e.get_attrs().contains_key(&fold_attr("objectclass")));
    }

    #[test]
    fn test_entry_presence_needs_a_value() {
        let e = person();
        assert!(!e.attribute_pres("sn"));
        assert!(!e.attribute_startswith("sn", ""));
        assert!(e.attribute_startswith("mail", ""));
        assert!(!e.attribute_pres("uid"));
    }

    #[test]
    fn test_entry_equality_multivalue() {
        let e = person();
        assert!(e.attribute_equality("alias", "doe@example.com"));
        assert!(e.attribute_equality("alias", "jd@example.com"));
        assert!(!e.attribute_equality("alias", "DOE@example.com"));
        assert!(e.attribute_startswith("alias", "doe@"));
    }

    #[test]
    fn test_entry_match_leaf() {
        let e = person();
        assert_eq!(
            e.match_leaf(&Leaf {
                attr: "MAIL".into(),
                op: Operator::Equal,
                value: "jane@example.com".to_string(),
                prefix_only: false,
            }),
            Ok(true)
        );
        assert_eq!(
            e.match_leaf(&Leaf {
                attr: "mail".into(),
                op: Operator::GreaterOrEqual,
                value: "a".to_string(),
                prefix_only: false,
            }),
            Err(OperationError::NotImplemented(String::new()))
        );
    }

    #[test]
    fn test_entry_reduce_attributes() {
        let e = person();
        let r = e.reduce_attributes(&["MAIL".to_string(), "uid".to_string()]);
        assert_eq!(r.get_dn(), e.get_dn());
        assert_eq!(r.get_attrs().len(), 1);
        assert_eq!(r.get_ava_single("mail"), Some("jane@example.com"));

        assert_eq!(e.reduce_attributes(&[]), e);
    }

    #[test]
    fn test_entry_modify() {
        let mut e = Entry::new("cn=x,dc=example,dc=com");
        e.add_ava("Member", "cn=a");
        e.add_ava("member", "cn=b");
        assert_eq!(e.get_ava("member").map(|vs| vs.len()), Some(2));
        e.purge_ava("MEMBER");
        assert!(!e.attribute_pres("member"));
    }
}

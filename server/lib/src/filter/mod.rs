//! [`Criteria`] are the query language of the directory layer. Every lookup the
//! session offers is expressed as a criteria tree, which is then compiled to the
//! wire filter syntax of the directory (see [`compile`]) and, for the in memory
//! backend, parsed back out again (see [`parse`]).
//!
//! A criteria tree is made of leaves that assert something about one attribute, and
//! of `And`, `Or` and `Not` groups over other criteria.
//!
//! [`compile`]: compile/index.html
//! [`parse`]: parse/index.html

use std::collections::BTreeSet;
use std::fmt;

use crate::prelude::*;

pub mod compile;
pub mod parse;

pub use self::compile::{Charset, FilterCompiler};
pub use self::parse::{parse, parse_with_charset};

/// The relational operators of the wire syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    Approx,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Approx => "=~",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
        }
    }

    pub(crate) fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Operator::Equal),
            "=~" | "~=" => Some(Operator::Approx),
            ">" => Some(Operator::Greater),
            "<" => Some(Operator::Less),
            ">=" => Some(Operator::GreaterOrEqual),
            "<=" => Some(Operator::LessOrEqual),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute assertion.
///
/// When `prefix_only` is set the value must begin an attribute value rather than equal
/// it. A prefix assertion with an empty value is the presence test (`attr=*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub attr: AttrString,
    pub op: Operator,
    pub value: String,
    pub prefix_only: bool,
}

impl Leaf {
    pub fn is_presence(&self) -> bool {
        self.prefix_only && self.value.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criteria {
    Leaf(Leaf),
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
    /// Negates the *union* of the children. With more than one child this is
    /// not the same as negating each child in turn.
    Not(Vec<Criteria>),
}

pub fn c_op(attr: &str, op: Operator, value: &str) -> Criteria {
    Criteria::Leaf(Leaf {
        attr: AttrString::from(attr),
        op,
        value: value.to_string(),
        prefix_only: false,
    })
}

pub fn c_eq(attr: &str, value: &str) -> Criteria {
    c_op(attr, Operator::Equal, value)
}

pub fn c_begins(attr: &str, value: &str) -> Criteria {
    Criteria::Leaf(Leaf {
        attr: AttrString::from(attr),
        op: Operator::Equal,
        value: value.to_string(),
        prefix_only: true,
    })
}

pub fn c_pres(attr: &str) -> Criteria {
    c_begins(attr, "")
}

pub fn c_and(vs: Vec<Criteria>) -> Criteria {
    Criteria::And(vs)
}

pub fn c_or(vs: Vec<Criteria>) -> Criteria {
    Criteria::Or(vs)
}

pub fn c_not(vs: Vec<Criteria>) -> Criteria {
    Criteria::Not(vs)
}

impl Criteria {
    pub fn children(&self) -> &[Criteria] {
        match self {
            Criteria::Leaf(_) => &[],
            Criteria::And(vs) | Criteria::Or(vs) | Criteria::Not(vs) => vs.as_slice(),
        }
    }

    /// An empty top level group. Compiles to the universal filter.
    pub fn is_empty(&self) -> bool {
        match self {
            Criteria::Leaf(_) => false,
            Criteria::And(vs) | Criteria::Or(vs) | Criteria::Not(vs) => vs.is_empty(),
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Criteria::Leaf(l) => Some(l),
            _ => None,
        }
    }

    /// Depth first, parents before their children.
    pub fn visit<F>(&self, f: &mut F)
    where
        F: FnMut(&Criteria),
    {
        f(self);
        self.children().iter().for_each(|c| c.visit(f));
    }

    pub fn get_attr_set(&self) -> BTreeSet<AttrString> {
        let mut r_set = BTreeSet::new();
        self.visit(&mut |c| {
            if let Criteria::Leaf(l) = c {
                r_set.insert(fold_attr(l.attr.as_str()));
            }
        });
        r_set
    }

    /// Restrict these criteria to entries of one object class, the way every uid and
    /// gid lookup does.
    pub fn restrict_to_class(self, class: &str) -> Criteria {
        let class_leaf = c_eq(Attribute::ObjectClass.as_str(), class);
        if self.is_empty() {
            c_and(vec![class_leaf])
        } else {
            c_and(vec![class_leaf, self])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_simple() {
        let _crit = c_eq("mail", "a@b.com");

        let complex = c_and(vec![
            c_or(vec![c_eq("uid", "test_a"), c_eq("mail", "test_b")]),
            c_begins("cn", "Test"),
            c_not(vec![c_pres("alias")]),
        ]);
        assert_eq!(complex.children().len(), 3);
        assert!(!complex.is_empty());
        assert!(c_or(vec![]).is_empty());
    }

    #[test]
    fn test_criteria_visit_order() {
        let crit = c_and(vec![c_or(vec![c_eq("a", "1"), c_eq("b", "2")]), c_eq("c", "3")]);
        let mut seen = Vec::new();
        crit.visit(&mut |c| match c {
            Criteria::Leaf(l) => seen.push(l.attr.to_string()),
            Criteria::And(_) => seen.push("&".to_string()),
            Criteria::Or(_) => seen.push("|".to_string()),
            Criteria::Not(_) => seen.push("!".to_string()),
        });
        assert_eq!(seen, vec!["&", "|", "a", "b", "c"]);
    }

    #[test]
    fn test_attr_set_criteria() {
        let crit = c_and(vec![
            c_eq("objectClass", "kolabInetOrgPerson"),
            c_or(vec![c_eq("UID", "x"), c_eq("mail", "x"), c_eq("Mail", "y")]),
        ]);
        let attrs: Vec<String> = crit.get_attr_set().into_iter().map(|a| a.to_string()).collect();
        assert_eq!(attrs, vec!["mail", "objectclass", "uid"]);
    }

    #[test]
    fn test_presence_leaf() {
        let leaf = c_pres("mail");
        assert!(leaf.as_leaf().map(Leaf::is_presence).unwrap_or(false));
        assert!(!c_begins("mail", "a").as_leaf().map(Leaf::is_presence).unwrap_or(true));
    }

    #[test]
    fn test_restrict_to_class() {
        let restricted = c_and(vec![]).restrict_to_class("kolabGroupOfNames");
        assert_eq!(restricted, c_and(vec![c_eq("objectClass", "kolabGroupOfNames")]));

        let restricted = c_eq("mail", "a@b").restrict_to_class("kolabGroupOfNames");
        assert_eq!(restricted.children().len(), 2);
    }
}

//! Set based evaluation of criteria over a table of entries.
//!
//! Every group works on the set of matching dns of its children. `And` keeps the dns
//! every child matched, `Or` takes the union and `Not` takes the complement of the
//! union of its children against all entries. Results are returned in the order the
//! dns were first seen.

use hashbrown::{HashMap, HashSet};

use crate::prelude::*;

/// Evaluate `crit` over `records`, projecting the matches to `attrs`.
#[instrument(level = "trace", skip_all)]
pub fn evaluate(
    crit: &Criteria,
    records: &[Entry],
    attrs: &[String],
) -> Result<Vec<Entry>, OperationError> {
    // Refuse what we can't answer before touching any record.
    check_supported(crit)?;

    let dns = match_dns(crit, records)?;
    filter_trace!(matched = dns.len(), "criteria evaluated");

    let by_dn: HashMap<&str, &Entry> = records.iter().map(|e| (e.get_dn(), e)).collect();
    Ok(dns
        .into_iter()
        .filter_map(|dn| by_dn.get(dn))
        .map(|e| e.reduce_attributes(attrs))
        .collect())
}

fn check_supported(crit: &Criteria) -> Result<(), OperationError> {
    let mut unsupported = None;
    crit.visit(&mut |c| {
        if let Criteria::Leaf(l) = c {
            if l.op != Operator::Equal && unsupported.is_none() {
                unsupported = Some(l.op);
            }
        }
    });

    match unsupported {
        Some(op) => {
            filter_warn!(%op, "unsupported operator in criteria");
            Err(OperationError::NotImplemented(format!(
                "the {} operator is not supported",
                op
            )))
        }
        None => Ok(()),
    }
}

fn match_dns<'a>(crit: &Criteria, records: &'a [Entry]) -> Result<Vec<&'a str>, OperationError> {
    match crit {
        Criteria::Leaf(leaf) => {
            let mut dns = Vec::new();
            for e in records {
                if e.match_leaf(leaf)? {
                    dns.push(e.get_dn());
                }
            }
            Ok(dns)
        }
        Criteria::And(vs) => {
            let mut order: Vec<&'a str> = Vec::new();
            let mut counts: HashMap<&'a str, usize> = HashMap::new();
            for child in vs {
                let child_dns: HashSet<&'a str> = match_dns(child, records)?.into_iter().collect();
                // Walk in record order so the first seen order is stable.
                for dn in records.iter().map(|e| e.get_dn()) {
                    if child_dns.contains(dn) {
                        let count = counts.entry(dn).or_insert(0);
                        if *count == 0 {
                            order.push(dn);
                        }
                        *count += 1;
                    }
                }
            }
            Ok(order
                .into_iter()
                .filter(|dn| counts.get(dn).copied() == Some(vs.len()))
                .collect())
        }
        Criteria::Or(vs) => union(vs, records),
        Criteria::Not(vs) => {
            let excluded: HashSet<&'a str> = union(vs, records)?.into_iter().collect();
            Ok(records
                .iter()
                .map(|e| e.get_dn())
                .filter(|dn| !excluded.contains(dn))
                .collect())
        }
    }
}

fn union<'a>(vs: &[Criteria], records: &'a [Entry]) -> Result<Vec<&'a str>, OperationError> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut dns = Vec::new();
    for child in vs {
        for dn in match_dns(child, records)? {
            if seen.insert(dn) {
                dns.push(dn);
            }
        }
    }
    Ok(dns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(dn: &str, avas: &[(&str, &str)]) -> Entry {
        let mut e = Entry::new(dn);
        avas.iter().for_each(|(k, v)| e.add_ava(k, v));
        e
    }

    fn records() -> Vec<Entry> {
        vec![
            e(
                "cn=a,dc=example,dc=com",
                &[("uid", "a"), ("mail", "a@example.com"), ("ou", "x")],
            ),
            e(
                "cn=b,dc=example,dc=com",
                &[
                    ("uid", "b"),
                    ("mail", "b@example.com"),
                    ("ou", "x"),
                    ("ou", "y"),
                ],
            ),
            e("cn=c,dc=example,dc=com", &[("uid", "c"), ("ou", "y")]),
        ]
    }

    fn dns(r: Result<Vec<Entry>, OperationError>) -> Vec<String> {
        r.expect("evaluation failed")
            .into_iter()
            .map(|e| e.get_dn().to_string())
            .collect()
    }

    #[test]
    fn test_eval_leaf() {
        sketching::test_init();
        let r = records();
        assert_eq!(
            dns(evaluate(&c_eq("ou", "y"), &r, &[])),
            vec!["cn=b,dc=example,dc=com", "cn=c,dc=example,dc=com"]
        );
        assert_eq!(
            dns(evaluate(&c_pres("mail"), &r, &[])),
            vec!["cn=a,dc=example,dc=com", "cn=b,dc=example,dc=com"]
        );
        assert_eq!(
            dns(evaluate(&c_begins("mail", "b@"), &r, &[])),
            vec!["cn=b,dc=example,dc=com"]
        );
        assert!(dns(evaluate(&c_eq("missing", "a"), &r, &[])).is_empty());
    }

    #[test]
    fn test_eval_and_is_intersection() {
        let r = records();
        let crit = c_and(vec![c_eq("ou", "x"), c_eq("ou", "y")]);
        assert_eq!(dns(evaluate(&crit, &r, &[])), vec!["cn=b,dc=example,dc=com"]);

        // A child that matches the same dn twice still only counts once.
        let crit = c_and(vec![
            c_or(vec![c_eq("ou", "x"), c_eq("ou", "y")]),
            c_eq("uid", "c"),
        ]);
        assert_eq!(dns(evaluate(&crit, &r, &[])), vec!["cn=c,dc=example,dc=com"]);

        assert!(dns(evaluate(&c_and(vec![]), &r, &[])).is_empty());
    }

    #[test]
    fn test_eval_or_is_union() {
        let r = records();
        let crit = c_or(vec![c_eq("uid", "c"), c_eq("ou", "x"), c_eq("uid", "a")]);
        assert_eq!(
            dns(evaluate(&crit, &r, &[])),
            vec![
                "cn=c,dc=example,dc=com",
                "cn=a,dc=example,dc=com",
                "cn=b,dc=example,dc=com"
            ]
        );
    }

    #[test]
    fn test_eval_not_is_complement() {
        let r = records();
        assert_eq!(
            dns(evaluate(&c_not(vec![c_pres("mail")]), &r, &[])),
            vec!["cn=c,dc=example,dc=com"]
        );
    }

    #[test]
    fn test_eval_not_negates_union_of_children() {
        // With several children the group excludes anything any child matched, it does
        // not require every child to fail on its own.
        let r = records();
        let crit = c_not(vec![c_eq("uid", "a"), c_eq("uid", "c")]);
        assert_eq!(dns(evaluate(&crit, &r, &[])), vec!["cn=b,dc=example,dc=com"]);
    }

    #[test]
    fn test_eval_projection() {
        let r = records();
        let res = evaluate(&c_eq("uid", "a"), &r, &["MAIL".to_string()]).expect("eval failed");
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].get_dn(), "cn=a,dc=example,dc=com");
        assert_eq!(res[0].get_attrs().len(), 1);
        assert_eq!(res[0].get_ava_single("mail"), Some("a@example.com"));
    }

    #[test]
    fn test_eval_unsupported_operator_is_eager() {
        // Nothing carries the attribute, but the operator is still refused.
        let r = records();
        let crit = c_or(vec![
            c_eq("uid", "a"),
            c_op("nothing", Operator::Approx, "z"),
        ]);
        assert_eq!(
            evaluate(&crit, &r, &[]),
            Err(OperationError::NotImplemented(String::new()))
        );
        assert_eq!(
            evaluate(&c_op("uid", Operator::Less, "z"), &[], &[]),
            Err(OperationError::NotImplemented(String::new()))
        );
    }
}

//! Wire filter to criteria parsing. This is the inverse of [`FilterCompiler`], and is what
//! lets the in memory backend answer the same queries a real directory would.
//!
//! All the syntax characters are ASCII, so scanning works on bytes and only ever splits
//! the input at ASCII positions.
//!
//! [`FilterCompiler`]: super::FilterCompiler

use crate::filter::Charset;
use crate::prelude::*;

const TWO_BYTE_OPERATORS: [&str; 4] = [">=", "<=", "=~", "~="];

/// Parse a filter whose escaped values are UTF-8.
pub fn parse(filter: &str) -> Result<Criteria, OperationError> {
    parse_with_charset(filter, Charset::utf8())
}

/// Parse a filter whose escaped values are in `charset`.
pub fn parse_with_charset(filter: &str, charset: Charset) -> Result<Criteria, OperationError> {
    parse_component(filter.trim(), charset)
}

fn syntax(err: FilterError) -> OperationError {
    OperationError::FilterSyntax(err)
}

/// True when the byte at `idx` is preceded by an odd run of backslashes.
fn is_escaped(bytes: &[u8], idx: usize) -> bool {
    bytes[..idx]
        .iter()
        .rev()
        .take_while(|b| **b == b'\\')
        .count()
        % 2
        == 1
}

fn parse_component(frag: &str, charset: Charset) -> Result<Criteria, OperationError> {
    let bytes = frag.as_bytes();
    let enclosed = bytes.len() >= 2
        && bytes[0] == b'('
        && bytes[bytes.len() - 1] == b')'
        && !is_escaped(bytes, bytes.len() - 1);
    if !enclosed {
        return Err(syntax(FilterError::NotEnclosed(frag.to_string())));
    }

    let inner = &frag[1..frag.len() - 1];
    match inner.as_bytes().first() {
        Some(b'&') => parse_children(&inner[1..], frag, charset).map(Criteria::And),
        Some(b'|') => parse_children(&inner[1..], frag, charset).map(Criteria::Or),
        Some(b'!') => parse_children(&inner[1..], frag, charset).map(Criteria::Not),
        _ => parse_leaf(inner, frag, charset).map(Criteria::Leaf),
    }
}

fn parse_children(
    rest: &str,
    frag: &str,
    charset: Charset,
) -> Result<Vec<Criteria>, OperationError> {
    let bytes = rest.as_bytes();
    let mut children = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if depth > 0 => {
                // Skip whatever is escaped, it can't open or close anything.
                i += 2;
                continue;
            }
            b'(' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b')' => {
                if depth == 0 {
                    return Err(syntax(FilterError::Unbalanced(frag.to_string())));
                }
                depth -= 1;
                if depth == 0 {
                    children.push(parse_component(&rest[start..=i], charset)?);
                }
            }
            _ if depth == 0 => {
                return Err(syntax(FilterError::Unbalanced(frag.to_string())));
            }
            _ => {}
        }
        i += 1;
    }

    if depth != 0 {
        return Err(syntax(FilterError::Unbalanced(frag.to_string())));
    }
    Ok(children)
}

fn parse_leaf(inner: &str, frag: &str, charset: Charset) -> Result<Leaf, OperationError> {
    let bytes = inner.as_bytes();

    // Two leaves run together, eg "(a=b)(c=d)", are reported before anything else.
    let multiple = (1..bytes.len())
        .any(|i| bytes[i - 1] == b')' && bytes[i] == b'(' && !is_escaped(bytes, i - 1));
    if multiple {
        return Err(syntax(FilterError::MultipleLeafComponents(
            frag.to_string(),
        )));
    }

    let stray = bytes
        .iter()
        .enumerate()
        .any(|(i, b)| (*b == b'(' || *b == b')') && !is_escaped(bytes, i));
    if stray {
        return Err(syntax(FilterError::Unbalanced(frag.to_string())));
    }

    let (op_idx, op_len, op) = find_operator(inner)
        .ok_or_else(|| syntax(FilterError::UnknownMatchingRule(frag.to_string())))?;

    let attr = inner[..op_idx].trim();
    if attr.is_empty() {
        return Err(syntax(FilterError::UnknownMatchingRule(frag.to_string())));
    }

    let raw = &inner[op_idx + op_len..];
    let raw_bytes = raw.as_bytes();
    let wildcards: Vec<usize> = raw_bytes
        .iter()
        .enumerate()
        .filter(|(i, b)| **b == b'*' && !is_escaped(raw_bytes, *i))
        .map(|(i, _)| i)
        .collect();

    let (value, prefix_only) = match wildcards.as_slice() {
        [] => (unescape(raw, charset), false),
        [last] if *last == raw.len() - 1 => (unescape(&raw[..*last], charset), true),
        _ => {
            filter_warn!(?frag, "substring assertion rejected");
            return Err(OperationError::NotImplemented(format!(
                "substring assertions are not supported: {}",
                frag
            )));
        }
    };

    Ok(Leaf {
        attr: AttrString::from(attr),
        op,
        value,
        prefix_only,
    })
}

/// Leftmost unescaped operator, preferring the two byte tokens at each position.
fn find_operator(inner: &str) -> Option<(usize, usize, Operator)> {
    let bytes = inner.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'=' | b'<' | b'>' | b'~' => {
                let two = inner
                    .get(i..i + 2)
                    .filter(|t| TWO_BYTE_OPERATORS.contains(t))
                    .and_then(Operator::from_token);
                if let Some(op) = two {
                    return Some((i, 2, op));
                }
                if let Some(op) = inner.get(i..i + 1).and_then(Operator::from_token) {
                    return Some((i, 1, op));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn flush_escaped(pending: &mut Vec<u8>, charset: Charset, out: &mut String) {
    if !pending.is_empty() {
        out.push_str(&charset.decode(pending));
        pending.clear();
    }
}

/// Decode `\HH` pairs, any other escaped character stands for itself. Runs of escaped
/// bytes are decoded in `charset`, raw text is taken as it is.
fn unescape(raw: &str, charset: Charset) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut pending: Vec<u8> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            let end = raw[i..].find('\\').map(|o| i + o).unwrap_or(raw.len());
            flush_escaped(&mut pending, charset, &mut out);
            out.push_str(&raw[i..end]);
            i = end;
            continue;
        }

        let hi = bytes.get(i + 1).copied().and_then(hex_val);
        let lo = bytes.get(i + 2).copied().and_then(hex_val);
        if let (Some(hi), Some(lo)) = (hi, lo) {
            pending.push((hi << 4) | lo);
            i += 3;
            continue;
        }

        flush_escaped(&mut pending, charset, &mut out);
        i += 1;
        match bytes.get(i) {
            Some(next) if next.is_ascii() => {
                out.push(*next as char);
                i += 1;
            }
            // An escaped multibyte character is picked up as raw text.
            Some(_) => {}
            None => out.push('\\'),
        }
    }
    flush_escaped(&mut pending, charset, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::be::eval::evaluate;
    use crate::filter::{Charset, FilterCompiler};

    fn syntax_err(r: Result<Criteria, OperationError>) -> FilterError {
        match r {
            Err(OperationError::FilterSyntax(e)) => e,
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple() {
        let crit = parse("(&(objectClass=kolabInetOrgPerson)(mail=a@b.com))")
            .expect("failed to parse");
        assert_eq!(
            crit,
            c_and(vec![
                c_eq("objectClass", "kolabInetOrgPerson"),
                c_eq("mail", "a@b.com"),
            ])
        );

        let crit = parse("(|(uid=x)(!(mail=y)(alias=z)))").expect("failed to parse");
        assert_eq!(
            crit,
            c_or(vec![
                c_eq("uid", "x"),
                c_not(vec![c_eq("mail", "y"), c_eq("alias", "z")]),
            ])
        );
    }

    #[test]
    fn test_parse_value_with_equals() {
        let crit = parse("(member=cn=admin,cn=internal,dc=example,dc=com)")
            .expect("failed to parse");
        assert_eq!(
            crit,
            c_eq("member", "cn=admin,cn=internal,dc=example,dc=com")
        );
    }

    #[test]
    fn test_parse_operators() {
        assert_eq!(
            parse("(uidNumber>=10)"),
            Ok(c_op("uidNumber", Operator::GreaterOrEqual, "10"))
        );
        let approx = parse("(cn~=jon)").expect("failed to parse");
        let approx_alt = parse("(cn=~jon)").expect("failed to parse");
        assert_eq!(approx, c_op("cn", Operator::Approx, "jon"));
        assert_eq!(approx, approx_alt);
        assert_eq!(parse("(a<b)"), Ok(c_op("a", Operator::Less, "b")));
    }

    #[test]
    fn test_parse_wildcards() {
        assert_eq!(parse("(mail=*)"), Ok(c_pres("mail")));
        assert_eq!(parse("(cn=Jo*)"), Ok(c_begins("cn", "Jo")));
        assert_eq!(
            parse("(cn=J*n)"),
            Err(OperationError::NotImplemented(String::new()))
        );
        assert_eq!(
            parse("(cn=*n)"),
            Err(OperationError::NotImplemented(String::new()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            syntax_err(parse("(mail=a@b.com")),
            FilterError::NotEnclosed(_)
        ));
        assert!(matches!(
            syntax_err(parse("mail=a@b.com")),
            FilterError::NotEnclosed(_)
        ));
        assert!(matches!(
            syntax_err(parse("(a=b)(c=d)")),
            FilterError::MultipleLeafComponents(_)
        ));
        assert!(matches!(
            syntax_err(parse("(mail)")),
            FilterError::UnknownMatchingRule(_)
        ));
        assert!(matches!(
            syntax_err(parse("(&(a=b)x(c=d))")),
            FilterError::Unbalanced(_)
        ));
        assert!(matches!(
            syntax_err(parse("(&(a=b)(c=d)")),
            FilterError::Unbalanced(_)
        ));
        assert!(matches!(
            syntax_err(parse("(&(a=b))(c=d)")),
            FilterError::Unbalanced(_)
        ));
        assert!(matches!(
            syntax_err(parse("(a=(b)")),
            FilterError::Unbalanced(_)
        ));
    }

    #[test]
    fn test_parse_empty_groups() {
        assert_eq!(parse("(&)"), Ok(c_and(vec![])));
        assert_eq!(
            parse("(&(a=b)(|))"),
            Ok(c_and(vec![c_eq("a", "b"), c_or(vec![])]))
        );
    }

    #[test]
    fn test_parse_escapes() {
        assert_eq!(
            parse("(cn=a\\2ab\\28c\\29d\\5ce)"),
            Ok(c_eq("cn", "a*b(c)d\\e"))
        );
        // Escaped brackets don't count towards nesting.
        assert_eq!(
            parse("(&(cn=\\29)(sn=\\28))"),
            Ok(c_and(vec![c_eq("cn", ")"), c_eq("sn", "(")]))
        );
        assert_eq!(parse("(cn=a\\=b)"), Ok(c_eq("cn", "a=b")));
    }

    #[test]
    fn test_compile_parse_roundtrip() {
        let crit = c_and(vec![
            c_eq("objectClass", "kolabInetOrgPerson"),
            c_or(vec![
                c_eq("mail", "o'neil*(x)@example.com"),
                c_begins("cn", "Mü\\"),
                c_pres("alias"),
            ]),
            c_not(vec![c_eq("sn", "a\0b")]),
        ]);

        let latin1 = Charset::from_label("ISO-8859-1").expect("latin1 label");
        for charset in [Charset::utf8(), latin1] {
            let fc = FilterCompiler::new(None, charset);
            let parsed = parse_with_charset(&fc.compile(&crit), charset).expect("failed to parse");
            assert_eq!(parsed, crit);
        }

        let fc = FilterCompiler::new(Some("(objectClass=top)"), Charset::utf8());
        let parsed = parse(&fc.compile(&crit)).expect("failed to parse");
        assert_eq!(parsed, c_and(vec![c_eq("objectClass", "top"), crit]));
    }

    #[test]
    fn test_parse_charset_escapes() {
        let latin1 = Charset::from_label("ISO-8859-1").expect("latin1 label");
        assert_eq!(
            parse_with_charset("(sn=M\\fcller)", latin1),
            Ok(c_eq("sn", "Müller"))
        );
        assert_eq!(parse("(sn=M\\c3\\bcller)"), Ok(c_eq("sn", "Müller")));
        // Raw text is never re-decoded.
        assert_eq!(
            parse_with_charset("(sn=Müller\\2a)", latin1),
            Ok(c_eq("sn", "Müller*"))
        );
    }

    #[test]
    fn test_roundtrip_operator_characters() {
        let mut e = Entry::new("cn=odd,dc=example,dc=com");
        e.add_ava("cn", "~x");
        e.add_ava("cn", "<x>");
        e.add_ava("mail", "=5");
        let records = vec![e];
        let fc = FilterCompiler::default();

        for crit in [
            c_eq("cn", "~x"),
            c_eq("cn", "<x>"),
            c_eq("mail", "=5"),
            c_begins("cn", "~"),
        ] {
            let wire = fc.compile(&crit);
            let parsed = parse(&wire).expect("failed to parse");
            assert_eq!(parsed, crit, "{}", wire);

            let direct = evaluate(&crit, &records, &[]).expect("direct evaluation failed");
            let back = evaluate(&parsed, &records, &[]).expect("evaluation after parse failed");
            assert_eq!(direct.len(), 1, "{}", wire);
            assert_eq!(direct, back, "{}", wire);
        }

        let less = c_op("uidNumber", Operator::Less, "=5");
        assert_eq!(parse(&fc.compile(&less)), Ok(less));
    }
}

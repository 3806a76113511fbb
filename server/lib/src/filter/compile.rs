//! Criteria to wire filter compilation.
//!
//! Values are escaped following RFC 4515. The filter syntax characters and the
//! operator characters are always written as `\HH` pairs, so a value can never change
//! the shape of the leaf it sits in. When the directory is not UTF-8, values are
//! transcoded to its charset and every byte outside of ASCII is escaped as well.

use std::borrow::Cow;
use std::fmt::Write;

use encoding_rs::{Encoding, UTF_8};

use crate::prelude::*;

/// The character set the directory expects values in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Default for Charset {
    fn default() -> Self {
        Charset(UTF_8)
    }
}

impl Charset {
    pub fn utf8() -> Self {
        Charset(UTF_8)
    }

    /// Accepts any WHATWG encoding label, eg `UTF-8`, `ISO-8859-1` or `ASCII`.
    pub fn from_label(label: &str) -> Result<Self, OperationError> {
        match Encoding::for_label(label.trim().as_bytes()) {
            // Encodings that can't be written, like UTF-16, aren't usable in a filter.
            Some(enc) if enc == enc.output_encoding() => Ok(Charset(enc)),
            _ => Err(OperationError::InvalidConfig(format!(
                "unsupported directory charset {}",
                label
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        self.0.name()
    }

    pub fn is_utf8(self) -> bool {
        self.0 == UTF_8
    }

    fn encode(self, value: &str) -> Cow<'_, [u8]> {
        let (bytes, _, unmappable) = self.0.encode(value);
        if unmappable {
            filter_warn!(charset = self.name(), "value not representable in directory charset");
        }
        bytes
    }

    /// Decode bytes received in this charset. Invalid sequences become U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        self.0.decode_without_bom_handling(bytes).0.into_owned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterCompiler {
    base_filter: Option<String>,
    charset: Charset,
}

impl FilterCompiler {
    /// The base filter may be given with or without its enclosing brackets.
    pub fn new(base_filter: Option<&str>, charset: Charset) -> Self {
        let base_filter = base_filter
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(|b| {
                if b.starts_with('(') {
                    b.to_string()
                } else {
                    format!("({})", b)
                }
            });
        FilterCompiler {
            base_filter,
            charset,
        }
    }

    pub fn base_filter(&self) -> Option<&str> {
        self.base_filter.as_deref()
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn compile(&self, crit: &Criteria) -> String {
        let compiled = if crit.is_empty() {
            FILTER_UNIVERSAL.to_string()
        } else {
            let mut out = String::new();
            self.write_criteria(crit, &mut out);
            out
        };

        match &self.base_filter {
            Some(base) => format!("(&{}{})", base, compiled),
            None => compiled,
        }
    }

    fn write_criteria(&self, crit: &Criteria, out: &mut String) {
        let (sym, vs) = match crit {
            Criteria::Leaf(leaf) => {
                out.push('(');
                out.push_str(leaf.attr.as_str());
                out.push_str(leaf.op.as_str());
                escape_value_into(&leaf.value, self.charset, out);
                if leaf.prefix_only {
                    out.push('*');
                }
                out.push(')');
                return;
            }
            Criteria::And(vs) => ('&', vs),
            Criteria::Or(vs) => ('|', vs),
            Criteria::Not(vs) => ('!', vs),
        };

        out.push('(');
        out.push(sym);
        vs.iter().for_each(|c| self.write_criteria(c, out));
        out.push(')');
    }
}

pub fn escape_value(value: &str, charset: Charset) -> String {
    let mut out = String::with_capacity(value.len());
    escape_value_into(value, charset, &mut out);
    out
}

fn escape_byte(b: u8, out: &mut String) {
    // Writing to a String can't fail.
    let _ = write!(out, "\\{:02x}", b);
}

fn escape_value_into(value: &str, charset: Charset, out: &mut String) {
    let escaped = |c: char| matches!(c, '*' | '(' | ')' | '\\' | '\0' | '=' | '~' | '<' | '>');

    if charset.is_utf8() {
        for c in value.chars() {
            if escaped(c) {
                escape_byte(c as u8, out);
            } else {
                out.push(c);
            }
        }
        return;
    }

    for b in charset.encode(value).iter().copied() {
        if !b.is_ascii() || escaped(b as char) {
            escape_byte(b, out);
        } else {
            out.push(b as char);
        }
    }
}

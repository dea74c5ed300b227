//! Literal-only argument resolution.
//!
//! An argument resolves only when its expression is a constant: a string
//! (including implicit concatenation, parentheses and `+` between strings),
//! a boolean, a number or `None`. Names, calls, subscripts and f-strings with
//! interpolation are `Unresolved`; no data flow is followed.

use tree_sitter::Node;

use crate::python::scan::{RawArg, RawCall, node_text};
use crate::rules::catalog::ArgSlot;
use crate::sites::model::{CallSite, Literal, Resolved};

/// Turn a matched call into a `CallSite` with every argument role resolved.
pub fn resolve_call(raw: &RawCall<'_, '_>, source: &str, path: &str) -> CallSite {
    let entry = raw.entry;
    let trust_flags = entry
        .trust_flags
        .iter()
        .map(|flag| {
            let value = resolve_slot(&ArgSlot::keyword(flag), &raw.args, source);
            (flag.clone(), value)
        })
        .collect();

    CallSite {
        path: path.to_string(),
        line: raw.line,
        api: entry.name.clone(),
        identifier: resolve_slot(&entry.identifier, &raw.args, source),
        revision: resolve_slot(&entry.revision, &raw.args, source),
        trust_flags,
    }
}

/// Keyword first, then position.
///
/// `*args` reached before the wanted position, or `**kwargs` when the keyword
/// was not written out, means the value exists only at runtime.
fn resolve_slot(slot: &ArgSlot, args: &[RawArg<'_>], source: &str) -> Resolved {
    if let Some(keyword) = &slot.keyword {
        let explicit = args.iter().find_map(|arg| match arg {
            RawArg::Keyword(name, value) if name == keyword => Some(*value),
            _ => None,
        });
        if let Some(value) = explicit {
            return resolve_expr(value, source);
        }
    }

    if let Some(position) = slot.position {
        let mut index = 0;
        for arg in args {
            match arg {
                RawArg::Positional(value) => {
                    if index == position {
                        return resolve_expr(*value, source);
                    }
                    index += 1;
                }
                RawArg::Splat => return Resolved::Unresolved,
                RawArg::Keyword(..) | RawArg::KwSplat => {}
            }
        }
    }

    if slot.keyword.is_some() && args.iter().any(|arg| matches!(arg, RawArg::KwSplat)) {
        return Resolved::Unresolved;
    }
    Resolved::Absent
}

fn resolve_expr(node: Node<'_>, source: &str) -> Resolved {
    match node.kind() {
        "string" => string_literal(node, source),
        "concatenated_string" => {
            let mut cursor = node.walk();
            let parts: Vec<Resolved> = node
                .named_children(&mut cursor)
                .filter(|part| part.kind() != "comment")
                .map(|part| string_literal(part, source))
                .collect();
            join_strings(parts)
        }
        "parenthesized_expression" => {
            let mut cursor = node.walk();
            let inner: Vec<Node<'_>> = node
                .named_children(&mut cursor)
                .filter(|n| n.kind() != "comment")
                .collect();
            match inner.as_slice() {
                [only] => resolve_expr(*only, source),
                _ => Resolved::Unresolved,
            }
        }
        "binary_operator" => {
            let operator = node
                .child_by_field_name("operator")
                .map(|op| op.kind() == "+")
                .unwrap_or(false);
            match (node.child_by_field_name("left"), node.child_by_field_name("right")) {
                (Some(left), Some(right)) if operator => join_strings(vec![
                    resolve_expr(left, source),
                    resolve_expr(right, source),
                ]),
                _ => Resolved::Unresolved,
            }
        }
        "true" => Resolved::Literal(Literal::Bool(true)),
        "false" => Resolved::Literal(Literal::Bool(false)),
        "none" => Resolved::Literal(Literal::None),
        "integer" | "float" => number(node, source),
        "unary_operator" => {
            let negated = node
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "-");
            let operand = node.child_by_field_name("argument");
            match operand {
                Some(arg) if negated && matches!(arg.kind(), "integer" | "float") => {
                    match node_text(node, source) {
                        Some(text) => Resolved::Literal(Literal::Number(text.replace(' ', ""))),
                        None => Resolved::Unresolved,
                    }
                }
                _ => Resolved::Unresolved,
            }
        }
        _ => Resolved::Unresolved,
    }
}

fn number(node: Node<'_>, source: &str) -> Resolved {
    match node_text(node, source) {
        Some(text) => Resolved::Literal(Literal::Number(text.to_string())),
        None => Resolved::Unresolved,
    }
}

/// Concatenate string parts; any non-string part poisons the result.
fn join_strings(parts: Vec<Resolved>) -> Resolved {
    let mut joined = String::new();
    for part in parts {
        match part {
            Resolved::Literal(Literal::Str(s)) => joined.push_str(&s),
            _ => return Resolved::Unresolved,
        }
    }
    Resolved::Literal(Literal::Str(joined))
}

fn string_literal(node: Node<'_>, source: &str) -> Resolved {
    if node.kind() != "string" {
        return Resolved::Unresolved;
    }
    let Some(text) = node_text(node, source) else {
        return Resolved::Unresolved;
    };

    let prefix_len = text.find(['"', '\'']).unwrap_or(text.len());
    let prefix = text[..prefix_len].to_ascii_lowercase();
    if prefix.contains('b') {
        return Resolved::Unresolved;
    }
    let formatted = prefix.contains('f');
    if formatted && has_interpolation(node) {
        return Resolved::Unresolved;
    }

    let quoted = &text[prefix_len..];
    let Some(quote) = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|q| quoted.len() >= 2 * q.len() && quoted.starts_with(q) && quoted.ends_with(q))
    else {
        return Resolved::Unresolved;
    };
    let body = &quoted[quote.len()..quoted.len() - quote.len()];

    let mut value = if prefix.contains('r') {
        body.to_string()
    } else {
        unescape(body)
    };
    if formatted {
        value = value.replace("{{", "{").replace("}}", "}");
    }
    Resolved::Literal(Literal::Str(value))
}

fn has_interpolation(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .any(|child| child.kind() == "interpolation");
    found
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(q @ ('\\' | '\'' | '"')) => out.push(q),
            // Line continuation.
            Some('\n') => {}
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.by_ref().take(width).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(ch) if digits.len() == width => out.push(ch),
                    _ => {
                        out.push('\\');
                        out.push(kind);
                        out.push_str(&digits);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

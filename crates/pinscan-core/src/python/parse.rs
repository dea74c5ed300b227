use tracing::debug;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::ParseError;

/// Parse Python source into a syntax tree.
///
/// tree-sitter recovers from errors and always yields a tree; a tree that
/// contains error or missing nodes is rejected here so that a half-parsed
/// file never contributes call sites.
pub fn parse_python(source: &str) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    let lang: Language = tree_sitter_python::LANGUAGE.into();
    parser
        .set_language(&lang)
        .map_err(|e| ParseError::Grammar(e.to_string()))?;

    debug!(source_len = source.len(), "parsing python source");

    let tree = parser.parse(source, None).ok_or(ParseError::NoTree)?;
    let root = tree.root_node();
    if root.has_error() {
        let (line, column) = first_error(root).unwrap_or((1, 1));
        return Err(ParseError::Syntax { line, column });
    }
    Ok(tree)
}

/// 1-based position of the first error or missing node, in document order.
fn first_error(root: Node<'_>) -> Option<(usize, usize)> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return Some((pos.row + 1, pos.column + 1));
        }
        // Only descend into subtrees that contain an error.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

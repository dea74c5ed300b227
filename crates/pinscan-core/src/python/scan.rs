use std::collections::HashMap;

use tree_sitter::{Node, Tree};

use crate::rules::catalog::{ApiEntry, Catalog};

/// One argument of a call, before resolution.
#[derive(Debug, Clone)]
pub enum RawArg<'t> {
    Positional(Node<'t>),
    Keyword(String, Node<'t>),
    /// `*args`: positions after this point are unknown.
    Splat,
    /// `**kwargs`: any keyword may be supplied dynamically.
    KwSplat,
}

/// A call expression that matched a catalog entry.
#[derive(Debug, Clone)]
pub struct RawCall<'t, 'c> {
    pub entry: &'c ApiEntry,
    /// 1-based line of the call expression.
    pub line: usize,
    pub args: Vec<RawArg<'t>>,
}

/// Find every call in `tree` that targets a catalog API, in source order.
///
/// Matching is purely syntactic: `Recv.func(...)` matches on the last segment
/// of the receiver, `func(...)` on the bare name, both after undoing
/// `from x import Name as Alias`. Calls that share a method name with a
/// catalog entry but target an unrelated object can still match.
pub fn scan_calls<'t, 'c>(
    tree: &'t Tree,
    source: &str,
    catalog: &'c Catalog,
) -> Vec<RawCall<'t, 'c>> {
    let mut calls = Vec::new();
    let mut aliases = HashMap::new();

    let mut cursor = tree.walk();
    loop {
        let node = cursor.node();
        match node.kind() {
            "call" => calls.push(node),
            "import_from_statement" => collect_aliases(node, source, &mut aliases),
            _ => {}
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return calls
                    .into_iter()
                    .filter_map(|call| match_call(call, source, catalog, &aliases))
                    .collect();
            }
        }
    }
}

fn match_call<'t, 'c>(
    call: Node<'t>,
    source: &str,
    catalog: &'c Catalog,
    aliases: &HashMap<String, String>,
) -> Option<RawCall<'t, 'c>> {
    let function = call.child_by_field_name("function")?;
    let unalias = |name: &str| aliases.get(name).cloned().unwrap_or_else(|| name.to_string());

    let entry = match function.kind() {
        "identifier" => catalog.lookup(None, &unalias(node_text(function, source)?)),
        "attribute" => {
            let method = node_text(function.child_by_field_name("attribute")?, source)?;
            let receiver = function
                .child_by_field_name("object")
                .and_then(|obj| last_segment(obj, source))
                .map(unalias);
            catalog.lookup(receiver.as_deref(), method)
        }
        _ => None,
    }?;

    Some(RawCall {
        entry,
        line: call.start_position().row + 1,
        args: collect_args(call, source),
    })
}

/// `a.b.C` → `C`, `C` → `C`; anything else (calls, subscripts) has no name.
fn last_segment<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    match node.kind() {
        "identifier" => node_text(node, source),
        "attribute" => node_text(node.child_by_field_name("attribute")?, source),
        _ => None,
    }
}

fn collect_args<'t>(call: Node<'t>, source: &str) -> Vec<RawArg<'t>> {
    let Some(list) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    // `f(x for x in y)`: a bare generator is the only argument.
    if list.kind() == "generator_expression" {
        return vec![RawArg::Positional(list)];
    }

    let mut cursor = list.walk();
    let args = list
        .named_children(&mut cursor)
        .filter_map(|arg| match arg.kind() {
            "comment" => None,
            "list_splat" => Some(RawArg::Splat),
            "dictionary_splat" => Some(RawArg::KwSplat),
            "keyword_argument" => {
                let name = node_text(arg.child_by_field_name("name")?, source)?;
                let value = arg.child_by_field_name("value")?;
                Some(RawArg::Keyword(name.to_string(), value))
            }
            _ => Some(RawArg::Positional(arg)),
        })
        .collect();
    args
}

/// Record `from pkg import Name as Alias` so that `Alias` maps back to `Name`.
fn collect_aliases(stmt: Node<'_>, source: &str, aliases: &mut HashMap<String, String>) {
    let mut cursor = stmt.walk();
    for imported in stmt.children_by_field_name("name", &mut cursor) {
        if imported.kind() != "aliased_import" {
            continue;
        }
        let original = imported
            .child_by_field_name("name")
            .and_then(|n| node_text(n, source))
            .and_then(|dotted| dotted.rsplit('.').next());
        let alias = imported
            .child_by_field_name("alias")
            .and_then(|n| node_text(n, source));
        if let (Some(original), Some(alias)) = (original, alias) {
            aliases.insert(alias.to_string(), original.to_string());
        }
    }
}

pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    source.get(node.byte_range())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::parse::parse_python;

    fn matched(src: &str) -> Vec<(String, usize, usize)> {
        let catalog = Catalog::builtin().unwrap();
        let tree = parse_python(src).expect("valid python");
        scan_calls(&tree, src, &catalog)
            .into_iter()
            .map(|c| (c.entry.name.clone(), c.line, c.args.len()))
            .collect()
    }

    fn names(src: &str) -> Vec<String> {
        matched(src).into_iter().map(|(n, _, _)| n).collect()
    }

    #[test]
    fn finds_receiver_and_function_calls_in_source_order() {
        let src = r#"
from datasets import load_dataset
from transformers import AutoModel, AutoTokenizer

ds = load_dataset("imdb")
tok = AutoTokenizer.from_pretrained("bert-base-uncased")
m = AutoModel.from_pretrained("bert-base-uncased", revision="main")
"#;
        let hits = matched(src);
        assert_eq!(
            hits,
            vec![
                ("load_dataset".to_string(), 5, 1),
                ("AutoTokenizer.from_pretrained".to_string(), 6, 1),
                ("AutoModel.from_pretrained".to_string(), 7, 2),
            ]
        );
    }

    #[test]
    fn multi_line_call_reports_its_first_line() {
        let src = "x = 1\nsnapshot_download(\n    repo_id=\"org/model\",\n    revision=\"v1\",\n)\n";
        assert_eq!(matched(src), vec![("snapshot_download".to_string(), 2, 2)]);
    }

    #[test]
    fn module_qualified_calls_match_function_entries() {
        let src = "import datasets\nimport huggingface_hub as hub\ndatasets.load_dataset(\"imdb\")\nhub.hf_hub_download(\"org/m\", \"config.json\")\n";
        assert_eq!(names(src), vec!["load_dataset", "hf_hub_download"]);
    }

    #[test]
    fn fully_qualified_receiver_matches() {
        let src = "import transformers\ntransformers.AutoModel.from_pretrained(\"org/model\")\n";
        assert_eq!(names(src), vec!["AutoModel.from_pretrained"]);
    }

    #[test]
    fn import_aliases_are_undone() {
        let src = r#"
from transformers import AutoModel as AM
from datasets import load_dataset as ld
AM.from_pretrained("org/model")
ld("imdb")
"#;
        assert_eq!(names(src), vec!["AutoModel.from_pretrained", "load_dataset"]);
    }

    #[test]
    fn unknown_apis_are_ignored() {
        let src = "print('hi')\nSomething.from_pretrained('x')\nrequests.get('http://x')\n";
        assert!(matched(src).is_empty());
    }

    #[test]
    fn nested_calls_are_found() {
        let src = "wrap(AutoModel.from_pretrained(load_dataset(\"imdb\")))\n";
        assert_eq!(names(src), vec!["AutoModel.from_pretrained", "load_dataset"]);
    }

    #[test]
    fn calls_inside_functions_and_classes_are_found() {
        let src = r#"
class Loader:
    def load(self):
        if True:
            return AutoTokenizer.from_pretrained("org/tok")
"#;
        assert_eq!(matched(src), vec![("AutoTokenizer.from_pretrained".to_string(), 5, 1)]);
    }

    #[test]
    fn splats_and_comments_are_classified() {
        let catalog = Catalog::builtin().unwrap();
        let src = "load_dataset(\n    # comment\n    *args,\n    name='x',\n    **kwargs,\n)\n";
        let tree = parse_python(src).unwrap();
        let calls = scan_calls(&tree, src, &catalog);
        assert_eq!(calls.len(), 1);
        let kinds: Vec<&str> = calls[0]
            .args
            .iter()
            .map(|a| match a {
                RawArg::Positional(_) => "pos",
                RawArg::Keyword(..) => "kw",
                RawArg::Splat => "splat",
                RawArg::KwSplat => "kwsplat",
            })
            .collect();
        assert_eq!(kinds, vec!["splat", "kw", "kwsplat"]);
    }

    #[test]
    fn scanning_is_idempotent() {
        let src = "load_dataset('a')\nAutoModel.from_pretrained('b', revision='main')\n";
        assert_eq!(matched(src), matched(src));
    }
}

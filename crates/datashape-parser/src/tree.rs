//! Parsed source trees and capture-set execution.

use std::collections::BTreeMap;

use datashape_core::Language;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor, Tree};

use crate::error::ParseError;

/// Captures named `helper_*` must equal a literal once quotes are stripped.
pub const ANCHOR_PREFIX: &str = "helper_";
/// Prefix of captures bound to rule parameters.
pub const PARAM_PREFIX: &str = "param_";
/// Capture on the root of every generated query.
pub const RULE_CAPTURE: &str = "rule";

/// Get the tree-sitter grammar for a language.
#[must_use]
pub fn grammar(language: Language) -> Option<tree_sitter::Language> {
    match language {
        Language::Ruby => Some(tree_sitter_ruby::LANGUAGE.into()),
        Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        Language::Other => None,
    }
}

/// Remove one pair of matching surrounding quotes.
#[must_use]
pub fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Source text together with its concrete syntax tree.
pub struct SourceTree {
    language: Language,
    source: String,
    tree: Tree,
}

impl SourceTree {
    pub fn parse(language: Language, source: impl Into<String>) -> Result<Self, ParseError> {
        let source = source.into();
        let grammar = grammar(language).ok_or(ParseError::UnsupportedLanguage(language))?;

        let mut parser = Parser::new();
        parser
            .set_language(&grammar)
            .map_err(|source| ParseError::Grammar { language, source })?;

        let tree = parser
            .parse(&source, None)
            .ok_or(ParseError::Failed(language))?;

        Ok(Self {
            language,
            source,
            tree,
        })
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Text covered by a node of this tree.
    #[must_use]
    pub fn content<'s>(&'s self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    /// First error or missing node in the tree, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<Node<'_>> {
        if !self.root_node().has_error() {
            return None;
        }
        let mut found = None;
        self.for_each_node(|node| {
            if found.is_none() && (node.is_error() || node.is_missing()) {
                found = Some(node);
            }
        });
        found
    }

    /// Visit every node in pre-order.
    pub fn for_each_node<'t, F>(&'t self, mut visit: F)
    where
        F: FnMut(Node<'t>),
    {
        let mut cursor = self.tree.walk();
        loop {
            visit(cursor.node());
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return;
                }
            }
        }
    }

    /// Run a query over the whole tree.
    ///
    /// Matches whose `helper_*` captures do not equal their literal are dropped.
    /// The literal comes from `anchors` when present, otherwise from the
    /// capture name itself (`@helper_new` must read `new`).
    pub fn captures<'t>(&'t self, query: &Query, anchors: &BTreeMap<String, String>) -> Vec<CaptureSet<'t>> {
        let names = query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, self.root_node(), self.source.as_bytes());

        let mut results = Vec::new();
        while let Some(mat) = matches.next() {
            let mut set = CaptureSet::default();
            let mut anchored = true;

            for cap in mat.captures {
                let name = names[cap.index as usize];
                if let Some(literal) = name.strip_prefix(ANCHOR_PREFIX) {
                    let expected = anchors.get(name).map(String::as_str).unwrap_or(literal);
                    if strip_quotes(self.content(cap.node)) != expected {
                        anchored = false;
                        break;
                    }
                    continue;
                }
                set.insert(name, cap.node);
            }

            if anchored {
                results.push(set);
            }
        }

        results
    }
}

/// Named nodes bound by a single query match.
#[derive(Debug, Clone, Default)]
pub struct CaptureSet<'tree> {
    nodes: BTreeMap<String, Node<'tree>>,
}

impl<'tree> CaptureSet<'tree> {
    pub fn insert(&mut self, name: &str, node: Node<'tree>) {
        self.nodes.entry(name.to_string()).or_insert(node);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Node<'tree>> {
        self.nodes.get(name).copied()
    }

    /// The node matched by the root of the query.
    #[must_use]
    pub fn rule_node(&self) -> Option<Node<'tree>> {
        self.get(RULE_CAPTURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"email\""), "email");
        assert_eq!(strip_quotes("'email'"), "email");
        assert_eq!(strip_quotes("`email`"), "email");
        assert_eq!(strip_quotes("email"), "email");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("\"email'"), "\"email'");
    }

    #[test]
    fn test_parse_ruby() {
        let tree = SourceTree::parse(Language::Ruby, "user.email").unwrap();
        assert_eq!(tree.root_node().kind(), "program");
        assert!(tree.first_error().is_none());
    }

    #[test]
    fn test_parse_unsupported() {
        let err = SourceTree::parse(Language::Other, "x").err().unwrap();
        assert!(matches!(err, ParseError::UnsupportedLanguage(Language::Other)));
    }

    #[test]
    fn test_first_error() {
        let tree = SourceTree::parse(Language::JavaScript, "foo(;").unwrap();
        assert!(tree.first_error().is_some());
    }

    #[test]
    fn test_for_each_node_visits_leaves() {
        let tree = SourceTree::parse(Language::Ruby, "logger.info(user)").unwrap();
        let mut identifiers = Vec::new();
        tree.for_each_node(|node| {
            if node.kind() == "identifier" {
                identifiers.push(tree.content(node).to_string());
            }
        });
        assert_eq!(identifiers, vec!["logger", "info", "user"]);
    }

    #[test]
    fn test_captures_with_named_anchor() {
        let tree = SourceTree::parse(Language::Ruby, "Foo.new(a)\nFoo.build(b)").unwrap();
        let grammar = grammar(Language::Ruby).unwrap();
        let query = Query::new(
            &grammar,
            "(call receiver: (constant) @helper_Foo method: (identifier) @helper_new) @rule",
        )
        .unwrap();

        let sets = tree.captures(&query, &BTreeMap::new());
        assert_eq!(sets.len(), 1);
        let rule = sets[0].rule_node().unwrap();
        assert_eq!(tree.content(rule), "Foo.new(a)");
        assert!(sets[0].get("helper_new").is_none());
    }

    #[test]
    fn test_captures_with_anchor_map() {
        let tree = SourceTree::parse(Language::Ruby, "Foo.new(a)\nBar.new(b)").unwrap();
        let grammar = grammar(Language::Ruby).unwrap();
        let query = Query::new(&grammar, "(call receiver: (constant) @helper_0 arguments: (argument_list) @param_1) @rule").unwrap();

        let mut anchors = BTreeMap::new();
        anchors.insert("helper_0".to_string(), "Bar".to_string());
        let sets = tree.captures(&query, &anchors);
        assert_eq!(sets.len(), 1);
        assert_eq!(tree.content(sets[0].get("param_1").unwrap()), "(b)");
    }
}

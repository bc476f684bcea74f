//! Query generation from a rewritten pattern tree.
//!
//! Each call returns an owned fragment; children fragments are concatenated in
//! traversal order, so params and capture names are reproducible for a pattern.

use tree_sitter::Node;

use super::substitution::Placeholder;
use super::Param;
use crate::error::PatternError;
use crate::languages::{NodeClass, ParamSpec, PatternLanguage};
use crate::tree::{strip_quotes, SourceTree, ANCHOR_PREFIX, PARAM_PREFIX};

/// Any named node.
pub(crate) const WILDCARD: &str = "(_)";

#[derive(Debug, Default)]
pub(crate) struct Fragment {
    pub text: String,
    pub params: Vec<Param>,
    /// (capture name, literal) pairs for `helper_*` captures.
    pub anchors: Vec<(String, String)>,
}

impl Fragment {
    /// Pin the next appended fragment to the immediately following sibling.
    fn anchor(&mut self) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push('.');
    }

    fn append(&mut self, field: Option<&str>, other: Fragment) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        if let Some(field) = field {
            self.text.push_str(field);
            self.text.push_str(": ");
        }
        self.text.push_str(&other.text);
        self.params.extend(other.params);
        self.anchors.extend(other.anchors);
    }
}

/// Generate the query fragment for `node`, or `None` when the node is ignored.
pub(crate) fn generate<L>(
    lang: &L,
    node: Node<'_>,
    tree: &SourceTree,
    placeholders: &[Placeholder],
) -> Result<Option<Fragment>, PatternError>
where
    L: PatternLanguage + ?Sized,
{
    if node.is_error() || node.is_missing() {
        return Err(syntax_error(node, tree));
    }

    match lang.classify(node, tree.source(), placeholders) {
        NodeClass::Ignore => Ok(None),
        NodeClass::Wildcard => Ok(Some(Fragment {
            text: WILDCARD.to_string(),
            ..Fragment::default()
        })),
        NodeClass::Param(spec) => generate_param(lang, node, tree, placeholders, spec).map(Some),
        NodeClass::Context => {
            // Positional arguments bind to their own slot only.
            let anchored = node.kind() == lang.argument_wrapper() && named_child_count(node) > 1;
            let children = generate_children(lang, node, tree, placeholders, anchored)?;
            let mut fragment = Fragment::default();

            if has_named_children(node) {
                fragment.text = if children.text.is_empty() {
                    format!("({})", node.kind())
                } else {
                    format!("({} {})", node.kind(), children.text)
                };
                fragment.params = children.params;
                fragment.anchors = children.anchors;
            } else {
                let capture = format!("{ANCHOR_PREFIX}{}", node.start_byte());
                fragment.text = format!("({}) @{}", node.kind(), capture);
                fragment
                    .anchors
                    .push((capture, strip_quotes(tree.content(node)).to_string()));
            }

            Ok(Some(fragment))
        }
    }
}

fn generate_param<L>(
    lang: &L,
    node: Node<'_>,
    tree: &SourceTree,
    placeholders: &[Placeholder],
    spec: ParamSpec,
) -> Result<Fragment, PatternError>
where
    L: PatternLanguage + ?Sized,
{
    let capture = format!("{PARAM_PREFIX}{}", spec.placeholder_id);
    let mut fragment = Fragment::default();

    fragment.params.push(Param {
        capture_name: capture.clone(),
        pattern_name: spec.pattern_name,
        string_match: spec.string_match,
        regex_match: None,
        kind: spec.kind,
    });

    if spec.terminating {
        fragment.text = format!("{} @{}", type_pattern(&spec.node_types), capture);
    } else {
        let children = generate_children(lang, node, tree, placeholders, false)?;
        fragment.text = if children.text.is_empty() {
            format!("({}) @{}", node.kind(), capture)
        } else {
            format!("({} {}) @{}", node.kind(), children.text, capture)
        };
        fragment.params.extend(children.params);
        fragment.anchors.extend(children.anchors);
    }

    Ok(fragment)
}

fn generate_children<L>(
    lang: &L,
    node: Node<'_>,
    tree: &SourceTree,
    placeholders: &[Placeholder],
    anchored: bool,
) -> Result<Fragment, PatternError>
where
    L: PatternLanguage + ?Sized,
{
    let mut combined = Fragment::default();
    let mut cursor = node.walk();

    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.is_error() || child.is_missing() {
                return Err(syntax_error(child, tree));
            }
            if child.is_named() && !child.is_extra() {
                if let Some(fragment) = generate(lang, child, tree, placeholders)? {
                    if anchored {
                        combined.anchor();
                    }
                    combined.append(cursor.field_name(), fragment);
                }
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    Ok(combined)
}

fn has_named_children(node: Node<'_>) -> bool {
    named_child_count(node) > 0
}

fn named_child_count(node: Node<'_>) -> usize {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).filter(|child| !child.is_extra()).count()
}

/// `(kind)` for one type, `[(a) (b)]` for alternatives, `(_)` for any named node.
fn type_pattern(node_types: &[String]) -> String {
    match node_types {
        [] => WILDCARD.to_string(),
        [single] => format!("({single})"),
        many => {
            let alternatives: Vec<String> = many.iter().map(|t| format!("({t})")).collect();
            format!("[{}]", alternatives.join(" "))
        }
    }
}

fn syntax_error(node: Node<'_>, tree: &SourceTree) -> PatternError {
    let point = node.start_position();
    let snippet = match node.parent() {
        Some(parent) if tree.content(node).is_empty() => tree.content(parent),
        _ => tree.content(node),
    };
    PatternError::Syntax {
        line: point.row + 1,
        column: point.column + 1,
        snippet: snippet.to_string(),
    }
}

//! Placeholder substitution.
//!
//! Rewrites metavariable tokens in a pattern into synthetic identifiers that the
//! guest grammar parses as ordinary code. Every rewrite embeds a fresh id so the
//! generated capture names stay unique within one rule.

use datashape_core::IdGenerator;

/// Role of a placeholder in the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    ClassName,
    Arguments,
    Anything,
    Variable,
}

impl PlaceholderKind {
    #[must_use]
    pub fn default_name(&self) -> &'static str {
        match self {
            PlaceholderKind::ClassName => "CLASS_NAME",
            PlaceholderKind::Arguments => "ARGUMENT",
            PlaceholderKind::Anything => "ANYTHING",
            PlaceholderKind::Variable => "VARIABLE",
        }
    }
}

/// Spelling of a token in authored patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenShape {
    Literal(&'static str),
    /// `$<NAME>` or `$<NAME:literal>`.
    NamedVariable,
}

/// One entry of a language's token vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRule {
    pub shape: TokenShape,
    pub kind: PlaceholderKind,
    pub prefix: &'static str,
}

/// A token occurrence after rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub id: String,
    pub kind: PlaceholderKind,
    /// Logical name used by filters and metavars.
    pub name: String,
    /// Inline literal from `$<NAME:literal>`.
    pub literal: Option<String>,
    /// Text written into the rewritten pattern.
    pub dummy: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub placeholders: Vec<Placeholder>,
}

#[must_use]
pub fn find_placeholder<'p>(placeholders: &'p [Placeholder], text: &str) -> Option<&'p Placeholder> {
    placeholders.iter().find(|p| p.dummy == text)
}

struct TokenMatch<'a> {
    consumed: usize,
    name: Option<&'a str>,
    literal: Option<&'a str>,
}

impl TokenShape {
    fn match_prefix<'a>(&self, input: &'a str) -> Option<TokenMatch<'a>> {
        match self {
            TokenShape::Literal(token) => input.starts_with(token).then_some(TokenMatch {
                consumed: token.len(),
                name: None,
                literal: None,
            }),
            TokenShape::NamedVariable => {
                let body = input.strip_prefix("$<")?;
                let end = body.find('>')?;
                let inner = &body[..end];
                let (name, literal) = match inner.split_once(':') {
                    Some((name, literal)) => (name, Some(literal)),
                    None => (inner, None),
                };
                if !is_variable_name(name) {
                    return None;
                }
                Some(TokenMatch {
                    consumed: 2 + end + 1,
                    name: Some(name),
                    literal,
                })
            }
        }
    }
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Replace every token occurrence, left to right. At one position the first
/// matching rule of the table wins.
pub fn substitute(pattern: &str, table: &[TokenRule], ids: &mut dyn IdGenerator) -> Substitution {
    let mut text = String::with_capacity(pattern.len());
    let mut placeholders = Vec::new();
    let mut rest = pattern;

    'scan: while let Some(ch) = rest.chars().next() {
        for rule in table {
            if let Some(token) = rule.shape.match_prefix(rest) {
                let id = ids.generate_id();
                let dummy = format!("{}{}", rule.prefix, id);
                text.push_str(&dummy);
                placeholders.push(Placeholder {
                    id,
                    kind: rule.kind,
                    name: token.name.unwrap_or(rule.kind.default_name()).to_string(),
                    literal: token.literal.map(str::to_string),
                    dummy,
                });
                rest = &rest[token.consumed..];
                continue 'scan;
            }
        }
        text.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    Substitution { text, placeholders }
}

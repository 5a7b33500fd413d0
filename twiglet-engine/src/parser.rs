//! Builds the statement tree (the token stream extension tags operate on)
//! from lexed segments.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SyntaxError, TemplateError};
use crate::expr::Expr;
use crate::syntax::{lex, Segment};
use crate::tag::{Tag, TagInstance};

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub nodes: Vec<Node>,
}

/// One statement of a compiled template.
#[derive(Debug, Clone)]
pub enum Node {
    Raw(String),
    Output(Expr),
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Vec<Node>,
    },
    For {
        key: Option<String>,
        value: String,
        iterable: Expr,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Set {
        name: String,
        value: Expr,
    },
    /// `{% set name %}…{% endset %}` captures rendered output.
    SetBlock {
        name: String,
        body: Vec<Node>,
    },
    Tag(TagNode),
}

/// An extension tag occurrence.
#[derive(Debug, Clone)]
pub struct TagNode {
    pub name: String,
    pub line: usize,
    pub instance: Arc<dyn TagInstance>,
    /// Statements up to the tag's end keyword; empty for standalone tags.
    pub body: Vec<Node>,
}

impl TagNode {
    /// The compiled instance as `T`.
    pub fn downcast<T: TagInstance + 'static>(&self) -> Option<&T> {
        self.instance.as_any().downcast_ref::<T>()
    }
}

impl Node {
    /// The extension tag named `name`, if this node is one.
    pub fn as_tag(&self, name: &str) -> Option<&TagNode> {
        match self {
            Node::Tag(tag) if tag.name == name => Some(tag),
            _ => None,
        }
    }
}

pub(crate) fn parse(
    tags: &HashMap<String, Arc<dyn Tag>>,
    name: &str,
    source: &str,
) -> Result<Template, TemplateError> {
    let segments = lex(name, source)?;
    let mut parser = Parser {
        template: name,
        tags,
        segments: segments.into_iter(),
        line: 1,
    };
    let (nodes, _) = parser.body(&[])?;
    Ok(Template {
        name: name.to_string(),
        nodes,
    })
}

/// A closing or intermediate keyword that ended a body.
struct Boundary {
    keyword: String,
    rest: String,
}

struct Parser<'a> {
    template: &'a str,
    tags: &'a HashMap<String, Arc<dyn Tag>>,
    segments: std::vec::IntoIter<Segment>,
    line: usize,
}

impl Parser<'_> {
    fn syntax(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Syntax {
            template: self.template.to_string(),
            line: self.line,
            message: message.into(),
        }
    }

    fn expr(&self, source: &str) -> Result<Expr, TemplateError> {
        Expr::parse(source).map_err(|e| self.syntax(e.message))
    }

    /// Parse statements until one of `ends` (or end of input when empty).
    fn body(&mut self, ends: &[&str]) -> Result<(Vec<Node>, Option<Boundary>), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(segment) = self.segments.next() {
            match segment {
                Segment::Text(text) => nodes.push(Node::Raw(text)),
                Segment::Output { source, line } => {
                    self.line = line;
                    nodes.push(Node::Output(self.expr(&source)?));
                }
                Segment::Tag { source, line } => {
                    self.line = line;
                    let (keyword, rest) = split_keyword(&source);
                    if ends.contains(&keyword) {
                        return Ok((
                            nodes,
                            Some(Boundary {
                                keyword: keyword.to_string(),
                                rest: rest.to_string(),
                            }),
                        ));
                    }
                    nodes.push(self.statement(keyword, rest, &source)?);
                }
            }
        }
        if ends.is_empty() {
            Ok((nodes, None))
        } else {
            Err(self.syntax(format!(
                "unexpected end of template, expected `{}`",
                ends.join("` or `")
            )))
        }
    }

    fn statement(&mut self, keyword: &str, rest: &str, source: &str) -> Result<Node, TemplateError> {
        match keyword {
            "if" => self.if_statement(rest),
            "for" => self.for_statement(rest),
            "set" => self.set_statement(rest),
            _ => {
                if let Some(tag) = self.tags.get(keyword).cloned() {
                    return self.extension(tag, source);
                }
                if keyword.starts_with("end") || matches!(keyword, "else" | "elseif") {
                    return Err(self.syntax(format!("unexpected `{keyword}`")));
                }
                Err(TemplateError::UnknownTag {
                    template: self.template.to_string(),
                    name: keyword.to_string(),
                    line: self.line,
                })
            }
        }
    }

    fn if_statement(&mut self, condition: &str) -> Result<Node, TemplateError> {
        let mut branches = Vec::new();
        let mut condition = self.expr(condition)?;
        loop {
            let (body, boundary) = self.body(&["elseif", "else", "endif"])?;
            branches.push((condition, body));
            match boundary {
                Some(b) if b.keyword == "elseif" => condition = self.expr(&b.rest)?,
                Some(b) if b.keyword == "else" => {
                    let (otherwise, _) = self.body(&["endif"])?;
                    return Ok(Node::If { branches, otherwise });
                }
                _ => {
                    return Ok(Node::If {
                        branches,
                        otherwise: Vec::new(),
                    })
                }
            }
        }
    }

    fn for_statement(&mut self, header: &str) -> Result<Node, TemplateError> {
        let (targets, iterable) = header
            .split_once(" in ")
            .ok_or_else(|| self.syntax("expected `for item in sequence`"))?;
        let names: Vec<&str> = targets.split(',').map(str::trim).collect();
        let (key, value) = match names.as_slice() {
            [value] => (None, value.to_string()),
            [key, value] => (Some(key.to_string()), value.to_string()),
            _ => return Err(self.syntax("expected one or two loop variables")),
        };
        if !value.chars().all(|c| c.is_alphanumeric() || c == '_') || value.is_empty() {
            return Err(self.syntax(format!("invalid loop variable `{value}`")));
        }
        let iterable = self.expr(iterable)?;
        let (body, boundary) = self.body(&["else", "endfor"])?;
        let otherwise = match boundary {
            Some(b) if b.keyword == "else" => self.body(&["endfor"])?.0,
            _ => Vec::new(),
        };
        Ok(Node::For {
            key,
            value,
            iterable,
            body,
            otherwise,
        })
    }

    fn set_statement(&mut self, rest: &str) -> Result<Node, TemplateError> {
        match rest.split_once('=') {
            Some((name, value)) => Ok(Node::Set {
                name: self.variable_name(name)?,
                value: self.expr(value)?,
            }),
            None => {
                let name = self.variable_name(rest)?;
                let (body, _) = self.body(&["endset"])?;
                Ok(Node::SetBlock { name, body })
            }
        }
    }

    fn variable_name(&self, raw: &str) -> Result<String, TemplateError> {
        let name = raw.trim();
        match Expr::parse(name) {
            Ok(Expr::Var(name)) => Ok(name),
            _ => Err(self.syntax(format!("invalid variable name `{name}`"))),
        }
    }

    fn extension(&mut self, tag: Arc<dyn Tag>, source: &str) -> Result<Node, TemplateError> {
        let line = self.line;
        let instance = tag
            .compile(source)
            .map_err(|SyntaxError { message }| self.syntax(message))?;
        let body = match tag.end_tag() {
            Some(end) => self.body(&[end])?.0,
            None => Vec::new(),
        };
        Ok(Node::Tag(TagNode {
            name: tag.name().to_string(),
            line,
            instance,
            body,
        }))
    }
}

fn split_keyword(source: &str) -> (&str, &str) {
    match source.find(char::is_whitespace) {
        Some(i) => (&source[..i], source[i..].trim()),
        None => (source, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_plain(source: &str) -> Result<Template, TemplateError> {
        parse(&HashMap::new(), "test.twig", source)
    }

    #[test]
    fn nests_control_structures() {
        let template =
            parse_plain("{% for k, v in items %}{% if v %}a{% elseif k %}b{% else %}c{% endif %}{% else %}none{% endfor %}")
                .unwrap();
        match &template.nodes[..] {
            [Node::For { key, body, otherwise, .. }] => {
                assert_eq!(key.as_deref(), Some("k"));
                assert!(matches!(&body[..], [Node::If { branches, otherwise }] if branches.len() == 2 && otherwise.len() == 1));
                assert_eq!(otherwise.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn set_forms() {
        let template = parse_plain("{% set a = 1 %}{% set b %}x{% endset %}").unwrap();
        assert!(matches!(&template.nodes[0], Node::Set { name, .. } if name == "a"));
        assert!(matches!(&template.nodes[1], Node::SetBlock { name, .. } if name == "b"));
    }

    #[test]
    fn unknown_and_stray_tags() {
        let err = parse_plain("\n{% nope %}").unwrap_err();
        assert_eq!(err.to_string(), "unknown tag `nope` in test.twig at line 2");
        let err = parse_plain("{% endif %}").unwrap_err();
        assert!(err.to_string().contains("unexpected `endif`"));
        let err = parse_plain("{% if a %}open").unwrap_err();
        assert!(err.to_string().contains("expected `elseif` or `else` or `endif`"));
    }

    #[test]
    fn expression_errors_carry_position() {
        let err = parse_plain("ok\n\n{{ a ~ }}").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { line: 3, .. }), "got {err}");
    }
}

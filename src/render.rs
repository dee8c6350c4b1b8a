use std::collections::BTreeMap;

use crate::error::GenerationError;
use crate::template::Template;

/// A value bound to a placeholder name: plain text, or a list of records
/// iterated by `{% for %}` blocks.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    List(Vec<BTreeMap<String, String>>),
}

/// Name → value mapping consumed by one render call.
pub type RenderContext = BTreeMap<String, Value>;

/// Renders template bodies against a context.
///
/// Supported syntax: `{{ name }}`, `{{ name || default }}`, an
/// `| indent(N)` pipeline suffix, `{% for item in list %} ... {% endfor %}`
/// and `{% if name %} ... {% else %} ... {% endif %}`.
///
/// Placeholders that are absent from the context render as an empty string
/// rather than failing. Templates are user-authored and may reference
/// optional fields, so a typo in a placeholder name is silently masked;
/// check rendered output when authoring a new template. Rendering is purely
/// string-to-string and never inspects the substituted code.
pub struct PromptRenderer;

impl PromptRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a template body against a context.
    pub fn render(
        &self,
        template: &Template,
        context: &RenderContext,
    ) -> Result<String, GenerationError> {
        let tokens = tokenize(&template.body)?;
        let mut pos = 0;
        // Stray end tags fail inside parse_block, so the top level never
        // sees a terminator.
        let (nodes, _) = parse_block(&tokens, &mut pos, &[])?;

        let mut out = String::new();
        render_nodes(&nodes, context, None, &mut out);
        Ok(out)
    }
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

enum Token {
    Text(String),
    Var(String),
    Tag(String),
}

enum Node {
    Text(String),
    Var(VarExpr),
    For {
        var: String,
        list: String,
        body: Vec<Node>,
    },
    If {
        name: String,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
}

struct VarExpr {
    name: String,
    default: Option<String>,
    indent: Option<usize>,
}

fn tokenize(body: &str) -> Result<Vec<Token>, GenerationError> {
    let mut tokens = Vec::new();
    let mut rest = body;

    loop {
        let var_pos = rest.find("{{");
        let tag_pos = rest.find("{%");
        let next = match (var_pos, tag_pos) {
            (Some(v), Some(t)) if v < t => Some((v, true)),
            (Some(_), Some(t)) => Some((t, false)),
            (Some(v), None) => Some((v, true)),
            (None, Some(t)) => Some((t, false)),
            (None, None) => None,
        };

        let Some((pos, is_var)) = next else {
            if !rest.is_empty() {
                tokens.push(Token::Text(rest.to_string()));
            }
            break;
        };

        if pos > 0 {
            tokens.push(Token::Text(rest[..pos].to_string()));
        }
        let after = &rest[pos + 2..];
        let close = if is_var { "}}" } else { "%}" };
        let end = after.find(close).ok_or_else(|| {
            GenerationError::TemplateSyntax(format!(
                "unclosed {} marker",
                if is_var { "{{" } else { "{%" }
            ))
        })?;
        let inner = after[..end].trim().to_string();
        tokens.push(if is_var {
            Token::Var(inner)
        } else {
            Token::Tag(inner)
        });
        rest = &after[end + 2..];
    }

    Ok(tokens)
}

/// Parse tokens until a tag from `stop` or the end of input. Returns the
/// nodes and the terminating tag, if any.
fn parse_block(
    tokens: &[Token],
    pos: &mut usize,
    stop: &[&str],
) -> Result<(Vec<Node>, Option<String>), GenerationError> {
    let mut nodes = Vec::new();

    while *pos < tokens.len() {
        match &tokens[*pos] {
            Token::Text(text) => {
                nodes.push(Node::Text(text.clone()));
                *pos += 1;
            }
            Token::Var(expr) => {
                nodes.push(Node::Var(parse_var_expr(expr)));
                *pos += 1;
            }
            Token::Tag(tag) => {
                let word = tag.split_whitespace().next().unwrap_or("");
                if stop.contains(&word) {
                    let terminator = word.to_string();
                    *pos += 1;
                    return Ok((nodes, Some(terminator)));
                }
                match word {
                    "for" => {
                        let parts: Vec<&str> = tag.split_whitespace().collect();
                        if parts.len() != 4 || parts[2] != "in" {
                            return Err(GenerationError::TemplateSyntax(format!(
                                "malformed for tag: {}",
                                tag
                            )));
                        }
                        *pos += 1;
                        let (body, terminator) = parse_block(tokens, pos, &["endfor"])?;
                        if terminator.is_none() {
                            return Err(GenerationError::TemplateSyntax(
                                "unclosed for block".to_string(),
                            ));
                        }
                        nodes.push(Node::For {
                            var: parts[1].to_string(),
                            list: parts[3].to_string(),
                            body,
                        });
                    }
                    "if" => {
                        let parts: Vec<&str> = tag.split_whitespace().collect();
                        if parts.len() != 2 {
                            return Err(GenerationError::TemplateSyntax(format!(
                                "malformed if tag: {}",
                                tag
                            )));
                        }
                        *pos += 1;
                        let (then_body, terminator) =
                            parse_block(tokens, pos, &["else", "endif"])?;
                        let else_body = match terminator.as_deref() {
                            Some("else") => {
                                let (body, terminator) = parse_block(tokens, pos, &["endif"])?;
                                if terminator.is_none() {
                                    return Err(GenerationError::TemplateSyntax(
                                        "unclosed if block".to_string(),
                                    ));
                                }
                                body
                            }
                            Some(_) => Vec::new(),
                            None => {
                                return Err(GenerationError::TemplateSyntax(
                                    "unclosed if block".to_string(),
                                ));
                            }
                        };
                        nodes.push(Node::If {
                            name: parts[1].to_string(),
                            then_body,
                            else_body,
                        });
                    }
                    _ => {
                        return Err(GenerationError::TemplateSyntax(format!(
                            "unexpected tag: {}",
                            tag
                        )));
                    }
                }
            }
        }
    }

    Ok((nodes, None))
}

/// Parse `name`, `name || default`, `name | indent(N)` or
/// `name || default | indent(N)`.
fn parse_var_expr(expr: &str) -> VarExpr {
    match expr.split_once("||") {
        Some((name, rest)) => {
            let (default, indent) = split_filter(rest);
            VarExpr {
                name: name.trim().to_string(),
                default: Some(unquote(&default)),
                indent,
            }
        }
        None => {
            let (name, indent) = split_filter(expr);
            VarExpr {
                name,
                default: None,
                indent,
            }
        }
    }
}

fn split_filter(expr: &str) -> (String, Option<usize>) {
    let Some((value, filter)) = expr.split_once('|') else {
        return (expr.trim().to_string(), None);
    };
    let value = value.trim().to_string();
    let filter = filter.trim();
    let indent = filter
        .strip_prefix("indent(")
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|n| n.trim().parse::<usize>().ok());
    // An unrecognized filter is dropped, keeping the bare value.
    (value, indent)
}

fn unquote(text: &str) -> String {
    let text = text.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].to_string();
        }
    }
    text.to_string()
}

type Scope<'a> = Option<(&'a str, &'a BTreeMap<String, String>)>;

fn render_nodes(nodes: &[Node], context: &RenderContext, scope: Scope, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(var) => {
                let value = lookup(&var.name, context, scope);
                let text = match value {
                    Some(text) if !text.is_empty() => text,
                    _ => var.default.clone().unwrap_or_default(),
                };
                out.push_str(&apply_indent(&text, var.indent));
            }
            Node::For { var, list, body } => {
                if let Some(Value::List(items)) = context.get(list) {
                    for item in items {
                        render_nodes(body, context, Some((var.as_str(), item)), out);
                    }
                }
            }
            Node::If {
                name,
                then_body,
                else_body,
            } => {
                let branch = if is_truthy(name, context, scope) {
                    then_body
                } else {
                    else_body
                };
                render_nodes(branch, context, scope, out);
            }
        }
    }
}

fn lookup(name: &str, context: &RenderContext, scope: Scope) -> Option<String> {
    if let Some((head, field)) = name.split_once('.') {
        if let Some((var, record)) = scope {
            if head == var {
                return record.get(field).cloned();
            }
        }
        return None;
    }

    match context.get(name) {
        Some(Value::Text(text)) => Some(text.clone()),
        _ => None,
    }
}

fn is_truthy(name: &str, context: &RenderContext, scope: Scope) -> bool {
    if let Some((head, field)) = name.split_once('.') {
        if let Some((var, record)) = scope {
            if head == var {
                return record.get(field).is_some_and(|value| !value.is_empty());
            }
        }
        return false;
    }

    match context.get(name) {
        Some(Value::Text(text)) => !text.is_empty(),
        Some(Value::List(items)) => !items.is_empty(),
        None => false,
    }
}

/// Prefix every line after the first with `n` spaces.
fn apply_indent(text: &str, indent: Option<usize>) -> String {
    let Some(n) = indent else {
        return text.to_string();
    };
    let pad = " ".repeat(n);
    let mut lines = text.split('\n');
    let mut out = String::new();
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        out.push_str(&pad);
        out.push_str(line);
    }
    out
}

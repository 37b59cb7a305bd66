//! Template parser (spec §4.8), ported from `libliquify/parse.c`.

use super::ast::{Expr, FilterCall, Part, Tag, Template};
use super::lexer::{Lexer, Token};

const BLOCK_NAMES: &[&str] = &["if", "for"];
const STANDALONE_NAMES: &[&str] = &["include", "else", "elsif"];

#[derive(Debug, Clone)]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}: {}", self.file, self.line, self.col, self.message)
    }
}

struct OpenBlock {
    name: String,
    part_index: usize,
}

/// Parses `source` into a [`Template`] named `name`, used both for the
/// file this name is loaded from and in error messages (spec §4.8).
pub fn parse(name: &str, source: &str) -> Result<Template, ParseError> {
    let mut parts = Vec::new();
    let mut stack: Vec<OpenBlock> = Vec::new();

    let mut pos = 0usize;
    let mut line = 1usize;
    let mut col = 1usize;
    let bytes = source.as_bytes();
    let mut text_start = 0usize;

    macro_rules! err {
        ($line:expr, $col:expr, $($arg:tt)*) => {
            return Err(ParseError {
                file: name.to_string(),
                line: $line,
                col: $col,
                message: format!($($arg)*),
            })
        };
    }

    while pos < bytes.len() {
        if source[pos..].starts_with("{{") || source[pos..].starts_with("{%") {
            if pos > text_start {
                parts.push(Part::Text(source[text_start..pos].to_string()));
            }
            let is_var = source[pos..].starts_with("{{");
            let marker_line = line;
            let marker_col = col;
            pos += 2;
            col += 2;

            if is_var {
                let mut lexer = Lexer::new(source, pos, line, col, "}}");
                let (expr, filters) = match parse_var_body(&mut lexer) {
                    Ok(v) => v,
                    Err(e) => err!(marker_line, marker_col, "{e}"),
                };
                if let Err(e) = lexer.consume_end() {
                    err!(lexer.line, lexer.col, "{e}");
                }
                pos = lexer.pos;
                line = lexer.line;
                col = lexer.col;
                parts.push(Part::Var { expr, filters });
            } else {
                let mut lexer = Lexer::new(source, pos, line, col, "%}");
                let (tag_name, params) = match parse_tag_body(&mut lexer) {
                    Ok(v) => v,
                    Err(e) => err!(marker_line, marker_col, "{e}"),
                };
                if let Err(e) = lexer.consume_end() {
                    err!(lexer.line, lexer.col, "{e}");
                }
                pos = lexer.pos;
                line = lexer.line;
                col = lexer.col;

                if let Some(block_name) = tag_name.strip_prefix("end") {
                    if BLOCK_NAMES.contains(&block_name) {
                        match stack.last() {
                            Some(open) if open.name == block_name => {
                                let open = stack.pop().unwrap();
                                let end_index = parts.len();
                                if let Part::Tag(Tag::Begin { end, .. }) = &mut parts[open.part_index]
                                {
                                    *end = end_index;
                                }
                                parts.push(Part::Tag(Tag::End {
                                    name: block_name.to_string(),
                                }));
                                text_start = pos;
                                continue;
                            }
                            Some(open) => err!(
                                marker_line,
                                marker_col,
                                "unexpected {{% end{block_name} %}}, expected {{% end{} %}}",
                                open.name
                            ),
                            None => err!(
                                marker_line,
                                marker_col,
                                "unexpected {{% end{block_name} %}}, no open block"
                            ),
                        }
                    }
                }

                if BLOCK_NAMES.contains(&tag_name.as_str()) {
                    parts.push(Part::Tag(Tag::Begin {
                        name: tag_name.clone(),
                        params,
                        end: usize::MAX,
                    }));
                    stack.push(OpenBlock {
                        name: tag_name,
                        part_index: parts.len() - 1,
                    });
                } else if STANDALONE_NAMES.contains(&tag_name.as_str()) {
                    parts.push(Part::Tag(Tag::Standalone {
                        name: tag_name,
                        params,
                    }));
                } else {
                    err!(marker_line, marker_col, "unknown tag '{tag_name}'");
                }
            }
            text_start = pos;
            continue;
        }

        let ch = bytes[pos];
        pos += 1;
        match ch {
            b'\t' => col += 4,
            b'\n' | 0x0c | 0x0b => {
                line += 1;
                col = 1;
            }
            b'\r' => {}
            _ => col += 1,
        }
    }

    if text_start < bytes.len() {
        parts.push(Part::Text(source[text_start..].to_string()));
    }

    if let Some(open) = stack.last() {
        err!(line, col, "unclosed block '{}'", open.name);
    }

    Ok(Template {
        name: name.to_string(),
        parts,
    })
}

/// `{{ expr | filter | filter:"p1","p2" }}`.
fn parse_var_body(lexer: &mut Lexer<'_>) -> Result<(Expr, Vec<FilterCall>), String> {
    let expr = parse_expr(lexer)?;
    let mut filters = Vec::new();
    loop {
        if lexer.at_end() {
            break;
        }
        match lexer.next()? {
            Some(Token::Pipe) => filters.push(parse_filter(lexer)?),
            Some(tok) => return Err(format!("unexpected {tok} in output expression")),
            None => break,
        }
    }
    Ok((expr, filters))
}

fn parse_filter(lexer: &mut Lexer<'_>) -> Result<FilterCall, String> {
    let name = match lexer.next()? {
        Some(Token::Ident(name)) => name,
        other => return Err(format!("expected filter name, found {other:?}")),
    };
    let mut params = Vec::new();
    if lexer.at_end() {
        return Ok(FilterCall { name, params });
    }
    let save = (lexer.pos, lexer.line, lexer.col);
    if matches!(lexer.next()?, Some(Token::Colon)) {
        loop {
            params.push(parse_expr(lexer)?);
            if lexer.at_end() {
                break;
            }
            let save2 = (lexer.pos, lexer.line, lexer.col);
            if !matches!(lexer.next()?, Some(Token::Comma)) {
                lexer.pos = save2.0;
                lexer.line = save2.1;
                lexer.col = save2.2;
                break;
            }
        }
    } else {
        // Not a ':' after all (e.g. the next filter's '|') — rewind so
        // the caller's loop sees it.
        lexer.pos = save.0;
        lexer.line = save.1;
        lexer.col = save.2;
    }
    Ok(FilterCall { name, params })
}

/// `{% name param1 param2… %}`.
fn parse_tag_body(lexer: &mut Lexer<'_>) -> Result<(String, Vec<Expr>), String> {
    let name = match lexer.next()? {
        Some(Token::Ident(name)) => name,
        other => return Err(format!("expected tag name, found {other:?}")),
    };
    if name == "for" {
        return parse_for_params(lexer).map(|params| (name, params));
    }
    let mut params = Vec::new();
    while !lexer.at_end() {
        params.push(parse_expr(lexer)?);
    }
    Ok((name, params))
}

/// `for x in collection`: the middle `in` is a keyword, not an
/// expression, so it needs its own production rather than falling
/// through `parse_expr`'s generic expression grammar.
fn parse_for_params(lexer: &mut Lexer<'_>) -> Result<Vec<Expr>, String> {
    let var = match lexer.next()? {
        Some(Token::Ident(name)) => Expr::Ident(name),
        other => return Err(format!("expected loop variable, found {other:?}")),
    };
    match lexer.next()? {
        Some(Token::Ident(kw)) if kw == "in" => {}
        other => return Err(format!("expected 'in', found {other:?}")),
    }
    let collection = parse_expr(lexer)?;
    Ok(vec![var, collection])
}

/// `ident-or-string (.ident)* ((==|!=) expr)?`, left-associative.
fn parse_expr(lexer: &mut Lexer<'_>) -> Result<Expr, String> {
    let mut expr = match lexer.next()? {
        Some(Token::Ident(name)) => Expr::Ident(name),
        Some(Token::Str(s)) => Expr::Str(s),
        other => return Err(format!("expected expression, found {other:?}")),
    };
    loop {
        if lexer.at_end() {
            break;
        }
        let save = (lexer.pos, lexer.line, lexer.col);
        match lexer.next()? {
            Some(Token::Dot) => match lexer.next()? {
                Some(Token::Ident(field)) => expr = Expr::Path(Box::new(expr), field),
                other => return Err(format!("expected identifier after '.', found {other:?}")),
            },
            Some(Token::EqEq) => {
                let rhs = parse_expr(lexer)?;
                expr = Expr::Eq(Box::new(expr), Box::new(rhs));
            }
            Some(Token::NotEq) => {
                let rhs = parse_expr(lexer)?;
                expr = Expr::Ne(Box::new(expr), Box::new(rhs));
            }
            _ => {
                lexer.pos = save.0;
                lexer.line = save.1;
                lexer.col = save.2;
                break;
            }
        }
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_only_template_round_trips() {
        let tpl = parse("t", "hello, world").unwrap();
        assert_eq!(tpl.parts.len(), 1);
        matches!(&tpl.parts[0], Part::Text(t) if t == "hello, world");
    }

    #[test]
    fn parses_var_with_filters() {
        let tpl = parse("t", "{{ name | escape | upcase }}").unwrap();
        assert_eq!(tpl.parts.len(), 1);
        match &tpl.parts[0] {
            Part::Var { filters, .. } => assert_eq!(filters.len(), 2),
            _ => panic!("expected Var part"),
        }
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let err = parse("t", "{% if x %}body").unwrap_err();
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn mismatched_end_tag_is_an_error() {
        let err = parse("t", "{% if x %}{% endfor %}").unwrap_err();
        assert!(err.message.contains("unexpected"));
    }

    #[test]
    fn for_block_links_begin_to_end() {
        let tpl = parse("t", "{% for x in y %}{{x}}{% endfor %}").unwrap();
        match &tpl.parts[0] {
            Part::Tag(Tag::Begin { end, .. }) => assert_eq!(*end, 2),
            _ => panic!("expected Begin tag"),
        }
    }
}

//! Template AST (spec §3 "Template (AST)", §4.8, §9).
//!
//! Parts live in a flat vector rather than behind pointers, per spec
//! §9's "Template AST with parent pointers... Model as indexed arenas."
//! Expressions, by contrast, are a small owned recursive enum: the
//! grammar in spec §4.8 only ever nests `.ident` traversal and a single
//! `==`/`!=` comparison, so an index arena would add bookkeeping with no
//! payoff at this depth — see `DESIGN.md` for that call.

/// One parsed template: an ordered sequence of parts plus its name (the
/// key templates are loaded and `include`d under).
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone)]
pub enum Part {
    /// Literal text between `{{`/`{%` markers.
    Text(String),
    /// `{{ expr | filter | filter:"p1","p2" }}`.
    Var { expr: Expr, filters: Vec<FilterCall> },
    Tag(Tag),
}

#[derive(Debug, Clone)]
pub enum Tag {
    /// `{% if … %}` / `{% for … %}` — `end` is the index of the matching
    /// `{% endif %}`/`{% endfor %}` part.
    Begin {
        name: String,
        params: Vec<Expr>,
        end: usize,
    },
    /// `{% endif %}` / `{% endfor %}`.
    End { name: String },
    /// `{% include … %}`, `{% else %}`, `{% elsif … %}`.
    Standalone { name: String, params: Vec<Expr> },
}

#[derive(Debug, Clone)]
pub struct FilterCall {
    pub name: String,
    pub params: Vec<Expr>,
}

/// The expression micro-language (spec §4.8): identifier or string,
/// optionally `.ident`-traversed, optionally compared with `==`/`!=`.
/// Left-heavy and left-associative, matched directly by this shape.
#[derive(Debug, Clone)]
pub enum Expr {
    Ident(String),
    Str(String),
    Path(Box<Expr>, String),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

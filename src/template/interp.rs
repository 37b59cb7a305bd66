//! Apply-time interpreter (spec §4.8), ported from `libliquify/apply.c`.
//!
//! Walks a template's flat part list with a cursor, a block stack, and a
//! capture stack that can be marked `inhibit` to discard emitted bytes —
//! the same two deviations from straight-line execution as the source:
//! a block's end-tag may `goto` its opening part (driving `for`
//! iteration) instead of advancing, and a block may suppress emission
//! entirely (driving untaken `if`/`elsif`/`else` branches).

use serde_json::{Map, Value};

use super::ast::{Expr, FilterCall, Part, Tag, Template};
use super::blocks::{self, Frame, FrameData};
use super::filters;

const MAX_INCLUDE_DEPTH: usize = 32;

/// Anything that can resolve a named template for `{% include %}`.
pub trait TemplateLoader {
    fn load(&self, name: &str) -> Option<Template>;
}

struct Capture {
    buffer: String,
    inhibit: bool,
    owner_depth: usize,
}

struct Interpreter<'a, L: TemplateLoader> {
    loader: &'a L,
    vars: Map<String, Value>,
    output: String,
    captures: Vec<Capture>,
    include_depth: usize,
}

/// Applies `template` against `dict`, returning the rendered bytes.
pub fn apply<L: TemplateLoader>(loader: &L, template: &Template, dict: &Value) -> Result<String, String> {
    let vars = dict.as_object().cloned().unwrap_or_default();
    let mut interp = Interpreter {
        loader,
        vars,
        output: String::new(),
        captures: Vec::new(),
        include_depth: 0,
    };
    interp.run(&template.parts)?;
    Ok(interp.output)
}

impl<'a, L: TemplateLoader> Interpreter<'a, L> {
    fn emit(&mut self, text: &str) {
        if let Some(top) = self.captures.last_mut() {
            top.buffer.push_str(text);
        } else {
            self.output.push_str(text);
        }
    }

    fn push_capture(&mut self, inhibit: bool, owner_depth: usize) {
        self.captures.push(Capture {
            buffer: String::new(),
            inhibit,
            owner_depth,
        });
    }

    fn end_capture(&mut self) -> String {
        let cap = self.captures.pop().expect("end_capture with empty stack");
        if cap.inhibit {
            String::new()
        } else {
            cap.buffer
        }
    }

    fn eval(&self, expr: &Expr) -> Value {
        match expr {
            Expr::Ident(name) => self.vars.get(name).cloned().unwrap_or(Value::Null),
            Expr::Str(s) => Value::String(s.clone()),
            Expr::Path(base, field) => match self.eval(base) {
                Value::Object(map) => map.get(field).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            },
            Expr::Eq(a, b) => {
                Value::Bool(Self::value_to_text(&self.eval(a)) == Self::value_to_text(&self.eval(b)))
            }
            Expr::Ne(a, b) => {
                Value::Bool(Self::value_to_text(&self.eval(a)) != Self::value_to_text(&self.eval(b)))
            }
        }
    }

    fn ident_name(expr: &Expr) -> Option<&str> {
        match expr {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    fn value_to_text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn run(&mut self, parts: &[Part]) -> Result<(), String> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut cursor = 0usize;

        while cursor < parts.len() {
            match &parts[cursor] {
                Part::Text(text) => {
                    self.emit(text);
                    cursor += 1;
                }
                Part::Var { expr, filters: filter_calls } => {
                    let value = self.eval(expr);
                    let rendered = self.render_with_filters(&value, filter_calls);
                    self.emit(&rendered);
                    cursor += 1;
                }
                Part::Tag(Tag::Begin { name, params, end }) => {
                    // A `goto` back to this index from the block's end
                    // tag (loop continuation) leaves the frame already
                    // on the stack; anything else is a fresh entry.
                    let reentry = stack.last().map(|f| f.opening) == Some(cursor);
                    let inhibit = self.block_begin(name, params, &mut stack, cursor, reentry)?;
                    if inhibit {
                        let owner_depth = stack.len();
                        self.push_capture(true, owner_depth);
                    }
                    let _ = end;
                    cursor += 1;
                }
                Part::Tag(Tag::End { name }) => {
                    let goto = self.block_end(name, &mut stack)?;
                    match goto {
                        Some(begin_index) => cursor = begin_index,
                        None => {
                            stack.pop();
                            cursor += 1;
                        }
                    }
                }
                Part::Tag(Tag::Standalone { name, params }) => {
                    match name.as_str() {
                        "include" => self.run_include(params)?,
                        "else" => self.run_else(&mut stack)?,
                        "elsif" => self.run_elsif(params, &mut stack)?,
                        other => return Err(format!("unknown standalone tag '{other}'")),
                    }
                    cursor += 1;
                }
            }
        }
        Ok(())
    }

    fn render_with_filters(&self, value: &Value, calls: &[FilterCall]) -> String {
        let mut buf = Self::value_to_text(value);
        for call in calls {
            buf = filters::apply(&call.name, &buf);
        }
        buf
    }

    /// `liquify_block_begin_`: dispatches to the `if`/`for` begin logic,
    /// pushing a fresh frame unless this is a loop re-entry (the frame
    /// is already on the stack).
    fn block_begin(
        &mut self,
        name: &str,
        params: &[Expr],
        stack: &mut Vec<Frame>,
        opening: usize,
        reentry: bool,
    ) -> Result<bool, String> {
        match name {
            "if" => {
                let cond_expr = params.first().ok_or("if requires a condition")?;
                let cond = self.eval(cond_expr);
                let (data, inhibit) = blocks::if_begin(&cond);
                if !reentry {
                    stack.push(Frame {
                        opening,
                        ident: "if".to_string(),
                        data,
                    });
                }
                Ok(inhibit)
            }
            "for" => {
                if !reentry {
                    let var = Self::ident_name(
                        params.first().ok_or("for requires 'x in y'")?,
                    )
                    .ok_or("for loop variable must be an identifier")?
                    .to_string();
                    let collection_expr = params.get(1).ok_or("for requires 'x in y'")?;
                    let collection = self.eval(collection_expr);
                    let (data, current, inhibit) = blocks::for_begin(&var, &collection);
                    if let Some(value) = current {
                        self.vars.insert(var, value);
                    }
                    stack.push(Frame {
                        opening,
                        ident: "for".to_string(),
                        data,
                    });
                    Ok(inhibit)
                } else {
                    Ok(false)
                }
            }
            other => Err(format!("unknown block '{other}'")),
        }
    }

    /// `liquify_block_*_end_` plus the `apply.c` end-tag dispatch: pops
    /// any inhibit-capture this frame owns, then either returns the
    /// index to jump back to (loop continuation) or `None` to fall
    /// through and let the caller pop the frame.
    fn block_end(&mut self, name: &str, stack: &mut [Frame]) -> Result<Option<usize>, String> {
        let frame = stack
            .last()
            .ok_or_else(|| format!("end{name} with no open block"))?;
        if frame.ident != name {
            return Err(format!(
                "unexpected end{name}, expected end{}",
                frame.ident
            ));
        }
        if matches!(self.captures.last(), Some(c) if c.owner_depth == stack.len()) {
            self.end_capture();
        }

        match &mut stack.last_mut().unwrap().data {
            FrameData::If { .. } => Ok(None),
            FrameData::For { var, .. } => {
                let var = var.clone();
                let next = {
                    let frame = stack.last_mut().unwrap();
                    blocks::for_advance(&mut frame.data)
                };
                match next {
                    Some(value) => {
                        self.vars.insert(var, value);
                        Ok(Some(frame_opening(stack)))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    fn run_else(&mut self, stack: &mut [Frame]) -> Result<(), String> {
        let frame = stack.last_mut().ok_or("else with no open if")?;
        let FrameData::If { matched } = &mut frame.data else {
            return Err("else outside of if block".to_string());
        };
        if *matched {
            // An earlier branch already fired: stay/become inhibited.
            self.push_capture(true, stack.len());
        } else {
            // This branch now fires: end whatever inhibit is live.
            if matches!(self.captures.last(), Some(c) if c.owner_depth == stack.len()) {
                self.end_capture();
            }
            *matched = true;
        }
        Ok(())
    }

    fn run_elsif(&mut self, params: &[Expr], stack: &mut [Frame]) -> Result<(), String> {
        let cond_expr = params.first().ok_or("elsif requires a condition")?;
        let cond = self.eval(cond_expr);
        let frame = stack.last_mut().ok_or("elsif with no open if")?;
        let FrameData::If { matched } = &mut frame.data else {
            return Err("elsif outside of if block".to_string());
        };
        if *matched {
            self.push_capture(true, stack.len());
            return Ok(());
        }
        if blocks::truthy(&cond) {
            if matches!(self.captures.last(), Some(c) if c.owner_depth == stack.len()) {
                self.end_capture();
            }
            *matched = true;
        } else {
            // Condition false: stay inhibited (or become inhibited if
            // this is the first elsif after a false `if`).
            if !matches!(self.captures.last(), Some(c) if c.owner_depth == stack.len()) {
                self.push_capture(true, stack.len());
            }
        }
        Ok(())
    }

    fn run_include(&mut self, params: &[Expr]) -> Result<(), String> {
        let name = match params.first() {
            Some(Expr::Str(s)) => s.clone(),
            _ => return Err("include requires a string file name".to_string()),
        };
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            self.emit(&format!("{{ include error: max depth exceeded for '{name}' }}"));
            return Ok(());
        }
        let Some(included) = self.loader.load(&name) else {
            self.emit(&format!("{{ include error: template '{name}' not found }}"));
            return Ok(());
        };
        self.include_depth += 1;
        let result = self.run(&included.parts);
        self.include_depth -= 1;
        result
    }
}

fn frame_opening(stack: &[Frame]) -> usize {
    stack.last().expect("frame present").opening
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parser::parse;

    struct NoIncludes;
    impl TemplateLoader for NoIncludes {
        fn load(&self, _name: &str) -> Option<Template> {
            None
        }
    }

    fn render(src: &str, dict: Value) -> String {
        let tpl = parse("t", src).unwrap();
        apply(&NoIncludes, &tpl, &dict).unwrap()
    }

    #[test]
    fn literal_only_template_renders_unchanged() {
        assert_eq!(render("hello, world", Value::Null), "hello, world");
    }

    #[test]
    fn for_loop_over_array_concatenates_values() {
        let dict = serde_json::json!({ "items": [1, 2, 3] });
        assert_eq!(render("{% for x in items %}{{x}}{% endfor %}", dict), "123");
    }

    #[test]
    fn if_else_emits_else_branch_exactly_once() {
        let dict = serde_json::json!({ "flag": false });
        assert_eq!(
            render("{% if flag %}yes{% else %}no{% endif %}", dict),
            "no"
        );
    }

    #[test]
    fn elsif_chain_picks_first_true_branch() {
        let dict = serde_json::json!({ "a": false, "b": true });
        let src = "{% if a %}A{% elsif b %}B{% else %}C{% endif %}";
        assert_eq!(render(src, dict), "B");
    }

    #[test]
    fn nested_if_inside_for_does_not_leak_capture_state() {
        let dict = serde_json::json!({ "items": [1, 2, 3] });
        let src = "{% for x in items %}{% if x == \"2\" %}two{% else %}other{% endif %}{% endfor %}";
        assert_eq!(render(src, dict), "othertwoother");
    }

    #[test]
    fn mapping_iteration_visits_keys_in_reverse_insertion_order() {
        let dict = serde_json::json!({ "m": { "a": "1", "b": "2", "c": "3" } });
        assert_eq!(render("{% for v in m %}{{v}}{% endfor %}", dict), "321");
    }

    #[test]
    fn escape_filter_neutralises_markup() {
        let dict = serde_json::json!({ "x": "<b>" });
        assert_eq!(render("{{ x | escape }}", dict), "&lt;b&gt;");
    }
}

//! Script engine behind code execution requests

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Dynamic, Engine};

use crate::doc_api::{SharedKernel, register_document_api};
use crate::error::ScriptError;

/// Default cap on operations per script, stops runaway loops
pub const DEFAULT_MAX_OPERATIONS: u64 = 50_000_000;

/// What a finished script produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptOutput {
    /// Everything printed through `print` and `debug`
    pub output: String,
    /// Display form of the final expression, unless it was `()`
    pub value: Option<String>,
}

/// Rhai engine bound to one kernel
///
/// Not `Send`: it shares the kernel through `Rc` and must stay in the
/// context that owns the documents.
pub struct ScriptEngine {
    engine: Engine,
    output: Rc<RefCell<String>>,
}

impl ScriptEngine {
    /// Engine with printing and the core language only
    pub fn new() -> Self {
        let mut engine = Engine::new();
        let output = Rc::new(RefCell::new(String::new()));

        let sink = output.clone();
        engine.on_print(move |text| {
            let mut out = sink.borrow_mut();
            out.push_str(text);
            out.push('\n');
        });

        let sink = output.clone();
        engine.on_debug(move |text, source, pos| {
            let mut out = sink.borrow_mut();
            match source {
                Some(source) => out.push_str(&format!("[{source}:{pos}] {text}\n")),
                None => out.push_str(&format!("[{pos}] {text}\n")),
            }
        });

        // Configure engine for better errors
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(DEFAULT_MAX_OPERATIONS);

        Self { engine, output }
    }

    /// Engine with the document API registered against `kernel`
    pub fn with_kernel(kernel: &SharedKernel) -> Self {
        let mut this = Self::new();
        register_document_api(&mut this.engine, kernel);
        this
    }

    /// Change the operation cap (0 = unlimited)
    pub fn set_max_operations(&mut self, ops: u64) {
        self.engine.set_max_operations(ops);
    }

    /// Compile a script to check for syntax errors without running it
    pub fn compile(&self, code: &str) -> Result<(), ScriptError> {
        self.engine
            .compile(widen_single_quoted(code).as_ref())
            .map(|_| ())
            .map_err(|e| ScriptError::Compile(e.to_string()))
    }

    /// Run a script, capturing what it prints
    pub fn execute(&self, code: &str) -> Result<ScriptOutput, ScriptError> {
        self.output.borrow_mut().clear();

        let code = widen_single_quoted(code);
        let ast = self
            .engine
            .compile(code.as_ref())
            .map_err(|e| ScriptError::Compile(e.to_string()))?;

        let result = self.engine.eval_ast::<Dynamic>(&ast);
        let output = std::mem::take(&mut *self.output.borrow_mut());

        match result {
            Ok(value) => Ok(ScriptOutput {
                output,
                value: (!value.is_unit()).then(|| value.to_string()),
            }),
            Err(e) => {
                tracing::debug!("Script failed: {}", e);
                Err(ScriptError::Runtime {
                    message: e.to_string(),
                    output,
                })
            }
        }
    }

    /// Get a reference to the underlying Rhai engine
    pub fn inner(&self) -> &Engine {
        &self.engine
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite `'text'` literals longer than one character as `"text"`
///
/// Agents habitually quote strings with single quotes, which Rhai reserves
/// for characters. Single-character literals, double-quoted and backtick
/// strings, and comments are left alone.
fn widen_single_quoted(code: &str) -> Cow<'_, str> {
    if !code.contains('\'') {
        return Cow::Borrowed(code);
    }

    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len() + 8);
    let mut i = 0;

    // Copy a delimited run verbatim, honoring backslash escapes
    let copy_quoted = |out: &mut String, i: &mut usize, quote: char| {
        out.push(chars[*i]);
        *i += 1;
        while *i < chars.len() {
            let c = chars[*i];
            out.push(c);
            *i += 1;
            if c == '\\' && *i < chars.len() {
                out.push(chars[*i]);
                *i += 1;
            } else if c == quote {
                break;
            }
        }
    };

    while i < chars.len() {
        match (chars[i], chars.get(i + 1)) {
            (quote @ ('"' | '`'), _) => copy_quoted(&mut out, &mut i, quote),
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    out.push(chars[i]);
                    i += 1;
                }
                out.extend(chars[i..chars.len().min(i + 2)].iter());
                i += 2;
            }
            ('\'', _) => {
                let mut end = i + 1;
                let mut body = String::new();
                let mut len = 0;
                while end < chars.len() && chars[end] != '\'' && chars[end] != '\n' {
                    if chars[end] == '\\' && end + 1 < chars.len() {
                        body.push(chars[end]);
                        end += 1;
                    } else if chars[end] == '"' {
                        body.push('\\');
                    }
                    body.push(chars[end]);
                    end += 1;
                    len += 1;
                }
                if end < chars.len() && chars[end] == '\'' && len != 1 {
                    out.push('"');
                    out.push_str(&body);
                    out.push('"');
                    i = end + 1;
                } else {
                    copy_quoted(&mut out, &mut i, '\'');
                }
            }
            (c, _) => {
                out.push(c);
                i += 1;
            }
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_is_captured() {
        let engine = ScriptEngine::new();
        let out = engine.execute(r#"print("hello"); print(1 + 2);"#).unwrap();
        assert_eq!(out.output, "hello\n3\n");
        assert_eq!(out.value, None);
    }

    #[test]
    fn test_final_value_is_reported() {
        let engine = ScriptEngine::new();
        let out = engine.execute("40 + 2").unwrap();
        assert_eq!(out.value.as_deref(), Some("42"));
    }

    #[test]
    fn test_output_does_not_leak_between_runs() {
        let engine = ScriptEngine::new();
        engine.execute(r#"print("first")"#).unwrap();
        let out = engine.execute(r#"print("second")"#).unwrap();
        assert_eq!(out.output, "second\n");
    }

    #[test]
    fn test_syntax_error() {
        let engine = ScriptEngine::new();
        let err = engine.execute("let = ;").unwrap_err();
        assert!(matches!(err, ScriptError::Compile(_)));
        assert!(engine.compile("let x = 1;").is_ok());
    }

    #[test]
    fn test_runtime_error_keeps_output() {
        let engine = ScriptEngine::new();
        let err = engine.execute(r#"print("before"); throw "boom";"#).unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(err.output(), "before\n");
    }

    #[test]
    fn test_single_quoted_strings() {
        let engine = ScriptEngine::new();
        let out = engine.execute("print('hi')").unwrap();
        assert!(out.output.contains("hi"));

        let out = engine.execute("let c = 'x'; print(type_of(c));").unwrap();
        assert_eq!(out.output, "char\n");
    }

    #[test]
    fn test_widen_leaves_other_literals() {
        assert_eq!(widen_single_quoted(r#"print("it's")"#), r#"print("it's")"#);
        assert_eq!(widen_single_quoted("// don't\nprint('ok')"), "// don't\nprint(\"ok\")");
        assert_eq!(widen_single_quoted(r#"print('say "yo"')"#), r#"print("say \"yo\"")"#);
    }

    #[test]
    fn test_runaway_loop_is_stopped() {
        let mut engine = ScriptEngine::new();
        engine.set_max_operations(1_000);
        assert!(engine.execute("loop { }").is_err());
    }
}

//! Command evaluation on the agent side.

use async_trait::async_trait;

use wirelink_codec::{ObjectView, Value, lookup_property};

/// Evaluates command text against the host application's runtime.
///
/// Evaluation must not fail: anything that goes wrong is reported as
/// [`Value::Error`], which the encoder turns into an error marker for the
/// console. Commands are assumed to be side-effect-free when they originate
/// from stub expansion; that is the operator's responsibility, not the
/// handler's.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Evaluate one command.
    async fn eval(&self, command: &str) -> Value;
}

/// Built-in handler resolving index-expression commands against a fixed
/// root scope.
///
/// Understands exactly the command shape the console produces: a bare
/// identifier followed by zero or more `["property"]` segments, which is
/// also the shape stub expansion generates. Hosts with a real interpreter
/// supply their own [`CommandHandler`] instead.
pub struct ScopeHandler {
    root: wirelink_codec::ObjectRef,
}

impl ScopeHandler {
    /// Create a handler over a root scope object.
    #[must_use]
    pub fn new(root: impl ObjectView + 'static) -> Self {
        Self {
            root: std::sync::Arc::new(root),
        }
    }

    fn eval_sync(&self, command: &str) -> Value {
        let Some((ident, segments)) = parse_path(command) else {
            return Value::error(format!("cannot evaluate \"{command}\""));
        };

        let mut current = match lookup_property(&self.root, &ident) {
            Some(Ok(value)) => value,
            Some(Err(e)) => return Value::error(e.message),
            None => return Value::error(format!("{ident} is not defined")),
        };

        for segment in segments {
            let Value::Object(obj) = &current else {
                return Value::error(format!("cannot index \"{segment}\" into a non-object"));
            };
            current = match lookup_property(obj, &segment) {
                Some(Ok(value)) => value,
                Some(Err(e)) => return Value::error(e.message),
                // Missing property reads as undefined, like any dynamic
                // runtime would report it.
                None => Value::Undefined,
            };
        }
        current
    }
}

#[async_trait]
impl CommandHandler for ScopeHandler {
    async fn eval(&self, command: &str) -> Value {
        self.eval_sync(command)
    }
}

/// Split `ident["a"]["b"]` into the identifier and its unescaped segments.
fn parse_path(command: &str) -> Option<(String, Vec<String>)> {
    let command = command.trim();
    let ident_end = command
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
        .map_or(command.len(), |(i, _)| i);
    if ident_end == 0 {
        return None;
    }

    let ident = command[..ident_end].to_owned();
    let mut rest = &command[ident_end..];
    let mut segments = Vec::new();

    while !rest.is_empty() {
        rest = rest.strip_prefix("[\"")?;
        let (segment, after) = take_quoted(rest)?;
        rest = after.strip_prefix(']')?;
        segments.push(segment);
    }
    Some((ident, segments))
}

/// Consume up to the closing quote, handling `\"` and `\\` escapes.
fn take_quoted(input: &str) -> Option<(String, &str)> {
    let mut out = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((out, &input[i + 1..])),
            '\\' => match chars.next() {
                Some((_, escaped @ ('"' | '\\'))) => out.push(escaped),
                _ => return None,
            },
            _ => out.push(c),
        }
    }
    None
}

//! Conversation transcript types.
//!
//! A transcript is an ordered list of [`Turn`]s. Assistant turns carry the
//! tool invocations the remote assistant reported while composing the answer.

use serde_json::Value;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// One entry in the conversation transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// Empty for user turns
    pub tool_invocations: Vec<ToolInvocation>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            tool_invocations: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            tool_invocations: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tool_invocations: Vec<ToolInvocation>) -> Self {
        self.tool_invocations = tool_invocations;
        self
    }

    pub fn is_user(&self) -> bool {
        self.speaker == Speaker::User
    }
}

/// A backend capability the assistant exercised while producing a turn.
///
/// Argument order is the order the assistant reported them in.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Vec<(String, ArgValue)>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    /// Add an argument, replacing any earlier value under the same key.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.arguments.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.arguments.push((key, value)),
        }
        self
    }

    /// Build an invocation from a JSON object of parameters. A non-object
    /// payload is kept under a single `value` key.
    pub fn from_json(name: impl Into<String>, parameters: Value) -> Self {
        let arguments = match ArgValue::from(parameters) {
            ArgValue::Mapping(pairs) => pairs,
            ArgValue::Null => Vec::new(),
            other => vec![("value".to_string(), other)],
        };
        Self {
            name: name.into(),
            arguments,
        }
    }

    pub fn argument(&self, key: &str) -> Option<&ArgValue> {
        self.arguments.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Loosely structured tool argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Sequence(Vec<ArgValue>),
    Mapping(Vec<(String, ArgValue)>),
}

impl ArgValue {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, ArgValue::Sequence(_) | ArgValue::Mapping(_))
    }
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ArgValue::Null,
            Value::Bool(b) => ArgValue::Bool(b),
            Value::Number(n) => ArgValue::Number(n),
            Value::String(s) => ArgValue::Text(s),
            Value::Array(items) => ArgValue::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                ArgValue::Mapping(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&ArgValue> for Value {
    fn from(value: &ArgValue) -> Self {
        match value {
            ArgValue::Null => Value::Null,
            ArgValue::Bool(b) => Value::Bool(*b),
            ArgValue::Number(n) => Value::Number(n.clone()),
            ArgValue::Text(s) => Value::String(s.clone()),
            ArgValue::Sequence(items) => Value::Array(items.iter().map(Value::from).collect()),
            ArgValue::Mapping(pairs) => Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Text(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Number(value.into())
    }
}

//! Tool-invocation presenter
//!
//! Turns the tool calls attached to an assistant turn into a collapsible
//! summary: a `"N tools used"` label that expands to each call's name and its
//! arguments, one `key: value` line per argument.

use shared::transcript::{ArgValue, ToolInvocation};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSummary {
    pub label: String,
    pub calls: Vec<CallView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallView {
    pub name: String,
    pub parameters: Vec<ParamLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamLine {
    pub key: String,
    pub value: String,
    /// Value spans several lines (a serialized mapping or sequence)
    pub structured: bool,
}

impl fmt::Display for ParamLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// `None` when the turn used no tools.
pub fn present(invocations: &[ToolInvocation]) -> Option<ToolSummary> {
    if invocations.is_empty() {
        return None;
    }
    Some(ToolSummary {
        label: count_label(invocations.len()),
        calls: invocations.iter().map(present_call).collect(),
    })
}

fn count_label(count: usize) -> String {
    if count == 1 {
        "1 tool used".to_string()
    } else {
        format!("{count} tools used")
    }
}

fn present_call(call: &ToolInvocation) -> CallView {
    CallView {
        name: call.name.clone(),
        parameters: call
            .arguments
            .iter()
            .map(|(key, value)| ParamLine {
                key: key.clone(),
                value: render_value(value),
                structured: !value.is_scalar(),
            })
            .collect(),
    }
}

/// Scalars render as their literal text, strings unquoted. Mappings and
/// sequences render as pretty-printed JSON.
pub fn render_value(value: &ArgValue) -> String {
    match value {
        ArgValue::Null => "null".to_string(),
        ArgValue::Bool(b) => b.to_string(),
        ArgValue::Number(n) => render_number(n),
        ArgValue::Text(s) => s.clone(),
        structured => {
            let json = serde_json::Value::from(structured);
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        }
    }
}

/// Integral floats print without a fractional part (`1.0` as `1`).
fn render_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
            // also folds -0.0 into 0
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

impl fmt::Display for ToolSummary {
    /// Expanded plain-text form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)?;
        for call in &self.calls {
            write!(f, "\n  {}", call.name)?;
            for line in &call.parameters {
                let indented = line.value.replace('\n', "\n      ");
                write!(f, "\n    {}: {}", line.key, indented)?;
            }
        }
        Ok(())
    }
}

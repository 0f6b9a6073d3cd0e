use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::Error, types::TraceStep};

/// In-band payload emitted by an instrumented interpreter run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracePayload {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub steps: Vec<TraceStep>,
    #[serde(default)]
    pub execution_time_ms: u64,
}

/// A decoded run: the payload plus the program's own stdout with the
/// payload line removed
#[derive(Debug)]
pub struct DecodedRun {
    pub payload: TracePayload,
    pub output: String,
}

/// Framing strategy for carrying the trace payload over the child's stdout.
///
/// `instrument` wraps user source in a program that records a step per
/// executed line and emits the payload in-band; `decode` separates that
/// payload from whatever the user program printed itself.
pub trait TraceCodec: Send + Sync {
    fn instrument(&self, code: &str, input_data: &Value) -> String;

    fn decode(&self, stdout: &str) -> Result<DecodedRun, Error>;
}

/// The default codec: the payload travels as a single stdout line prefixed
/// with a sentinel marker, JSON after the marker.
pub struct SentinelCodec {
    sentinel: String,
    max_depth: usize,
}

impl SentinelCodec {
    pub fn new(sentinel: impl Into<String>, max_depth: usize) -> Self {
        Self {
            sentinel: sentinel.into(),
            max_depth,
        }
    }
}

impl Default for SentinelCodec {
    fn default() -> Self {
        Self::new("__TRACE__", 3)
    }
}

impl TraceCodec for SentinelCodec {
    fn instrument(&self, code: &str, input_data: &Value) -> String {
        // Single-pass substitution; placeholder-like text inside the user
        // code stays literal. All wrapper names carry a leading underscore
        // so the tracer's snapshot filter hides them, and the user code runs
        // against a scope of its own instead of the wrapper's globals.
        format!(
            r#"import json as _json
import math as _math
import sys as _sys
import time as _time

_USER_CODE = {code}
_INPUT_DATA = _json.loads({input})


def _to_jsonable(value, depth=0):
    if depth > {depth}:
        return repr(value)
    if value is None or isinstance(value, (str, bool)):
        return value
    if isinstance(value, int):
        if -(2 ** 63) <= value < 2 ** 64:
            return value
        return repr(value)
    if isinstance(value, float):
        return value if _math.isfinite(value) else repr(value)
    if isinstance(value, (list, tuple)):
        return [_to_jsonable(item, depth + 1) for item in value]
    if isinstance(value, dict):
        return {{
            str(k): _to_jsonable(v, depth + 1)
            for k, v in value.items()
        }}
    return repr(value)


def _make_tracer(steps):
    def _tracer(frame, event, arg):
        if event == 'line' and frame.f_code.co_filename == '<user_code>':
            steps.append({{
                "line": frame.f_lineno,
                "locals": {{
                    k: _to_jsonable(v)
                    for k, v in frame.f_locals.items()
                    if not k.startswith('_')
                }},
            }})
        return _tracer
    return _tracer


def _main():
    steps = []
    start = _time.perf_counter_ns()
    try:
        code = compile(_USER_CODE, '<user_code>', 'exec')
        scope = {{'__name__': '__main__', '_input_data': _INPUT_DATA}}
        _sys.settrace(_make_tracer(steps))
        try:
            exec(code, scope)
        finally:
            _sys.settrace(None)
        elapsed = (_time.perf_counter_ns() - start) // 1_000_000
        print({sentinel} + _json.dumps({{
            "success": True,
            "steps": steps,
            "execution_time_ms": elapsed,
        }}))
    except Exception as e:
        elapsed = (_time.perf_counter_ns() - start) // 1_000_000
        print({sentinel} + _json.dumps({{
            "success": False,
            "error": str(e),
            "steps": steps,
            "execution_time_ms": elapsed,
        }}))


_main()
"#,
            code = python_string_literal(code),
            input = python_string_literal(&input_data.to_string()),
            depth = self.max_depth,
            sentinel = python_string_literal(&self.sentinel),
        )
    }

    fn decode(&self, stdout: &str) -> Result<DecodedRun, Error> {
        let lines: Vec<&str> = stdout.split('\n').collect();

        // The wrapper emits its payload after the program's own output is
        // complete, so the final marker line is the payload. Earlier lines
        // that happen to start with the marker are user output and keep
        // their place.
        let mut payload_line = None;
        for (index, line) in lines.iter().enumerate() {
            if let Some(rest) = line.strip_prefix(self.sentinel.as_str()) {
                payload_line = Some((index, rest));
            }
        }

        let (payload_index, payload) = match payload_line {
            Some((index, raw)) => (
                Some(index),
                serde_json::from_str(raw).map_err(|e| Error::Protocol(e.to_string()))?,
            ),
            None => (None, TracePayload::default()),
        };

        let mut output_lines = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            if Some(index) != payload_index {
                output_lines.push(*line);
            }
        }

        Ok(DecodedRun {
            payload,
            output: output_lines.join("\n").trim().to_string(),
        })
    }
}

/// Render `s` as a single-quoted Python string literal
fn python_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

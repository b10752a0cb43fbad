//! Console (diagnostic/log sink)
//!
//! Provides `console.log`, `console.warn`, `console.error`, `console.debug`
//! and `console.info` that route output to the tracing crate, unless a custom
//! handler is installed with [`set_console_handler`].

use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

use crate::error::HostResult;
use crate::number::number_to_string;
use crate::object::JsObject;
use crate::realm::{Realm, define_method};
use crate::value::Value;

/// Severity of a console call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    /// `console.log`
    Log,
    /// `console.info`
    Info,
    /// `console.debug`
    Debug,
    /// `console.warn`
    Warn,
    /// `console.error`
    Error,
}

type ConsoleHandler = dyn Fn(ConsoleLevel, &str) + Send + Sync + 'static;

static CONSOLE_HANDLER: OnceLock<Mutex<Arc<ConsoleHandler>>> = OnceLock::new();

/// Replace the process-wide console handler
pub fn set_console_handler(handler: impl Fn(ConsoleLevel, &str) + Send + Sync + 'static) {
    let lock = CONSOLE_HANDLER.get_or_init(|| Mutex::new(Arc::new(default_console_handler)));
    *lock.lock() = Arc::new(handler);
}

/// Restore the tracing-backed handler
pub fn reset_console_handler() {
    set_console_handler(default_console_handler);
}

fn default_console_handler(level: ConsoleLevel, message: &str) {
    match level {
        ConsoleLevel::Log | ConsoleLevel::Info => info!(target: "otter", "{}", message),
        ConsoleLevel::Debug => debug!(target: "otter", "{}", message),
        ConsoleLevel::Warn => warn!(target: "otter", "{}", message),
        ConsoleLevel::Error => error!(target: "otter", "{}", message),
    }
}

pub(crate) fn dispatch_console(level: ConsoleLevel, message: &str) {
    let lock = CONSOLE_HANDLER.get_or_init(|| Mutex::new(Arc::new(default_console_handler)));
    let handler = lock.lock().clone();
    handler(level, message);
}

/// Build the console object
pub(crate) fn create_console(object_prototype: &JsObject, function_prototype: &JsObject) -> JsObject {
    let console = JsObject::new(
        crate::object::ObjectKind::Ordinary,
        Some(object_prototype.clone()),
    );
    define_method(&console, function_prototype, "log", console_log);
    define_method(&console, function_prototype, "info", console_info);
    define_method(&console, function_prototype, "debug", console_debug);
    define_method(&console, function_prototype, "warn", console_warn);
    define_method(&console, function_prototype, "error", console_error);
    console
}

fn console_log(_realm: &Realm, _this: &Value, args: &[Value]) -> HostResult<Value> {
    emit(ConsoleLevel::Log, args)
}

fn console_info(_realm: &Realm, _this: &Value, args: &[Value]) -> HostResult<Value> {
    emit(ConsoleLevel::Info, args)
}

fn console_debug(_realm: &Realm, _this: &Value, args: &[Value]) -> HostResult<Value> {
    emit(ConsoleLevel::Debug, args)
}

fn console_warn(_realm: &Realm, _this: &Value, args: &[Value]) -> HostResult<Value> {
    emit(ConsoleLevel::Warn, args)
}

fn console_error(_realm: &Realm, _this: &Value, args: &[Value]) -> HostResult<Value> {
    emit(ConsoleLevel::Error, args)
}

fn emit(level: ConsoleLevel, args: &[Value]) -> HostResult<Value> {
    let parts: SmallVec<[String; 4]> = args
        .iter()
        .map(|v| match v {
            Value::String(s) => s.to_string(),
            other => inspect(other),
        })
        .collect();
    dispatch_console(level, &parts.join(" "));
    Ok(Value::Undefined)
}

const MAX_INSPECT_DEPTH: usize = 2;

fn empty_items(count: u32) -> String {
    if count == 1 {
        "<1 empty item>".to_string()
    } else {
        format!("<{} empty items>", count)
    }
}

/// Render a value for diagnostics without running host code
pub fn inspect(value: &Value) -> String {
    inspect_at(value, 0)
}

fn inspect_at(value: &Value, depth: usize) -> String {
    let obj = match value {
        Value::String(s) if depth > 0 => return format!("'{}'", s),
        Value::String(s) => return s.to_string(),
        Value::Number(n) => return number_to_string(*n),
        Value::Object(o) => o,
        other => return format!("{:?}", other),
    };

    if let Some(name) = obj.function_name() {
        return if name.is_empty() {
            "[Function (anonymous)]".to_string()
        } else {
            format!("[Function: {}]", name)
        };
    }

    if obj.is_error() {
        let field = |key: &str| match crate::ops::get_from_object(obj, &key.into()) {
            Value::String(s) => s.to_string(),
            _ => String::new(),
        };
        let (name, message) = (field("name"), field("message"));
        return if message.is_empty() {
            name
        } else {
            format!("{}: {}", name, message)
        };
    }

    if let Some(inner) = obj.primitive_value() {
        return format!("[{}: {}]", obj.class_name(), inspect_at(&inner, depth + 1));
    }

    if depth >= MAX_INSPECT_DEPTH {
        return format!("[{}]", obj.class_name());
    }

    if let (Some(len), Some(entries)) = (obj.array_length(), obj.array_entries()) {
        if len == 0 {
            return "[]".to_string();
        }
        let mut items = Vec::with_capacity(entries.len() + 1);
        let mut next = 0;
        for (index, element) in &entries {
            if *index > next {
                items.push(empty_items(index - next));
            }
            items.push(inspect_at(element, depth + 1));
            next = index + 1;
        }
        if len > next {
            items.push(empty_items(len - next));
        }
        return format!("[ {} ]", items.join(", "));
    }

    let props = obj.properties();
    if props.is_empty() {
        return "{}".to_string();
    }
    let items: Vec<String> = props
        .iter()
        .map(|(k, v)| format!("{}: {}", k, inspect_at(v, depth + 1)))
        .collect();
    format!("{{ {} }}", items.join(", "))
}

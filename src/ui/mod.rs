use colored::*;
use lazy_static::lazy_static;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

lazy_static! {
    static ref RENDERER: RwLock<Renderer> = RwLock::new(Renderer::default());
}

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn init(format: OutputFormat, color: bool) {
    if let Ok(mut r) = RENDERER.write() {
        r.format = format;
        r.color = color;
    }
}

pub const SEPARATOR_HEAVY: &str = "━";

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn colorize(level: Level, s: &str, enable: bool) -> String {
    if !enable {
        return s.to_string();
    }
    match level {
        Level::Info => s.normal().to_string(),
        Level::Success => s.green().bold().to_string(),
        Level::Warn => s.yellow().bold().to_string(),
        Level::Error => s.red().bold().to_string(),
        Level::Debug => s.cyan().to_string(),
    }
}

/// Emit a user-facing event. In text mode this is a colored line; in JSON
/// mode a structured event on one line, suitable for piping to jq.
pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    if matches!(level, Level::Debug) && !is_debug_enabled() {
        return;
    }
    let r = RENDERER.read().expect("renderer poisoned").clone();
    let mut out: Box<dyn Write> = match level {
        Level::Error | Level::Warn => Box::new(io::stderr()),
        _ => Box::new(io::stdout()),
    };
    match r.format {
        OutputFormat::Text => {
            let line = colorize(level, message, r.color);
            let _ = writeln!(out, "{}", line);
        }
        OutputFormat::Json => {
            let ev = Event {
                level: level.as_str(),
                code,
                message,
                data,
            };
            let s = serde_json::to_string(&ev).expect("serialize event");
            let _ = writeln!(out, "{}", s);
        }
    }
}

/// Print the marked failure banner required on every halt path: which
/// application failed, in which stage, and why.
pub fn failure_banner(app: &str, stage: &str, reason: &str) {
    let r = RENDERER.read().expect("renderer poisoned").clone();
    if matches!(r.format, OutputFormat::Json) {
        emit(
            Level::Error,
            "run.failed",
            &format!("{app} failed during {stage}: {reason}"),
            Some(serde_json::json!({ "app": app, "stage": stage })),
        );
        return;
    }
    let line = SEPARATOR_HEAVY.repeat(72);
    eprintln!(
        "{}",
        if r.color {
            line.red().to_string()
        } else {
            line.clone()
        }
    );
    emit(
        Level::Error,
        "run.failed",
        &format!("FAILED: {app} ({stage})"),
        None,
    );
    emit(Level::Error, "run.failed.reason", reason, None);
    eprintln!(
        "{}",
        if r.color {
            line.red().to_string()
        } else {
            line
        }
    );
}

pub mod prelude {
    pub use super::{Level, OutputFormat, emit, failure_banner};
}

//! Colorful console output for model loading and evaluation.
//!
//! Provides a custom `tracing` layer that formats TensorForge events with
//! colors.
//!
//! ## Log Levels
//!
//! - **INFO**: Model loading and tree ensemble compilation
//! - **WARN**: Native compilation falling back to the branch table
//! - **DEBUG**: Resolved function types
//! - **TRACE**: Individual evaluations

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};


static INIT: OnceLock<()> = OnceLock::new();
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Package version for banner display.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes console output.
///
/// Safe to call multiple times - only the first call has effect.
/// Prints the banner and installs a tracing subscriber filtered by
/// `RUST_LOG`, defaulting to `info`.
pub fn init() {
    INIT.get_or_init(|| {
        EPOCH.get_or_init(Instant::now);
        print_banner();

        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy();

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(TensorConsoleLayer)
            .try_init();
    });
}

fn elapsed_secs() -> f64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

fn print_banner() {
    let banner = r#"
 _____                          _____
|_   _|__ _ __  ___  ___  _ __ |  ___|__  _ __ __ _  ___
  | |/ _ \ '_ \/ __|/ _ \| '__|| |_ / _ \| '__/ _` |/ _ \
  | |  __/ | | \__ \ (_) | |   |  _| (_) | | | (_| |  __/
  |_|\___|_| |_|___/\___/|_|   |_|  \___/|_|  \__, |\___|
                                              |___/
"#;

    let version_line = format!(
        "                   v{} - Tensor Expression Evaluator\n",
        VERSION
    );

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", banner.bright_cyan());
    let _ = writeln!(stdout, "{}", version_line.bright_white().bold());
    let _ = stdout.flush();
}

/// A tracing layer that formats TensorForge events with colors.
pub struct TensorConsoleLayer;

impl<S: Subscriber> Layer<S> for TensorConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("tensorforge") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor, *metadata.level());
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    model: Option<String>,
    function: Option<String>,
    error: Option<String>,
    tensor_type: Option<String>,
    result_type: Option<String>,
    functions: Option<u64>,
    constants: Option<u64>,
    trees: Option<u64>,
    bytes: Option<u64>,
    native: Option<bool>,
}

impl EventVisitor {
    fn record_string(&mut self, field: &Field, value: String) {
        match field.name() {
            "event" => self.event = Some(value),
            "model" => self.model = Some(value),
            "function" => self.function = Some(value),
            "error" => self.error = Some(value),
            "tensor_type" => self.tensor_type = Some(value),
            "result_type" => self.result_type = Some(value),
            _ => {}
        }
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.record_string(field, s.trim_matches('"').to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "functions" => self.functions = Some(value),
            "constants" => self.constants = Some(value),
            "trees" => self.trees = Some(value),
            "bytes" => self.bytes = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value.max(0) as u64);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "native" {
            self.native = Some(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_string(field, value.to_string());
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    match v.event.as_deref().unwrap_or("") {
        "model_loaded" => format_model_loaded(v),
        "forest_compiled" => format_forest_compiled(v),
        "native_compile_failed" => format_native_failed(v),
        "function_resolved" => format_function_resolved(v),
        "evaluate" => format_evaluate(v, level),
        _ => String::new(),
    }
}

fn format_elapsed() -> String {
    format!("{:>7.3}s", elapsed_secs())
        .bright_black()
        .to_string()
}

fn format_model_loaded(v: &EventVisitor) -> String {
    let model = v.model.as_deref().unwrap_or("?");
    let functions = v.functions.unwrap_or(0);
    let constants = v.constants.unwrap_or(0);

    format!(
        "{} {} Model {} loaded │ {} functions │ {} constants",
        format_elapsed(),
        "▶".bright_green().bold(),
        model.white().bold(),
        functions.to_formatted_string(&Locale::en).bright_yellow(),
        constants.to_formatted_string(&Locale::en).bright_yellow(),
    )
}

fn format_forest_compiled(v: &EventVisitor) -> String {
    let function = v.function.as_deref().unwrap_or("?");
    let trees = v.trees.unwrap_or(0);
    let backend = if v.native.unwrap_or(false) {
        "native".bright_magenta().bold().to_string()
    } else {
        "table".bright_blue().to_string()
    };

    format!(
        "{} {} {} compiled │ {} trees │ {} │ {}",
        format_elapsed(),
        "⚙".bright_cyan(),
        function.white().bold(),
        trees.to_formatted_string(&Locale::en).bright_yellow(),
        format_bytes(v.bytes.unwrap_or(0)).yellow(),
        backend,
    )
}

fn format_native_failed(v: &EventVisitor) -> String {
    let function = v.function.as_deref().unwrap_or("?");
    let error = v.error.as_deref().unwrap_or("unknown error");

    format!(
        "{} {} {} native compilation failed │ {} │ using branch table",
        format_elapsed(),
        "⚠".bright_yellow().bold(),
        function.white().bold(),
        error.bright_red(),
    )
}

fn format_function_resolved(v: &EventVisitor) -> String {
    let function = v.function.as_deref().unwrap_or("?");
    let tensor_type = v.tensor_type.as_deref().unwrap_or("?");

    format!(
        "{} {} {} : {}",
        format_elapsed(),
        "·".bright_black(),
        function.white(),
        tensor_type.bright_cyan(),
    )
}

fn format_evaluate(v: &EventVisitor, level: Level) -> String {
    if level != Level::TRACE {
        return String::new();
    }

    let function = v.function.as_deref().unwrap_or("?");
    let result_type = v.result_type.as_deref().unwrap_or("?");

    format!(
        "{} {} {} → {}",
        format_elapsed(),
        "✓".bright_green(),
        function.bright_black(),
        result_type.bright_black(),
    )
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    }
}

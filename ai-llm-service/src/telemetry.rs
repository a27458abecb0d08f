use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Targets of the workspace libraries rendered by [`layer`].
pub const TARGET_PREFIXES: &[&str] = &["ai_llm_service", "rag_store", "contextor", "viz_synth"];

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

fn is_library_target(target: &str) -> bool {
    TARGET_PREFIXES.iter().any(|p| target.starts_with(p))
}

/// Formatting layer that renders ONLY events emitted by the workspace libraries.
///
/// - RFC3339 UTC timestamps, compact single-line format
/// - `file:line` and target
/// - span close events (durations of instrumented provider calls)
/// - ANSI colors only when stdout is a terminal
///
/// Compose it in the binary with a global `fmt` layer that excludes the same targets.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();
    let only_libraries = filter::filter_fn(|meta| is_library_target(meta.target()));

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(only_libraries)
}

/// Per-event filter for the binary's own layer: everything the library layer does not print.
pub fn not_library_filter() -> filter::FilterFn<impl Fn(&tracing::Metadata<'_>) -> bool> {
    filter::filter_fn(|meta| !is_library_target(meta.target()))
}

/// Level directives for every workspace library, e.g. `contextor=debug`.
pub fn level_directives(level: Level) -> Result<Vec<Directive>, ParseError> {
    let level = level.as_str().to_lowercase();
    TARGET_PREFIXES
        .iter()
        .map(|p| Directive::from_str(&format!("{p}={level}")))
        .collect()
}

/// `EnvFilter` from `RUST_LOG` (or `default`), plus `level` for the workspace libraries
/// unless `RUST_LOG` is set explicitly.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => {
            let mut f = EnvFilter::new(default);
            if let Ok(directives) = level_directives(level) {
                for d in directives {
                    f = f.add_directive(d);
                }
            }
            f
        }
    }
}

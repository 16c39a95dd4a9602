use core::fmt as core_fmt;

use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    registry::LookupSpan,
};

const TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

/// ANSI sequences, all empty when colors are off.
#[derive(Clone, Copy)]
struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(self, code: &'static str) -> &'static str {
        if self.enabled { code } else { "" }
    }

    fn reset(self) -> &'static str {
        self.paint("\x1b[0m")
    }

    fn dim(self) -> &'static str {
        self.paint("\x1b[2m")
    }

    fn level(self, level: &Level) -> &'static str {
        self.paint(match *level {
            Level::ERROR => "\x1b[1;31m",
            Level::WARN => "\x1b[1;33m",
            Level::INFO => "\x1b[1;32m",
            Level::DEBUG => "\x1b[1;34m",
            Level::TRACE => "\x1b[1;35m",
        })
    }
}

/// Crate-internal targets lose their `swish::` prefix.
fn short_target(target: &str) -> &str {
    target.strip_prefix("swish::").unwrap_or(target)
}

fn timestamp() -> String {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(TIMESTAMP)
        .unwrap_or_else(|_| "-".to_string())
}

/// Single-line log format: `[timestamp] LEVEL target:line > message`.
pub struct SwishFormatter {
    palette: Palette,
}

impl SwishFormatter {
    pub fn new(use_ansi: bool) -> Self {
        Self {
            palette: Palette { enabled: use_ansi },
        }
    }
}

impl<S, N> FormatEvent<S, N> for SwishFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> core_fmt::Result {
        let palette = self.palette;
        let metadata = event.metadata();

        write!(
            writer,
            "{}[{}]{} {}{:<5}{} {}{}",
            palette.dim(),
            timestamp(),
            palette.reset(),
            palette.level(metadata.level()),
            metadata.level(),
            palette.reset(),
            palette.dim(),
            short_target(metadata.target()),
        )?;
        if let Some(line) = metadata.line() {
            write!(writer, ":{}", line)?;
        }
        write!(writer, "{} > ", palette.reset())?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

use log::{Level, LevelFilter, Metadata, Record};
use std::any::Any;
use std::panic::Location;
use std::sync::Once;

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", format_line(record.level(), record.target(), record.args()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;
static INIT: Once = Once::new();

fn format_line(level: Level, target: &str, args: &std::fmt::Arguments) -> String {
    format!("[{}] [{}] {}", level, target, args)
}

pub fn init_logging() {
    init_logging_with(LevelFilter::Info);
}

pub fn init_logging_with(level: LevelFilter) {
    // Concurrent callers wait here until the level is in place
    INIT.call_once(|| {
        // A logger installed by the embedding program wins
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
            install_panic_hook();
        }
    });
}

// The previous hook still runs after the log line
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("supervisor panicked: {}", panic_summary(info.payload(), info.location()));
        previous(info);
    }));
}

fn panic_summary(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> String {
    let reason = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>");
    match location {
        Some(at) => format!("{} ({}:{})", reason, at.file(), at.line()),
        None => reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let line = format_line(Level::Error, "supervisor::table", &format_args!("ASID {}", 3));
        assert_eq!(line, "[ERROR] [supervisor::table] ASID 3");
    }

    #[test]
    fn test_init_logging_idempotent() {
        init_logging();
        init_logging_with(LevelFilter::Trace);
        assert_eq!(log::max_level(), LevelFilter::Info);
    }

    #[test]
    fn test_panic_summary() {
        let here = Location::caller();
        let text = panic_summary(&"queue overflow", Some(here));
        assert_eq!(text, format!("queue overflow ({}:{})", here.file(), here.line()));

        let owned: Box<dyn Any + Send> = Box::new(String::from("bad ASID"));
        assert_eq!(panic_summary(owned.as_ref(), None), "bad ASID");
        assert_eq!(panic_summary(&42u32, None), "<non-string payload>");
    }
}

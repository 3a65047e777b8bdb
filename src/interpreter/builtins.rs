use std::cell::RefCell;
use std::fmt::{self, Display};
use std::io::Write;
use std::rc::Rc;

use itertools::Itertools;

use crate::diagnostics::colors;
use crate::interpreter::scope::Scope;
use crate::interpreter::value::{Object, Value};

/// Which `console` member produced a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Log,
    Error,
    Info,
}

impl Level {
    fn member(self) -> &'static str {
        match self {
            Level::Log => "log",
            Level::Error => "error",
            Level::Info => "info",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.member())
    }
}

/// Where the `console` built-ins send their output.
pub trait Console {
    fn write_line(&self, level: Level, line: &str);
}

/// Writes to the process stdout, colouring each line by level.
#[derive(Debug, Clone, Copy)]
pub struct StdoutConsole {
    colors: bool,
}

impl StdoutConsole {
    pub fn new(colors: bool) -> Self {
        Self { colors }
    }
}

impl Console for StdoutConsole {
    fn write_line(&self, level: Level, line: &str) {
        let mut stdout = std::io::stdout().lock();

        let _ = if self.colors {
            let color = match level {
                Level::Log => colors::GREEN,
                Level::Error => colors::RED,
                Level::Info => colors::GREY,
            };
            writeln!(stdout, "{color}{line}{}", colors::RESET)
        } else {
            writeln!(stdout, "{line}")
        };
    }
}

/// Keeps every line in memory, used by tests and embedders.
#[derive(Debug, Default)]
pub struct CapturedConsole {
    lines: RefCell<Vec<(Level, String)>>,
}

impl CapturedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    pub fn text(&self) -> Vec<String> {
        self.lines.borrow().iter().map(|(_, line)| line.clone()).collect()
    }
}

impl Console for CapturedConsole {
    fn write_line(&self, level: Level, line: &str) {
        self.lines.borrow_mut().push((level, line.to_string()));
    }
}

/// Builds the `console` namespace with its `log`, `error` and `info` members.
pub fn console_object(sink: Rc<dyn Console>) -> Value {
    [Level::Log, Level::Error, Level::Info]
        .into_iter()
        .fold(Object::new(), |object, level| {
            let sink = Rc::clone(&sink);
            let member = Value::native(level.member(), move |_this, args| {
                sink.write_line(level, &args.iter().join(" "));
                Ok(Value::Undefined)
            });
            object.with(level.member(), member)
        })
        .into()
}

/// Binds the host-provided globals into a fresh root scope.
pub fn install_globals(scope: &Scope, sink: Rc<dyn Console>) {
    scope.set("console", console_object(sink));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call_member(console: &Value, name: &str, args: &[Value]) {
        let Value::Object(object) = console else {
            panic!("console should be an object");
        };
        let Some(Value::NativeFunction(native)) = object.get(name) else {
            panic!("console.{name} should be a native function");
        };
        assert_eq!(native.call(console, args), Ok(Value::Undefined));
    }

    #[test]
    fn members_forward_joined_arguments() {
        let sink = Rc::new(CapturedConsole::new());
        let console = console_object(sink.clone());

        call_member(&console, "log", &[Value::Number(1.0), Value::Number(2.5)]);
        call_member(&console, "error", &[Value::Undefined]);
        call_member(&console, "info", &[]);

        assert_eq!(
            sink.lines(),
            vec![
                (Level::Log, "1 2.5".to_string()),
                (Level::Error, "undefined".to_string()),
                (Level::Info, String::new()),
            ]
        );
    }

    #[test]
    fn install_binds_console() {
        let scope = Scope::root();
        install_globals(&scope, Rc::new(CapturedConsole::new()));

        assert!(scope.has("console"));
        assert_eq!(
            scope.get("console").map(|console| console.to_string()),
            Some("{ error: [Function: error], info: [Function: info], log: [Function: log] }".to_string())
        );
    }
}

//! Error reporting with an excerpt of the offending source.

use std::fmt::Display;
use std::io::Write;

use crate::frontend::location::SourceLocation;
use crate::frontend::parser::ParserError;
use crate::interpreter::error::EvalError;

/// ANSI escape codes shared by the reporter and the console built-ins.
pub mod colors {
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const GREY: &str = "\x1b[90m";
    pub const BOLD_RED: &str = "\x1b[1;31m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

const LINES_ABOVE: usize = 2;
const LINES_BELOW: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Colour only when writing to a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Anything that can be reported against a range of source.
pub trait Located: Display {
    fn loc(&self) -> SourceLocation;
}

impl Located for EvalError {
    fn loc(&self) -> SourceLocation {
        EvalError::loc(self)
    }
}

impl<'src> Located for ParserError<'src> {
    fn loc(&self) -> SourceLocation {
        ParserError::loc(self)
    }
}

fn paint(text: &str, color: &str, colors: bool) -> String {
    if colors {
        format!("{color}{text}{}", colors::RESET)
    } else {
        text.to_string()
    }
}

/// Renders the lines around `loc` with a line-number gutter, `>` on every
/// line the range touches and carets under the covered columns.
pub fn code_frame(source: &str, loc: SourceLocation, colors: bool) -> String {
    let lines: Vec<&str> = source
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let start_line = loc.start.line.max(1);
    let end_line = loc.end.line.max(start_line);
    let first = start_line.saturating_sub(LINES_ABOVE).max(1);
    let last = (end_line + LINES_BELOW).min(lines.len());
    let width = last.to_string().len();

    let mut frame = vec![];

    for (index, text) in lines.iter().enumerate().take(last).skip(first - 1) {
        let number = index + 1;
        let marked = (start_line..=end_line).contains(&number);

        let marker = if marked {
            paint(">", colors::BOLD_RED, colors)
        } else {
            " ".to_string()
        };
        let gutter = paint(&format!("{number:>width$} |"), colors::GREY, colors);

        if text.is_empty() {
            frame.push(format!("{marker} {gutter}"));
        } else {
            frame.push(format!("{marker} {gutter} {text}"));
        }

        if marked {
            let from = if number == start_line { loc.start.column } else { 0 };
            let to = if number == end_line {
                loc.end.column
            } else {
                text.chars().count()
            };

            let carets = "^".repeat(to.saturating_sub(from).max(1));
            let blank_gutter = paint(&format!("{:>width$} |", ""), colors::GREY, colors);
            frame.push(format!(
                "  {blank_gutter} {}{}",
                " ".repeat(from),
                paint(&carets, colors::BOLD_RED, colors)
            ));
        }
    }

    frame.join("\n")
}

/// Writes `error: <message>` followed by a code frame for each report.
pub struct Reporter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        Self {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    pub fn report(&mut self, source: &str, error: &dyn Located) {
        let loc = error.loc();
        let header = paint("error", colors::BOLD_RED, self.colors);
        let message = paint(&error.to_string(), colors::BOLD, self.colors);

        let _ = writeln!(self.writer, "{header}: {message}");
        let _ = writeln!(self.writer, "  --> {}", loc.start);
        let _ = writeln!(self.writer, "{}", code_frame(source, loc, self.colors));
        let _ = writeln!(self.writer);
    }

    pub fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

use std::error::Error;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::rc::Rc;

use tracing::info;

use crate::cli::Cli;
use crate::diagnostics::Reporter;
use crate::frontend::parser::parse_program;
use crate::interpreter::builtins::{install_globals, Console, StdoutConsole};
use crate::interpreter::{Interpreter, Scope};

/// What happened to one source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub parsed: bool,
    pub errors: usize,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.parsed && self.errors == 0
    }
}

/// Parses and evaluates `src` in a fresh root scope, reporting every error
/// against the source text.
pub fn run_source<W: Write>(
    src: &str,
    cli: &Cli,
    console: Rc<dyn Console>,
    reporter: &mut Reporter<W>,
) -> RunSummary {
    let program = match parse_program(src) {
        Ok(program) => program,
        Err(error) => {
            reporter.report(src, &error);
            reporter.flush();
            return RunSummary {
                parsed: false,
                errors: 1,
            };
        }
    };

    if cli.inspect_tree {
        eprintln!("{program:#?}");
    }

    let scope = Scope::root();
    install_globals(&scope, console);

    let errors = Interpreter::new(cli.eval_config()).run(&program, &scope);
    for error in &errors {
        reporter.report(src, error);
    }
    reporter.flush();

    info!(errors = errors.len(), "run finished");

    RunSummary {
        parsed: true,
        errors: errors.len(),
    }
}

/// Evaluates a whole file, console output on stdout and reports on stderr.
pub fn run_file(path: &Path, cli: &Cli) -> Result<RunSummary, Box<dyn Error>> {
    let src = std::fs::read_to_string(path)?;
    info!(path = %path.display(), bytes = src.len(), "running file");

    let console = Rc::new(StdoutConsole::new(
        cli.color.should_use_colors(io::stdout().is_terminal()),
    ));
    let mut reporter = Reporter::new(io::stderr(), cli.color, io::stderr().is_terminal());

    Ok(run_source(&src, cli, console, &mut reporter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ColorMode;
    use crate::interpreter::builtins::CapturedConsole;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> (RunSummary, Vec<String>, String) {
        let cli = Cli::parse_from(["treewalk", "--color", "never"]);
        let console = Rc::new(CapturedConsole::new());
        let mut reporter = Reporter::new(Vec::new(), ColorMode::Never, false);

        let summary = run_source(src, &cli, console.clone(), &mut reporter);
        let report = String::from_utf8(reporter.into_inner()).expect("utf-8 report");

        (summary, console.text(), report)
    }

    #[test]
    fn demo_program() {
        let (summary, output, report) = run(include_str!("../demos/add.js"));

        assert!(summary.is_success());
        assert_eq!(output, vec!["3", "4"]);
        assert_eq!(report, "");
    }

    #[test]
    fn evaluation_errors_are_reported_and_skipped() {
        let (summary, output, report) = run("const a = 1;\nconst a = 2;\nconsole.log(a);");

        assert_eq!(
            summary,
            RunSummary {
                parsed: true,
                errors: 1
            }
        );
        assert_eq!(output, vec!["1"]);
        assert!(report.starts_with("error: duplicate declaration of variable `a`\n  --> 2:7\n"));
        assert!(report.contains("> 2 | const a = 2;"));
    }

    #[test]
    fn parse_errors_stop_before_evaluation() {
        let (summary, output, report) = run("console.log(1);\nconst = 2;");

        assert_eq!(
            summary,
            RunSummary {
                parsed: false,
                errors: 1
            }
        );
        assert!(output.is_empty());
        assert!(report.starts_with("error: Expected identifier, found Assign\n"));
    }

    #[test]
    fn each_run_gets_its_own_scope() {
        let (first, _, _) = run("const shared = 1;");
        let (second, output, _) = run("const shared = 2;\nconsole.log(shared);");

        assert!(first.is_success());
        assert!(second.is_success());
        assert_eq!(output, vec!["2"]);
    }
}

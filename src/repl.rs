use std::io::{self, BufRead, IsTerminal, Write};
use std::rc::Rc;

use tracing::error;

use crate::cli::Cli;
use crate::diagnostics::Reporter;
use crate::frontend::parser::parse_program;
use crate::interpreter::builtins::{install_globals, StdoutConsole};
use crate::interpreter::{Interpreter, Scope};

// One interpreter and one root scope live for the whole session, so names
// declared on earlier lines stay visible to later ones.
pub struct Session {
    interpreter: Interpreter,
    scope: Scope,
    inspect_tree: bool,
}

impl Session {
    pub fn new(interpreter: Interpreter, scope: Scope, inspect_tree: bool) -> Self {
        Self {
            interpreter,
            scope,
            inspect_tree,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Parses and evaluates one line, returning how many errors it reported.
    pub fn evaluate_line<W: Write>(&mut self, line: &str, reporter: &mut Reporter<W>) -> usize {
        let program = match parse_program(line) {
            Ok(program) => program,
            Err(error) => {
                reporter.report(line, &error);
                return 1;
            }
        };

        if self.inspect_tree {
            eprintln!("{program:#?}");
        }

        let errors = self.interpreter.run(&program, &self.scope);
        for error in &errors {
            reporter.report(line, error);
        }

        errors.len()
    }
}

pub fn repl_driver(cli: &Cli) {
    let console = Rc::new(StdoutConsole::new(
        cli.color.should_use_colors(io::stdout().is_terminal()),
    ));
    let scope = Scope::root();
    install_globals(&scope, console);

    let mut session = Session::new(Interpreter::new(cli.eval_config()), scope, cli.inspect_tree);
    let mut reporter = Reporter::new(io::stderr(), cli.color, io::stderr().is_terminal());

    let stdin = io::stdin();
    let mut input_buf = String::new();

    loop {
        print!("Ready >> ");
        let _ = io::stdout().flush();

        input_buf.clear();
        match stdin.lock().read_line(&mut input_buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                error!(%err, "failed to read from stdin");
                break;
            }
        }

        if input_buf.trim().is_empty() {
            continue;
        }

        session.evaluate_line(&input_buf, &mut reporter);
        reporter.flush();
    }

    println!();
}

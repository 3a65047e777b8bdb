use std::path::PathBuf;

use clap::{
    builder::{OsStr, PossibleValue},
    Parser, ValueEnum,
};

use crate::diagnostics::ColorMode;
use crate::interpreter::evaluator::{EvalConfig, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_NESTING_DEPTH};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// A positional file containing source code to evaluate, if not given, starts the REPL instead
    pub file: Option<PathBuf>,

    /// When to colour console output and error reports
    #[arg(long, value_enum, default_value = ColorMode::Auto)]
    pub color: ColorMode,

    /// Prints the parsed tree to stderr before evaluating it
    #[arg(long)]
    pub inspect_tree: bool,

    /// How deeply calls may nest before evaluation of a statement is abandoned
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    pub max_call_depth: usize,

    /// How deeply expressions may nest before evaluation of a statement is abandoned
    #[arg(long, default_value_t = DEFAULT_MAX_NESTING_DEPTH)]
    pub max_nesting_depth: usize,
}

impl Cli {
    pub fn eval_config(&self) -> EvalConfig {
        EvalConfig {
            max_call_depth: self.max_call_depth,
            max_nesting_depth: self.max_nesting_depth,
        }
    }
}

impl ValueEnum for ColorMode {
    fn value_variants<'a>() -> &'a [Self] {
        &[ColorMode::Auto, ColorMode::Always, ColorMode::Never]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            ColorMode::Auto => PossibleValue::new("auto").help("Colour when writing to a terminal"),
            ColorMode::Always => PossibleValue::new("always").help("Always colour"),
            ColorMode::Never => PossibleValue::new("never").help("Never colour"),
        })
    }
}

impl From<ColorMode> for OsStr {
    fn from(mode: ColorMode) -> OsStr {
        match mode {
            ColorMode::Auto => "auto".into(),
            ColorMode::Always => "always".into(),
            ColorMode::Never => "never".into(),
        }
    }
}

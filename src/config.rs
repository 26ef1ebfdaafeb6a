//! Driver configuration assembled from command-line arguments and the
//! environment.

use std::path::PathBuf;

use snafu::Snafu;

pub const DEFAULT_OUTPUT: &str = "output.s";

/// Set to a false-ish value (`0`, `false`, `no`, `off`) to skip the AST dump.
pub const PRINT_AST_VAR: &str = "TYPECC_PRINT_AST";

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ConfigError {
  #[snafu(display("usage: {program} <input> [output]"))]
  Usage { program: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
  pub input: PathBuf,
  pub output: PathBuf,
  pub print_ast: bool,
}

impl DriverConfig {
  /// Build the configuration from `argv` and the process environment.
  pub fn from_env(args: &[String]) -> Result<Self, ConfigError> {
    Self::from_parts(args, |key| std::env::var(key).ok())
  }

  pub fn from_parts(
    args: &[String],
    env: impl Fn(&str) -> Option<String>,
  ) -> Result<Self, ConfigError> {
    let program = args.first().map(String::as_str).unwrap_or("typecc");
    let (input, output) = match args {
      [_, input] => (input, DEFAULT_OUTPUT),
      [_, input, output] => (input, output.as_str()),
      _ => {
        return UsageSnafu { program }.fail();
      }
    };

    let print_ast = env(PRINT_AST_VAR).map_or(true, |value| flag(&value));

    Ok(Self {
      input: PathBuf::from(input),
      output: PathBuf::from(output),
      print_ast,
    })
  }
}

fn flag(value: &str) -> bool {
  !matches!(
    value.trim().to_ascii_lowercase().as_str(),
    "0" | "false" | "no" | "off"
  )
}

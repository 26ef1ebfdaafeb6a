use std::env;
use std::process;

use tracing_subscriber::EnvFilter;
use typecc::config::DriverConfig;
use typecc::{CompileResult, codegen};

fn run(config: &DriverConfig) -> CompileResult<()> {
  let source = typecc::read_source(&config.input)?;
  let program = typecc::parse_source(&source)?;

  if config.print_ast {
    println!("=== Parsed AST ===");
    print!("{program}");
  }

  let asm = codegen::generate(&program)?;
  typecc::write_assembly(&config.output, &asm)?;
  println!(
    "Compilation successful. Assembly code generated in {}",
    config.output.display()
  );
  Ok(())
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();

  let args: Vec<String> = env::args().collect();
  let config = match DriverConfig::from_env(&args) {
    Ok(config) => config,
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  };

  if let Err(err) = run(&config) {
    eprintln!("{err}");
    process::exit(1);
  }
}

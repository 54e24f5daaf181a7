//! # buildmatrix generate demo
//!
//! Expands a model file and prints one JSON document per generation unit.
//! Diagnostics go to stderr through `tracing`.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example generate -- --model demos/oxygen/oxygen.model.toml
//! ```
//!
//! | Feature                  | How to exercise it                                                        |
//! |--------------------------|---------------------------------------------------------------------------|
//! | Declarative model        | `--model demos/oxygen/oxygen.model.toml`                                  |
//! | Settings next to model   | `demos/oxygen/buildmatrix.toml` limits resources to `oxygen`              |
//! | Env var override         | `BUILDMATRIX__RESOURCES__DIR=none cargo run --example generate -- ...`    |
//! | CLI override             | `--iteration-cap 4`, `--definition-dir C:\dev\oxygen`, `--no-strict`      |
//! | Verbose logging          | `RUST_LOG=buildmatrix=debug cargo run --example generate -- ...`          |

use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use buildmatrix::{
    GenerateArgs, Generator, JsonLinesEmitter, MatrixError, SearchPath, SettingsLoader,
    load_model, resources,
};

/// Expand a build model into per-target configurations.
#[derive(Parser, Debug)]
#[command(name = "buildmatrix-generate")]
struct Cli {
    #[command(flatten)]
    generate: GenerateArgs,
}

fn run(cli: &Cli) -> Result<(), MatrixError> {
    let model_dir = cli
        .generate
        .model
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let loader = SettingsLoader::new().add_search_path(SearchPath::Path(model_dir));
    let settings = cli.generate.apply(loader).load()?;

    let registry = load_model(&cli.generate.model, &settings)?;
    let manifests = resources::manifests_for(&registry, &settings)?;
    let generation = Generator::new(&registry)
        .iteration_cap(settings.template_iteration_cap)
        .resources(&manifests)
        .run()?;

    let mut emitter = JsonLinesEmitter::new(io::stdout().lock());
    generation.emit_all(&mut emitter)?;

    for diagnostic in &generation.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(MatrixError::UnknownKeys { path, keys }) => {
            eprintln!("error: unknown keys in {}", path.display());
            for key in keys {
                eprintln!("  {key}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error [{}]: {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}

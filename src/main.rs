use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use matc_emitter::{emit_embeddable, emit_standalone};
use matc_parser::parse_source;
use matc_passes::{run_all_passes, CompilerConfig};

/// Translates a matrix-oriented scripting language source file into C++17.
#[derive(Parser, Debug)]
#[command(name = "matc", version, about)]
struct Args {
    /// Source file to translate.
    input: PathBuf,

    /// Where to write the standalone C++17 program.
    #[arg(short = 'o', long = "output", default_value = "out.cpp")]
    output: PathBuf,

    /// If set, also emit an embeddable entry point under this exported
    /// function name, written alongside `--output` with an `_entry` suffix.
    #[arg(long = "entry-point")]
    entry_point: Option<String>,

    /// Disallow scalar broadcasting in `+`/`-`; require exactly matching
    /// shapes (spec.md §6 "mathematical notation mode").
    #[arg(long = "mathematical-notation")]
    mathematical_notation: bool,

    /// Reject any reassignment that would change a variable's shape.
    #[arg(long = "disallow-resizing")]
    disallow_resizing: bool,

    /// Have the embeddable entry point read and write a workspace snapshot
    /// instead of returning a single value.
    #[arg(long = "write-to-workspace")]
    write_to_workspace: bool,

    /// Also write the captured leading-comment documentation block to this
    /// path.
    #[arg(long = "doc-out")]
    doc_out: Option<PathBuf>,
}

fn run(args: Args) -> matc_errors::Result<()> {
    let source = fs::read_to_string(&args.input).map_err(|e| matc_errors::Error::Io(e.to_string()))?;

    let (ast, root) = parse_source(&source)?;
    let config = CompilerConfig {
        mathematical_notation: args.mathematical_notation,
        disallow_resizing: args.disallow_resizing,
        write_to_workspace: args.write_to_workspace,
    };
    let state = run_all_passes(ast, root, source, config)?;

    let program = emit_standalone(&state);
    fs::write(&args.output, program).map_err(|e| matc_errors::Error::Io(e.to_string()))?;
    tracing::info!(path = %args.output.display(), "wrote standalone program");

    if let Some(entry_point) = &args.entry_point {
        let embeddable = emit_embeddable(&state, entry_point);
        let mut entry_path = args.output.clone();
        let stem = entry_path.file_stem().unwrap_or_default().to_string_lossy().into_owned();
        entry_path.set_file_name(format!("{stem}_entry.cpp"));
        fs::write(&entry_path, embeddable).map_err(|e| matc_errors::Error::Io(e.to_string()))?;
        tracing::info!(path = %entry_path.display(), "wrote embeddable entry point");
    }

    if let Some(doc_path) = &args.doc_out {
        let doc = matc_emitter::capture_doc_comment(&state.source).unwrap_or_default();
        fs::write(doc_path, doc).map_err(|e| matc_errors::Error::Io(e.to_string()))?;
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .init();

    let args = Args::parse();
    let input = args.input.clone();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let source = fs::read_to_string(&input).unwrap_or_default();
            eprintln!("{}", err.formatted(&source));
            ExitCode::FAILURE
        }
    }
}

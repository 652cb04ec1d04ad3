use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Once;

static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "wordvm::vm::load=debug,wordvm::vm::eval=debug,wordvm::vm::debug=info";
const DEBUG_LOG_FILTER: &str = "wordvm::vm::debug=info";

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use wordvm_core::{
    vm::{self, Expression, ExpressionConfig, Host, JsonLinesSink, NullHost, StaticHost, TracingSink, Vm, VmContext},
    word::{Word, parse_word},
};


#[derive(Debug, Parser)]
#[command(
    name = "wordvm",
    author,
    version,
    about = "CLI for wordvm",
    long_about = None,
    after_help = "Expression files are JSON, TOML or YAML: { constants: [...], sources: [...] }"
)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DebugOutput {
    /// Records go to the tracing log
    Log,
    /// One JSON object per record on stderr
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load and validate an expression file.
    Check {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
    },
    /// Print every source in assembly form.
    Disasm {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
    },
    /// Re-emit an expression file as JSON with hex bytecode sources.
    Asm {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
        /// Output path (stdout when omitted)
        #[arg(short, long, value_parser = parse_sanitized_path)]
        output: Option<PathBuf>,
    },
    /// Evaluate a source and print the final stack, one word per line.
    Eval {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
        /// Entry source index
        #[arg(long, default_value_t = 0)]
        entry: usize,
        /// Host state file (JSON, TOML or YAML)
        #[arg(long, value_parser = parse_sanitized_path)]
        host: Option<PathBuf>,
        /// Word seeded into the entry window; repeatable, deepest first
        #[arg(long = "input", value_name = "WORD", value_parser = parse_word_arg)]
        inputs: Vec<Word>,
        /// Where `debug` records go
        #[arg(long, value_enum)]
        debug: Option<DebugOutput>,
    },
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    let p = Path::new(raw);

    for comp in p.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(anyhow::anyhow!(
                "Parent directory components ('..') are not allowed in file paths."
            ));
        }
    }

    Ok(p.to_path_buf())
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|e| e.to_string())
}

fn parse_word_arg(raw: &str) -> Result<Word, String> {
    parse_word(raw).map_err(|e| e.to_string())
}

fn env_toggle_enabled(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.eq_ignore_ascii_case("0") || trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("off"))
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn init_tracing(filter_expr: Option<String>, default_filter: &str) {
    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let builder = fmt().with_writer(std::io::stderr);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(default_filter),
        };

        let _ = builder.try_init();
    });
}

fn maybe_init_tracing() {
    let raw = match std::env::var("WORDVM_TRACE") {
        Ok(value) => value,
        Err(_) => return,
    };

    if !env_toggle_enabled(&raw) {
        return;
    }

    let filter_expr = filter_expr_from(&raw).or_else(|| std::env::var("RUST_LOG").ok());
    init_tracing(filter_expr, DEFAULT_TRACE_FILTER);
}

fn load_expression(path: &Path) -> anyhow::Result<Expression> {
    ExpressionConfig::load(path)?
        .build()
        .with_context(|| format!("Failed to load expression from {}", path.display()))
}

fn check(path: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let expr = load_expression(path)?;
    let instructions: usize = expr.sources().iter().map(|s| s.len()).sum();
    writeln!(
        out,
        "ok: {} source(s), {} constant(s), {} instruction(s)",
        expr.sources().len(),
        expr.constants().len(),
        instructions
    )?;
    Ok(())
}

/// Assembly text that `assemble_expression` reads back.
fn disasm(path: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let expr = load_expression(path)?;
    for (idx, source) in expr.sources().iter().enumerate() {
        if idx > 0 {
            writeln!(out, ";")?;
        }
        writeln!(out, "# source {}", idx)?;
        let text = vm::disassemble(source);
        if !text.is_empty() {
            writeln!(out, "{}", text)?;
        }
    }
    Ok(())
}

fn asm(path: &Path, output: Option<&Path>, out: &mut dyn Write) -> anyhow::Result<()> {
    let expr = load_expression(path)?;
    let json = serde_json::to_string_pretty(&ExpressionConfig::from_expression(&expr))?;
    match output {
        Some(target) => {
            if let Some(parent) = target.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create parent directory for {}", target.display()))?;
            }
            std::fs::write(target, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", target.display()))?;
            eprintln!("Wrote {} source(s) to {}", expr.sources().len(), target.display());
        }
        None => writeln!(out, "{}", json)?,
    }
    Ok(())
}

fn eval(
    path: &Path,
    entry: usize,
    host_path: Option<&Path>,
    inputs: &[Word],
    debug: Option<DebugOutput>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let expr = load_expression(path)?;
    let static_host = host_path.map(StaticHost::load).transpose()?;
    let host: &dyn Host = match &static_host {
        Some(h) => h,
        None => &NullHost,
    };

    let mut tracing_sink = TracingSink;
    let mut json_sink = JsonLinesSink::new(std::io::stderr());
    let mut ctx = VmContext::with_host(host);
    match debug {
        Some(DebugOutput::Log) => {
            init_tracing(std::env::var("RUST_LOG").ok(), DEBUG_LOG_FILTER);
            ctx = ctx.with_sink(&mut tracing_sink);
        }
        Some(DebugOutput::Json) => ctx = ctx.with_sink(&mut json_sink),
        None => {}
    }

    let stack = Vm::new()
        .eval_with(&expr, entry, inputs, &mut ctx)
        .with_context(|| format!("Evaluation of source {} failed", entry))?;
    for value in stack {
        writeln!(out, "{}", value)?;
    }
    Ok(())
}

fn run(command: Commands, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Commands::Check { file } => check(&file, out),
        Commands::Disasm { file } => disasm(&file, out),
        Commands::Asm { file, output } => asm(&file, output.as_deref(), out),
        Commands::Eval {
            file,
            entry,
            host,
            inputs,
            debug,
        } => eval(&file, entry, host.as_deref(), &inputs, debug, out),
    }
}

fn main() -> anyhow::Result<()> {
    maybe_init_tracing();

    let CliArgs { command } = CliArgs::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(command, &mut out)
}

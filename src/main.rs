use std::io::{self, Read, Write};
use std::ops::ControlFlow;

use anyhow::{Context, Result};
use serde::Serialize;

use gcode_toolpath::config::Config;
use gcode_toolpath::core::{DiagnosticKind, ParseResult};
use gcode_toolpath::interp::parse_batched;
use gcode_toolpath::structure::{analyze_program_structure, ProgramStructure};

/// JSON document written to stdout
#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    result: &'a ParseResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    structure: Option<ProgramStructure>,
}

fn main() -> Result<()> {
    let config = Config::from_args_and_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    for source in &config.sources {
        log::debug!("Using config file {}", source.display());
    }

    let text = read_input(&config)?;
    let result = parse_batched(&text, &config.parser, config.batch_size, |run| {
        log::debug!("{} lines parsed", run.lines_consumed());
        ControlFlow::Continue(())
    });
    log_summary(&result);

    let structure = config.structure.then(|| analyze_program_structure(&text));
    let report = Report {
        result: &result,
        structure,
    };

    let mut out = io::stdout().lock();
    if config.pretty {
        serde_json::to_writer_pretty(&mut out, &report)
    } else {
        serde_json::to_writer(&mut out, &report)
    }
    .context("Failed to write JSON output")?;
    writeln!(out).context("Failed to write JSON output")?;

    Ok(())
}

/// Program text from the input file or stdin; invalid UTF-8 is replaced
fn read_input(config: &Config) -> Result<String> {
    let bytes = match &config.input {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::warn!("Input is not valid UTF-8, replacing invalid sequences");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

fn log_summary(result: &ParseResult) {
    let count = |kind: DiagnosticKind| result.diagnostics().filter(|d| d.kind == kind).count();

    log::info!(
        "{} segments, {} layers; {} parse errors, {} unsupported, \
         {} unknown parameters, {} warnings",
        result.motions().count(),
        result.layers.len(),
        count(DiagnosticKind::ParseError),
        count(DiagnosticKind::Unsupported),
        count(DiagnosticKind::UnknownParam),
        count(DiagnosticKind::Warning),
    );
}

//! Command handlers for the CLI.
//!
//! Records go to stdout as JSON; logs go to stderr. Degraded extractions are
//! still printed. Only invalid input and broken configuration fail a command.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use homescout_core::AppConfig;
use homescout_extract::{parse_listing_url_str, ExtractionPool, Extractor};

fn build_extractor(config: &AppConfig) -> anyhow::Result<Extractor> {
    Extractor::from_config(config).map_err(|e| anyhow::anyhow!("failed to build extractor: {e}"))
}

/// Extract a single listing and print the record (or the full report).
///
/// # Errors
///
/// Returns an error if the extractor cannot be built or the input is invalid.
pub(crate) async fn run_extract(
    config: &AppConfig,
    input: &str,
    deadline_secs: Option<u64>,
    report: bool,
) -> anyhow::Result<()> {
    let extractor = build_extractor(config)?;
    let deadline = deadline_secs.map(Duration::from_secs);

    let output = if report {
        let report = extractor.extract_with_report(input, deadline).await?;
        serde_json::to_string_pretty(&report)?
    } else {
        let record = match deadline {
            Some(deadline) => extractor.extract_with_deadline(input, deadline).await?,
            None => extractor.extract(input).await?,
        };
        serde_json::to_string_pretty(&record)?
    };
    println!("{output}");
    Ok(())
}

/// Extract every input listed in `file`, printing one JSON line per input in
/// file order.
///
/// Invalid inputs print an `{"input", "error"}` line and do not abort the run.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the extractor cannot be
/// built.
pub(crate) async fn run_batch(
    config: &AppConfig,
    file: &Path,
    concurrency: Option<usize>,
) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read batch file {}", file.display()))?;
    let inputs = batch_inputs(&contents);
    if inputs.is_empty() {
        tracing::warn!(file = %file.display(), "batch file has no inputs");
        return Ok(());
    }

    let pool = ExtractionPool::new(
        Arc::new(build_extractor(config)?),
        concurrency.unwrap_or(config.max_concurrent_extractions),
    );
    tracing::info!(
        inputs = inputs.len(),
        concurrency = pool.max_concurrent(),
        "batch extraction started"
    );

    let results = pool.extract_many(inputs.iter().copied()).await;
    let mut failed = 0usize;
    for (input, result) in inputs.iter().zip(results) {
        let line = match result {
            Ok(record) => serde_json::to_string(&record)?,
            Err(e) => {
                failed += 1;
                serde_json::json!({ "input": input, "error": e.to_string() }).to_string()
            }
        };
        println!("{line}");
    }

    tracing::info!(inputs = inputs.len(), failed, "batch extraction finished");
    Ok(())
}

/// Print the address parts the URL path alone yields.
///
/// # Errors
///
/// Returns an error if the URL yields no address.
pub(crate) fn run_parse_url(url: &str) -> anyhow::Result<()> {
    let parts = parse_listing_url_str(url)
        .ok_or_else(|| anyhow::anyhow!("no address could be recovered from '{url}'"))?;
    println!("{}", serde_json::to_string_pretty(&parts)?);
    Ok(())
}

/// Non-blank, non-comment lines, trimmed.
pub(crate) fn batch_inputs(contents: &str) -> Vec<&str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

//! `review extract`: run field extraction on a saved block

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use review_core::extract_fields;
use serde_json::{json, Value};

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Text file holding one review block
    pub file: PathBuf,
}

pub fn run(args: &ExtractArgs) -> Result<ExitCode> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    println!("{}", serde_json::to_string_pretty(&extraction(&text))?);
    Ok(ExitCode::SUCCESS)
}

fn extraction(text: &str) -> Value {
    let fields = extract_fields(text);
    let verdict = fields.verdict();
    json!({
        "fields": fields,
        "verdict": verdict,
        "label": verdict.label(),
    })
}

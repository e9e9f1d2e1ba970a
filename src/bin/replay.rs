//! Feed a recorded series file through the chart panel and print the
//! resulting frame as JSON.
//!
//! Usage: replay <file.jsonl> [--range ALL|72H] [--mode $|%] [--now <ms>] [--width <px>]

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde_json::json;

use modelboard::chart::ChartPanel;
use modelboard::config::Config;
use modelboard::feed::recorded::{load_batches, manifest};
use modelboard::series::Mode;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let path = PathBuf::from(args.next().ok_or_else(|| anyhow!("usage: replay <file.jsonl> [flags]"))?);

    let cfg = Config::from_env();
    let mut selection = cfg.initial_selection();
    let mut now_ms: Option<i64> = None;
    let mut width = cfg.viewport_width;

    while let Some(flag) = args.next() {
        let value = args.next().ok_or_else(|| anyhow!("{} needs a value", flag))?;
        match flag.as_str() {
            "--range" => selection.range = cfg.parse_range(&value),
            "--mode" => selection.mode = Mode::parse(&value).ok_or_else(|| anyhow!("unknown mode {}", value))?,
            "--now" => now_ms = Some(value.parse()?),
            "--width" => width = value.parse()?,
            other => return Err(anyhow!("unknown flag {}", other)),
        }
    }

    let recording = load_batches(&path)?;
    let manifest = manifest(&path, &recording)?;

    let mut settings = cfg.panel_settings();
    settings.selection = selection;
    settings.viewport_width = width;
    let mut panel = ChartPanel::new(settings);
    for batch in recording.batches {
        panel.on_batch(batch.points, &batch.model_ids);
    }

    // default to the newest recorded point so trailing windows line up with the data
    let now = now_ms.or(panel.aggregator().last_timestamp()).unwrap_or(0);
    let frame = panel.frame(now);
    for line in frame.summary_lines() {
        eprintln!("{}", line);
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "manifest": manifest, "now_ms": now, "frame": frame }))?
    );
    Ok(())
}

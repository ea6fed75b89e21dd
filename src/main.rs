// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::LocalSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use streamwork::builtin::{source_from_chunks, sync_sink};
use streamwork::config::consts::DEFAULT_CONFIG_PATH;
use streamwork::config::{load_and_validate_config, RuntimeConfig};
use streamwork::pipeline::{create_linear, pipeline_transform, NetworkCallbacks};
use streamwork::transform::{buffering_transform, Scheduler, TokioScheduler};

const DEFAULT_INPUT: &str = "the quick brown fox jumps over the lazy dog";

type Completion = Rc<RefCell<Option<oneshot::Sender<anyhow::Result<()>>>>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() > 3 {
        eprintln!("Usage: {} [config.yaml|config.toml] [input_text]", args[0]);
        eprintln!("Example: {} configs/runtime.yaml \"hello streaming world\"", args[0]);
        std::process::exit(1);
    }

    let config_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);
    let input_text = args.get(2).map(String::as_str).unwrap_or(DEFAULT_INPUT);

    let config = load_and_validate_config(config_path)
        .with_context(|| format!("failed to load configuration from {config_path}"))?;
    init_tracing(&config);

    println!("🚀 streamwork network demo");
    println!("═══════════════════════════");
    println!("Input: \"{}\"", input_text);
    println!("Config file: {}", config_path);
    println!(
        "⚙️  Thresholds: {}..{}, max per turn: {}",
        config.transform.threshold_min,
        config.transform.threshold_max,
        config
            .transform
            .max_per_turn
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
    );

    let start_time = Instant::now();
    let local = LocalSet::new();
    let records = local.run_until(run_network(&config, input_text)).await?;

    println!("\n📊 Records:");
    for record in &records {
        println!("  {}", serde_json::to_string(record)?);
    }
    println!("\n⏱️  Total Time: {:?}", start_time.elapsed());

    Ok(())
}

fn init_tracing(config: &RuntimeConfig) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Words flow through a length annotation and a nested network that
/// upper-cases them, into a collecting sink.
async fn run_network(config: &RuntimeConfig, input_text: &str) -> anyhow::Result<Vec<Value>> {
    let scheduler: Rc<dyn Scheduler> = Rc::new(TokioScheduler::new());

    let words: Vec<Value> = input_text
        .split_whitespace()
        .enumerate()
        .map(|(index, word)| json!({ "index": index, "word": word }))
        .collect();

    let measure = buffering_transform(annotate_length, config.transform, Rc::clone(&scheduler))?;
    let upper = buffering_transform(shout, config.transform, Rc::clone(&scheduler))?;
    let nested = pipeline_transform(move |entry, exit| create_linear(entry, vec![upper], exit));

    let collected = Rc::new(RefCell::new(Vec::new()));
    let sink = {
        let collected = Rc::clone(&collected);
        sync_sink(
            move |chunks: Vec<Value>| {
                collected.borrow_mut().extend(chunks);
                Ok(())
            },
            || tracing::debug!("collecting sink finished"),
            || tracing::debug!("collecting sink destroyed"),
        )
    };

    let (tx, rx) = oneshot::channel();
    let completion: Completion = Rc::new(RefCell::new(Some(tx)));
    let on_done = Rc::clone(&completion);
    let on_failed = Rc::clone(&completion);

    let network = create_linear(source_from_chunks(words), vec![measure, nested], sink)?;
    let _stream = network.stream(NetworkCallbacks::new(
        move || {
            if let Some(tx) = on_done.borrow_mut().take() {
                let _ = tx.send(Ok(()));
            }
            Ok(())
        },
        move |error| {
            if let Some(tx) = on_failed.borrow_mut().take() {
                let _ = tx.send(Err(error));
            }
            Ok(())
        },
    ))?;

    rx.await.context("network dropped without completing")??;

    let records = collected.borrow_mut().drain(..).collect();
    Ok(records)
}

fn annotate_length(records: Vec<Value>) -> anyhow::Result<Vec<Value>> {
    records
        .into_iter()
        .map(|mut record| {
            let length = record
                .get("word")
                .and_then(Value::as_str)
                .map(|word| word.chars().count())
                .ok_or_else(|| anyhow!("record without a word: {record}"))?;
            record["length"] = json!(length);
            Ok(record)
        })
        .collect()
}

fn shout(records: Vec<Value>) -> anyhow::Result<Vec<Value>> {
    records
        .into_iter()
        .map(|mut record| {
            let word = record
                .get("word")
                .and_then(Value::as_str)
                .map(str::to_uppercase)
                .ok_or_else(|| anyhow!("record without a word: {record}"))?;
            record["word"] = Value::String(word);
            Ok(record)
        })
        .collect()
}

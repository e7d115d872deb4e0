//! Iris preparation walkthrough
//!
//! Run with: `cargo run --example iris_pipeline [path/to/iris.data]`
//!
//! Loads Iris (from the UCI archive, or a local copy when a path is given),
//! splits it 100/50, writes both splits to minidb stores and reads the
//! training store back in batches of 16. Set `RUST_LOG=tensorkv=debug` to
//! see every batch read.

use anyhow::Context;
use tensorkv::data::IRIS_FEATURE_NAMES;
use tensorkv::pipeline::Pipeline;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== tensorkv Iris Pipeline ===\n");

    let dir = std::env::temp_dir();
    let mut builder = Pipeline::builder()
        .seed(2017)
        .train_path(dir.join("iris_train.minidb").display().to_string())
        .test_path(dir.join("iris_test.minidb").display().to_string());
    if let Some(path) = std::env::args().nth(1) {
        builder = builder.source_path(path);
    }
    let pipeline = builder.build()?;

    // 1. Load
    println!("1. Load");
    println!("   ----");
    let dataset = pipeline.load().context("loading Iris")?;
    println!("   {} rows, features: {}", dataset.len(), IRIS_FEATURE_NAMES.join(", "));
    println!();

    // 2. Split and write
    println!("2. Split + Write");
    println!("   -------------");
    let summary = pipeline.prepare_dataset(&dataset)?;
    for written in [&summary.train, &summary.test] {
        println!(
            "   {} -> {} records ({} bytes)",
            written.path, written.records, written.bytes
        );
    }
    println!();

    // 3. Read back
    println!("3. Batched Read");
    println!("   ------------");
    let mut reader = pipeline.train_reader()?;
    for _ in 0..3 {
        let batch = reader.next_batch()?;
        println!(
            "   batch {}: {} records, first key {}, labels {:?}",
            reader.batches_read(),
            batch.len(),
            batch.keys[0],
            batch.labels.to_vec()
        );
    }
    let columns = reader.next_batch()?.to_record_batch()?;
    println!("   as Arrow: {} rows x {} columns", columns.num_rows(), columns.num_columns());
    reader.close()?;

    println!("\nDone.");
    Ok(())
}

use std::path::PathBuf;

use clap::Parser;
use pivotdb::{AnalyticsClient, FileSnapshotStore, QueryModel, QueryResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pivotdb")]
#[command(about = "PivotDB - an in-memory analytical query engine", long_about = None)]
struct Args {
    /// Delimited dataset file to load
    #[arg(short, long)]
    data: PathBuf,

    /// Query model as a JSON file
    #[arg(short, long)]
    model: PathBuf,

    /// Purpose tag recorded in run metadata
    #[arg(long, default_value = "cli")]
    purpose: String,

    /// Directory holding the snapshot slot
    #[arg(long, default_value = "./data")]
    state_dir: PathBuf,

    /// Print only the generated SQL, not the result table
    #[arg(long)]
    sql_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pivotdb=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::fs::create_dir_all(&args.state_dir)?;
    let store = FileSnapshotStore::new(&args.state_dir);
    let mut client = AnalyticsClient::restore(store);

    client.load_dataset_file(&args.data).await?;

    let model_text = tokio::fs::read_to_string(&args.model).await?;
    let model: QueryModel = serde_json::from_str(&model_text)?;

    let output = client.run(&model, args.purpose.as_str().into())?;

    println!("-- {}", output.meta.id);
    println!("{}", output.sql);
    if !args.sql_only {
        println!();
        print_table(&output.result);
    }

    Ok(())
}

fn print_table(result: &QueryResult) {
    let widths: Vec<usize> = result
        .columns
        .iter()
        .map(|col| {
            result
                .rows
                .iter()
                .map(|row| row.get(col).map_or(0, |v| cell_text(v).len()))
                .chain(std::iter::once(col.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("{:<w$}", col, w = *w))
        .collect();
    println!("{}", header.join(" | "));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );

    for row in &result.rows {
        let cells: Vec<String> = result
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| {
                let text = row.get(col).map(cell_text).unwrap_or_default();
                format!("{:<w$}", text, w = *w)
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
    println!("({} rows)", result.rows.len());
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

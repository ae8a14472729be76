use anyhow::{Context, Result};
use clap::Parser;
use fooder::algorithms::pruning::prune;
use fooder::services::rating_store::{write_interactions, CsvInteractionSource, InteractionSource};
use fooder::{init_tracing, Config, DishType};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

/// Drops sparse users and recipes from an interaction table.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Table to prune when no explicit input is given.
    #[arg(short, long, default_value = "main")]
    dish: DishType,

    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(short, long)]
    output: PathBuf,

    #[arg(long)]
    min_ratings_per_user: Option<usize>,

    #[arg(long)]
    min_ratings_per_recipe: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing().await;

    let config = Config::load_or_default(&args.config)?;

    let mut thresholds = config.pruning.thresholds();
    if let Some(min) = args.min_ratings_per_user {
        thresholds.min_ratings_per_user = min;
    }
    if let Some(min) = args.min_ratings_per_recipe {
        thresholds.min_ratings_per_recipe = min;
    }

    let input = args.input.unwrap_or_else(|| match args.dish {
        DishType::Main => config.data.main_interactions.clone(),
        DishType::Dessert => config.data.dessert_interactions.clone(),
    });
    info!("Pruning {} with {:?}", input.display(), thresholds);

    let mut table = CsvInteractionSource::new(&input).load_table().await?;
    let report = prune(&mut table, thresholds);
    info!(
        passes = report.passes,
        users_removed = report.users_removed,
        recipes_removed = report.recipes_removed,
        interactions_removed = report.interactions_removed,
        "Pruning finished"
    );

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    write_interactions(&table, BufWriter::new(file))?;

    let (users, recipes, interactions) = table.shape();
    info!(
        "Wrote {} users, {} recipes, {} interactions to {}",
        users,
        recipes,
        interactions,
        args.output.display()
    );

    Ok(())
}

use anyhow::{Context, Result};
use catalog_core::{
    init_logging, CatalogConfig, CatalogQueryService, DocumentId, LogLevel, MemoryStore,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Catalog CLI - query a storefront catalog seeded from a JSON file")]
#[command(version)]
struct Cli {
    /// Seed data file: { "collection_name": [documents...], ... }
    #[arg(long, default_value = "catalog.json", global = true)]
    data: PathBuf,
    /// Config file (defaults to $CATALOG_CONFIG or catalog.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log level override (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Item count per category, plus "All"
    Categories,
    /// One page of items in a category
    Items {
        /// Category name, or "All"
        #[arg(default_value = "All")]
        category: String,
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 5)]
        page_size: usize,
    },
    /// Number of items in a category
    Count {
        #[arg(default_value = "All")]
        category: String,
    },
    /// One page of full-text search results
    Search {
        query: String,
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 5)]
        page_size: usize,
    },
    /// Number of full-text search results
    CountSearch { query: String },
    /// Show one item
    Get {
        /// Item id (numeric ids are matched as integers)
        id: DocumentId,
    },
    /// Items shown beside an item page
    Related,
    /// Append a review to an item
    Review {
        id: DocumentId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        comment: String,
        #[arg(long)]
        stars: f64,
        /// Save the updated catalog back into the data file
        #[arg(long)]
        write_back: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CatalogConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => CatalogConfig::load_from_env().context("Failed to load config")?,
    };

    let level = match cli.log_level.as_deref() {
        Some(name) => LogLevel::from_str(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown log level: {}", name))?,
        None => config.log_level(),
    };
    init_logging(level);

    let store = Arc::new(MemoryStore::new());
    let total = load_seed(&store, &cli.data, &config)?;
    info!("Loaded {} documents from {}", total, cli.data.display());

    let service = CatalogQueryService::new(Arc::clone(&store), config);
    run(&service, cli.command, &cli.data).await
}

async fn run(
    service: &CatalogQueryService<MemoryStore>,
    command: Commands,
    data: &Path,
) -> Result<()> {
    match command {
        Commands::Categories => print_json(&service.list_categories().await?),
        Commands::Items {
            category,
            page,
            page_size,
        } => print_json(&service.list_items(&category, page, page_size).await?),
        Commands::Count { category } => print_json(&service.count_items(&category).await?),
        Commands::Search {
            query,
            page,
            page_size,
        } => print_json(&service.search_items(&query, page, page_size).await?),
        Commands::CountSearch { query } => {
            print_json(&service.count_search_items(&query).await?)
        }
        Commands::Get { id } => print_json(&service.get_item(&id).await?),
        Commands::Related => print_json(&service.get_related_items().await?),
        Commands::Review {
            id,
            name,
            comment,
            stars,
            write_back,
        } => {
            let review = service.add_review(&id, &comment, &name, stars).await?;
            if write_back {
                let total = save_catalog(service.store(), data)?;
                info!("Wrote {} documents back to {}", total, data.display());
            }
            print_json(&review)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

/// Seed the store from a JSON file
/// Format: { "collection_name": [documents...], ... }
fn load_seed(store: &MemoryStore, file: &Path, config: &CatalogConfig) -> Result<usize> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let data: Map<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in file: {}", file.display()))?;

    store.create_collection(&config.collection);
    store
        .create_text_index(&config.collection, config.text_index())
        .context("Failed to create text index")?;

    let mut total_docs = 0;
    for (collection_name, documents) in data {
        let docs = match documents {
            Value::Array(docs) => docs,
            _ => anyhow::bail!("Collection '{}' must be an array", collection_name),
        };
        let inserted = store
            .insert_many(&collection_name, docs)
            .with_context(|| format!("Failed to insert documents into {}", collection_name))?;
        total_docs += inserted.len();
    }

    Ok(total_docs)
}

/// Write every collection back to the seed file
fn save_catalog(store: &MemoryStore, file: &Path) -> Result<usize> {
    let mut output: Map<String, Value> = Map::new();
    let mut total_docs = 0;

    for name in store.list_collections() {
        let docs = store
            .export(&name)
            .with_context(|| format!("Failed to export collection: {}", name))?;
        total_docs += docs.len();
        output.insert(name, Value::Array(docs));
    }

    let json =
        serde_json::to_string_pretty(&output).with_context(|| "Failed to serialize to JSON")?;
    fs::write(file, json).with_context(|| format!("Failed to write to file: {}", file.display()))?;

    Ok(total_docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn seed_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("catalog.json");
        let data = json!({
            "item": [
                {
                    "_id": 1,
                    "title": "Gray Hooded Sweatshirt",
                    "category": "Apparel",
                    "price": 29.99,
                    "reviews": []
                },
                {
                    "_id": 2,
                    "title": "Coffee Mug",
                    "category": "Kitchen",
                    "price": 12.5,
                    "reviews": []
                }
            ]
        });
        fs::write(&path, data.to_string()).unwrap();
        path
    }

    #[test]
    fn test_load_seed() {
        let dir = TempDir::new().unwrap();
        let path = seed_file(&dir);
        let store = MemoryStore::new();
        let total = load_seed(&store, &path, &CatalogConfig::default()).unwrap();
        assert_eq!(total, 2);
        assert_eq!(store.len("item"), 2);
    }

    #[test]
    fn test_load_seed_rejects_non_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"item": {"_id": 1}}"#).unwrap();
        let store = MemoryStore::new();
        assert!(load_seed(&store, &path, &CatalogConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_review_write_back() {
        let dir = TempDir::new().unwrap();
        let path = seed_file(&dir);
        let config = CatalogConfig::default();
        let store = Arc::new(MemoryStore::new());
        load_seed(&store, &path, &config).unwrap();
        let service = CatalogQueryService::new(Arc::clone(&store), config);

        let command = Commands::Review {
            id: DocumentId::Int(2),
            name: "Ann".to_string(),
            comment: "Great".to_string(),
            stars: 5.0,
            write_back: true,
        };
        run(&service, command, &path).await.unwrap();

        let saved: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["item"][1]["reviews"][0]["name"], "Ann");
        assert_eq!(saved["item"][0]["reviews"], json!([]));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["catalog", "items", "Books", "--page", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Items { ref category, page: 2, page_size: 5 } if category == "Books"
        ));

        let cli = Cli::try_parse_from(["catalog", "--data", "x.json", "get", "abc"]).unwrap();
        assert_eq!(cli.data, PathBuf::from("x.json"));
        assert!(matches!(
            cli.command,
            Commands::Get { id: DocumentId::String(ref s) } if s == "abc"
        ));

        assert!(Cli::try_parse_from(["catalog", "review", "1", "--name", "Ann"]).is_err());
    }
}

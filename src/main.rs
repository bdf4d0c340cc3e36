use docctx::chunking::Chunker;
use docctx::cli::{Cli, Commands, ConfigAction};
use docctx::config::Config;
use docctx::error::{DocctxError, Result};
use docctx::ingest::{Document, Extractor};
use docctx::retrieval::RetrievalConfig;
use docctx::service::{ContextRequest, ContextService};
use std::path::{Path, PathBuf};

/// Retrieval flags given to `ask`
struct AskOptions {
    file: Option<PathBuf>,
    web: bool,
    top_k: Option<usize>,
    fetch_k: Option<usize>,
    lambda: Option<f32>,
    no_mmr: bool,
    rerank: bool,
    json: bool,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Ask {
            query,
            file,
            web,
            top_k,
            fetch_k,
            lambda,
            no_mmr,
            rerank,
            json,
        } => {
            let options = AskOptions {
                file,
                web,
                top_k,
                fetch_k,
                lambda,
                no_mmr,
                rerank,
                json,
            };
            cmd_ask(cli.config, &query, options)?;
        }
        Commands::Chunk { file, json } => {
            cmd_chunk(cli.config, &file, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = if verbose { "docctx=debug" } else { "docctx=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_ask(config_path: Option<PathBuf>, query: &str, options: AskOptions) -> Result<()> {
    let mut config = load_config(config_path)?;

    // Flags that need models or credentials must be set before the service loads them
    if options.rerank {
        config.retrieval.reranking_enabled = true;
    }
    if options.web {
        config.web_search.enabled = true;
    }

    let mut retrieval = RetrievalConfig::from(&config.retrieval);
    if let Some(top_k) = options.top_k {
        retrieval.top_k = top_k;
    }
    if let Some(fetch_k) = options.fetch_k {
        retrieval.fetch_k = fetch_k;
    }
    if let Some(lambda) = options.lambda {
        if !(0.0..=1.0).contains(&lambda) {
            return Err(DocctxError::InvalidConfigValue {
                path: "--lambda".to_string(),
                message: format!("must be between 0.0 and 1.0, got {}", lambda),
            });
        }
        retrieval.lambda_mult = lambda;
    }
    if options.no_mmr {
        retrieval.use_mmr = false;
    }

    let mut request = ContextRequest::new(query)
        .with_web_search(options.web)
        .with_retrieval(retrieval);

    if let Some(path) = &options.file {
        let bytes = std::fs::read(path).map_err(|e| DocctxError::Io {
            source: e,
            context: format!("Failed to read {:?}", path),
        })?;
        request = request.with_file(file_name(path), bytes);
    }

    let service = ContextService::from_config(&config)?;

    let rt = tokio::runtime::Runtime::new().map_err(|e| DocctxError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;
    let context = rt.block_on(service.build_context(request))?;

    if options.json {
        let json = serde_json::to_string_pretty(&context).map_err(|e| DocctxError::Json {
            source: e,
            context: "Failed to serialize context".to_string(),
        })?;
        println!("{}", json);
        return Ok(());
    }

    match &context.system_prompt {
        Some(prompt) => println!("{}", prompt),
        None => println!("No context found for this question."),
    }

    if !context.sources.is_empty() {
        println!("\nSources:");
        for source in &context.sources {
            println!("  - {} ({})", source.title, source.link);
        }
    }

    Ok(())
}

fn cmd_chunk(config_path: Option<PathBuf>, path: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let document = Document::from_path(path)?;
    let extractor = Extractor::from_config(&config.extraction);
    let chunker = Chunker::from_config(&config.chunking)?;

    let extraction = extractor.extract(&document);
    if let Some(reason) = extraction.reason() {
        tracing::warn!("Extraction {:?}: {}", extraction.status(), reason);
    }
    let chunks = chunker.chunk(extraction.value());

    if json {
        let json = serde_json::to_string_pretty(&chunks).map_err(|e| DocctxError::Json {
            source: e,
            context: "Failed to serialize chunks".to_string(),
        })?;
        println!("{}", json);
        return Ok(());
    }

    println!(
        "{}: {} page(s), {} chunk(s) (size={}, overlap={})",
        document.file_name,
        extraction.value().len(),
        chunks.len(),
        chunker.chunk_size(),
        chunker.chunk_overlap()
    );
    for chunk in &chunks {
        println!(
            "\n--- chunk {} (page {}, offset {}, {} chars) ---",
            chunk.index,
            chunk.page,
            chunk.source_offset,
            chunk.char_len()
        );
        println!("{}", chunk.text);
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path)?;
            let mut value = serde_json::to_value(&config).map_err(|e| DocctxError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            if let Some(section) = section {
                value = value
                    .get(&section)
                    .cloned()
                    .ok_or_else(|| DocctxError::Config(format!("Unknown section: {}", section)))?;
            }

            let json = serde_json::to_string_pretty(&value).map_err(|e| DocctxError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DocctxError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'docctx config init' to create one."
        );
        return Config::from_env();
    }

    Config::load(&path)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

mod cli;

use reelforge::{
    config,
    dispatcher::Dispatcher,
    pipeline::{FileEvent, PostOutput, PostPipeline},
    resolver::ResolveOptions,
};
use reelforge_common::ImageReference;
use reelforge_parser::{FilenameParser, ParsedFilename};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use tokio::io::AsyncBufReadExt;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelforge=trace,reelforge_parser=debug,reelforge_db=debug,reelforge_common=debug"
                .to_string()
        } else {
            "reelforge=info,reelforge_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Parse { filename, json } => parse_filename(&filename, json),
        Commands::Process {
            filename,
            message_id,
            size,
            image,
            refresh,
            json,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            let mut event = FileEvent::new(message_id, filename);
            event.size_bytes = size;
            event.supplied_image = image.as_deref().map(ImageReference::from_user_input);
            let options = ResolveOptions {
                force_refresh: refresh,
            };
            rt.block_on(process_file(event, options, cli.config.as_deref(), json))
        }
        Commands::Dispatch { capacity } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(dispatch_stdin(capacity, cli.config.as_deref()))
        }
        Commands::Override { hint, image } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(save_override(&hint, &image, cli.config.as_deref()))
        }
        Commands::History { message_id, limit } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_history(message_id, limit, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_filename(filename: &str, json: bool) -> Result<()> {
    let parsed = FilenameParser::default().parse(filename);

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else {
        print_parsed(&parsed);
    }

    Ok(())
}

fn print_parsed(parsed: &ParsedFilename) {
    fn show<T: std::fmt::Display>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
    }

    println!("Title: {}", parsed.title);
    println!("Type: {}", parsed.media_type);
    println!("Year: {}", show(parsed.year));
    if parsed.is_series() {
        println!("Episode: {}", show(parsed.episode_tag()));
    }
    println!("Quality: {}", show(parsed.quality));
    println!("Source: {}", show(parsed.source));
    println!("Video codec: {}", show(parsed.video_codec));
    println!("Audio codec: {}", show(parsed.audio_codec));
    if !parsed.audio_languages.is_empty() {
        let languages: Vec<&str> = parsed.audio_languages.iter().map(String::as_str).collect();
        println!("Languages: {}", languages.join(", "));
    }
    println!("Group: {}", show(parsed.release_group.as_deref()));
}

fn build_pipeline(config_path: Option<&Path>) -> Result<PostPipeline> {
    let config = config::load_config_or_default(config_path)?;
    PostPipeline::from_config(&config)
}

async fn process_file(
    event: FileEvent,
    options: ResolveOptions,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let pipeline = build_pipeline(config_path)?;
    let output = pipeline.process_with(&event, &[], options).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_output(&output);
    }

    Ok(())
}

fn print_output(output: &PostOutput) {
    println!("Image: {}", output.image);
    if let Some(ref resolution) = output.resolution {
        println!("Poster source: {:?}", resolution.source);
    }
    println!("\n{}\n", output.caption);
    for row in &output.buttons {
        let labels: Vec<String> = row
            .iter()
            .map(|b| format!("[{}] ({})", b.text, b.callback_data))
            .collect();
        println!("{}", labels.join("  "));
    }
}

async fn dispatch_stdin(capacity: usize, config_path: Option<&Path>) -> Result<()> {
    let pipeline = build_pipeline(config_path)?;
    let (events, mut outcomes, dispatcher) = Dispatcher::channel(pipeline.clone(), capacity.max(1));
    let dispatch_handle = tokio::spawn(dispatcher.run());

    let printer = tokio::spawn(async move {
        while let Some(outcome) = outcomes.recv().await {
            match serde_json::to_string(&outcome.output) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::error!("Failed to serialize outcome: {}", e),
            }
            pipeline
                .record_posted(outcome.message_id, &outcome.output.parsed.title)
                .await;
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((id, filename)) = line.split_once(char::is_whitespace) else {
            tracing::warn!("Skipping malformed line: {}", line);
            continue;
        };
        let Ok(message_id) = id.parse::<i64>() else {
            tracing::warn!("Skipping line with invalid message id: {}", line);
            continue;
        };
        if events
            .send(FileEvent::new(message_id, filename.trim()))
            .await
            .is_err()
        {
            break;
        }
    }
    drop(events);

    let processed = dispatch_handle.await?;
    printer.await?;
    tracing::info!("Dispatched {} files", processed);

    Ok(())
}

async fn save_override(hint: &str, image: &str, config_path: Option<&Path>) -> Result<()> {
    let pipeline = build_pipeline(config_path)?;
    let entry = pipeline
        .save_override(hint, ImageReference::from_user_input(image))
        .await?;
    println!("Saved override for \"{}\": {}", entry.hint, entry.image);
    Ok(())
}

async fn show_history(
    message_id: Option<i64>,
    limit: u32,
    config_path: Option<&Path>,
) -> Result<()> {
    let pipeline = build_pipeline(config_path)?;

    let Some(message_id) = message_id else {
        let records = pipeline.recent_posted(limit).await?;
        if records.is_empty() {
            println!("Nothing has been posted yet");
        }
        for record in records {
            println!(
                "{}  {}  {}",
                record.posted_at.to_rfc3339(),
                record.message_id,
                record.title
            );
        }
        return Ok(());
    };

    match pipeline.posted_record(message_id).await? {
        Some(record) => println!(
            "Message {} posted as \"{}\" at {}",
            record.message_id,
            record.title,
            record.posted_at.to_rfc3339()
        ),
        None => println!("Message {} has not been posted", message_id),
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!(
        "  TMDB: {} ({} req/s)",
        if config.tmdb.api_key.is_empty() {
            "no API key"
        } else {
            "API key set"
        },
        config.tmdb.requests_per_second
    );
    println!("  Database: {}", config.storage.database_path.display());
    println!("  Poster cache: {}", config.storage.poster_cache_dir.display());
    println!("  Output: {}", config.storage.output_dir.display());
    println!("  Fallback image: {}", config.assets.fallback_image.display());
    println!("  Poster width: {}px", config.composer.width);

    Ok(())
}

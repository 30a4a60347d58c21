//! footprint CLI entry point
//!
//! - `footprint investigate --email <addr> --phone <e164>` - run an investigation
//! - `footprint capabilities` - list capabilities and registered probes
//! - `footprint config --validate` - check the configuration file

use anyhow::Context;
use footprint::cli::output::Output;
use footprint::cli::{Cli, Commands};
use footprint::utils::logging;
use footprint::utils::toml_config::{ConfigError, FootprintConfig};
use footprint::{
    AppError, Capability, InvestigationInput, Investigator, JsonFileSink, ProbeRegistry,
    RecordSink,
};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        let code = match e.downcast_ref::<AppError>() {
            Some(AppError::Cancelled) => 130,
            Some(AppError::InvalidInput(_)) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let (config, config_missing) = match FootprintConfig::load(&cli.config) {
        Ok(config) => (config, false),
        Err(ConfigError::FileNotFound(_)) => (FootprintConfig::default(), true),
        Err(e) => return Err(e).context("failed to load configuration"),
    };

    logging::init(&config.logging, cli.verbose)?;
    if config_missing {
        tracing::warn!(path = %cli.config.display(), "config file not found, using defaults");
    }

    match cli.command {
        Commands::Investigate {
            email,
            phone,
            only,
            output: results_dir,
            no_save,
            json,
        } => {
            investigate(
                &output,
                config,
                email,
                phone,
                only,
                results_dir,
                no_save,
                json,
            )
            .await
        }
        Commands::Capabilities => {
            show_capabilities(&output, &config);
            Ok(())
        }
        Commands::Config { validate } => show_config(&output, &config, &cli.config, validate),
    }
}

#[allow(clippy::too_many_arguments)]
async fn investigate(
    output: &Output,
    config: FootprintConfig,
    email: Option<String>,
    phone: Option<String>,
    only: Option<Vec<Capability>>,
    results_dir: Option<PathBuf>,
    no_save: bool,
    json: bool,
) -> anyhow::Result<()> {
    config.validate()?;
    let input = InvestigationInput::new(email.as_deref(), phone.as_deref())?;
    let results_root = results_dir.unwrap_or_else(|| config.storage.results_dir.clone());
    let investigator = Investigator::from_config(config)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling investigation");
            on_ctrl_c.cancel();
        }
    });

    if !json {
        output.banner();
    }
    let record = investigator
        .investigate(input, only.as_deref(), cancel)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(record.as_ref())?);
    } else {
        output.record(&record);
    }

    if !no_save {
        let sink = JsonFileSink::new(results_root);
        let path = sink.store(&record).await?;
        if !json {
            output.info(&format!("saved to {}", path.display()));
        }
    }

    Ok(())
}

fn show_capabilities(output: &Output, config: &FootprintConfig) {
    let registry = ProbeRegistry::from_config(config);
    let registered = registry.describe();

    output.header("Capabilities");
    for capability in Capability::ALL {
        match registered.iter().find(|(c, _)| *c == capability) {
            Some((_, description)) => output.kv(capability.id(), description),
            None => output.kv(capability.id(), "disabled"),
        }
    }
    output.newline();
}

fn show_config(
    output: &Output,
    config: &FootprintConfig,
    path: &std::path::Path,
    validate: bool,
) -> anyhow::Result<()> {
    output.header("Configuration");
    output.kv("file", &path.display().to_string());
    output.kv(
        "max_concurrency",
        &config.orchestrator.max_concurrency.to_string(),
    );
    output.kv(
        "default_timeout_secs",
        &config.orchestrator.default_timeout_secs.to_string(),
    );
    output.kv(
        "results_dir",
        &config.storage.results_dir.display().to_string(),
    );

    if validate {
        let warnings = config.validate_with_warnings()?;
        for warning in &warnings {
            output.warning(&warning.to_string());
        }
        output.success("configuration is valid");
    }
    output.newline();
    Ok(())
}

//! Add-on manifest CLI - validation front end for build/start/package tooling
//!
//! Commands: validate, inspect
//! Returns 2 on validation failure, 1 when the manifest cannot be loaded

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use addon_manifest_core::{
    check_entry_files, read_manifest, report::render_lines, AdditionalInfo, AddOnManifest,
    ManifestValidator, ValidationResult,
};

#[derive(Parser)]
#[command(name = "addon-manifest-cli")]
#[command(about = "Add-on manifest validation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing manifest.json
    #[arg(short, long, default_value = "dist", global = true)]
    src: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Identifier of the add-on source, used in logs
    #[arg(long, default_value = "local", global = true)]
    source_id: String,

    /// Grant access to privileged manifest features
    #[arg(long, global = true)]
    privileged: bool,

    /// Treat the add-on as a developer add-on
    #[arg(long, global = true)]
    developer: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the manifest and the files its entry points reference
    Validate {
        /// Print the validation result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate and print a summary of the typed manifest
    Inspect,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let additional = AdditionalInfo::new(cli.source_id.clone())
        .privileged(cli.privileged)
        .developer(cli.developer);

    let validator = match ManifestValidator::new() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to compile manifest schemas: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Validate { json } => {
            let document = match read_manifest(&cli.src) {
                Ok(d) => d,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            };

            let mut result = validator.validate(Some(&document), &additional);
            if result.is_success() {
                // Only a valid manifest can be typed; file checks need the typed view.
                match AddOnManifest::from_value(&document) {
                    Ok(manifest) => {
                        result = ValidationResult::failure(check_entry_files(&manifest, &cli.src));
                    }
                    Err(e) => {
                        eprintln!("{}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }

            if json {
                match serde_json::to_string_pretty(&result) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("{}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                for line in render_lines(&result) {
                    eprintln!("{}", line);
                }
            }

            if result.is_success() {
                info!(src = %cli.src.display(), "manifest is valid");
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2) // Validation failure
            }
        }

        Commands::Inspect => {
            let manifest = match validator.load_manifest(&cli.src, &additional) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::from(2);
                }
            };

            let apps: Vec<_> = manifest
                .requirements()
                .apps
                .iter()
                .map(|app| serde_json::json!({ "name": app.name, "apiVersion": app.api_version }))
                .collect();

            let summary = serde_json::json!({
                "manifestVersion": manifest.manifest_version().as_u8(),
                "id": manifest.id(),
                "name": manifest.name(),
                "version": manifest.version(),
                "apps": apps,
                "entryPoints": manifest.entry_points(),
            });

            match serde_json::to_string_pretty(&summary) {
                Ok(out) => {
                    println!("{}", out);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tokio::io::{stdin, stdout};
use tower_lsp::{LspService, Server};

use crate::lsp::backend::Backend;
use crate::schema::registry::{embedded_polly_toml, EMBEDDED_SCHEMA_NAME, SCHEMA_FILE_SUFFIX};
use crate::schema::SchemaRegistry;
use crate::Config;

/// Start the LSP server
pub async fn serve() -> Result<()> {
    let config = Config::from_args_and_env()?;

    // Logs go to stderr, stdout carries the protocol
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .target(env_logger::Target::Stderr)
        .init();

    let schema_registry = SchemaRegistry::from_config(&config);
    log::info!(
        "Loaded schemas: {}",
        schema_registry.list_schemas().join(", ")
    );

    // Write embedded schema to user's config directory as a template
    match write_embedded_schema_template() {
        Ok(Some(path)) => log::info!("Created schema template: {:?}", path),
        Ok(None) => {}
        Err(e) => log::warn!("Failed to write embedded schema template: {:#}", e),
    }

    let (service, socket) =
        LspService::build(move |client| Backend::new(client, config.clone(), schema_registry))
            .custom_method("ssml/report", Backend::report)
            .finish();

    Server::new(stdin(), stdout(), socket).serve(service).await;

    Ok(())
}

/// Write the embedded Polly schema next to the user schema directory.
///
/// The template carries an `.example` suffix so it is never loaded; users
/// rename it to customize the schema. Existing files are left untouched.
fn write_embedded_schema_template() -> Result<Option<PathBuf>> {
    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    let schema_dir = config_dir.join("ssml-ls").join("schemas");
    fs::create_dir_all(&schema_dir)
        .with_context(|| format!("Failed to create {:?}", schema_dir))?;

    let template_path =
        schema_dir.join(format!("{EMBEDDED_SCHEMA_NAME}{SCHEMA_FILE_SUFFIX}.example"));
    if template_path.exists() {
        return Ok(None);
    }

    fs::write(&template_path, embedded_polly_toml())
        .with_context(|| format!("Failed to write {:?}", template_path))?;
    Ok(Some(template_path))
}

//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, QueryArgs};
use crate::config::ServiceConfig;
use crate::error::{Error, Result, ResultExt};
use crate::provider::MemoryDirectory;
use crate::service::{DirectoryService, ExportRequest, QueryRequest};
use crate::types::ObjectType;
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Serve { port } => crate::cli::serve(self.service()?, *port).await,
            Commands::Query { query, page } => self.query(query, *page).await,
            Commands::Export {
                query,
                export_format,
                selected_ids,
                output,
            } => {
                self.export(query, export_format, selected_ids, output.as_deref())
                    .await
            }
            Commands::Attributes { object_type } => self.attributes(object_type),
        }
    }

    /// Load the service configuration, falling back to defaults
    fn load_config(&self) -> Result<ServiceConfig> {
        match &self.cli.config {
            Some(path) => ServiceConfig::from_file(path),
            None => Ok(ServiceConfig::default()),
        }
    }

    /// Build a service over the directory fixture
    fn service(&self) -> Result<DirectoryService> {
        let path = self
            .cli
            .directory
            .as_ref()
            .ok_or_else(|| Error::config("Directory file not specified (use -d flag)"))?;
        let directory = MemoryDirectory::from_file(path)?;
        tracing::info!(
            base_dn = directory.base_dn(),
            entries = directory.len(),
            "Loaded directory"
        );
        DirectoryService::in_memory(Arc::new(directory), self.load_config()?)
    }

    /// Run a query and print the requested page
    async fn query(&self, args: &QueryArgs, page: u32) -> Result<()> {
        let service = self.service()?;
        let first = service.start_query(&query_request(args)).await?;

        let result = if page == 1 {
            first
        } else {
            service.get_page(first.session_id.as_str(), page).await?
        };

        let mut message = serde_json::to_value(&result)?;
        message["type"] = json!("PAGE");
        self.output_message(&message);
        Ok(())
    }

    /// Run a query and write the full export
    async fn export(
        &self,
        args: &QueryArgs,
        format: &str,
        selected_ids: &[String],
        output: Option<&Path>,
    ) -> Result<()> {
        let service = self.service()?;
        let first = service.start_query(&query_request(args)).await?;

        let request = ExportRequest {
            format: format.to_string(),
            selected_ids: (!selected_ids.is_empty()).then(|| selected_ids.to_vec()),
        };
        let export = service
            .export(first.session_id.as_str(), &request)
            .await?;
        service.invalidate_session(first.session_id.as_str()).await;

        match output {
            Some(path) => {
                std::fs::write(path, &export.bytes).with_context(|| {
                    format!("Failed to write export to '{}'", path.display())
                })?;
                self.output_message(&json!({
                    "type": "EXPORT",
                    "path": path.display().to_string(),
                    "filename": export.filename,
                    "content_type": export.content_type,
                    "records": export.record_count,
                }));
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&export.bytes)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    /// Print the default attributes of an object type
    fn attributes(&self, object_type: &str) -> Result<()> {
        let object_type: ObjectType = object_type.parse()?;
        self.output_message(&json!({
            "type": "ATTRIBUTES",
            "object_type": object_type,
            "attributes": object_type.default_attributes(),
        }));
        Ok(())
    }

    /// Output a message
    fn output_message<T: Serialize>(&self, msg: &T) {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(msg),
        };
        println!("{}", rendered.unwrap_or_default());
    }
}

/// Map CLI query arguments to a service request
fn query_request(args: &QueryArgs) -> QueryRequest {
    let non_empty = |values: &Vec<String>| (!values.is_empty()).then(|| values.clone());

    QueryRequest {
        filter: args.filter.clone(),
        object_type: args.object_type.clone(),
        search: args.search.clone(),
        attributes: non_empty(&args.attributes),
        partitions: non_empty(&args.partitions),
        page_size: args.page_size,
    }
}

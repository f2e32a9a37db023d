//! Dashboard Migration Tool
//!
//! Provides CLI interface for exporting BI analyses to JSON and re-importing and
//! publishing them in another environment

// dashboardtool/src/main.rs
mod config;
mod errors;
mod export;
mod gateway;
mod import;
mod operation;
mod publish;
mod utils;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::AppConfig;
use gateway::http::HttpQuickSightGateway;
use gateway::object_store::S3ObjectStore;
use operation::composite::ImportAndPublishOperation;
use operation::{Operation, OperationContext};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Moves dashboards between environments of the BI service
#[derive(Parser)]
#[command(name = "dashboardtool")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: config.json when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The AWS account profile
    #[arg(long, global = true)]
    aws_profile: Option<String>,

    /// The AWS region of the BI service
    #[arg(long, global = true)]
    aws_region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates a template from the analysis and exports it and its datasets to JSON
    ExportAnalysis {
        /// The ID of the AWS account
        #[arg(long)]
        aws_account_id: String,

        /// The ID of the analysis to be exported
        #[arg(long)]
        analysis_id: String,

        /// The directory to which resources will be exported
        #[arg(long)]
        output_dir: PathBuf,
    },

    /// Imports template and dataset files from JSON into a namespace
    ImportTemplate(ImportArgs),

    /// Creates or replaces a dashboard from a template
    PublishDashboard {
        #[command(flatten)]
        target: PublishArgs,

        /// The ID of the template to publish
        #[arg(long)]
        template_id: String,
    },

    /// Imports a template and publishes a dashboard from it
    ImportAndPublish {
        #[command(flatten)]
        import: ImportArgs,

        /// Name of the group granted read access
        #[arg(long)]
        group_name: String,

        #[command(flatten)]
        output: ResultOutputArgs,
    },
}

#[derive(Args)]
struct ImportArgs {
    /// The ID of the AWS account
    #[arg(long)]
    aws_account_id: String,

    /// The name of the template to be restored
    #[arg(long)]
    template_name: String,

    /// The ARN of the data source to associate with the datasets
    #[arg(long)]
    data_source_arn: String,

    /// The namespace to target (e.g. tpp-prod, tpp-dev, tpp-staging)
    #[arg(long)]
    target_namespace: String,

    /// The directory from which resources will be imported
    #[arg(long)]
    input_dir: PathBuf,
}

#[derive(Args)]
struct PublishArgs {
    /// The ID of the AWS account
    #[arg(long)]
    aws_account_id: String,

    /// The namespace whose datasets the dashboard binds to
    #[arg(long)]
    target_namespace: String,

    /// Name of the group granted read access
    #[arg(long)]
    group_name: String,

    #[command(flatten)]
    output: ResultOutputArgs,
}

#[derive(Args)]
struct ResultOutputArgs {
    /// Also write the publish result to this file
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Also upload the publish result to this bucket
    #[arg(long, requires = "s3_key")]
    s3_bucket: Option<String>,

    /// Object key for the uploaded publish result
    #[arg(long, requires = "s3_bucket")]
    s3_key: Option<String>,
}

/// Main entry point for the migration tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run_app(cli).await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app(cli: Cli) -> Result<()> {
    let app_config = AppConfig::resolve(cli.config.as_deref())
        .context("Failed to load application configuration")?
        .with_overrides(cli.aws_profile, cli.aws_region);

    let gateway = Arc::new(
        HttpQuickSightGateway::connect(&app_config.aws)
            .await
            .context("Failed to set up the BI service client")?,
    );
    let context_for = |account_id: String| OperationContext::new(gateway.clone(), account_id, app_config.timing);

    match cli.command {
        Commands::ExportAnalysis {
            aws_account_id,
            analysis_id,
            output_dir,
        } => {
            println!("📦 Exporting analysis {} to {}...", analysis_id, output_dir.display());
            let op = export::ExportAnalysisOperation::new(context_for(aws_account_id), analysis_id, output_dir);
            run_operation(&op).await?;
        }
        Commands::ImportTemplate(args) => {
            println!("📥 Importing template {} into {}...", args.template_name, args.target_namespace);
            let op = import_operation(context_for(args.aws_account_id.clone()), args);
            run_operation(&op).await?;
        }
        Commands::PublishDashboard { target, template_id } => {
            println!("🚀 Publishing dashboard from template {}...", template_id);
            let context = context_for(target.aws_account_id);
            let op = publish::PublishDashboardOperation::new(
                context,
                template_id,
                target.target_namespace,
                target.group_name,
            );
            let op = with_result_output(op, target.output, &app_config).await;
            run_operation(&op).await?;
        }
        Commands::ImportAndPublish {
            import,
            group_name,
            output,
        } => {
            println!(
                "🔄 Importing template {} into {} and publishing it...",
                import.template_name, import.target_namespace
            );
            let context = context_for(import.aws_account_id.clone());
            // the template id is only known once the import has run
            let publish_op = publish::PublishDashboardOperation::new(
                context.clone(),
                String::new(),
                import.target_namespace.clone(),
                group_name,
            );
            let publish_op = with_result_output(publish_op, output, &app_config).await;
            let op = ImportAndPublishOperation::new(import_operation(context, import), publish_op);
            run_operation(&op).await?;
        }
    }
    Ok(())
}

fn import_operation(context: OperationContext, args: ImportArgs) -> import::ImportTemplateOperation {
    import::ImportTemplateOperation::new(
        context,
        args.template_name,
        args.target_namespace,
        args.data_source_arn,
        args.input_dir,
    )
}

async fn with_result_output(
    mut op: publish::PublishDashboardOperation,
    output: ResultOutputArgs,
    app_config: &AppConfig,
) -> publish::PublishDashboardOperation {
    if let Some(path) = output.output_json {
        op = op.with_output_json(path);
    }
    if let (Some(bucket), Some(key)) = (output.s3_bucket, output.s3_key) {
        let store = S3ObjectStore::connect(&app_config.aws, app_config.object_store.as_ref()).await;
        op = op.with_upload(publish::ResultUpload {
            store: Arc::new(store),
            bucket,
            key,
        });
    }
    op
}

/// Runs one workflow and prints its result document on stdout.
async fn run_operation<O: Operation>(op: &O) -> Result<()> {
    tracing::info!("Running {}", op.name());
    let output = op
        .execute()
        .await
        .with_context(|| format!("{} failed", op.name()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to serialize operation result")?
    );
    Ok(())
}

//! opgate - operator pull request gate
//!
//! ## Commands
//!
//! - `check-permissions`: decide whether a pull request may be auto-approved
//! - `publish vendor|repository`: mark catalog records as published
//! - `create-container-image`: register a bundle image in the catalog

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use opgate_catalog::{Catalog, CatalogConfig, PyxisClient};
use opgate_core::{
    create_container_image, publish_repository, publish_vendor, write_verdict, ChangeDescriptor,
    ImageInspection, ImageRequest, PermissionCheck, PullRequest, RepositorySnapshot,
    ReviewDispatcher, ReviewOptions, Revision,
};
use opgate_hosting::{GhCli, HostingPlatform};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "opgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Permission gate and catalog publication for operator pull requests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Catalog API base URL
    #[arg(long, global = true, env = "PYXIS_URL")]
    pyxis_url: Option<String>,

    /// Catalog API key
    #[arg(long, global = true, env = "PYXIS_API_KEY", hide_env_values = true)]
    pyxis_api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the pull request author may change every affected operator
    CheckPermissions(CheckPermissionsArgs),

    /// Publish catalog records
    Publish {
        #[command(subcommand)]
        action: PublishAction,
    },

    /// Create the catalog record of a bundle image
    CreateContainerImage(CreateContainerImageArgs),
}

#[derive(Args, Debug)]
struct CheckPermissionsArgs {
    /// Checkout of the pull request's target branch
    #[arg(long)]
    repo_base_path: PathBuf,

    /// Checkout of the pull request's head
    #[arg(long)]
    repo_head_path: PathBuf,

    /// JSON file listing the affected operators
    #[arg(long)]
    changes_file: PathBuf,

    /// Account that opened the pull request
    #[arg(long)]
    pr_owner: String,

    #[arg(long)]
    pull_request_url: String,

    /// Where to write `{"approved": <bool>}`
    #[arg(long)]
    output_file: PathBuf,

    /// Ask repository maintainers for review when an operator has no reviewers
    #[arg(long)]
    notify_maintainers: bool,

    /// Also post a comment asking the operator owners to review
    #[arg(long)]
    comment: bool,
}

impl CheckPermissionsArgs {
    fn review_options(&self) -> ReviewOptions {
        ReviewOptions {
            notify_maintainers: self.notify_maintainers,
            comment_on_review_request: self.comment,
        }
    }
}

#[derive(Subcommand)]
enum PublishAction {
    /// Publish the vendor of an organisation
    Vendor {
        #[arg(long)]
        org_id: String,
    },

    /// Publish (or create) the container repository of a certification project
    Repository {
        #[arg(long)]
        cert_project_id: String,

        #[arg(long)]
        connect_registry: String,
    },
}

#[derive(Args, Debug)]
struct CreateContainerImageArgs {
    #[arg(long)]
    isv_pid: String,

    #[arg(long)]
    connect_registry: String,

    #[arg(long)]
    repository: String,

    #[arg(long)]
    bundle_version: String,

    #[arg(long)]
    docker_image_digest: String,

    /// Output of `skopeo inspect` (JSON)
    #[arg(long)]
    skopeo_result: PathBuf,

    /// Output of `podman image inspect` (JSON)
    #[arg(long)]
    podman_result: PathBuf,

    /// Whether the image becomes the project's `latest`
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    is_latest: bool,
}

impl CreateContainerImageArgs {
    fn request(&self) -> ImageRequest {
        ImageRequest {
            isv_pid: self.isv_pid.clone(),
            connect_registry: self.connect_registry.clone(),
            repository: self.repository.clone(),
            bundle_version: self.bundle_version.clone(),
            docker_image_digest: self.docker_image_digest.clone(),
            is_latest: self.is_latest,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    opgate_core::init_tracing(cli.json, level);

    let catalog = PyxisClient::new(catalog_config(&cli)).context("Failed to create catalog client")?;

    match &cli.command {
        Commands::CheckPermissions(args) => {
            cmd_check_permissions(&catalog, &GhCli::default(), args).await
        }
        Commands::Publish { action } => match action {
            PublishAction::Vendor { org_id } => cmd_publish_vendor(&catalog, org_id).await,
            PublishAction::Repository {
                cert_project_id,
                connect_registry,
            } => cmd_publish_repository(&catalog, cert_project_id, connect_registry).await,
        },
        Commands::CreateContainerImage(args) => cmd_create_container_image(&catalog, args).await,
    }
}

fn catalog_config(cli: &Cli) -> CatalogConfig {
    let mut config = match &cli.pyxis_url {
        Some(url) => CatalogConfig::new(url),
        None => CatalogConfig::from_env(),
    };
    if let Some(key) = &cli.pyxis_api_key {
        config = config.with_api_key(key);
    }
    config
}

async fn cmd_check_permissions(
    catalog: &dyn Catalog,
    host: &dyn HostingPlatform,
    args: &CheckPermissionsArgs,
) -> Result<()> {
    let base = RepositorySnapshot::load(&args.repo_base_path, Revision::Base)
        .with_context(|| format!("Failed to load base repository {:?}", args.repo_base_path))?;
    let head = RepositorySnapshot::load(&args.repo_head_path, Revision::Head)
        .with_context(|| format!("Failed to load head repository {:?}", args.repo_head_path))?;
    let changes = ChangeDescriptor::from_path(&args.changes_file)
        .with_context(|| format!("Failed to read change descriptor {:?}", args.changes_file))?;

    let dispatcher = ReviewDispatcher::new(host, args.pull_request_url.as_str());
    let check = PermissionCheck {
        catalog,
        dispatcher: &dispatcher,
        options: args.review_options(),
    };
    let pull_request = PullRequest {
        owner: args.pr_owner.clone(),
    };

    let approved = check
        .run(&base, &head, &pull_request, &changes)
        .await
        .context("Permission check failed")?;

    if approved {
        info!("Author {} may merge every affected operator", args.pr_owner);
        dispatcher
            .approve()
            .await
            .context("Failed to approve the pull request")?;
    } else {
        info!("Pull request needs review before it can be merged");
    }

    write_verdict(&args.output_file, approved)
        .with_context(|| format!("Failed to write verdict to {:?}", args.output_file))?;
    Ok(())
}

async fn cmd_publish_vendor(catalog: &dyn Catalog, org_id: &str) -> Result<()> {
    let vendor = publish_vendor(catalog, org_id)
        .await
        .context("Failed to publish vendor")?;
    print_json(&vendor)
}

async fn cmd_publish_repository(
    catalog: &dyn Catalog,
    cert_project_id: &str,
    connect_registry: &str,
) -> Result<()> {
    let repository = publish_repository(catalog, cert_project_id, connect_registry)
        .await
        .context("Failed to publish repository")?;
    print_json(&repository)
}

async fn cmd_create_container_image(
    catalog: &dyn Catalog,
    args: &CreateContainerImageArgs,
) -> Result<()> {
    let inspection = ImageInspection {
        skopeo: read_json(&args.skopeo_result)?,
        podman: read_json(&args.podman_result)?,
    };
    let image = create_container_image(catalog, &args.request(), &inspection)
        .await
        .context("Failed to create container image")?;
    print_json(&image)
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?} as JSON", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

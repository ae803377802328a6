use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use slk_api::{ApiCredentials, InventoryClient};
use slk_config::Settings;
use slk_core::{Notifier, WatermarkStore};
use slk_db::PgStore;
use slk_jobs::{categories, orders, products, render_report, LogNotifier, SyncJob, WebhookNotifier};
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "slk")]
#[command(about = "StockLink inventory sync CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> environment -> overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run one sync job
    Sync {
        #[arg(long)]
        job: JobName,

        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Compute and print the plan without writing, advancing the
        /// watermark or notifying.
        #[arg(long, default_value_t = false)]
        preview: bool,
    },

    /// Watermark inspection
    Watermark {
        #[command(subcommand)]
        cmd: WatermarkCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses without --yes since the
    /// target is the live shop database.
    Migrate {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WatermarkCmd {
    /// Print a job's stored watermark
    Show {
        #[arg(long)]
        job: JobName,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum JobName {
    Categories,
    Products,
    Orders,
}

impl JobName {
    fn as_job_name(self) -> &'static str {
        match self {
            JobName::Categories => categories::JOB_NAME,
            JobName::Products => products::JOB_NAME,
            JobName::Orders => orders::JOB_NAME,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = slk_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = slk_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_watermark_table={}",
                        s.ok, s.has_watermark_table
                    );
                }
                DbCmd::Migrate { yes } => {
                    if !yes {
                        anyhow::bail!(
                            "REFUSING MIGRATE: this applies schema changes to the shop database. Re-run with: `slk db migrate --yes`"
                        );
                    }
                    slk_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = slk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Sync {
            job,
            config_paths,
            preview,
        } => {
            let settings = load_settings(&config_paths)?;
            run_sync(job, &settings, preview).await?;
        }

        Commands::Watermark { cmd } => match cmd {
            WatermarkCmd::Show { job } => {
                let pool = slk_db::connect_from_env().await?;
                let store = PgStore::new(pool);
                match store.get(job.as_job_name()).await? {
                    Some(wm) => {
                        println!("job_name={}", wm.job_name);
                        println!("external_key={}", wm.external_key);
                        println!("external_last_edited={}", wm.external_last_edited);
                    }
                    None => println!("job_name={} watermark=<none>", job.as_job_name()),
                }
            }
        },
    }

    Ok(())
}

fn load_settings(config_paths: &[String]) -> Result<Settings> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = slk_config::load_layered_yaml(&path_refs)?;
    tracing::info!(config_hash = %loaded.config_hash, "config loaded");
    Settings::from_loaded(&loaded)
}

async fn run_sync(job: JobName, settings: &Settings, preview: bool) -> Result<()> {
    let api = build_client(settings)?;
    let pool = slk_db::connect_from_env().await?;
    let store = PgStore::new(pool);

    let notifier: Box<dyn Notifier> = match &settings.notify.webhook_url {
        Some(url) => Box::new(WebhookNotifier::new(url.clone())),
        None => Box::new(LogNotifier),
    };

    let spec = match job {
        JobName::Categories => {
            let mut spec = categories::job_spec();
            spec.filter_timezone = parse_zone(settings.jobs.categories.filter_timezone.as_deref())?;
            spec
        }
        JobName::Products => {
            let zone = parse_zone(settings.jobs.products.filter_timezone.as_deref())?;
            products::job_spec(&store, zone).await?
        }
        JobName::Orders => {
            let mut spec = orders::job_spec(settings.source_id.clone());
            spec.filter_timezone = parse_zone(settings.jobs.orders.filter_timezone.as_deref())?;
            spec
        }
    };

    let sync = SyncJob {
        spec,
        api: &api,
        local: &store,
        watermarks: &store,
        notifier: notifier.as_ref(),
        preview,
    };
    let report = sync.run().await?;

    println!(
        "job={} preview={} fetched={} created={} updated={} cleared={} errors={}",
        report.job,
        report.preview,
        report.fetched,
        report.plan.created,
        report.plan.updated,
        report.plan.cleared,
        report.plan.errors.len()
    );
    if !report.plan.is_empty() {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn build_client(settings: &Settings) -> Result<InventoryClient> {
    let mut client = InventoryClient::new(settings.api.base_url.clone());
    if let (Some(id_env), Some(key_env)) = (
        settings.api.auth_id_env.as_deref(),
        settings.api.auth_key_env.as_deref(),
    ) {
        let id = std::env::var(id_env).with_context(|| format!("missing env var {id_env}"))?;
        let key = std::env::var(key_env).with_context(|| format!("missing env var {key_env}"))?;
        client = client.with_credentials(ApiCredentials { id, key });
    }
    Ok(client)
}

fn parse_zone(name: Option<&str>) -> Result<Option<chrono_tz::Tz>> {
    name.map(|n| {
        chrono_tz::Tz::from_str(n).map_err(|_| anyhow::anyhow!("unknown timezone: {n}"))
    })
    .transpose()
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

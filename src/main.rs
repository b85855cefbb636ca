mod cli;

use reelforge::{
    orchestrator::Orchestrator,
    rescan,
    resolve::LocalFileResolver,
    service::JobService,
    worker::{self, WorkerIdentity},
};
use rf_av::ToolRegistry;
use rf_core::config::Config;
use rf_db::pool::{init_pool, DbPool};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelforge=trace,rf_av=trace,rf_plan=trace,rf_db=debug".to_string()
        } else {
            "reelforge=debug,rf_av=debug,rf_plan=info,rf_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config = Config::load_or_default(cli.config.as_deref());

    match cli.command {
        Commands::Worker { storage_root } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_worker(config, storage_root))
        }
        Commands::Submit {
            input,
            owner,
            source_ref,
            profile,
        } => submit(&config, &input, &owner, source_ref.as_deref(), &profile),
        Commands::Jobs { owner } => list_jobs(&config, owner.as_deref()),
        Commands::Show { id } => show_job(&config, &id),
        Commands::Delete { id } => delete_job(&config, &id),
        Commands::Cleanup { days } => cleanup(&config, days),
        Commands::Probe { file } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&config, &file))
        }
        Commands::CheckTools => check_tools(&config),
        Commands::Validate => validate_config(cli.config.as_deref()),
    }
}

fn open_pool(config: &Config) -> Result<DbPool> {
    let db_path = &config.worker.db_path;
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(init_pool(&db_path.to_string_lossy())?)
}

async fn run_worker(config: Config, storage_root: PathBuf) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }

    tracing::info!("Starting reelforge worker");
    tracing::info!("Job store at {}", config.worker.db_path.display());

    let pool = open_pool(&config)?;

    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    if tools.get("ffmpeg").is_none() {
        tracing::warn!("ffmpeg not found; every conversion will fail until it is installed");
    }

    let resolver = Arc::new(LocalFileResolver::new(storage_root));
    let reindexer = rescan::from_config(&config.rescan);
    let identity = WorkerIdentity::detect();

    let orchestrator = Arc::new(Orchestrator::new(
        pool.clone(),
        tools,
        resolver,
        reindexer,
    ));

    let cancel = tokio_util::sync::CancellationToken::new();
    let worker_handle = tokio::spawn(worker::run_worker(
        pool,
        orchestrator,
        identity,
        config.worker.clone(),
        cancel.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    cancel.cancel();
    worker_handle.await?;

    Ok(())
}

fn submit(
    config: &Config,
    input: &str,
    owner: &str,
    source_ref: Option<&str>,
    profile: &str,
) -> Result<()> {
    let pool = open_pool(config)?;
    let service = JobService::new(pool);

    let fallback_ref = std::path::Path::new(input)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| input.to_string());
    let source_ref = source_ref.unwrap_or(&fallback_ref);

    let job = service.submit(owner, source_ref, input, profile)?;
    println!("Submitted job {}", job.id);
    Ok(())
}

fn list_jobs(config: &Config, owner: Option<&str>) -> Result<()> {
    let pool = open_pool(config)?;
    let service = JobService::new(pool);

    let jobs = match owner {
        Some(owner) => service.list_for_owner(owner)?,
        None => service.list_all()?,
    };

    if jobs.is_empty() {
        println!("No jobs");
        return Ok(());
    }

    for job in jobs {
        println!(
            "{}  {:<10}  {:>3}%  retries={}  {}  {}",
            job.id, job.status, job.progress, job.retry_count, job.owner_id, job.input_path
        );
    }
    Ok(())
}

fn show_job(config: &Config, id: &str) -> Result<()> {
    let pool = open_pool(config)?;
    let service = JobService::new(pool);
    let job_id = id
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid job id: {id}"))?;

    let Some(job) = service.get(job_id)? else {
        anyhow::bail!("job not found: {id}");
    };

    println!("Job:        {}", job.id);
    println!("Owner:      {}", job.owner_id);
    println!("Source:     {}", job.source_ref);
    println!("Input:      {}", job.input_path);
    println!("Status:     {}", job.status);
    println!("Progress:   {}%", job.progress);
    println!("Retries:    {}", job.retry_count);
    println!("Worker:     {}", job.worker_host.as_deref().unwrap_or("-"));
    println!("Created:    {}", job.created_at);
    println!("Started:    {}", job.started_at.as_deref().unwrap_or("-"));
    println!("Finished:   {}", job.finished_at.as_deref().unwrap_or("-"));
    if let Some(ref error) = job.error_message {
        println!("Error:\n{error}");
    }

    match serde_json::from_str::<serde_json::Value>(&job.config) {
        Ok(value) => println!("Config:\n{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("Config (unparsed):\n{}", job.config),
    }

    Ok(())
}

fn delete_job(config: &Config, id: &str) -> Result<()> {
    let pool = open_pool(config)?;
    let service = JobService::new(pool);
    let job_id = id
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid job id: {id}"))?;

    if service.delete(job_id)? {
        println!("Deleted job {id}");
    } else {
        println!("Job not found: {id}");
    }
    Ok(())
}

fn cleanup(config: &Config, days: Option<u32>) -> Result<()> {
    let pool = open_pool(config)?;
    let service = JobService::new(pool);
    let days = days.unwrap_or(config.retention.max_age_days);

    let deleted = service.cleanup(days)?;
    println!("Deleted {deleted} finished jobs older than {days} days");
    Ok(())
}

async fn probe_file(config: &Config, file: &std::path::Path) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let info = rf_av::probe_source(&tools, file).await?;

    println!("File:     {}", file.display());
    println!("Duration: {:.2}s", info.duration_secs);
    println!("Audio:    {}", if info.has_audio { "yes" } else { "no" });
    match (info.width, info.height) {
        (Some(w), Some(h)) => println!("Video:    {w}x{h}"),
        _ => println!("Video:    none detected"),
    }
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable conversions.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            println!("  Job store: {}", config.worker.db_path.display());
            println!("  Poll interval: {}s", config.worker.poll_interval_secs);
            println!("  Max retries: {}", config.worker.max_retries);
            println!("  Retention: {} days", config.retention.max_age_days);
            for warning in config.validate() {
                println!("  warning: {warning}");
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Job store: {}", config.worker.db_path.display());
            println!("  Poll interval: {}s", config.worker.poll_interval_secs);
        }
    }

    Ok(())
}

mod cli;
mod composition;
mod config;
mod dispatch;
mod memory_sink;

use clap::Parser;
use cli::{Cli, Command, CronAction, SkillsAction};
use squidbot_channels::Channel;
use squidbot_types::{CronJob, Session};
use tokio_stream::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "squidbot_gateway=info".into()))
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_dir = config::base_dir()?;
    std::fs::create_dir_all(&base_dir)?;
    let config = config::Config::load(&base_dir)?;
    let squidbot = composition::build(config, &base_dir)?;

    match cli.command {
        Command::Onboard => {
            std::fs::create_dir_all(base_dir.join("memory"))?;
            std::fs::create_dir_all(base_dir.join("skills"))?;
            let config_path = base_dir.join("config.toml");
            if !config_path.exists() {
                std::fs::write(&config_path, "model = \"claude-sonnet-4-6\"\n")?;
                println!("Wrote a starter config to {}", config_path.display());
            } else {
                println!("Config already exists at {}, leaving it untouched.", config_path.display());
            }
            println!("squidbot home is ready at {}", base_dir.display());
        }
        Command::Agent { message } => run_agent(squidbot, message).await?,
        Command::Gateway => run_gateway(squidbot).await?,
        Command::Status => print_status(&squidbot),
        Command::Cron { action } => run_cron(&squidbot, action)?,
        Command::Skills { action } => run_skills(&squidbot, action),
    }
    Ok(())
}

async fn run_agent(squidbot: composition::Squidbot, message: Option<String>) -> anyhow::Result<()> {
    let session = Session::new("cli", "local");
    let channel = squidbot.terminal_channel.as_ref();
    let extra_tools = [squidbot.memory_write_tool()];

    if let Some(text) = message {
        squidbot.agent.run(&session, &text, channel, None, &extra_tools).await;
        return Ok(());
    }

    let mut inbound = channel.receive();
    while let Some(msg) = inbound.next().await {
        squidbot.agent.run(&msg.session, &msg.text, channel, None, &extra_tools).await;
    }
    Ok(())
}

async fn run_gateway(squidbot: composition::Squidbot) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    info!(heartbeat = squidbot.config.heartbeat.enabled, "starting gateway");

    let extra_tools = [squidbot.memory_write_tool()];
    let scheduler_task = tokio::spawn(squidbot.scheduler.run(shutdown_rx.clone()));

    let heartbeat_task = if squidbot.config.heartbeat.enabled {
        let interval = squidbot.config.heartbeat.interval_secs;
        let mut shutdown_rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
            loop {
                tokio::select! {
                    _ = ticker.tick() => info!("heartbeat"),
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        }))
    } else {
        None
    };

    let channel = squidbot.terminal_channel.clone();
    let agent = squidbot.agent.clone();
    let mut inbound = channel.receive();
    while let Some(msg) = inbound.next().await {
        agent.run(&msg.session, &msg.text, channel.as_ref(), None, &extra_tools).await;
    }

    let _ = shutdown_tx.send(true);
    scheduler_task.await.ok();
    if let Some(task) = heartbeat_task {
        task.await.ok();
    }
    Ok(())
}

fn print_status(squidbot: &composition::Squidbot) {
    println!("model: {}", squidbot.config.model);
    println!("heartbeat enabled: {}", squidbot.config.heartbeat.enabled);
    let job_count = squidbot.scheduler.list_jobs().map(|jobs| jobs.len()).unwrap_or(0);
    println!("cron jobs: {job_count}");
}

fn run_cron(squidbot: &composition::Squidbot, action: CronAction) -> anyhow::Result<()> {
    match action {
        CronAction::List => {
            for job in squidbot.scheduler.list_jobs()? {
                println!("{}\t{}\t{}\t{}\tenabled={}", job.id, job.name, job.schedule, job.channel, job.enabled);
            }
        }
        CronAction::Add { name, schedule, message, channel } => {
            let job = CronJob {
                id: String::new(),
                name,
                schedule,
                message,
                channel,
                enabled: true,
                timezone: "UTC".to_string(),
                last_run: None,
            };
            let stored = squidbot.scheduler.add_job(job)?;
            println!("added job {}", stored.id);
        }
        CronAction::Remove { id } => {
            squidbot.scheduler.remove_job(&id)?;
            println!("removed job {id}");
        }
        CronAction::SetEnabled { id, enabled } => {
            squidbot.scheduler.set_enabled(&id, enabled)?;
            println!("job {id} enabled={enabled}");
        }
    }
    Ok(())
}

fn run_skills(squidbot: &composition::Squidbot, action: SkillsAction) {
    match action {
        SkillsAction::List => {
            for skill in squidbot.skills.list_skills() {
                println!("{}\t{}", skill.name, skill.description);
            }
        }
    }
}

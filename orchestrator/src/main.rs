use anyhow::{Context, Result};
use tracing::{error, info};

use node_staking_orchestrator::{Config, RpcLedger, Scenario, ScenarioParams};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "node_staking_orchestrator=info".into()),
        )
        .init();

    info!("Node staking orchestrator starting...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("Cluster: {}", config.cluster.url());
    info!("Program ID: {}", config.program_id);
    info!("Presale duration: {}s", config.presale_duration);

    let ledger = RpcLedger::connect(&config).context("Failed to connect to cluster")?;

    let params = ScenarioParams {
        presale_duration: config.presale_duration,
        ..ScenarioParams::default()
    };
    let run = match Scenario::new(&ledger, params)
        .with_metadata(config.with_metadata)
        .run()
    {
        Ok(run) => run,
        Err(e) => {
            error!(step = e.step().unwrap_or("setup"), "Scenario aborted: {}", e);
            return Err(e).context("Scenario failed");
        }
    };

    info!("Scenario completed with {} transactions", run.signatures.len());
    println!("{}", run.report.render(config.report_format)?);

    Ok(())
}

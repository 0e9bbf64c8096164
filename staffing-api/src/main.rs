use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use staffing_api::{
    config::read_config,
    domain::{models::EmployeeId, ports::inbound::AllocationService},
    factory::postgres_allocation_service,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "staffing-api", about = "Allocation maintenance tasks")]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Report employees whose overlapping allocations exceed 100%
    Audit {
        /// Only audit this employee
        #[arg(long)]
        employee: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::from_filename(".env.local").ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "staffing_api=info,allocation=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let opts = Opts::parse();
    let settings = read_config()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(settings.database.with_db())
        .await?;

    match opts.command {
        Command::Migrate => {
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("migrations applied");
        }
        Command::Audit { employee } => {
            let service = postgres_allocation_service(pool, settings.allocation);
            tracing::info!(mode = %settings.allocation.mode, "auditing allocations");

            let audits = service.audit(employee.map(EmployeeId::new)).await?;
            println!("{}", serde_json::to_string_pretty(&audits)?);

            if audits.is_empty() {
                tracing::info!("no over-allocated employees");
            }
        }
    }

    Ok(())
}

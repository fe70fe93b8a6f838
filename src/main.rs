use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use susu::application::engine::{ContributionEngine, Stores};
use susu::domain::ports::SettingsStore;
use susu::domain::settings::MaturitySettings;
use susu::infrastructure::clock::ManualClock;
use susu::infrastructure::in_memory::{
    InMemoryEnrollmentStore, InMemoryPaymentMethodStore, InMemoryPaymentStore, InMemoryPlanStore,
    InMemoryProofStore, InMemorySettingsStore, InMemoryUserStore,
};
use susu::interfaces::csv::{write_summaries, BatchImporter, OpReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Weeks until a DAILY enrollment matures
    #[arg(long, default_value_t = 5)]
    daily_maturity_weeks: u32,

    /// Calendar months until a WEEKLY enrollment matures
    #[arg(long, default_value_t = 3)]
    weekly_maturity_months: u32,

    /// Print a receipt for every verified payment after the summary
    #[arg(long)]
    receipts: bool,

    /// Print a maturity certificate for every paid-out enrollment
    #[arg(long)]
    certificates: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let clock = ManualClock::at(chrono::Utc::now());
    let settings = InMemorySettingsStore::new();
    settings
        .set_maturity(MaturitySettings {
            daily_maturity_weeks: cli.daily_maturity_weeks,
            weekly_maturity_months: cli.weekly_maturity_months,
        })
        .await
        .into_diagnostic()?;

    let stores = Stores {
        plans: Box::new(InMemoryPlanStore::new()),
        enrollments: Box::new(InMemoryEnrollmentStore::new()),
        payments: Box::new(InMemoryPaymentStore::new()),
        methods: Box::new(InMemoryPaymentMethodStore::new()),
        users: Box::new(InMemoryUserStore::new()),
        settings: Box::new(settings),
        proofs: Box::new(InMemoryProofStore::new()),
    };
    let engine = ContributionEngine::new(stores, Box::new(clock.clone()));
    let mut importer = BatchImporter::new(engine, clock);

    let file = File::open(cli.input).into_diagnostic()?;
    let summaries = importer.run(OpReader::new(file)).await.into_diagnostic()?;

    let stdout = io::stdout();
    write_summaries(stdout.lock(), &summaries).into_diagnostic()?;

    if cli.receipts {
        for receipt in importer.receipts().await.into_diagnostic()? {
            println!("\n{receipt}");
        }
    }
    if cli.certificates {
        for certificate in importer.certificates().await.into_diagnostic()? {
            println!("\n{certificate}");
        }
    }

    Ok(())
}

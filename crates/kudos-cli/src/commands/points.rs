use clap::Subcommand;
use kudos_core::PointsEngine;

#[derive(Subcommand)]
pub enum PointsAction {
    /// Claim the daily reward
    Claim {
        /// User id to claim for
        #[arg(long)]
        user: String,
    },
    /// Show engagement status
    Status {
        /// User id to inspect
        #[arg(long)]
        user: String,
    },
    /// Show recent ledger entries
    History {
        /// User id to inspect
        #[arg(long)]
        user: String,
        /// Maximum entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

pub fn run(action: PointsAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = PointsEngine::open()?;

    match action {
        PointsAction::Claim { user } => {
            let outcome = engine.claim_daily(&user)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        PointsAction::Status { user } => {
            let status = engine.status(&user)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        PointsAction::History { user, limit } => {
            let history = engine.history(&user, limit)?;
            if history.is_empty() {
                println!("no transactions for '{user}'");
            }
            for tx in history {
                println!(
                    "{}  {:+6}  {:<16} {}",
                    tx.created_at.format("%Y-%m-%d %H:%M"),
                    tx.points,
                    tx.kind.as_str(),
                    tx.description
                );
            }
        }
    }
    Ok(())
}

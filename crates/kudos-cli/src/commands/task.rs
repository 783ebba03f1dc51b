use clap::Subcommand;
use kudos_core::PointsEngine;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Award a named once-per-day task
    Complete {
        /// User id to award
        #[arg(long)]
        user: String,
        /// Task type, e.g. read_article
        #[arg(long)]
        task_type: String,
        /// Points to award
        #[arg(long)]
        points: i64,
    },
    /// Grant an ad-hoc bonus
    Bonus {
        /// User id to award
        #[arg(long)]
        user: String,
        /// Points to grant
        #[arg(long)]
        points: i64,
        /// Audit note for the ledger
        #[arg(long, default_value = "operator bonus")]
        description: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = PointsEngine::open()?;

    match action {
        TaskAction::Complete {
            user,
            task_type,
            points,
        } => {
            let outcome = engine.complete_task(&user, &task_type, points)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        TaskAction::Bonus {
            user,
            points,
            description,
        } => {
            let outcome = engine.grant_bonus(&user, points, &description)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }
    Ok(())
}

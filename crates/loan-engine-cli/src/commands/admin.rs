use clap::Args;
use serde_json::{json, Value};

use loan_engine_core::sqlite::SeedData;

use super::Context;
use crate::input;

/// Arguments for loading fixture data
#[derive(Args)]
pub struct SeedArgs {
    /// Path to JSON/YAML seed file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_init_db(ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    // Opening the store applies the schema.
    ctx.open_store()?;
    Ok(json!({
        "database": ctx.db.display().to_string(),
        "schema": "up to date",
    }))
}

pub fn run_seed(ctx: &Context, args: SeedArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let seed: SeedData = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input file is required for seeding".into());
    };

    let mut store = ctx.open_store()?;
    store
        .load_seed(&seed)
        .map_err(loan_engine_core::LoanEngineError::from)?;

    Ok(json!({
        "database": ctx.db.display().to_string(),
        "users": seed.users.len(),
        "credit_tiers": seed.credit_tiers.len(),
        "employment_multipliers": seed.employment_multipliers.len(),
        "loan_settings": seed.loan_settings.is_some(),
    }))
}

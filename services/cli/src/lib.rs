mod cli;
mod demo;
mod infra;

use license_issuance::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

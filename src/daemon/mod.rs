mod app;
mod polling;

use crate::core::settings::Settings;
use anyhow::Result;

pub async fn run() -> Result<()> {
    let settings = Settings::load()?;
    app::run(settings).await
}

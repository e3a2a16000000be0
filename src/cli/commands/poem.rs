//! Poem command: stream a poem to stdout.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::services::ChatTurn;
use futures::StreamExt;
use std::io::Write;

pub async fn run_poem(topic: &str, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Stream, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let mut records = orchestrator.poet().stream(&[ChatTurn::user(topic)]).await?;

    let mut stdout = std::io::stdout();
    while let Some(record) = records.next().await {
        if let Some(error) = record.error {
            println!();
            anyhow::bail!("Stream failed: {}", error);
        }
        write!(stdout, "{}", record.delta)?;
        stdout.flush()?;
    }
    println!();

    Ok(())
}

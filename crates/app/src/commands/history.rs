//! The `mocktest history` command.

use anyhow::Result;
use comfy_table::Table;

use exam_core::time::format_countdown;
use services::MockTestApi;

pub async fn execute(api: &dyn MockTestApi) -> Result<()> {
    let attempts = api.list_attempts().await?;
    if attempts.is_empty() {
        println!("No attempts yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Test", "Subject", "Score", "Correct", "Time"]);
    for attempt in &attempts {
        table.add_row(vec![
            attempt.completed_at.format("%Y-%m-%d %H:%M").to_string(),
            attempt.title.clone(),
            attempt.subject.clone(),
            format!("{}%", attempt.score),
            format!("{}/{}", attempt.correct_count, attempt.total_questions),
            format_countdown(attempt.time_taken_seconds),
        ]);
    }
    println!("{table}");
    Ok(())
}

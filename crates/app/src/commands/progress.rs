//! The `mocktest progress` command.

use anyhow::Result;
use comfy_table::Table;

use services::MockTestApi;

pub async fn execute(api: &dyn MockTestApi) -> Result<()> {
    let overview = api.my_progress().await?;
    println!(
        "{} attempts, average score {:.1}%",
        overview.total_attempts, overview.average_score
    );
    if overview.by_subject.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Attempts", "Average"]);
    for subject in &overview.by_subject {
        table.add_row(vec![
            subject.subject.clone(),
            subject.attempts.to_string(),
            format!("{:.1}%", subject.average_score),
        ]);
    }
    println!("{table}");

    if !overview.recent.is_empty() {
        println!("Recent:");
        for attempt in &overview.recent {
            println!(
                "  {}  {} ({})  {}%",
                attempt.started_at.format("%Y-%m-%d"),
                attempt.title,
                attempt.subject,
                attempt.score
            );
        }
    }
    Ok(())
}

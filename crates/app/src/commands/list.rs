//! The `mocktest list` command.

use anyhow::Result;
use comfy_table::Table;

use services::SessionController;

pub async fn execute(controller: &mut SessionController) -> Result<()> {
    let resumable = controller.resumable_tests().await?;
    let tests = controller.load_catalog().await?;
    if tests.is_empty() {
        println!("No mock tests available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Title", "Subject", "Questions", "Minutes", "Difficulty", "Avg", "",
    ]);
    for test in tests {
        let saved = if resumable.contains(&test.id) {
            "saved"
        } else {
            ""
        };
        table.add_row(vec![
            test.id.to_string(),
            test.title.clone(),
            test.subject.clone(),
            test.total_questions.to_string(),
            test.duration.to_string(),
            test.difficulty.as_str().to_string(),
            format!("{:.0}%", test.average_score),
            saved.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

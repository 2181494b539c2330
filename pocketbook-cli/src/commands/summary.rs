//! Summary command - totals for the signed-in user

use anyhow::Result;
use colored::Colorize;

use super::{get_context, get_logger, log_command};
use crate::output;

pub async fn run(recent: Option<usize>, json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "summary");
    let ctx = get_context(logger)?;

    let summary = ctx.summary_service.get_summary().await?;
    let expenses = match recent {
        Some(limit) => ctx.summary_service.recent(limit).await?,
        None => Vec::new(),
    };

    if json {
        let value = serde_json::json!({
            "summary": summary,
            "net": summary.net(),
            "recent": expenses,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Expense Summary".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Expenses".to_string(), summary.total_expenses.to_string()]);
    table.add_row(vec!["Income".to_string(), format!("{:.2}", summary.income)]);
    table.add_row(vec!["Spending".to_string(), format!("{:.2}", summary.spending)]);
    table.add_row(vec!["Net".to_string(), format!("{:.2}", summary.net())]);
    println!("{}", table);

    if let (Some(earliest), Some(latest)) = (&summary.date_range.earliest, &summary.date_range.latest) {
        println!("Date range: {} to {}", earliest, latest);
    }

    if !summary.by_category.is_empty() {
        println!();
        println!("{}", "By Category".bold());
        let mut table = output::create_table();
        table.set_header(vec!["Category", "Count", "Total"]);
        for row in &summary.by_category {
            table.add_row(vec![
                row.category.clone(),
                row.count.to_string(),
                format!("{:.2}", row.total),
            ]);
        }
        println!("{}", table);
    }

    if !expenses.is_empty() {
        println!();
        println!("{}", "Recent".bold());
        let mut table = output::create_table();
        table.set_header(vec!["Date", "Amount", "Description", "Category"]);
        for expense in &expenses {
            table.add_row(vec![
                expense.date.to_string(),
                expense.amount.to_string(),
                expense.description.clone().unwrap_or_else(|| "-".to_string()),
                expense.category.clone(),
            ]);
        }
        println!("{}", table);
    }

    Ok(())
}

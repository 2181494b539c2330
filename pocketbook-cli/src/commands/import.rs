//! Import command - drive an import session from the terminal

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use pocketbook_core::domain::{ColumnRef, DateFormatHint, DateSource, Field};
use pocketbook_core::services::{ImportProgress, ImportSession, LogEvent};
use pocketbook_core::{ImportOutcome, OperationResult};

use super::{get_context, get_logger, log_command, log_event};
use crate::output;

#[derive(Args)]
pub struct ImportArgs {
    /// Path to the CSV file
    file: Option<PathBuf>,
    /// Column for the amount (NOT_MAPPED to leave it out)
    #[arg(long)]
    amount: Option<String>,
    /// Column for the description
    #[arg(long)]
    description: Option<String>,
    /// Column for the category
    #[arg(long)]
    category: Option<String>,
    /// Column for the date
    #[arg(long)]
    date: Option<String>,
    /// auto, dd.MM.yy, dd.MM.yyyy, MM/dd/yyyy or yyyy-MM-dd
    #[arg(long)]
    date_format: Option<String>,
    /// Use a saved import profile
    #[arg(long)]
    profile: Option<String>,
    /// Save the final mapping and date format as a profile
    #[arg(long)]
    save_profile: Option<String>,
    /// List saved profiles
    #[arg(long)]
    list_profiles: bool,
    /// Show the preview and stop
    #[arg(long)]
    preview: bool,
    /// Run the import against a throwaway store
    #[arg(long)]
    dry_run: bool,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl ImportArgs {
    fn overrides(&self) -> [(Field, Option<&String>); 4] {
        [
            (Field::Amount, self.amount.as_ref()),
            (Field::Description, self.description.as_ref()),
            (Field::Category, self.category.as_ref()),
            (Field::Date, self.date.as_ref()),
        ]
    }
}

pub async fn run(args: ImportArgs) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "import");
    let ctx = get_context(logger.clone())?;

    if args.list_profiles {
        let profiles = ctx.import_service.list_profiles()?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        } else if profiles.is_empty() {
            println!("No saved profiles.");
        } else {
            println!("Saved import profiles:");
            for (name, profile) in &profiles {
                println!();
                println!("  {}", name.green());
                for field in Field::ALL {
                    println!("    {}: {}", field, profile.column_mapping.get(field));
                }
                println!("    date format: {}", profile.date_format);
            }
        }
        return Ok(());
    }

    let file = args
        .file
        .clone()
        .context("File path required for import")?;
    let bytes = ctx.import_service.read_file(&file)?;

    let mut session = ctx.import_service.new_session()?;
    session.upload(&bytes)?;

    if let Some(name) = &args.profile {
        let profile = ctx
            .import_service
            .get_profile(name)?
            .with_context(|| format!("Profile not found: {}", name))?;
        session.apply_mapping(profile.column_mapping)?;
        session.set_date_format(profile.date_format)?;
        if !args.json {
            println!("Using profile '{}'", name);
        }
    }

    for (field, column) in args.overrides() {
        if let Some(column) = column {
            session.set_mapping(field, ColumnRef::from(Some(column.clone())))?;
        }
    }
    if let Some(format) = &args.date_format {
        session.set_date_format(format.parse::<DateFormatHint>()?)?;
    }

    if !args.json {
        print_mapping(&session);
    }

    session.preview()?;

    if let Some(name) = &args.save_profile {
        ctx.import_service
            .save_profile(name, session.mapping(), session.date_format())?;
        if !args.json {
            output::success(&format!("Profile '{}' saved", name));
        }
    }

    if args.preview {
        if args.json {
            let preview = serde_json::json!({
                "records": session.preview_rows(),
                "validationErrors": session.errors(),
                "validCount": session.valid_count(),
            });
            println!("{}", serde_json::to_string_pretty(&preview)?);
        } else {
            print_preview(&session);
            output::warning("PREVIEW MODE - nothing imported");
        }
        return Ok(());
    }

    if !args.json {
        print_preview(&session);
    }

    let interactive = !args.yes && !args.json && atty::is(atty::Stream::Stdin);
    if interactive {
        let prompt = format!(
            "Import {} of {} rows{}?",
            session.valid_count(),
            session.records().len(),
            if args.dry_run { " (dry run)" } else { "" }
        );
        if !Confirm::new().with_prompt(prompt).default(true).interact()? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let bar = progress_bar(args.json);
    let on_progress = {
        let bar = bar.clone();
        Arc::new(move |p: ImportProgress| {
            bar.set_length(p.batch_count as u64);
            bar.set_position(p.batches_done as u64);
            bar.set_message(format!("{} imported, {} failed", p.success_count, p.error_count));
        })
    };
    let importer = ctx.import_service.importer(args.dry_run)?.on_progress(on_progress);

    let refresher = ctx.start_session_refresh();
    let result = session.import(&importer).await.map(|o| o.clone());
    refresher.stop().await;
    bar.finish_and_clear();

    let outcome = result?;
    log_event(
        &logger,
        LogEvent::new("command_finished")
            .with_command("import")
            .with_row_count(outcome.success_count),
    );

    if args.json {
        let mut context = HashMap::new();
        context.insert("file".to_string(), serde_json::json!(file.display().to_string()));
        context.insert("dryRun".to_string(), serde_json::json!(args.dry_run));
        let result = OperationResult::ok_with_context(outcome, context);
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_outcome(&outcome, args.dry_run);
    Ok(())
}

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} batches {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

fn print_mapping(session: &ImportSession) {
    println!("{}", "Column mapping:".cyan());
    for field in Field::ALL {
        println!("  {:<12} {}", format!("{}:", field), session.mapping().get(field));
    }
    println!("  {:<12} {}", "date format:", session.date_format());
    println!();
}

fn print_preview(session: &ImportSession) {
    let mut table = output::create_table();
    table.set_header(vec!["Row", "Date", "Amount", "Description", "Category", "Status"]);

    for record in session.preview_rows() {
        let date = match (&record.date, &record.date_source) {
            (Some(date), Some(source)) if *source != DateSource::Mapped => {
                format!("{} ({})", date, source)
            }
            (Some(date), _) => date.to_string(),
            (None, _) => record.raw_date.clone().unwrap_or_else(|| "-".to_string()),
        };
        let amount = record
            .amount
            .map(|a| a.to_string())
            .or_else(|| record.raw_amount.clone())
            .unwrap_or_else(|| "-".to_string());
        let status = match session.errors().get(&record.source_row_index) {
            Some(errors) => errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ")
                .red()
                .to_string(),
            None => "OK".green().to_string(),
        };

        table.add_row(vec![
            (record.source_row_index + 1).to_string(),
            date,
            amount,
            record.description.clone(),
            record.category.clone(),
            status,
        ]);
    }

    println!("{}", table);

    let shown = session.preview_rows().len();
    let total = session.records().len();
    if total > shown {
        println!("... and {} more", total - shown);
    }
    println!(
        "{} valid, {} with errors",
        session.valid_count(),
        session.errors().len()
    );
    println!();
}

fn print_outcome(outcome: &ImportOutcome, dry_run: bool) {
    if dry_run {
        output::warning("DRY RUN - nothing was written");
    }
    if outcome.has_errors() {
        output::warning("Import finished with errors");
    } else {
        output::success("Import complete");
    }

    println!();
    println!("  Imported: {}", outcome.success_count);
    println!("  Failed: {}", outcome.error_count);
    println!("  Skipped (invalid): {}", outcome.validation_errors.len());

    for failure in &outcome.failed_batches {
        output::error(&format!("  {}", failure.message));
    }
}

//! `vizdash analyze`, `vizdash templates`

use serde::Serialize;

use vizdash_ai::{prepare, PromptTemplate};

use crate::catalog::not_found;
use crate::context::{load_config, open_dashboard, open_dispatcher};
use crate::{print_json, CliError};

pub struct AnalyzeArgs {
    pub workbook: String,
    pub view: String,
    pub template: PromptTemplate,
    pub instructions: String,
    pub dry_run: bool,
    pub json: bool,
}

#[derive(Serialize)]
struct DryRunJson<'a> {
    template: &'a str,
    prompt: &'a str,
    prompt_chars: usize,
    rows_sent: usize,
    total_rows: usize,
    truncated: bool,
}

pub fn cmd_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let config = load_config()?;
    let dash = open_dashboard(&config)?;

    // Check the key before touching the network for a real run
    let dispatcher = if args.dry_run { None } else { Some(open_dispatcher(&config)?) };

    let export = dash
        .export_view(&args.workbook, &args.view)
        .map_err(CliError::dash)?
        .ok_or_else(|| not_found(&args.workbook, Some(&args.view)))?;

    let Some(dispatcher) = dispatcher else {
        let prepared = prepare(
            args.template,
            &export.view.name,
            &args.instructions,
            &export.table,
            config.prompt.max_table_chars,
            config.prompt.oversize,
        )
        .map_err(|e| CliError::dispatch(e.into()))?;

        if args.json {
            return print_json(&DryRunJson {
                template: args.template.id(),
                prompt: &prepared.text,
                prompt_chars: prepared.chars(),
                rows_sent: prepared.rows_sent,
                total_rows: prepared.total_rows,
                truncated: prepared.truncated(),
            });
        }
        print!("{}", prepared.text);
        if prepared.truncated() {
            eprintln!(
                "note: table truncated to {} of {} rows",
                prepared.rows_sent, prepared.total_rows
            );
        }
        return Ok(());
    };

    let analysis = dispatcher
        .analyze(args.template, &export.view.name, &args.instructions, &export.table)
        .map_err(CliError::dispatch)?;

    if args.json {
        return print_json(&analysis);
    }

    for w in &analysis.warnings {
        eprintln!("warning: {}", w);
    }
    if analysis.truncated {
        eprintln!(
            "note: table truncated to {} of {} rows",
            analysis.rows_sent, analysis.total_rows
        );
    }

    println!("{} - {} / {}", args.template.title(), export.workbook.label, export.view.label);
    println!("──────────────────────────────");
    println!("{}", analysis.text.trim_end());
    if let Some(suggestion) = &analysis.suggestion {
        println!();
        for line in suggestion.summary_lines() {
            println!("{}", line);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct TemplateJson {
    id: &'static str,
    title: &'static str,
    json_response: bool,
}

pub fn cmd_templates(json: bool) -> Result<(), CliError> {
    let all = PromptTemplate::all();
    if json {
        let out: Vec<TemplateJson> = all
            .iter()
            .map(|t| TemplateJson { id: t.id(), title: t.title(), json_response: t.expects_json() })
            .collect();
        return print_json(&out);
    }
    for t in all {
        println!("{:<6} {}", t.id(), t.title());
    }
    Ok(())
}

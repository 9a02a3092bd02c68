//! `vizdash workbooks`, `vizdash views`, `vizdash export`

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use vizdash_engine::ViewExport;
use vizdash_io::render::render_grid;
use vizdash_io::Table;

use crate::context::{load_config, open_dashboard};
use crate::{print_json, CliError};

pub const NO_VIEWS: &str = "No views found in this workbook";

pub fn cmd_workbooks(json: bool) -> Result<(), CliError> {
    let config = load_config()?;
    let dash = open_dashboard(&config)?;
    let workbooks = dash.list_workbooks().map_err(CliError::dash)?;

    if json {
        return print_json(workbooks.as_slice());
    }

    if workbooks.is_empty() {
        println!("No workbooks found");
        return Ok(());
    }

    let rows = workbooks
        .iter()
        .map(|w| vec![w.label.clone(), w.project_name.clone()])
        .collect();
    let table = Table::new(vec!["Workbook".to_string(), "Project".to_string()], rows);
    print!("{}", render_grid(&table, 0));
    Ok(())
}

pub fn cmd_views(workbook: &str, json: bool) -> Result<(), CliError> {
    let config = load_config()?;
    let dash = open_dashboard(&config)?;
    let views = dash.list_views(workbook).map_err(CliError::dash)?;

    if json {
        return print_json(views.as_slice());
    }

    if views.is_empty() {
        println!("{}: {}", NO_VIEWS, workbook);
        return Ok(());
    }
    for v in views.iter() {
        println!("{}", v.label);
    }
    Ok(())
}

pub struct ExportArgs {
    pub workbook: String,
    pub view: Option<String>,
    pub image: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub max_rows: usize,
    pub json: bool,
}

#[derive(Serialize)]
struct ImageJson<'a> {
    format: &'a str,
    mime_type: &'a str,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

#[derive(Serialize)]
struct ExportJson<'a> {
    workbook: &'a str,
    view: &'a str,
    image: ImageJson<'a>,
    columns: &'a [String],
    column_types: Vec<&'static str>,
    rows: &'a [Vec<String>],
    total_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    csv_path: Option<String>,
}

pub fn cmd_export(args: ExportArgs) -> Result<(), CliError> {
    let config = load_config()?;
    let dash = open_dashboard(&config)?;

    let export = match &args.view {
        Some(view) => dash.export_view(&args.workbook, view),
        None => dash.first_view(&args.workbook),
    }
    .map_err(CliError::dash)?;

    let Some(export) = export else {
        return Err(not_found(&args.workbook, args.view.as_deref()));
    };

    if let Some(path) = &args.image {
        write_file(path, &export.image.bytes)?;
    }
    if let Some(path) = &args.csv {
        write_csv(path, &export.table)?;
    }

    if args.json {
        return print_export_json(&export, &args);
    }

    println!(
        "{} / {}  [{}]",
        export.workbook.label,
        export.view.label,
        export.image.summary()
    );
    if let Some(path) = &args.image {
        println!("image: {}", path.display());
    }
    if let Some(path) = &args.csv {
        println!("csv:   {}", path.display());
    }
    println!();
    if export.table.is_empty() {
        println!("No data");
    } else {
        print!("{}", render_grid(&export.table, args.max_rows));
    }
    Ok(())
}

fn print_export_json(export: &ViewExport, args: &ExportArgs) -> Result<(), CliError> {
    let dims = export.image.dimensions();
    let out = ExportJson {
        workbook: &export.workbook.label,
        view: &export.view.label,
        image: ImageJson {
            format: export.image.format.extension(),
            mime_type: export.image.format.mime_type(),
            bytes: export.image.len(),
            width: dims.map(|(w, _)| w),
            height: dims.map(|(_, h)| h),
            path: args.image.as_ref().map(|p| p.display().to_string()),
        },
        columns: &export.table.columns,
        column_types: export.table.column_types().iter().map(|t| t.as_str()).collect(),
        rows: &export.table.rows,
        total_rows: export.table.num_rows(),
        csv_path: args.csv.as_ref().map(|p| p.display().to_string()),
    };
    print_json(&out)
}

pub fn not_found(workbook: &str, view: Option<&str>) -> CliError {
    let message = match view {
        Some(view) => format!("No data for view '{}' in workbook '{}'", view, workbook),
        None => format!("Workbook '{}' not found or has no views", workbook),
    };
    CliError::notice(message).with_hint(format!("run `vizdash views {}`", shell_quote(workbook)))
}

fn shell_quote(s: &str) -> String {
    if s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./".contains(c)) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes)
        .map_err(|e| CliError::error(format!("{}: {}", path.display(), e)))
}

fn write_csv(path: &Path, table: &Table) -> Result<(), CliError> {
    let file = fs::File::create(path)
        .map_err(|e| CliError::error(format!("{}: {}", path.display(), e)))?;
    table
        .write_csv(file)
        .map_err(|e| CliError::error(format!("{}: {}", path.display(), e)))
}

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tabula_core::{
    CellData, CellInput, CellValue, ColumnKind, Executor, Role, Statement, TabularModel,
    VisualState,
};
use tabula_store::demo::{DEMO_TABLES, schema_for, seed};
use tabula_store::{
    DEFAULT_CONFIG_NAME, SqliteSession, TabulaConfig, ensure_catalog, truncate_catalog,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);
    match cli.command {
        Command::Init(args) => init_datastore(args),
        Command::Show(args) => show_table(args),
        Command::Options(args) => list_options(args),
        Command::Edit(args) => edit_cell(args),
        Command::Delete(args) => toggle_delete(args),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

#[derive(Parser)]
#[command(author, version, about = "Developer utilities for tabula datastores")]
struct Cli {
    /// Log filter, e.g. `debug` to see every statement.
    #[arg(long, global = true, default_value = "warn")]
    log: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the datastore config and create the demo tables.
    Init(InitArgs),
    /// Print a demo table as the grid sees it.
    Show(ShowArgs),
    /// List the choices for a foreign-key column.
    Options(OptionsArgs),
    /// Write one cell, print the pending statements, optionally save.
    Edit(EditArgs),
    /// Toggle the delete marker on a row, optionally save.
    Delete(DeleteArgs),
}

#[derive(Parser)]
struct TableArgs {
    /// Directory holding `tabula.json` and the database.
    #[arg(long, default_value = ".tabula")]
    datastore: PathBuf,
    /// One of the demo tables.
    #[arg(long)]
    table: String,
}

#[derive(Parser)]
struct InitArgs {
    #[arg(long, default_value = ".tabula")]
    datastore: PathBuf,
    /// Insert demo rows after creating the tables.
    #[arg(long, default_value_t = false)]
    seed: bool,
    /// Empty the demo tables before seeding.
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(Parser)]
struct ShowArgs {
    #[command(flatten)]
    target: TableArgs,
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser)]
struct OptionsArgs {
    #[command(flatten)]
    target: TableArgs,
    /// Header of the foreign-key column.
    #[arg(long)]
    column: String,
}

#[derive(Parser)]
struct EditArgs {
    #[command(flatten)]
    target: TableArgs,
    #[arg(long)]
    row: usize,
    /// Header of the column to write.
    #[arg(long)]
    column: String,
    /// `null`, an integer, a real, or text. Foreign-key columns take an id.
    #[arg(long)]
    value: String,
    #[arg(long, default_value_t = false)]
    save: bool,
}

#[derive(Parser)]
struct DeleteArgs {
    #[command(flatten)]
    target: TableArgs,
    #[arg(long)]
    row: usize,
    #[arg(long, default_value_t = false)]
    save: bool,
}

fn init_datastore(args: InitArgs) -> Result<()> {
    fs::create_dir_all(&args.datastore)
        .with_context(|| format!("failed to create {}", args.datastore.display()))?;
    let config = TabulaConfig::load_or_init(&args.datastore)?;
    let mut session = SqliteSession::open(&config, &args.datastore)?;
    ensure_catalog(&mut session)?;
    info!("tabula: catalog ready in {}", args.datastore.display());
    if args.seed {
        if args.force {
            truncate_catalog(&mut session)?;
            info!("tabula: cleared demo tables before reseeding");
        } else if has_rows(&mut session)? {
            bail!(
                "datastore '{}' already holds demo rows; rerun with --force to reseed",
                args.datastore.display()
            );
        }
        seed(&mut session)?;
        info!("tabula: seeded {} demo tables", DEMO_TABLES.len());
    }
    session.close()?;
    println!(
        "Initialised {} ({})",
        args.datastore.display(),
        config.sqlite_path(&args.datastore).display()
    );
    Ok(())
}

fn has_rows(session: &mut SqliteSession) -> Result<bool> {
    for table in DEMO_TABLES {
        let rows = session.query(&format!("SELECT 1 FROM {table} LIMIT 1"), &[])?;
        if !rows.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn open_grid(target: &TableArgs) -> Result<(SqliteSession, TabularModel)> {
    if !target.datastore.join(DEFAULT_CONFIG_NAME).exists() {
        bail!(
            "no datastore at '{}'; run `tabula-xtask init` first",
            target.datastore.display()
        );
    }
    let mut session = SqliteSession::open_datastore(&target.datastore)?;
    let schema = schema_for(&target.table)?;
    let model = TabularModel::load(schema, &mut session)
        .with_context(|| format!("failed to load table '{}'", target.table))?;
    Ok((session, model))
}

fn column_by_header(model: &TabularModel, header: &str) -> Result<usize> {
    model
        .column_layout()
        .iter()
        .position(|column| column.header == header)
        .ok_or_else(|| {
            let known: Vec<_> = model
                .column_layout()
                .iter()
                .map(|column| column.header.as_str())
                .collect();
            anyhow!("unknown column '{header}' (columns: {})", known.join(", "))
        })
}

fn marker(state: VisualState) -> &'static str {
    match state {
        VisualState::Normal | VisualState::Uneditable => "",
        VisualState::Updated | VisualState::UpdatedUneditable => "*",
        VisualState::Created | VisualState::CreatedUneditable => "+",
        VisualState::Deleted | VisualState::DeletedUneditable => "-",
    }
}

#[derive(Serialize)]
struct GridCell {
    text: String,
    state: VisualState,
}

#[derive(Serialize)]
struct GridView {
    table: String,
    headers: Vec<String>,
    rows: Vec<Vec<GridCell>>,
}

fn grid_view(model: &TabularModel) -> Result<GridView> {
    let headers = model
        .column_layout()
        .iter()
        .map(|column| column.header.clone())
        .collect();
    let mut rows = Vec::with_capacity(model.row_count());
    for row in 0..model.row_count() {
        let mut cells = Vec::with_capacity(model.column_count());
        for column in 0..model.column_count() {
            let role = match model.column_layout()[column].kind {
                ColumnKind::DeleteAction => Role::Edit,
                _ => Role::Display,
            };
            let text = match model.get(row, column, role)? {
                CellData::Value(value) => value.render(),
                CellData::DeleteAction { marked: true } => "[x]".to_string(),
                CellData::DeleteAction { marked: false } => "[ ]".to_string(),
                CellData::ForeignKey(handle) => handle.id.render(),
            };
            cells.push(GridCell {
                text,
                state: model.visual_state(row, column)?,
            });
        }
        rows.push(cells);
    }
    Ok(GridView {
        table: model.schema().table().to_string(),
        headers,
        rows,
    })
}

fn render_grid(view: &GridView) -> Vec<String> {
    let mut lines = vec![view.headers.join("\t")];
    for row in &view.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| format!("{}{}", cell.text, marker(cell.state)))
            .collect();
        lines.push(cells.join("\t"));
    }
    lines
}

fn show_table(args: ShowArgs) -> Result<()> {
    let (session, model) = open_grid(&args.target)?;
    let view = grid_view(&model)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        for line in render_grid(&view) {
            println!("{line}");
        }
    }
    session.close()?;
    Ok(())
}

fn list_options(args: OptionsArgs) -> Result<()> {
    let (mut session, model) = open_grid(&args.target)?;
    let column = column_by_header(&model, &args.column)?;
    let spec = model.schema().columns()[model.column_layout()[column].schema_index]
        .foreign_key
        .clone()
        .ok_or_else(|| anyhow!("column '{}' is not a foreign key", args.column))?;
    for option in tabula_core::load_options(&mut session, &spec)? {
        println!("{}\t{}", option.id().render(), option.label);
    }
    session.close()?;
    Ok(())
}

fn parse_value(raw: &str) -> CellValue {
    if raw.eq_ignore_ascii_case("null") {
        return CellValue::Null;
    }
    if let Ok(value) = raw.parse::<i64>() {
        return CellValue::Integer(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return CellValue::Real(value);
    }
    CellValue::Text(raw.to_string())
}

/// Foreign-key columns get the whole option group so display and auxiliary
/// values stay in step with the chosen id.
fn input_for(
    session: &mut SqliteSession,
    model: &TabularModel,
    row: usize,
    column: usize,
    value: CellValue,
) -> Result<CellInput> {
    let CellData::ForeignKey(handle) = model.get(row, column, Role::Edit)? else {
        return Ok(CellInput::Scalar(value));
    };
    let options = handle.options(session)?;
    let chosen = options
        .into_iter()
        .find(|option| option.id() == &value)
        .ok_or_else(|| {
            anyhow!(
                "no '{}' row with id {}",
                handle.spec.reference_table,
                value.render()
            )
        })?;
    Ok(CellInput::Group(chosen.group))
}

fn print_statements(statements: &[Statement]) {
    if statements.is_empty() {
        println!("No pending statements");
    }
    for statement in statements {
        println!("{} {:?}", statement.sql, statement.params);
    }
}

fn finish(session: &mut SqliteSession, model: &mut TabularModel, save: bool) -> Result<()> {
    print_statements(&model.pending_statements()?);
    if save {
        let applied = model.save(session)?;
        println!("Saved {applied} statements");
    }
    Ok(())
}

fn edit_cell(args: EditArgs) -> Result<()> {
    let (mut session, mut model) = open_grid(&args.target)?;
    let column = column_by_header(&model, &args.column)?;
    let input = input_for(
        &mut session,
        &model,
        args.row,
        column,
        parse_value(&args.value),
    )?;
    model.set(args.row, column, input)?;
    finish(&mut session, &mut model, args.save)?;
    session.close()?;
    Ok(())
}

fn toggle_delete(args: DeleteArgs) -> Result<()> {
    let (mut session, mut model) = open_grid(&args.target)?;
    let column = model
        .column_layout()
        .iter()
        .position(|column| column.kind == ColumnKind::DeleteAction)
        .ok_or_else(|| anyhow!("table '{}' has no delete column", args.target.table))?;
    model.set(args.row, column, CellInput::ToggleDelete)?;
    finish(&mut session, &mut model, args.save)?;
    session.close()?;
    Ok(())
}

use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use supa_admin_client::{
    AdminClient, ClientConfig, ConfigOverrides, FileFormat, Row, rows_from_json,
};
use supa_admin_core::{ColumnAlteration, ColumnSpec, FilterSpec, QuerySpec, TableRef, TableSpec};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// CLI-specific file format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFileFormat {
    Csv,
    Json,
}

impl From<CliFileFormat> for FileFormat {
    fn from(fmt: CliFileFormat) -> Self {
        match fmt {
            CliFileFormat::Csv => Self::Csv,
            CliFileFormat::Json => Self::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "supa-admin")]
#[command(about = "Manage tables and rows of a hosted PostgreSQL backend")]
struct Cli {
    /// Base URL of the backend (default: $SUPABASE_URL, then the config file).
    #[arg(long, global = true)]
    url: Option<String>,
    /// Service role key (default: $SUPABASE_SERVICE_ROLE_KEY, then the config file).
    #[arg(long, global = true)]
    key: Option<String>,
    /// Path to a YAML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log requests (equivalent to RUST_LOG=debug).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the tables of a schema.
    List(ListArgs),
    /// Show the metadata of one table.
    Info(TableArgs),
    /// Create a table from JSON column definitions.
    CreateTable(CreateTableArgs),
    /// Drop a table.
    DropTable(DropTableArgs),
    /// Add a column to a table.
    AddColumn(AddColumnArgs),
    /// Change a column's name, type, nullability, uniqueness, default or comment.
    AlterColumn(AlterColumnArgs),
    /// Drop a column.
    DropColumn(DropColumnArgs),
    /// Read rows.
    Select(SelectArgs),
    /// Insert rows from JSON.
    Insert(InsertArgs),
    /// Update the rows matching the filters.
    Update(UpdateArgs),
    /// Delete the rows matching the filters.
    Delete(FilteredArgs),
    /// Count the rows matching the filters.
    Count(FilteredArgs),
    /// Execute raw SQL through the exec_sql function.
    Sql(SqlArgs),
    /// Export rows to a CSV or JSON file.
    Export(ExportArgs),
    /// Import rows from a CSV or JSON file.
    Import(ImportArgs),
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Schema name.
    #[arg(long, default_value = "public")]
    schema: String,
}

#[derive(Debug, Args)]
struct TableArgs {
    /// Table name, optionally qualified as schema.table.
    table: String,
    /// Schema name (takes precedence over a qualified table name).
    #[arg(long)]
    schema: Option<String>,
}

impl TableArgs {
    fn table_ref(&self) -> TableRef {
        match &self.schema {
            Some(schema) => TableRef::new(schema.as_str(), self.table.as_str()),
            None => TableRef::from(self.table.as_str()),
        }
    }
}

#[derive(Debug, Args)]
struct CreateTableArgs {
    #[command(flatten)]
    table: TableArgs,
    /// Column definitions as a JSON array, or @path to a JSON file.
    #[arg(long)]
    columns: String,
}

#[derive(Debug, Args)]
struct DropTableArgs {
    #[command(flatten)]
    table: TableArgs,
    /// Also drop dependent objects.
    #[arg(long)]
    cascade: bool,
}

#[derive(Debug, Args)]
struct AddColumnArgs {
    #[command(flatten)]
    table: TableArgs,
    /// Column definition as a JSON object, or @path to a JSON file.
    column: String,
}

#[derive(Debug, Args)]
struct AlterColumnArgs {
    #[command(flatten)]
    table: TableArgs,
    /// Column to change.
    column: String,
    /// New column name.
    #[arg(long)]
    rename: Option<String>,
    /// New SQL type.
    #[arg(long = "type")]
    sql_type: Option<String>,
    /// Allow or forbid NULL values.
    #[arg(long)]
    nullable: Option<bool>,
    /// Add or remove a unique constraint.
    #[arg(long)]
    unique: Option<bool>,
    /// New default value.
    #[arg(long, conflicts_with = "drop_default")]
    default: Option<String>,
    /// Remove the current default.
    #[arg(long)]
    drop_default: bool,
    /// Column comment.
    #[arg(long)]
    comment: Option<String>,
}

#[derive(Debug, Args)]
struct DropColumnArgs {
    #[command(flatten)]
    table: TableArgs,
    /// Column to drop.
    column: String,
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Filter as column=operator.value (e.g. price=gte.100); repeatable.
    #[arg(long = "filter", short = 'f')]
    filters: Vec<String>,
}

impl FilterArgs {
    fn to_spec(&self) -> Result<FilterSpec, String> {
        parse_filters(&self.filters)
    }
}

#[derive(Debug, Args)]
struct SelectArgs {
    #[command(flatten)]
    table: TableArgs,
    /// Columns to return.
    #[arg(long, default_value = "*")]
    columns: String,
    #[command(flatten)]
    filters: FilterArgs,
    /// Ordering, e.g. created_at.desc.
    #[arg(long)]
    order: Option<String>,
    /// Maximum number of rows.
    #[arg(long)]
    limit: Option<u64>,
    /// Number of rows to skip.
    #[arg(long)]
    offset: Option<u64>,
}

#[derive(Debug, Args)]
struct InsertArgs {
    #[command(flatten)]
    table: TableArgs,
    /// A JSON object or array of objects, or @path to a JSON file.
    data: String,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    #[command(flatten)]
    table: TableArgs,
    /// New values as a JSON object, or @path to a JSON file.
    data: String,
    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Debug, Args)]
struct FilteredArgs {
    #[command(flatten)]
    table: TableArgs,
    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Debug, Args)]
struct SqlArgs {
    /// SQL statement.
    query: String,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    table: TableArgs,
    /// Output file.
    output: PathBuf,
    /// File format (default: from the file extension).
    #[arg(long)]
    format: Option<CliFileFormat>,
    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Debug, Args)]
struct ImportArgs {
    #[command(flatten)]
    table: TableArgs,
    /// Input file.
    input: PathBuf,
    /// File format (default: from the file extension).
    #[arg(long)]
    format: Option<CliFileFormat>,
    /// Rows per insert request (default: from the config, 1000).
    #[arg(long)]
    batch_size: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    let overrides = ConfigOverrides {
        url: cli.url,
        service_key: cli.key,
        config_file: cli.config,
    };
    let config = ClientConfig::resolve(&overrides).map_err(|e| e.to_string())?;
    debug!(?config, "resolved configuration");
    let client = AdminClient::connect(config).map_err(|e| e.to_string())?;

    match cli.command {
        Command::List(args) => run_list(&client, args),
        Command::Info(args) => run_info(&client, args),
        Command::CreateTable(args) => run_create_table(&client, args),
        Command::DropTable(args) => run_drop_table(&client, args),
        Command::AddColumn(args) => run_add_column(&client, args),
        Command::AlterColumn(args) => run_alter_column(&client, args),
        Command::DropColumn(args) => run_drop_column(&client, args),
        Command::Select(args) => run_select(&client, args),
        Command::Insert(args) => run_insert(&client, args),
        Command::Update(args) => run_update(&client, args),
        Command::Delete(args) => run_delete(&client, args),
        Command::Count(args) => run_count(&client, args),
        Command::Sql(args) => run_sql(&client, args),
        Command::Export(args) => run_export(&client, args),
        Command::Import(args) => run_import(&client, args),
    }
}

fn run_list(client: &AdminClient, args: ListArgs) -> Result<(), String> {
    let tables = client.list_tables(&args.schema).map_err(|e| e.to_string())?;
    for table in &tables {
        println!("{}.{}", table.schema, table.name);
    }
    eprintln!("{} table(s) in schema '{}'.", tables.len(), args.schema);
    Ok(())
}

fn run_info(client: &AdminClient, args: TableArgs) -> Result<(), String> {
    let info = client
        .get_table_info(args.table_ref())
        .map_err(|e| e.to_string())?;
    print_json(&info)
}

fn run_create_table(client: &AdminClient, args: CreateTableArgs) -> Result<(), String> {
    let columns: Vec<ColumnSpec> = parse_json_arg(&args.columns, "column definitions")?;
    let table_ref = args.table.table_ref();
    let mut table = TableSpec::new(table_ref.name).in_schema(table_ref.schema);
    table.columns = columns;

    let created = client.create_table(&table).map_err(|e| e.to_string())?;
    println!("{}", created.sql);
    eprintln!(
        "Created table '{}' with {} column(s).",
        created.table_ref(),
        created.columns.len()
    );
    Ok(())
}

fn run_drop_table(client: &AdminClient, args: DropTableArgs) -> Result<(), String> {
    let table = args.table.table_ref();
    let result = client
        .drop_table(&table, args.cascade)
        .map_err(|e| e.to_string())?;
    eprintln!("Dropped table '{table}'.");
    print_json(&result)
}

fn run_add_column(client: &AdminClient, args: AddColumnArgs) -> Result<(), String> {
    let column: ColumnSpec = parse_json_arg(&args.column, "column definition")?;
    let result = client
        .add_column(args.table.table_ref(), &column)
        .map_err(|e| e.to_string())?;
    print_json(&result)
}

fn run_alter_column(client: &AdminClient, args: AlterColumnArgs) -> Result<(), String> {
    let change = alteration_from_args(&args);
    if change.is_empty() {
        return Err("Specify at least one change: --rename, --type, --nullable, --unique, --default, --drop-default, or --comment".to_string());
    }
    let result = client
        .alter_column(args.table.table_ref(), &args.column, &change)
        .map_err(|e| e.to_string())?;
    print_json(&result)
}

fn alteration_from_args(args: &AlterColumnArgs) -> ColumnAlteration {
    ColumnAlteration {
        name: args.rename.clone(),
        sql_type: args.sql_type.clone(),
        is_nullable: args.nullable,
        is_unique: args.unique,
        default_value: args.default.clone().map(Into::into),
        drop_default: args.drop_default,
        comment: args.comment.clone(),
    }
}

fn run_drop_column(client: &AdminClient, args: DropColumnArgs) -> Result<(), String> {
    let result = client
        .drop_column(args.table.table_ref(), &args.column)
        .map_err(|e| e.to_string())?;
    print_json(&result)
}

fn run_select(client: &AdminClient, args: SelectArgs) -> Result<(), String> {
    let filters = args.filters.to_spec()?;
    let mut query = QuerySpec::new().columns(args.columns);
    if !filters.is_empty() {
        query = query.filters(filters);
    }
    if let Some(order) = args.order {
        query = query.order(order);
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = args.offset {
        query = query.offset(offset);
    }

    let rows = client
        .select(args.table.table_ref(), &query)
        .map_err(|e| e.to_string())?;
    print_json(&rows)
}

fn run_insert(client: &AdminClient, args: InsertArgs) -> Result<(), String> {
    let value: Value = parse_json_arg(&args.data, "row data")?;
    let rows = rows_from_json(value).map_err(|e| e.to_string())?;
    let inserted = client
        .insert(args.table.table_ref(), &rows)
        .map_err(|e| e.to_string())?;
    eprintln!("Inserted {} row(s).", inserted.len());
    print_json(&inserted)
}

fn run_update(client: &AdminClient, args: UpdateArgs) -> Result<(), String> {
    let values: Row = parse_json_arg(&args.data, "new values")?;
    let filters = args.filters.to_spec()?;
    let updated = client
        .update(args.table.table_ref(), &values, &filters)
        .map_err(|e| e.to_string())?;
    eprintln!("Updated {} row(s).", updated.len());
    print_json(&updated)
}

fn run_delete(client: &AdminClient, args: FilteredArgs) -> Result<(), String> {
    let filters = args.filters.to_spec()?;
    let deleted = client
        .delete(args.table.table_ref(), &filters)
        .map_err(|e| e.to_string())?;
    eprintln!("Deleted {} row(s).", deleted.len());
    print_json(&deleted)
}

fn run_count(client: &AdminClient, args: FilteredArgs) -> Result<(), String> {
    let filters = args.filters.to_spec()?;
    let filters = (!filters.is_empty()).then_some(&filters);
    let total = client
        .count(args.table.table_ref(), filters)
        .map_err(|e| e.to_string())?;
    println!("{total}");
    Ok(())
}

fn run_sql(client: &AdminClient, args: SqlArgs) -> Result<(), String> {
    let rows = client.execute_sql(&args.query).map_err(|e| e.to_string())?;
    eprintln!("Query returned {} row(s).", rows.len());
    print_json(&rows)
}

fn run_export(client: &AdminClient, args: ExportArgs) -> Result<(), String> {
    let table = args.table.table_ref();
    let filters = args.filters.to_spec()?;
    let filters = (!filters.is_empty()).then_some(&filters);
    let format = args
        .format
        .map(FileFormat::from)
        .unwrap_or_else(|| FileFormat::from_path(&args.output));

    let exported = match format {
        FileFormat::Csv => client.export_to_csv(&table, &args.output, filters),
        FileFormat::Json => client.export_to_json(&table, &args.output, filters),
    }
    .map_err(|e| e.to_string())?;

    if exported == 0 && format == FileFormat::Csv {
        eprintln!("Table '{table}' has no matching rows; nothing written.");
    } else {
        eprintln!(
            "Exported {exported} row(s) from '{table}' to '{}'.",
            args.output.display()
        );
    }
    Ok(())
}

fn run_import(client: &AdminClient, args: ImportArgs) -> Result<(), String> {
    let table = args.table.table_ref();
    let batch_size = args.batch_size.unwrap_or(client.config().batch_size);
    let format = args
        .format
        .map(FileFormat::from)
        .unwrap_or_else(|| FileFormat::from_path(&args.input));

    let imported = match format {
        FileFormat::Csv => client.import_from_csv(&table, &args.input, batch_size),
        FileFormat::Json => client.import_from_json(&table, &args.input, batch_size),
    }
    .map_err(|e| e.to_string())?;

    eprintln!(
        "Imported {imported} row(s) from '{}' into '{table}'.",
        args.input.display()
    );
    Ok(())
}

/// Parses `column=operator.value` pairs into a filter set.
fn parse_filters(raw: &[String]) -> Result<FilterSpec, String> {
    let mut filters = FilterSpec::new();
    for entry in raw {
        let (column, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("Invalid filter '{entry}': expected column=operator.value"))?;
        filters.insert(column, value).map_err(|e| e.to_string())?;
    }
    Ok(filters)
}

/// Parses inline JSON, or the contents of the file named after a leading `@`.
fn parse_json_arg<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> Result<T, String> {
    let text = match raw.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).map_err(|err| format!("Failed to read '{path}': {err}"))?
        }
        None => raw.to_string(),
    };
    serde_json::from_str(&text).map_err(|err| format!("Invalid {what}: {err}"))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(value)
        .map_err(|err| format!("Failed to serialize output: {err}"))?;
    println!("{raw}");
    Ok(())
}

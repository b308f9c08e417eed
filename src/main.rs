use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use salary_book::{
    find_agent, find_player, open_warehouse, render, AppConfig, RawParams, RequestContext,
    WORKSPACES,
};

#[derive(Debug, Parser)]
#[command(name = "salary-book", version, about = "Workspace lenses over the contract warehouse")]
struct Cli {
    /// Configuration file (defaults to ./salary-book.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the available workspaces
    Workspaces,

    /// Render one workspace
    Query {
        /// Workspace name, e.g. `players`
        name: String,

        /// Request parameter as key=value; repeatable
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Raw query string, e.g. `team=BOS&sort=cap_desc`
        #[arg(long)]
        query: Option<String>,

        /// Anchor date for relative windows (YYYY-MM-DD), defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Show a single player or agent
    Detail {
        #[arg(value_enum)]
        kind: DetailKind,
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DetailKind {
    Player,
    Agent,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env("SALARY_BOOK_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Workspaces => {
            for entry in WORKSPACES {
                println!("{:<14} {}", entry.name, entry.title);
            }
            Ok(())
        }
        Command::Query {
            name,
            params,
            query,
            today,
            format,
        } => {
            let config = load_config(cli.config)?;
            let conn = open_warehouse(&config.database).with_context(|| {
                format!(
                    "Failed to open warehouse at {}",
                    config.database.path.display()
                )
            })?;

            let mut raw = query
                .as_deref()
                .map(RawParams::from_query_string)
                .unwrap_or_default();
            for (key, value) in params {
                raw.insert(key, value);
            }

            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
            let ctx = RequestContext::from_config(&config.workspace, today);
            let payload = render(&name, &raw, &ctx, &conn)?;

            if let Some(error) = payload.get("error").and_then(Value::as_str) {
                tracing::warn!(workspace = %name, "{error}");
            }

            match format {
                OutputFormat::Json => print_json(&payload),
                OutputFormat::Csv => {
                    let rows = payload["rows"].as_array().map(Vec::as_slice).unwrap_or_default();
                    write_csv(rows, io::stdout().lock())
                }
            }
        }
        Command::Detail { kind, id } => {
            let config = load_config(cli.config)?;
            let conn = open_warehouse(&config.database).with_context(|| {
                format!(
                    "Failed to open warehouse at {}",
                    config.database.path.display()
                )
            })?;

            let row = match kind {
                DetailKind::Player => find_player(&conn, id)?,
                DetailKind::Agent => find_agent(&conn, id)?,
            };
            print_json(&serde_json::to_value(row)?)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    AppConfig::load(path.as_deref()).context("Failed to load configuration")
}

fn print_json(value: &Value) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Header is the union of row keys in first-seen order
fn write_csv<W: Write>(rows: &[Value], out: W) -> Result<()> {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        let Some(object) = row.as_object() else {
            bail!("workspace rows must be JSON objects");
        };
        for key in object.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&columns)?;
    for row in rows {
        let record: Vec<String> = columns.iter().map(|column| csv_cell(row.get(*column))).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("team=BOS"),
            Ok(("team".to_string(), "BOS".to_string()))
        );
        assert_eq!(
            parse_key_value("q=a=b"),
            Ok(("q".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("=x").is_err());
        assert!(parse_key_value("team").is_err());
    }

    #[test]
    fn test_csv_header_is_union_of_keys() {
        let rows = vec![
            json!({"player_id": 7, "player_name": "Marcus Vale"}),
            json!({"player_id": 23, "player_name": "Theo Brandt", "urgency_key": "upcoming"}),
        ];
        let mut buf = Vec::new();
        write_csv(&rows, &mut buf).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "player_id,player_name,urgency_key\n7,Marcus Vale,\n23,Theo Brandt,upcoming\n"
        );
    }

    #[test]
    fn test_cli_parses_query_command() {
        let cli = Cli::parse_from([
            "salary-book",
            "query",
            "players",
            "-p",
            "team=BOS",
            "--today",
            "2025-01-15",
            "--format",
            "csv",
        ]);

        match cli.command {
            Command::Query {
                name,
                params,
                today,
                format,
                ..
            } => {
                assert_eq!(name, "players");
                assert_eq!(params, vec![("team".to_string(), "BOS".to_string())]);
                assert_eq!(today, NaiveDate::from_ymd_opt(2025, 1, 15));
                assert_eq!(format, OutputFormat::Csv);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

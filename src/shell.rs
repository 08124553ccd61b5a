//! Interactive query shell.
//!
//! Lines starting with `.` are shell commands; anything else is a query.
//! Nothing typed in the shell is written to disk.

use colored::Colorize;
use docsql_core::{DocumentStore, QueryError, QueryExecutor, QueryOutput, Row, StoreQuery};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

const KEYWORDS: &[&str] = &[
    "SELECT",
    "FROM",
    "WHERE",
    "ORDER BY",
    "LIMIT",
    "GROUP",
    "COUNT(*)",
    "toDate(",
    "prettyJson(",
    "AND",
    "OR",
    "IN",
    "NOT IN",
    "ARRAY_CONTAINS",
    "ARRAY_CONTAINS_ANY",
    "ASC",
    "DESC",
    ".help",
    ".exit",
    ".use",
    ".explain",
    ".status",
];

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Empty,
    Exit,
    Help,
    Status,
    /// Switch the document root; `None` resets it.
    Use(Option<String>),
    Explain(String),
    Query(String),
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ShellCommand::Empty;
        }
        if !line.starts_with('.') {
            return ShellCommand::Query(line.to_string());
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command {
            ".exit" | ".quit" | ".q" => ShellCommand::Exit,
            ".help" | ".h" | ".?" => ShellCommand::Help,
            ".status" => ShellCommand::Status,
            ".use" | ".cd" => {
                let path = rest.trim_matches('/');
                ShellCommand::Use((!path.is_empty()).then(|| path.to_string()))
            }
            ".explain" => ShellCommand::Explain(rest.to_string()),
            other => ShellCommand::Unknown(other.to_string()),
        }
    }
}

/// What the shell has to show for one command.
#[derive(Debug)]
pub enum Response {
    Nothing,
    Exit,
    Help,
    Status(Vec<(&'static str, String)>),
    Message(String),
    Explain(StoreQuery),
    Output {
        output: QueryOutput,
        elapsed: Duration,
    },
    Error(QueryError),
    Unknown(String),
}

/// Query shell over one executor.
pub struct Shell<S: DocumentStore> {
    executor: QueryExecutor<S>,
    source: String,
}

impl<S: DocumentStore> Shell<S> {
    /// `source` describes where the documents came from, for `.status`.
    pub fn new(executor: QueryExecutor<S>, source: impl Into<String>) -> Self {
        Self {
            executor,
            source: source.into(),
        }
    }

    pub fn executor(&self) -> &QueryExecutor<S> {
        &self.executor
    }

    pub async fn respond(&mut self, command: ShellCommand) -> Response {
        match command {
            ShellCommand::Empty => Response::Nothing,
            ShellCommand::Exit => Response::Exit,
            ShellCommand::Help => Response::Help,
            ShellCommand::Status => Response::Status(self.status()),
            ShellCommand::Use(path) => {
                let message = match &path {
                    Some(path) => format!("Base path set to {}", path),
                    None => "Base path cleared".to_string(),
                };
                self.executor.settings_mut().base_path = path;
                Response::Message(message)
            }
            ShellCommand::Explain(query) => match self.executor.explain(&query) {
                Ok(plan) => Response::Explain(plan),
                Err(e) => Response::Error(e),
            },
            ShellCommand::Query(query) => {
                let started = Instant::now();
                match self.executor.execute(&query).await {
                    Ok(output) => Response::Output {
                        output,
                        elapsed: started.elapsed(),
                    },
                    Err(e) => {
                        tracing::debug!(%query, error = %e, "query failed");
                        Response::Error(e)
                    }
                }
            }
            ShellCommand::Unknown(command) => Response::Unknown(command),
        }
    }

    fn status(&self) -> Vec<(&'static str, String)> {
        let settings = self.executor.settings();
        vec![
            ("Source:", self.source.clone()),
            (
                "Base path:",
                settings
                    .base_path
                    .clone()
                    .unwrap_or_else(|| "/".to_string()),
            ),
            (
                "Time zone:",
                settings
                    .timezone
                    .map(|tz| tz.name().to_string())
                    .unwrap_or_else(|| "local".to_string()),
            ),
            ("Include id:", settings.include_id.to_string()),
        ]
    }
}

/// Tab completion helper
struct DocsqlHelper {
    completions: Vec<String>,
}

impl DocsqlHelper {
    fn new(collections: impl IntoIterator<Item = String>) -> Self {
        let mut completions: Vec<String> = KEYWORDS.iter().map(|k| k.to_string()).collect();
        completions.extend(collections);
        Self { completions }
    }

    fn word_start(line: &str) -> usize {
        line.rfind(|c: char| c.is_whitespace() || c == '(' || c == ',')
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

impl Completer for DocsqlHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let start = Self::word_start(&line[..pos]);
        let word = &line[start..pos];

        let matches: Vec<Pair> = self
            .completions
            .iter()
            .filter(|c| c.to_lowercase().starts_with(&word.to_lowercase()))
            .map(|c| Pair {
                display: c.clone(),
                replacement: c.clone(),
            })
            .collect();

        Ok((start, matches))
    }
}

impl Hinter for DocsqlHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }

        let word = &line[Self::word_start(line)..];
        if word.is_empty() {
            return None;
        }

        self.completions
            .iter()
            .find(|c| c.starts_with(word) && c.len() > word.len())
            .map(|c| c[word.len()..].to_string())
    }
}

impl Highlighter for DocsqlHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.truecolor(100, 100, 100).to_string())
    }
}

impl Validator for DocsqlHelper {}

impl Helper for DocsqlHelper {}

/// Read and run lines until `.exit` or end of input.
pub fn run_interactive<S: DocumentStore>(
    runtime: &Runtime,
    shell: &mut Shell<S>,
    collections: Vec<String>,
) -> rustyline::Result<()> {
    print_banner();

    let mut rl: Editor<DocsqlHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(DocsqlHelper::new(collections)));

    loop {
        let prompt = match &shell.executor().settings().base_path {
            Some(base) => format!("{}{} ", base.cyan(), ">".white()),
            None => format!("{}{} ", "docsql".cyan(), ">".white()),
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let command = ShellCommand::parse(&line);
                if command != ShellCommand::Empty {
                    let _ = rl.add_history_entry(line.trim());
                }
                let response = runtime.block_on(shell.respond(command));
                if matches!(response, Response::Exit) {
                    println!("{}", "Goodbye!".dimmed());
                    break;
                }
                print_response(&response);
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "Type .exit to quit".dimmed());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".dimmed());
                break;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "  {} {}",
        "docsql".white().bold(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    println!(
        "  Type {} for help, {} to quit\n",
        ".help".yellow(),
        ".exit".yellow()
    );
}

fn print_help() {
    println!("\n{}", "Commands:".white().bold());
    println!("  {}            Show this help", ".help".yellow());
    println!("  {}            Exit the shell", ".exit".yellow());
    println!("  {} [path]      Set or clear the base path", ".use".yellow());
    println!("  {} <query> Show the store operations", ".explain".yellow());
    println!("  {}          Show current settings", ".status".yellow());

    println!("\n{}", "Queries:".white().bold());
    println!(
        "  {}",
        "SELECT fields|*|COUNT(*) FROM path|GROUP name [WHERE ...] [ORDER BY f ASC|DESC] [LIMIT n]"
            .cyan()
    );
    println!(
        "  {}",
        "Functions: toDate(field), prettyJson(field). AND/OR split left to right.".dimmed()
    );

    println!("\n{}", "Examples:".white().bold());
    println!(
        "  {}",
        "SELECT name, age FROM users WHERE age > 25 ORDER BY age DESC LIMIT 10".green()
    );
    println!("  {}", "SELECT COUNT(*) FROM GROUP orders".green());
    println!(
        "  {}",
        "SELECT id, toDate(createdAt) FROM users WHERE id = 'u1'".green()
    );
    println!();
}

pub fn print_response(response: &Response) {
    match response {
        Response::Nothing | Response::Exit => {}
        Response::Help => print_help(),
        Response::Status(lines) => {
            for (label, value) in lines {
                println!("  {} {}", label.dimmed(), value.white());
            }
        }
        Response::Message(message) => println!("  {}", message.dimmed()),
        Response::Explain(plan) => println!("  {}", plan.to_string().cyan()),
        Response::Output { output, elapsed } => {
            let rows = output.clone().into_rows();
            let rendered: Vec<String> = rows.iter().map(format_row).collect();
            if !rendered.is_empty() {
                println!("{}", rendered.join("\n\n"));
            }
            let noun = if rows.len() == 1 { "row" } else { "rows" };
            println!(
                "{}",
                format!(
                    "  ({} {}, {:.2}ms)",
                    rows.len(),
                    noun,
                    elapsed.as_secs_f64() * 1000.0
                )
                .dimmed()
            );
        }
        Response::Error(e) => println!("{} {}", "Error:".red().bold(), e),
        Response::Unknown(command) => {
            println!("  {} {}", "Unknown command:".red(), command);
            println!("  Type {} for help", ".help".yellow());
        }
    }
}

/// Render one row as aligned `field  value` lines. Multi-line strings, such
/// as `prettyJson` output, continue under the value column.
pub fn format_row(row: &Row) -> String {
    if row.is_empty() {
        return format!("  {}", "(no fields)".dimmed());
    }

    let width = row.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    row.iter()
        .map(|(field, value)| {
            let label = format!("{:<width$}", field, width = width);
            format!("  {}  {}", label.cyan(), format_field(value, width + 4))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_field(value: &JsonValue, column: usize) -> String {
    match value {
        JsonValue::Null => "null".dimmed().to_string(),
        JsonValue::Bool(_) | JsonValue::Number(_) => value.to_string().yellow().to_string(),
        JsonValue::String(s) if s.contains('\n') => {
            let continuation = format!("\n{}", " ".repeat(column));
            s.lines()
                .collect::<Vec<_>>()
                .join(&continuation)
                .green()
                .to_string()
        }
        JsonValue::String(_) => value.to_string().green().to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsql_core::InMemoryStore;
    use serde_json::json;

    fn shell() -> Shell<InMemoryStore> {
        let mut store = InMemoryStore::new();
        store.insert("users", "u1", json!({"name": "Ada", "age": 36}));
        store.insert("users/u1/orders", "o1", json!({"total": 12}));
        Shell::new(QueryExecutor::new(store), "test")
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ShellCommand::parse("   "), ShellCommand::Empty);
        assert_eq!(ShellCommand::parse(".exit"), ShellCommand::Exit);
        assert_eq!(ShellCommand::parse(".q"), ShellCommand::Exit);
        assert_eq!(ShellCommand::parse(".help"), ShellCommand::Help);
        assert_eq!(
            ShellCommand::parse(".use /users/u1/"),
            ShellCommand::Use(Some("users/u1".to_string()))
        );
        assert_eq!(ShellCommand::parse(".use"), ShellCommand::Use(None));
        assert_eq!(ShellCommand::parse(".use /"), ShellCommand::Use(None));
        assert_eq!(
            ShellCommand::parse(".explain SELECT * FROM users"),
            ShellCommand::Explain("SELECT * FROM users".to_string())
        );
        assert_eq!(
            ShellCommand::parse("  SELECT * FROM users  "),
            ShellCommand::Query("SELECT * FROM users".to_string())
        );
        assert_eq!(
            ShellCommand::parse(".drop users"),
            ShellCommand::Unknown(".drop".to_string())
        );
    }

    #[test]
    fn test_use_changes_resolution() {
        let mut shell = shell();
        let runtime = Runtime::new().unwrap();

        runtime.block_on(shell.respond(ShellCommand::parse(".use users/u1")));
        let query = ShellCommand::parse("SELECT total FROM orders");
        match runtime.block_on(shell.respond(query)) {
            Response::Output { output, .. } => {
                let rows = output.into_rows();
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0]["total"], json!(12));
            }
            other => panic!("unexpected response: {:?}", other),
        }

        runtime.block_on(shell.respond(ShellCommand::Use(None)));
        assert_eq!(shell.executor().settings().base_path, None);
    }

    #[test]
    fn test_explain_and_errors() {
        let mut shell = shell();
        let response = tokio_test::block_on(shell.respond(ShellCommand::parse(
            ".explain SELECT name FROM users WHERE age > 30 LIMIT 2",
        )));
        match response {
            Response::Explain(plan) => {
                assert_eq!(
                    plan.to_string(),
                    "collection(users) | where(age > 30) | limit(2)"
                );
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let query = ShellCommand::parse("SELECT name users");
        let response = tokio_test::block_on(shell.respond(query));
        assert!(matches!(response, Response::Error(QueryError::MissingFrom)));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_query_not_logged_at_default_level() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();

        let mut shell = shell();
        let response = tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(shell.respond(ShellCommand::parse("SELECT * FROM users/u1")))
        });

        assert!(matches!(response, Response::Error(_)));
        assert!(log.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_status() {
        let mut shell = shell();
        let response = tokio_test::block_on(shell.respond(ShellCommand::Status));
        match response {
            Response::Status(lines) => {
                assert_eq!(lines[0], ("Source:", "test".to_string()));
                assert_eq!(lines[1], ("Base path:", "/".to_string()));
                assert_eq!(lines[2], ("Time zone:", "local".to_string()));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_format_row() {
        colored::control::set_override(false);
        let row = json!({"name": "Ada", "tags": ["a", "b"], "age": 36, "nickname": null});
        assert_eq!(
            format_row(row.as_object().unwrap()),
            "  name      \"Ada\"\n  tags      [\"a\",\"b\"]\n  age       36\n  nickname  null"
        );

        let row = json!({"prettyJson(meta)": "{\n  \"a\": 1\n}"});
        assert_eq!(
            format_row(row.as_object().unwrap()),
            "  prettyJson(meta)  {\n                      \"a\": 1\n                    }"
        );

        assert_eq!(format_row(&Row::new()), "  (no fields)");
    }

    #[test]
    fn test_completion_candidates() {
        let helper = DocsqlHelper::new(vec!["users".to_string()]);
        assert!(helper.completions.iter().any(|c| c == "users"));
        assert_eq!(DocsqlHelper::word_start("SELECT * FROM us"), 14);
        assert_eq!(DocsqlHelper::word_start("SELECT toDate(cr"), 14);
    }
}

//! Built-in shell commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! and dynamic help generation. Input that matches no command falls
//! through to the shell, which treats it as a filter expression.

mod clear;
mod datasets;
mod filter;
mod help;
mod import;
mod info;
mod order;
mod page;
mod quit;
mod size;
mod use_dataset;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::query::{Filter, OrderBy};
use crate::store::Dataset;
use crate::store::sqlite::SqliteStore;

/// Current browse state, owned by the shell loop.
#[derive(Debug, Clone)]
pub struct BrowseState {
    pub dataset: Option<Dataset>,
    pub filters: Vec<Filter>,
    /// The filter expression as typed, for display.
    pub filter_text: String,
    pub order: OrderBy,
    /// Zero-based page index.
    pub page: u32,
    pub page_size: u32,
}

impl BrowseState {
    pub fn new(page_size: u32) -> Self {
        Self {
            dataset: None,
            filters: Vec::new(),
            filter_text: String::new(),
            order: OrderBy::desc("created_at").expect("static column"),
            page: 0,
            page_size,
        }
    }
}

/// Session info available to commands during execution.
pub struct SessionInfo<'a> {
    pub store: &'a SqliteStore,
    pub config: &'a Config,
    pub state: &'a BrowseState,
    pub db_path: &'a str,
}

/// A state change the shell needs to apply after a command runs.
/// Every variant triggers a fresh query of the current view.
#[derive(Debug, Clone)]
pub enum StateChange {
    /// Dataset scope changed; filters and page reset.
    Dataset(Dataset),
    /// Additional filters replaced (parsed filters + the typed text).
    Filters(Vec<Filter>, String),
    /// Ordering changed.
    Order(OrderBy),
    /// Jump to a page (zero-based).
    Page(u32),
    /// Rows per page changed.
    PageSize(u32),
    /// Drop all additional filters.
    ClearFilters,
    /// Nothing changed, but the view should be re-queried.
    Refresh,
}

/// What the shell should do after a command runs.
pub enum CommandResult {
    /// Not a command — treat the input as a filter expression.
    NotACommand,
    /// Command handled, continue the shell loop.
    Handled,
    /// Command produced a state change the shell must apply.
    StateChanged(StateChange),
    /// Exit the shell.
    Quit,
}

/// A shell command. Implement this trait to add new commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/datasets"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/ds"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description for `/help`, including argument hints.
    fn description(&self) -> &str;

    /// Run the command. `args` is everything after the command word.
    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult;
}

/// Holds registered commands. Supports runtime registration.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(datasets::DatasetsCommand),
            Arc::new(use_dataset::UseCommand),
            Arc::new(filter::FilterCommand),
            Arc::new(order::OrderCommand),
            Arc::new(page::PageCommand),
            Arc::new(page::NextCommand),
            Arc::new(page::PrevCommand),
            Arc::new(size::SizeCommand),
            Arc::new(clear::ClearCommand),
            Arc::new(info::InfoCommand),
            Arc::new(import::ImportCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    /// Register an additional command.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, info: &SessionInfo<'_>) -> CommandResult {
        let input = input.trim();
        let (cmd, args) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        for command in &self.commands {
            if cmd == command.name() || command.aliases().contains(&cmd) {
                // /help is special — it needs the registry to list all commands
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                return command.execute(args, info).await;
            }
        }

        if cmd.starts_with('/') {
            println!("unknown command: {cmd}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    /// Generate help text from all registered commands.
    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.aliases()), c.description()))
            .collect();

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out
    }

    /// All registered command names (for testing).
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// All registered names and aliases (for duplicate detection).
    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = Vec::new();
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, aliases: &[&str]) -> String {
    if aliases.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, aliases.join(", "))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct TestEnv {
        pub store: SqliteStore,
        pub config: Config,
        pub state: BrowseState,
    }

    impl TestEnv {
        pub(crate) fn info(&self) -> SessionInfo<'_> {
            SessionInfo {
                store: &self.store,
                config: &self.config,
                state: &self.state,
                db_path: ":memory:",
            }
        }
    }

    pub(crate) fn test_env() -> TestEnv {
        TestEnv {
            store: SqliteStore::in_memory().unwrap(),
            config: Config::open(":memory:").unwrap(),
            state: BrowseState::new(20),
        }
    }

    #[test]
    fn all_builtins_registered() {
        let reg = CommandRegistry::new();
        let names = reg.names();
        for name in [
            "/help",
            "/datasets",
            "/use",
            "/filter",
            "/order",
            "/page",
            "/next",
            "/prev",
            "/size",
            "/clear",
            "/info",
            "/import",
            "/quit",
        ] {
            assert!(names.contains(&name), "missing builtin: {name}");
        }
    }

    #[test]
    fn no_duplicate_triggers() {
        let reg = CommandRegistry::new();
        let triggers = reg.all_triggers();
        let mut seen = Vec::new();
        for t in &triggers {
            assert!(!seen.contains(t), "duplicate trigger: {t}");
            seen.push(t);
        }
    }

    #[test]
    fn help_text_includes_all_commands() {
        let reg = CommandRegistry::new();
        let text = reg.help_text();
        for name in reg.names() {
            assert!(text.contains(name), "help missing: {name}");
        }
    }

    #[tokio::test]
    async fn unknown_slash_command_is_handled() {
        let env = test_env();
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("/foobar", &env.info()).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn non_command_passes_through() {
        let env = test_env();
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("label = good", &env.info()).await,
            CommandResult::NotACommand
        ));
        assert!(matches!(
            reg.dispatch("score > 3", &env.info()).await,
            CommandResult::NotACommand
        ));
    }

    #[tokio::test]
    async fn args_reach_the_command() {
        struct EchoCommand;

        #[async_trait]
        impl Command for EchoCommand {
            fn name(&self) -> &str {
                "/echo"
            }
            fn description(&self) -> &str {
                "repeat the arguments"
            }
            async fn execute(&self, args: &str, _info: &SessionInfo<'_>) -> CommandResult {
                assert_eq!(args, "hello   world");
                CommandResult::Handled
            }
        }

        let env = test_env();
        let mut reg = CommandRegistry::new();
        reg.register(Arc::new(EchoCommand));
        assert!(matches!(
            reg.dispatch("/echo hello   world", &env.info()).await,
            CommandResult::Handled
        ));
    }

    #[test]
    fn format_label_no_aliases() {
        assert_eq!(format_label("/info", &[]), "/info");
    }

    #[test]
    fn format_label_with_aliases() {
        assert_eq!(format_label("/help", &["/h", "/?"]), "/help (/h, /?)");
    }
}

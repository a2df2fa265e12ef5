use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo, StateChange};
use crate::consts::format_number;
use crate::ingest;

pub struct ImportCommand;

#[async_trait]
impl Command for ImportCommand {
    fn name(&self) -> &str {
        "/import"
    }

    fn description(&self) -> &str {
        "<path-or-url> — import records into the current dataset"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        if args.is_empty() {
            eprintln!("  ✗ usage: /import <path-or-url>");
            return CommandResult::Handled;
        }
        let Some(dataset) = &info.state.dataset else {
            eprintln!("  ✗ select a dataset first (/use <name>)");
            return CommandResult::Handled;
        };

        match ingest::import_source(info.store, dataset, args).await {
            Ok(summary) => {
                println!(
                    "  ✓ imported {} rows into {} ({} skipped)",
                    format_number(summary.inserted),
                    dataset.name,
                    format_number(summary.skipped),
                );
                CommandResult::StateChanged(StateChange::Refresh)
            }
            Err(e) => {
                eprintln!("  ✗ import failed: {e}");
                CommandResult::Handled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_env;
    use std::io::Write as _;

    #[tokio::test]
    async fn requires_a_source() {
        let env = test_env();
        assert!(matches!(
            ImportCommand.execute("", &env.info()).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn requires_a_selected_dataset() {
        let env = test_env();
        assert!(matches!(
            ImportCommand.execute("/tmp/none.jsonl", &env.info()).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn imports_into_the_current_dataset() {
        let mut env = test_env();
        let dataset = env.store.create_dataset("evals").unwrap();
        env.state.dataset = Some(dataset.clone());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", r#"{"data": {"q": "2+2?"}}"#).unwrap();
        writeln!(file, "{}", r#"{"data": {"q": "3+3?"}}"#).unwrap();

        let result = ImportCommand
            .execute(path.to_str().unwrap(), &env.info())
            .await;
        assert!(matches!(
            result,
            CommandResult::StateChanged(StateChange::Refresh)
        ));
        assert_eq!(env.store.datapoint_count(dataset.id).unwrap(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_handled() {
        let mut env = test_env();
        env.state.dataset = Some(env.store.create_dataset("evals").unwrap());
        assert!(matches!(
            ImportCommand
                .execute("/definitely/not/here.jsonl", &env.info())
                .await,
            CommandResult::Handled
        ));
    }
}

use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};
use crate::consts::format_number;

pub struct DatasetsCommand;

#[async_trait]
impl Command for DatasetsCommand {
    fn name(&self) -> &str {
        "/datasets"
    }

    fn aliases(&self) -> &[&str] {
        &["/ds"]
    }

    fn description(&self) -> &str {
        "list datasets and their row counts"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        let datasets = match info.store.datasets() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("  ✗ failed to list datasets: {e}");
                return CommandResult::Handled;
            }
        };

        if datasets.is_empty() {
            println!("  no datasets yet — strata import <path> --dataset <name>");
            return CommandResult::Handled;
        }

        let max_width = datasets.iter().map(|d| d.name.len()).max().unwrap_or(10);
        for dataset in &datasets {
            let count = info.store.datapoint_count(dataset.id).unwrap_or(0);
            let marker = match &info.state.dataset {
                Some(current) if current.id == dataset.id => " ← current",
                _ => "",
            };
            println!(
                "  {:<max_width$}  {:>10} rows  created {}{}",
                dataset.name,
                format_number(count),
                dataset.created_at,
                marker,
            );
        }
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_env;

    #[tokio::test]
    async fn returns_handled_when_empty() {
        let env = test_env();
        assert!(matches!(
            DatasetsCommand.execute("", &env.info()).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn returns_handled_with_datasets() {
        let env = test_env();
        env.store.create_dataset("evals").unwrap();
        env.store.create_dataset("traces").unwrap();
        assert!(matches!(
            DatasetsCommand.execute("", &env.info()).await,
            CommandResult::Handled
        ));
    }
}

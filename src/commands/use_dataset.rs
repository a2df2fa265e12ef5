use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo, StateChange};

pub struct UseCommand;

#[async_trait]
impl Command for UseCommand {
    fn name(&self) -> &str {
        "/use"
    }

    fn description(&self) -> &str {
        "<name> — select the dataset to browse"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        if args.is_empty() {
            match &info.state.dataset {
                Some(ds) => println!("  current dataset: {}", ds.name),
                None => println!("  no dataset selected — /use <name>"),
            }
            return CommandResult::Handled;
        }

        match info.store.dataset(args) {
            Ok(Some(dataset)) => {
                if let Err(e) = info.config.set_last_dataset(&dataset.name) {
                    log::warn!("couldn't save dataset preference: {e}");
                }
                println!("  ✓ browsing {}", dataset.name);
                CommandResult::StateChanged(StateChange::Dataset(dataset))
            }
            Ok(None) => {
                eprintln!("  ✗ no dataset named {args} — see /datasets");
                CommandResult::Handled
            }
            Err(e) => {
                eprintln!("  ✗ failed to look up {args}: {e}");
                CommandResult::Handled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_env;

    #[tokio::test]
    async fn missing_dataset_is_handled() {
        let env = test_env();
        assert!(matches!(
            UseCommand.execute("nope", &env.info()).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn selecting_a_dataset_changes_state_and_persists() {
        let env = test_env();
        env.store.create_dataset("evals").unwrap();

        let result = UseCommand.execute("evals", &env.info()).await;
        match result {
            CommandResult::StateChanged(StateChange::Dataset(ds)) => {
                assert_eq!(ds.name, "evals");
            }
            _ => panic!("expected a dataset state change"),
        }
        assert_eq!(env.config.last_dataset().unwrap().unwrap(), "evals");
    }

    #[tokio::test]
    async fn empty_args_show_current_selection() {
        let env = test_env();
        assert!(matches!(
            UseCommand.execute("", &env.info()).await,
            CommandResult::Handled
        ));
    }
}

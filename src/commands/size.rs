use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo, StateChange};
use crate::consts::MAX_PAGE_SIZE;

pub struct SizeCommand;

#[async_trait]
impl Command for SizeCommand {
    fn name(&self) -> &str {
        "/size"
    }

    fn description(&self) -> &str {
        "<n> — set rows per page (saved for next time)"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        if args.is_empty() {
            println!("  page size: {}", info.state.page_size);
            return CommandResult::Handled;
        }
        let size = match args.parse::<u32>() {
            Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => n,
            _ => {
                eprintln!("  ✗ page size must be between 1 and {MAX_PAGE_SIZE}");
                return CommandResult::Handled;
            }
        };
        if let Err(e) = info.config.set_page_size(size) {
            log::warn!("couldn't save page size preference: {e}");
        }
        CommandResult::StateChanged(StateChange::PageSize(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_env;

    #[tokio::test]
    async fn valid_size_changes_state_and_persists() {
        let env = test_env();
        match SizeCommand.execute("50", &env.info()).await {
            CommandResult::StateChanged(StateChange::PageSize(n)) => assert_eq!(n, 50),
            _ => panic!("expected a page-size state change"),
        }
        assert_eq!(env.config.page_size().unwrap(), Some(50));
    }

    #[tokio::test]
    async fn zero_and_oversized_are_rejected() {
        let env = test_env();
        assert!(matches!(
            SizeCommand.execute("0", &env.info()).await,
            CommandResult::Handled
        ));
        assert!(matches!(
            SizeCommand
                .execute(&(MAX_PAGE_SIZE + 1).to_string(), &env.info())
                .await,
            CommandResult::Handled
        ));
        assert!(env.config.page_size().unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_args_show_current_size() {
        let env = test_env();
        assert!(matches!(
            SizeCommand.execute("", &env.info()).await,
            CommandResult::Handled
        ));
    }
}

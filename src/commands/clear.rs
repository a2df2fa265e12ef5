use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo, StateChange};

pub struct ClearCommand;

#[async_trait]
impl Command for ClearCommand {
    fn name(&self) -> &str {
        "/clear"
    }

    fn description(&self) -> &str {
        "drop all filters"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        if info.state.filters.is_empty() {
            println!("  no filters to clear");
            return CommandResult::Handled;
        }
        CommandResult::StateChanged(StateChange::ClearFilters)
    }
}

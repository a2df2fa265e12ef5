use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo, StateChange};
use crate::query::parse::parse_filters;

pub struct FilterCommand;

#[async_trait]
impl Command for FilterCommand {
    fn name(&self) -> &str {
        "/filter"
    }

    fn aliases(&self) -> &[&str] {
        &["/f"]
    }

    fn description(&self) -> &str {
        "<expr> — set filters, e.g. /filter score > 0.5, target is not null"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        if args.is_empty() {
            if info.state.filters.is_empty() {
                println!("  no filters set");
            } else {
                println!("  filters: {}", info.state.filter_text);
            }
            return CommandResult::Handled;
        }

        match parse_filters(args) {
            Ok(filters) => {
                CommandResult::StateChanged(StateChange::Filters(filters, args.to_string()))
            }
            Err(e) => {
                eprintln!("  ✗ {e}");
                CommandResult::Handled
            }
        }
    }
}

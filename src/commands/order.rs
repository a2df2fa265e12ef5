use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo, StateChange};
use crate::query::OrderBy;

pub struct OrderCommand;

#[async_trait]
impl Command for OrderCommand {
    fn name(&self) -> &str {
        "/order"
    }

    fn aliases(&self) -> &[&str] {
        &["/o"]
    }

    fn description(&self) -> &str {
        "<column> [asc|desc] — sort results (try created_at or size)"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        let mut parts = args.split_whitespace();
        let Some(column) = parts.next() else {
            println!("  order: {}", info.state.order);
            return CommandResult::Handled;
        };

        let order = match parts.next() {
            None => OrderBy::asc(column),
            Some(d) if d.eq_ignore_ascii_case("asc") => OrderBy::asc(column),
            Some(d) if d.eq_ignore_ascii_case("desc") => OrderBy::desc(column),
            Some(d) => {
                eprintln!("  ✗ direction must be asc or desc, not {d}");
                return CommandResult::Handled;
            }
        };

        if parts.next().is_some() {
            eprintln!("  ✗ usage: /order <column> [asc|desc]");
            return CommandResult::Handled;
        }

        match order {
            Ok(order) => CommandResult::StateChanged(StateChange::Order(order)),
            Err(e) => {
                eprintln!("  ✗ {e}");
                CommandResult::Handled
            }
        }
    }
}

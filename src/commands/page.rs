//! Paging commands: `/page <n>`, `/next`, `/prev`.
//!
//! Pages are 1-based at the prompt and zero-based everywhere else.

use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo, StateChange};

pub struct PageCommand;

#[async_trait]
impl Command for PageCommand {
    fn name(&self) -> &str {
        "/page"
    }

    fn aliases(&self) -> &[&str] {
        &["/p"]
    }

    fn description(&self) -> &str {
        "<n> — jump to page n"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        if args.is_empty() {
            println!("  page {}", info.state.page + 1);
            return CommandResult::Handled;
        }
        match args.parse::<u32>() {
            Ok(n) if n >= 1 => CommandResult::StateChanged(StateChange::Page(n - 1)),
            _ => {
                eprintln!("  ✗ page must be a number from 1 up, not {args}");
                CommandResult::Handled
            }
        }
    }
}

pub struct NextCommand;

#[async_trait]
impl Command for NextCommand {
    fn name(&self) -> &str {
        "/next"
    }

    fn aliases(&self) -> &[&str] {
        &["/n"]
    }

    fn description(&self) -> &str {
        "go to the next page"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        CommandResult::StateChanged(StateChange::Page(info.state.page + 1))
    }
}

pub struct PrevCommand;

#[async_trait]
impl Command for PrevCommand {
    fn name(&self) -> &str {
        "/prev"
    }

    fn description(&self) -> &str {
        "go back one page"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        if info.state.page == 0 {
            println!("  already on the first page");
            return CommandResult::Handled;
        }
        CommandResult::StateChanged(StateChange::Page(info.state.page - 1))
    }
}

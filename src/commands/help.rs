use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

/// Dispatch intercepts `/help` and prints registry-generated text; this
/// type only carries the name, aliases, and description.
pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "/help"
    }

    fn aliases(&self) -> &[&str] {
        &["/h", "/?"]
    }

    fn description(&self) -> &str {
        "show this help"
    }

    async fn execute(&self, _args: &str, _info: &SessionInfo<'_>) -> CommandResult {
        CommandResult::Handled
    }
}

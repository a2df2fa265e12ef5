use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct InfoCommand;

#[async_trait]
impl Command for InfoCommand {
    fn name(&self) -> &str {
        "/info"
    }

    fn aliases(&self) -> &[&str] {
        &["/i"]
    }

    fn description(&self) -> &str {
        "show the current browse state"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        let state = info.state;
        let dataset = state
            .dataset
            .as_ref()
            .map_or("(none)", |ds| ds.name.as_str());
        let filters = if state.filters.is_empty() {
            "(none)"
        } else {
            state.filter_text.as_str()
        };
        println!("  dataset    {dataset}");
        println!("  filters    {filters}");
        println!("  order      {}", state.order);
        println!("  page       {} ({} rows per page)", state.page + 1, state.page_size);
        println!("  database   {}", info.db_path);
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_env;

    #[tokio::test]
    async fn returns_handled() {
        let env = test_env();
        assert!(matches!(
            InfoCommand.execute("", &env.info()).await,
            CommandResult::Handled
        ));
    }
}

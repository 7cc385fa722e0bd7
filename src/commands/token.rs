use clap::Args;

use super::CommandError;
use crate::config::Config;
use crate::platforms;

/// Look for the platform access token in the namespace snapshot
#[derive(Debug, Args)]
pub struct TokenCommand {}

impl TokenCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let locator = platforms::locator(config)?;
        let options = locator.options();
        println!(
            "Searching '{}*' objects for '{}' (timeout {} ms)",
            options.prefix,
            options.key,
            options.timeout.as_millis()
        );

        let credential = locator.locate().await?;
        println!("Found access token: {}", credential.masked());
        Ok(())
    }
}

use clap::{Args, Subcommand, ValueEnum};

use crate::config::{mask, Config, Endpoint};

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("backup_path: {}", config.backup_path.value.display());
                        println!("  source: {}", config.backup_path.source);
                        println!();

                        println!("settings_file: {}", config.settings_file.value.display());
                        println!("  source: {}", config.settings_file.source);
                        println!();

                        print_endpoint("source", &config.source);
                        print_endpoint("destination", &config.destination);

                        println!("discovery:");
                        match &config.discovery.namespace_file {
                            Some(path) => println!("  namespace_file: {}", path.display()),
                            None => println!("  namespace_file: (not set)"),
                        }
                        println!("  prefix: {}", config.discovery.prefix);
                        println!("  key: {}", config.discovery.key);
                        println!("  timeout_ms: {}", config.discovery.timeout_ms);
                        println!();

                        println!("pacing:");
                        println!("  fetch_delay_ms: {}", config.pacing.fetch_delay_ms);
                        println!("  write_delay_ms: {}", config.pacing.write_delay_ms);
                    }
                }
                Ok(())
            }
        }
    }
}

fn print_endpoint(name: &str, endpoint: &Endpoint) {
    println!("{}:", name);
    println!("  platform: {}", endpoint.platform);
    println!("  base_url: {}", endpoint.base_url);
    if let Some(cookie) = &endpoint.session_cookie {
        println!("  session_cookie: {}", mask(cookie));
    }
    if let Some(user) = &endpoint.user_id {
        println!("  user_id: {}", user);
    }
    println!();
}

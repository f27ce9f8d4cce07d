use clap::ArgMatches;
use tracing::info;

use super::helpers::load_config_with_warning;

pub(crate) fn handle_config_command(
    _matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.config_started");

    let config = load_config_with_warning();
    let rendered = toml::to_string_pretty(&config.resolved())?;
    print!("{}", rendered);

    info!(event = "cli.config_completed");
    Ok(())
}

use crate::config::Config;
use crate::error::Result;

/// Print the default configuration as YAML.
pub async fn run_template() -> Result<()> {
    print!("{}", Config::template()?);
    Ok(())
}

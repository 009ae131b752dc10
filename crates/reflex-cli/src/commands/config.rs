//! `reflex config`: print the effective engine options.

use reflex_engine::EngineOptions;

pub fn execute(options: &EngineOptions) -> anyhow::Result<()> {
    options.validate()?;
    print!("{}", options.to_toml_string()?);
    Ok(())
}

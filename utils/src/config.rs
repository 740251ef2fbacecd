use std::env;

const DEFAULT_FILE_NAME: &str = "zap_engine";

/// Loads `{FILE_NAME}.{ENV}.toml` into any deserializable settings struct.
pub fn get_config_from_env<'a, T: 'a>() -> Result<T, config::ConfigError>
where
    T: serde::Deserialize<'a>,
{
    let environment: String = env::var("ENV").unwrap_or_else(|_| "dev".into());
    let file_name: String = env::var("FILE_NAME").unwrap_or_else(|_| DEFAULT_FILE_NAME.into());

    let file_path = format!("{}.{}.toml", file_name, environment);

    let mut configuration = config::Config::default();
    configuration.merge(config::File::with_name(&file_path))?;
    configuration.try_into()
}

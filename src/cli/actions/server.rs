use crate::{
    api,
    cli::actions::Action,
    config::{self, Config},
};
use anyhow::Result;
use tracing::info;

/// Handle the server action: resolve the configuration and run the gateway.
/// # Errors
/// Returns an error if the configuration cannot be loaded or the server
/// fails to start.
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server { config, port } => {
            let path = match config {
                Some(path) => path,
                None => Config::default_path()?,
            };

            info!("Config path \"{}\"", path.display());

            let mut config = Config::load(&path)?;

            if let Some(port) = port {
                config.port = port;
            }

            // The key-value session store lives next to the config file.
            let storage = path.with_file_name(config::STORAGE_FILE);

            api::new(config, &storage).await?;
        }
    }

    Ok(())
}

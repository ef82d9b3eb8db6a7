use std::{fs::File, io, path::PathBuf, sync::Mutex};

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Default icon published by the Spotify web player, fetched once into the
/// cache directory.
const DEFAULT_ICON_URL: &str = "https://open.spotify.com/static/images/icon-48.png";

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Player to watch, as the bus-name segment after "org.mpris.MediaPlayer2."
    /// ("spotify", "vlc", ...). Use "all" to watch every MPRIS player.
    #[clap(long, short, default_value = "spotify")]
    pub player: String,
    /// Directory used to cache fetched album art.
    /// Defaults to `$XDG_CACHE_HOME/mpris-notify`.
    #[clap(long)]
    cache_dir: Option<PathBuf>,
    /// URL the default notification icon is fetched from
    #[clap(long, default_value = DEFAULT_ICON_URL)]
    pub default_icon_url: String,
    /// Notification expiry in milliseconds. -1 uses the daemon default,
    /// 0 never expires.
    #[clap(long, default_value_t = 5000)]
    pub notification_timeout: i32,
    /// Don't grab media keys from the desktop settings daemon
    #[clap(long)]
    pub no_media_keys: bool,
    /// File to write the log to. If not specified, logs will be written to stderr.
    #[clap(long, short)]
    log_file: Option<String>,
}

impl Args {
    /// Resolve the album art cache directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        Ok(dirs::cache_dir()
            .context("No cache directory available, pass --cache-dir explicitly")?
            .join("mpris-notify"))
    }

    /// Build the tracing subscriber using parameters from the command line arguments
    ///
    /// # Panics
    ///
    /// Panics if the log file cannot be opened.
    pub fn init_tracing_subscriber(&self) {
        let builder = tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(EnvFilter::from_default_env());

        match self.log_file.as_ref() {
            None => builder.with_writer(io::stderr).init(),
            Some(f) => builder
                .with_writer(Mutex::new(File::create(f).unwrap()))
                .init(),
        }
    }
}

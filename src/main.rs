use anyhow::Result;
use clap::Parser as _;
use event_loop::event_loop;
use zbus::Connection;

mod args;
mod dbus;
mod event_loop;
mod icon_cache;
mod notifier;
mod player;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = args::Args::parse();
    args.init_tracing_subscriber();

    let mut icons = icon_cache::IconCache::new(args.cache_dir()?, args.default_icon_url.clone())?;
    icons.ensure_default_icon().await;

    let connection = Connection::session().await?;
    let notifier =
        notifier::Notifier::new(&connection, icons, args.notification_timeout).await?;

    event_loop(
        connection,
        args.player.clone(),
        notifier,
        !args.no_media_keys,
    )
    .await
}

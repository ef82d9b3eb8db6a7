mod update_listener;

use std::{collections::HashMap, future::pending, sync::Arc};

use anyhow::{bail, Context as _, Result};
use futures_lite::StreamExt as _;
use tokio::{select, sync::mpsc, task::JoinHandle};
use zbus::{names::OwnedBusName, Connection};

use crate::{
    dbus::{
        media_keys::{MediaKeysProxy, MediaPlayerKeyPressed, MediaPlayerKeyPressedStream},
        player::PlayerProxy,
        player_buses, BusActivity, BusChange,
    },
    notifier::{Notifier, APP_NAME},
    player::{PlayerEvent, PlayerState},
};
use update_listener::spawn_player_listener;

type Players = HashMap<Arc<OwnedBusName>, (PlayerState, JoinHandle<Result<()>>)>;

pub async fn event_loop(
    conn: Connection,
    player_filter: String,
    mut notifier: Notifier,
    enable_media_keys: bool,
) -> Result<()> {
    let mut dbus_stream = player_buses(&conn).await?;

    let (player_update_sender, mut player_update_receiver) = mpsc::channel(16);

    let mut players: Players = HashMap::new();
    let mut last_announced: Option<PlayerEvent> = None;
    let mut media_keys = if enable_media_keys {
        grab_media_keys(&conn).await
    } else {
        None
    };

    loop {
        select! {
            bus_change = dbus_stream.next() => {
                let Some(change) = bus_change else {
                    tracing::error!("DBus NameOwnerChanged stream closed");
                    continue
                };
                if !change.matches_player(&player_filter) {
                    tracing::debug!(bus_name = %change.name, "Ignoring unwatched player");
                    continue
                }
                let bus_name = Arc::new(change.name);
                match change.activity {
                    BusActivity::Created => {
                        tracing::info!(%bus_name, "Player appeared on the bus");
                        let (state, listener) = match spawn_player_listener(Arc::clone(&bus_name), conn.clone(), player_update_sender.clone()).await {
                            Ok(i) => i,
                            Err(e) => {
                                tracing::error!(?e, "Failed to get player information from DBus");
                                continue
                            }
                        };

                        if let Some(event) = state.current_event() {
                            announce_if_new(&mut notifier, &mut last_announced, event).await;
                        }

                        players.insert(bus_name, (state, listener));
                    },
                    BusActivity::Destroyed => {
                        let Some((_, listener)) = players.remove(&bus_name) else {
                            tracing::debug!(%bus_name, "Unknown player left the bus");
                            continue
                        };
                        listener.abort();
                        // Don't tear anything down: the listener stays bound
                        // to the bus and picks the player up when it returns
                        tracing::info!(%bus_name, "Player left the bus, waiting for it to come back");
                    }
                }
            }
            Some((bus_name, player_update)) = player_update_receiver.recv() => {
                tracing::debug!(%bus_name, ?player_update, "Player status updated");
                let Some((state, _)) = players.get_mut(&bus_name) else {
                    tracing::error!("Attempting to update a non-existent player {bus_name}");
                    continue
                };
                state.apply_update(player_update);
                if let Some(event) = state.current_event() {
                    announce_if_new(&mut notifier, &mut last_announced, event).await;
                }
            }
            Some(key) = next_media_key(&mut media_keys) => {
                if let Err(e) = handle_media_key(&key, &players, &conn).await {
                    tracing::warn!(?e, "Failed to forward media key");
                }
            }
            else => { bail!("Player stream closed"); }
        }
    }
}

/// Show a notification for `event` unless it repeats the previous one.
async fn announce_if_new(
    notifier: &mut Notifier,
    last_announced: &mut Option<PlayerEvent>,
    event: PlayerEvent,
) {
    if last_announced.as_ref() == Some(&event) {
        tracing::debug!(?event, "Skipping duplicate event");
        return;
    }
    if let Err(e) = notifier.announce(&event).await {
        tracing::error!(?e, "Failed to display notification");
    }
    *last_announced = Some(event);
}

/// Register for media key broadcasts.
///
/// Returns [`None`] when the settings daemon is unavailable (non-GNOME
/// desktops); track notifications still work without it.
async fn grab_media_keys(conn: &Connection) -> Option<MediaPlayerKeyPressedStream> {
    let proxy = match MediaKeysProxy::new(conn).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(?e, "Media key service unavailable, continuing without media keys");
            return None;
        }
    };
    if let Err(e) = proxy.grab_media_player_keys(APP_NAME, 0).await {
        tracing::warn!(?e, "Failed to grab media player keys, continuing without media keys");
        return None;
    }
    match proxy.receive_media_player_key_pressed().await {
        Ok(stream) => {
            tracing::info!("Listening for media keys");
            Some(stream)
        }
        Err(e) => {
            tracing::warn!(?e, "Failed to listen for media key signal");
            None
        }
    }
}

async fn next_media_key(
    stream: &mut Option<MediaPlayerKeyPressedStream>,
) -> Option<MediaPlayerKeyPressed> {
    match stream {
        Some(s) => match s.next().await {
            Some(key) => Some(key),
            None => {
                tracing::warn!("Media key signal stream closed");
                *stream = None;
                None
            }
        },
        None => pending().await,
    }
}

/// Forward a media key press to the watched player, if one is running.
async fn handle_media_key(
    key: &MediaPlayerKeyPressed,
    players: &Players,
    conn: &Connection,
) -> Result<()> {
    let args = key
        .args()
        .context("Failed to parse MediaPlayerKeyPressed argument")?;
    let Some(bus_name) = players.keys().next() else {
        tracing::debug!(key = %args.key, "Ignoring media key because no player is running");
        return Ok(());
    };
    let player = PlayerProxy::builder(conn)
        .destination(Arc::unwrap_or_clone(Arc::clone(bus_name)))?
        .path("/org/mpris/MediaPlayer2")?
        .build()
        .await
        .context("Failed to create player proxy")?;
    tracing::debug!(key = %args.key, %bus_name, "Forwarding media key");
    match args.key.as_str() {
        "Play" | "Pause" => player.play_pause().await?,
        "Stop" => player.stop().await?,
        "Next" => player.next().await?,
        "Previous" => player.previous().await?,
        other => tracing::debug!(key = other, "Unhandled media key"),
    }
    Ok(())
}

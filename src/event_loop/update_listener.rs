use std::sync::Arc;

use anyhow::{ensure, Result};
use tokio::{
    sync::mpsc,
    task::{spawn, JoinHandle},
};
use tracing::instrument;
use zbus::{names::OwnedBusName, Connection};

use crate::{
    dbus::player::PlayerProxy,
    player::{PlayerState, PlayerUpdate, PlayerUpdateListener},
};

/// Query the initial state of a newly appeared player and spawn a task
/// forwarding its property changes into the event loop channel.
#[instrument(skip_all, fields(player_name))]
pub async fn spawn_player_listener(
    player_name: Arc<OwnedBusName>,
    conn: Connection,
    update_sender: mpsc::Sender<(Arc<OwnedBusName>, PlayerUpdate)>,
) -> Result<(PlayerState, JoinHandle<Result<()>>)> {
    let player = PlayerProxy::builder(&conn)
        .destination(Arc::unwrap_or_clone(Arc::clone(&player_name)))?
        .path("/org/mpris/MediaPlayer2")?
        .build()
        .await?;
    let state = PlayerState::new(&player).await?;
    tracing::debug!(?state);
    let mut listener = PlayerUpdateListener::new(&player).await;

    let listener_thread = spawn(async move {
        loop {
            let update = match listener.update().await {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!(?e, "Failed to parse MPRIS update");
                    continue;
                }
            };
            let result = update_sender.send((Arc::clone(&player_name), update)).await;
            ensure!(result.is_ok(), "Player updates listener closed");
        }
    });

    Ok((state, listener_thread))
}

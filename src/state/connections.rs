use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Clone)]
/// Handle used to push messages to a connected player.
pub struct PlayerConnection {
    /// Routed player.
    pub player_id: Uuid,
    /// Identifies the socket so a stale handler cannot evict a newer one.
    pub connection_id: Uuid,
    /// Writer task input of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Routing table from player id to the player's current socket writer.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, PlayerConnection>,
}

impl ConnectionRegistry {
    /// Route `player_id` to `tx`, replacing any previous connection. Returns the new connection id.
    pub fn register(&self, player_id: Uuid, tx: mpsc::UnboundedSender<Message>) -> Uuid {
        let connection_id = Uuid::new_v4();
        self.connections.insert(
            player_id,
            PlayerConnection {
                player_id,
                connection_id,
                tx,
            },
        );
        connection_id
    }

    /// Remove the route only if it still points at `connection_id`.
    pub fn unregister(&self, player_id: Uuid, connection_id: Uuid) -> bool {
        self.connections
            .remove_if(&player_id, |_, connection| {
                connection.connection_id == connection_id
            })
            .is_some()
    }

    /// Writer channel of the player's current connection.
    pub fn sender(&self, player_id: Uuid) -> Option<mpsc::UnboundedSender<Message>> {
        self.connections
            .get(&player_id)
            .map(|connection| connection.tx.clone())
    }

    /// Number of routed players.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no player is routed.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

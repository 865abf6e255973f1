use crate::models::content::SiteContent;
use tokio::sync::broadcast;

/// Default buffer size for the content-updated channel.
const CHANNEL_CAPACITY: usize = 16;

/// Broadcast channel for content-updated notifications.
///
/// Every successful save publishes the new snapshot; each open view holds a
/// receiver and re-reads the store on receipt. Receivers unsubscribe by
/// being dropped, so subscription lifetime follows component lifetime.
/// Components must still perform an initial load independent of the channel:
/// a receiver only sees snapshots published after it subscribed.
#[derive(Clone)]
pub struct ContentBroadcast {
    sender: broadcast::Sender<SiteContent>,
}

impl ContentBroadcast {
    /// Creates a channel with the default buffer size.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribes to content updates.
    pub fn subscribe(&self) -> broadcast::Receiver<SiteContent> {
        self.sender.subscribe()
    }

    /// Publishes a snapshot to all subscribers.
    ///
    /// Returns the number of receivers notified. Having no subscribers is
    /// not an error: a save with no open views is still a valid save.
    pub fn publish(&self, snapshot: &SiteContent) -> usize {
        match self.sender.send(snapshot.clone()) {
            Ok(count) => {
                tracing::debug!("Content snapshot broadcast to {} subscribers", count);
                count
            }
            Err(_) => 0,
        }
    }
}

impl Default for ContentBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_snapshots() {
        let channel = ContentBroadcast::new();
        let mut rx = channel.subscribe();

        let mut snapshot = SiteContent::default();
        snapshot.phone = "(34) 3251-0000".to_string();

        assert_eq!(channel.publish(&snapshot), 1);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.phone, "(34) 3251-0000");
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let channel = ContentBroadcast::new();
        assert_eq!(channel.publish(&SiteContent::default()), 0);
    }
}

//! Client interface for interacting with the ReconcilerActor.
//!
//! The `ReconcilerHandle` provides a cheap-to-clone interface for sending
//! observations and queries to the reconciler and subscribing to presence
//! events. Channel errors are mapped to `ReconcilerError::ChannelClosed` or
//! to empty defaults; nothing here panics.

use tokio::sync::{broadcast, mpsc, oneshot};

use lanwatch_core::{Device, DeviceKey};

use super::commands::{PresenceEvent, ReconcilerCommand, ReconcilerError};

/// Handle for interacting with the reconciler actor.
///
/// Cheap to clone and share across tasks: the scanner and prober tasks all
/// hold one, as does the report task via `subscribe`.
#[derive(Clone)]
pub struct ReconcilerHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<ReconcilerCommand>,

    /// Event broadcaster for subscribing to updates
    event_sender: broadcast::Sender<PresenceEvent>,
}

impl ReconcilerHandle {
    /// Create a new reconciler handle.
    pub fn new(
        sender: mpsc::Sender<ReconcilerCommand>,
        event_sender: broadcast::Sender<PresenceEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    /// Deliver one completed sweep batch.
    ///
    /// Fire-and-forget: a send failure means the actor is shutting down, in
    /// which case the observations are moot.
    pub async fn scan_batch(&self, devices: Vec<Device>) {
        let _ = self
            .sender
            .send(ReconcilerCommand::ScanBatch { devices })
            .await;
    }

    /// Deliver one completed reachability probe result.
    ///
    /// Fire-and-forget, like `scan_batch`.
    pub async fn probe_result(&self, key: DeviceKey, online: bool) {
        let _ = self
            .sender
            .send(ReconcilerCommand::ProbeResult { key, online })
            .await;
    }

    /// Get the current merged device list.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn get_devices(&self) -> Vec<Device> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(ReconcilerCommand::GetDevices { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Get the current occupancy flag.
    ///
    /// # Errors
    ///
    /// - `ReconcilerError::ChannelClosed` if the actor has shut down
    pub async fn is_occupied(&self) -> Result<bool, ReconcilerError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(ReconcilerCommand::GetOccupancy { respond_to: tx })
            .await
            .map_err(|_| ReconcilerError::ChannelClosed)?;

        rx.await.map_err(|_| ReconcilerError::ChannelClosed)
    }

    /// Subscribe to presence events.
    ///
    /// Returns a broadcast receiver that will receive device-list
    /// publications, occupancy transitions, and command dispatches.
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.event_sender.subscribe()
    }

    /// Check if the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanwatch_core::{Device, DeviceKind};

    fn create_test_handle() -> (ReconcilerHandle, mpsc::Receiver<ReconcilerCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, _event_rx) = broadcast::channel(16);
        let handle = ReconcilerHandle::new(cmd_tx, event_tx);
        (handle, cmd_rx)
    }

    fn test_device(name: &str) -> Device {
        Device {
            mac_address: None,
            ip_address: None,
            name: name.to_string(),
            icon: "question".to_string(),
            kind: DeviceKind::Known,
            online: true,
            last_seen: None,
        }
    }

    #[tokio::test]
    async fn test_scan_batch_sends_command() {
        let (handle, mut rx) = create_test_handle();

        let cmd_handler = tokio::spawn(async move {
            matches!(
                rx.recv().await,
                Some(ReconcilerCommand::ScanBatch { devices }) if devices.len() == 1
            )
        });

        handle.scan_batch(vec![test_device("Alice")]).await;
        assert!(cmd_handler.await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_batch_ignores_closed_channel() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        // Should not panic or error
        handle.scan_batch(Vec::new()).await;
    }

    #[tokio::test]
    async fn test_probe_result_sends_command() {
        let (handle, mut rx) = create_test_handle();

        let cmd_handler = tokio::spawn(async move {
            matches!(
                rx.recv().await,
                Some(ReconcilerCommand::ProbeResult { key: DeviceKey::Name(name), online: true })
                    if name == "Printer"
            )
        });

        handle
            .probe_result(DeviceKey::Name("Printer".to_string()), true)
            .await;
        assert!(cmd_handler.await.unwrap());
    }

    #[tokio::test]
    async fn test_get_devices_returns_empty_on_channel_close() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        assert!(handle.get_devices().await.is_empty());
    }

    #[tokio::test]
    async fn test_is_occupied_channel_closed_error() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        let result = handle.is_occupied().await;
        assert!(matches!(result, Err(ReconcilerError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_subscribe_returns_receiver() {
        let (handle, _rx) = create_test_handle();
        let _subscriber = handle.subscribe();
    }

    #[tokio::test]
    async fn test_is_connected() {
        let (handle, rx) = create_test_handle();
        assert!(handle.is_connected());

        drop(rx);
        handle.scan_batch(Vec::new()).await;
        assert!(!handle.is_connected());
    }
}

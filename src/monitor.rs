//! Cross-thread delivery of device notifications
//!
//! The audio thread must never block on the control thread, so every device
//! holds a [`MonitorHandle`] that only ever `try_send`s into a bounded channel.
//! The control thread drains the [`DeviceMonitor`] at its own pace.

use crate::error::{IoDevError, Result};
use crate::events::IoDevEvent;
use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Receiving end, owned by the control thread.
pub struct DeviceMonitor {
    sender: Sender<IoDevEvent>,
    receiver: Receiver<IoDevEvent>,
}

impl DeviceMonitor {
    pub fn new(queue_depth: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(queue_depth.max(1));
        Self { sender, receiver }
    }

    /// Returns a handle to give to a device.
    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            sender: self.sender.clone(),
        }
    }

    /// Drains every pending event without blocking.
    pub fn poll_events(&self) -> Vec<IoDevEvent> {
        self.receiver.try_iter().collect()
    }

    /// Blocks until the next event arrives.
    pub fn recv(&self) -> Result<IoDevEvent> {
        self.receiver
            .recv()
            .map_err(|e| IoDevError::Monitor(format!("Failed to receive event: {}", e)))
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// Sending end, cloned into devices and ramp completion callbacks.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: Sender<IoDevEvent>,
}

impl MonitorHandle {
    /// Queues an event and returns whether it was queued. A full queue drops
    /// the event, a closed one is an error.
    pub fn notify(&self, event: IoDevEvent) -> Result<bool> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(event)) => {
                log::warn!("Notification queue full, dropping {:?}", event);
                Ok(false)
            }
            Err(TrySendError::Disconnected(event)) => Err(IoDevError::Monitor(format!(
                "Monitor gone, cannot deliver {:?}",
                event
            ))),
        }
    }

    pub fn reset_device(&self, dev_idx: u32) -> Result<bool> {
        self.notify(IoDevEvent::ResetRequested { dev_idx })
    }

    pub fn set_device_mute_state(&self, dev_idx: u32) -> Result<bool> {
        self.notify(IoDevEvent::MuteStateChanged { dev_idx })
    }
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("pending", &self.sender.len())
            .finish()
    }
}

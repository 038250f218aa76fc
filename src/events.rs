//! Notifications raised by devices for the control thread

/// Events a device raises from the audio thread.
///
/// None of these are acted upon in the callback that raises them; they are
/// queued through a [`DeviceMonitor`](crate::monitor::DeviceMonitor) and
/// serviced by whichever thread owns the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoDevEvent {
    /// The device asks to be closed and reopened.
    ResetRequested { dev_idx: u32 },
    /// The device's effective mute state changed and should be republished.
    MuteStateChanged { dev_idx: u32 },
    /// The backend reported an underrun it could not absorb.
    SevereUnderrun { dev_idx: u32, count: u32 },
}

impl IoDevEvent {
    /// Index of the device that raised the event.
    pub fn dev_idx(&self) -> u32 {
        match self {
            Self::ResetRequested { dev_idx }
            | Self::MuteStateChanged { dev_idx }
            | Self::SevereUnderrun { dev_idx, .. } => *dev_idx,
        }
    }
}

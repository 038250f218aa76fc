use super::Device;
use crate::backend::Backend;
use crate::error::Result;
use crate::events::IoDevEvent;

impl<B: Backend> Device<B> {
    /// Asks the control thread to close and reopen the device. Only one
    /// request is outstanding at a time; the next open clears it. A request
    /// dropped by a full queue is not outstanding, so the next call retries.
    pub fn request_reset(&mut self) -> Result<()> {
        if self.reset_request_pending {
            log::debug!("Device {} reset already requested", self.info.idx);
            return Ok(());
        }
        if !self.monitor.reset_device(self.info.idx)? {
            log::warn!("Device {} reset request dropped", self.info.idx);
            return Ok(());
        }
        self.reset_request_pending = true;
        log::info!("Device {} requested reset", self.info.idx);
        Ok(())
    }

    pub fn is_reset_pending(&self) -> bool {
        self.reset_request_pending
    }

    /// Underruns reported by the backend, or counted here if it keeps no count.
    pub fn num_underruns(&self) -> u32 {
        if self.backend.capabilities().num_underruns {
            self.backend.num_underruns().unwrap_or(self.num_underruns)
        } else {
            self.num_underruns
        }
    }

    pub fn num_severe_underruns(&self) -> u32 {
        if self.backend.capabilities().num_severe_underruns {
            self.backend.num_severe_underruns().unwrap_or(0)
        } else {
            0
        }
    }

    /// Escalates any severe underrun the backend reported since the last
    /// check. Returns whether one was found.
    pub fn check_severe_underruns(&mut self) -> Result<bool> {
        let count = self.num_severe_underruns();
        if count <= self.last_severe_underruns {
            return Ok(false);
        }
        self.last_severe_underruns = count;
        log::error!(
            "Device {} severe underrun, {} so far",
            self.info.idx,
            count
        );
        self.notify(IoDevEvent::SevereUnderrun {
            dev_idx: self.info.idx,
            count,
        });
        self.request_reset()?;
        Ok(true)
    }

    /// Recovers an output device that ran dry: the backend's own handler if
    /// it has one, otherwise a callback's worth of silence. Recovery runs even
    /// when a severe underrun cannot be escalated.
    pub fn output_underrun(&mut self) -> Result<()> {
        self.num_underruns += 1;
        log::warn!(
            "Device {} underrun, {} so far",
            self.info.idx,
            self.num_underruns
        );
        if let Err(e) = self.check_severe_underruns() {
            log::error!(
                "Device {} could not escalate severe underrun: {}",
                self.info.idx,
                e
            );
        }

        if self.backend.capabilities().output_underrun {
            self.backend.output_underrun()
        } else {
            self.fill_odev_zeros(self.min_cb_level)
        }
    }
}

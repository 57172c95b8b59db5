//! Bus Sources

use crate::error::BusError;
use crate::frame::RawFrame;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::info;

/// Blocking source of raw bus frames
pub trait BusSource {
    /// Block until the next frame arrives (or the source's timeout expires)
    fn read_frame(&mut self) -> Result<RawFrame, BusError>;
}

impl<S: BusSource + ?Sized> BusSource for Box<S> {
    fn read_frame(&mut self) -> Result<RawFrame, BusError> {
        (**self).read_frame()
    }
}

/// Throttle pedal position (first byte flips 42/43)
const THROTTLE_ID: u16 = 0x001;
/// Brake pressure (first byte flips 30/35)
const BRAKE_ID: u16 = 0x003;
/// Engine RPM (little-endian u16 in bytes 0-1)
const RPM_ID: u16 = 0x005;

/// Default tick of the simulated bus
pub const DEFAULT_SIM_INTERVAL: Duration = Duration::from_millis(100);

/// Synthetic bus for bench runs without CAN hardware.
///
/// Every tick emits a throttle, a brake and an RPM frame, in that order.
pub struct SimulatedBus {
    interval: Duration,
    next_tick: Instant,
    pending: VecDeque<RawFrame>,
    ticks_left: Option<u64>,
    throttle: u8,
    brake: u8,
    rpm: u16,
}

impl SimulatedBus {
    /// Create a simulated bus ticking at `interval`
    pub fn new(interval: Duration) -> Self {
        info!("Creating simulated CAN bus ({:?} tick)", interval);
        Self {
            interval,
            next_tick: Instant::now(),
            pending: VecDeque::with_capacity(3),
            ticks_left: None,
            throttle: 42,
            brake: 30,
            rpm: 1000,
        }
    }

    /// Stop with `BusError::Closed` after `ticks` ticks
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks_left = Some(ticks);
        self
    }

    fn tick(&mut self) {
        self.throttle = if self.throttle == 42 { 43 } else { 42 };
        self.brake = if self.brake == 30 { 35 } else { 30 };
        self.rpm = self.rpm.wrapping_add(1);

        let mut throttle = [0u8; 8];
        throttle[0] = self.throttle;
        let mut brake = [0u8; 8];
        brake[0] = self.brake;
        let mut rpm = [0u8; 8];
        rpm[..2].copy_from_slice(&self.rpm.to_le_bytes());

        self.pending.push_back(RawFrame::standard(THROTTLE_ID, &throttle));
        self.pending.push_back(RawFrame::standard(BRAKE_ID, &brake));
        self.pending.push_back(RawFrame::standard(RPM_ID, &rpm));
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new(DEFAULT_SIM_INTERVAL)
    }
}

impl BusSource for SimulatedBus {
    fn read_frame(&mut self) -> Result<RawFrame, BusError> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(frame);
        }

        match self.ticks_left {
            Some(0) => return Err(BusError::Closed),
            Some(ref mut n) => *n -= 1,
            None => {}
        }

        let now = Instant::now();
        if self.next_tick > now {
            std::thread::sleep(self.next_tick - now);
        }
        self.next_tick += self.interval;

        self.tick();
        self.pending.pop_front().ok_or(BusError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_tick_order() {
        let mut bus = SimulatedBus::new(Duration::from_millis(1)).with_ticks(1);

        let throttle = bus.read_frame().unwrap();
        let brake = bus.read_frame().unwrap();
        let rpm = bus.read_frame().unwrap();

        assert_eq!(throttle.raw_id(), 1);
        assert_eq!(throttle.data[0], 43);
        assert_eq!(brake.raw_id(), 3);
        assert_eq!(brake.data[0], 35);
        assert_eq!(rpm.raw_id(), 5);
        assert_eq!(u16::from_le_bytes([rpm.data[0], rpm.data[1]]), 1001);
        assert_eq!(rpm.len, 8);

        assert!(matches!(bus.read_frame(), Err(BusError::Closed)));
    }

    #[test]
    fn test_simulated_values_alternate() {
        let mut bus = SimulatedBus::new(Duration::from_millis(1)).with_ticks(2);
        let first: Vec<_> = (0..3).map(|_| bus.read_frame().unwrap()).collect();
        let second: Vec<_> = (0..3).map(|_| bus.read_frame().unwrap()).collect();

        assert_eq!(first[0].data[0], 43);
        assert_eq!(second[0].data[0], 42);
        assert_eq!(first[1].data[0], 35);
        assert_eq!(second[1].data[0], 30);
    }
}

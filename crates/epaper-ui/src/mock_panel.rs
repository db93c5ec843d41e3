//! In-memory SSD1681 stand-in for tests and host-side runs.
//!
//! [`MockPanel`] records the command stream, models both RAM planes and
//! lets tests script the BUSY line. [`SimTime`] is a fake clock that only
//! moves when something delays on it, so busy timeouts run instantly.

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell};

use embedded_hal::delay::DelayNs;

use crate::clock::Clock;
use ssd1681::command::*;
use crate::eink::DisplayInterface;

/// Errors reported by [`MockPanel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockPanelError {
    /// BUSY stayed high through a blocking wait
    Timeout,
}

/// Recorded traffic and modelled controller state
#[derive(Debug)]
pub struct PanelState {
    /// Every command byte, in order
    pub commands: Vec<u8>,
    /// Data chunks tagged with the command they followed
    pub command_data: Vec<(u8, Vec<u8>)>,
    /// Control-2 value of every master activation
    pub activations: Vec<u8>,
    /// Hardware resets performed
    pub resets: u32,
    /// BW RAM (next image)
    pub bw_ram: Vec<u8>,
    /// RED RAM (previous image)
    pub red_ram: Vec<u8>,
    stride: usize,
    last_command: Option<u8>,
    params: Vec<u8>,
    ctrl2: u8,
    x_range: (usize, usize),
    cursor: (usize, usize),
    busy_polls_left: u32,
    busy_polls_per_refresh: u32,
    stuck_busy: bool,
}

impl PanelState {
    /// Activations that ran the full-refresh waveform
    pub fn full_refreshes(&self) -> usize {
        self.count_sequence(0x34)
    }

    /// Activations that ran the partial (mode 2) waveform
    pub fn partial_refreshes(&self) -> usize {
        self.count_sequence(0x3C)
    }

    fn count_sequence(&self, sequence: u8) -> usize {
        self.activations
            .iter()
            .filter(|value| *value & 0x3C == sequence)
            .count()
    }

    fn write_ram(&mut self, byte: u8) {
        let (x, y) = self.cursor;
        let index = y * self.stride + x;
        let plane = match self.last_command {
            Some(WRITE_RAM_RED) => &mut self.red_ram,
            _ => &mut self.bw_ram,
        };
        if let Some(slot) = plane.get_mut(index) {
            *slot = byte;
        }
        if x >= self.x_range.1 {
            self.cursor = (self.x_range.0, y + 1);
        } else {
            self.cursor = (x + 1, y);
        }
    }

    fn apply_params(&mut self, command: u8) {
        let p = &self.params;
        match command {
            SET_RAM_X_RANGE if p.len() >= 2 => self.x_range = (p[0] as usize, p[1] as usize),
            SET_RAM_X_COUNTER if !p.is_empty() => self.cursor.0 = p[0] as usize,
            SET_RAM_Y_COUNTER if p.len() >= 2 => {
                self.cursor.1 = p[0] as usize | (p[1] as usize) << 8;
            }
            DISPLAY_UPDATE_CTRL2 if !p.is_empty() => self.ctrl2 = p[0],
            AUTO_WRITE_BW_RAM if p.first() == Some(&AUTO_WRITE_WHITE) => self.bw_ram.fill(0xFF),
            AUTO_WRITE_RED_RAM if p.first() == Some(&AUTO_WRITE_WHITE) => {
                self.red_ram.fill(0xFF);
            }
            _ => {}
        }
    }
}

/// Mock [`DisplayInterface`] sharing its state with every clone
#[derive(Clone, Debug)]
pub struct MockPanel {
    state: Rc<RefCell<PanelState>>,
}

impl MockPanel {
    /// Panel of `rows` x `cols` pixels with RAM full of noise
    pub fn new(rows: u16, cols: u16) -> Self {
        let stride = cols as usize / 8;
        let size = stride * rows as usize;
        Self {
            state: Rc::new(RefCell::new(PanelState {
                commands: Vec::new(),
                command_data: Vec::new(),
                activations: Vec::new(),
                resets: 0,
                bw_ram: vec![0x5A; size],
                red_ram: vec![0x5A; size],
                stride,
                last_command: None,
                params: Vec::new(),
                ctrl2: 0,
                x_range: (0, stride.saturating_sub(1)),
                cursor: (0, 0),
                busy_polls_left: 0,
                busy_polls_per_refresh: 0,
                stuck_busy: false,
            })),
        }
    }

    /// BUSY reads high this many times after each activation
    pub fn with_busy_polls(self, polls: u32) -> Self {
        self.state.borrow_mut().busy_polls_per_refresh = polls;
        self
    }

    /// Keep BUSY asserted forever (or release it again)
    pub fn set_stuck_busy(&self, stuck: bool) {
        self.state.borrow_mut().stuck_busy = stuck;
    }

    /// Borrow the recorded state
    pub fn state(&self) -> Ref<'_, PanelState> {
        self.state.borrow()
    }

    /// Forget recorded commands, keeping RAM contents
    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.commands.clear();
        state.command_data.clear();
        state.activations.clear();
    }
}

impl DisplayInterface for MockPanel {
    type Error = MockPanelError;

    fn send_command(&mut self, command: u8) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.commands.push(command);
        state.last_command = Some(command);
        state.params.clear();
        if command == MASTER_ACTIVATION {
            let ctrl2 = state.ctrl2;
            state.activations.push(ctrl2);
            state.busy_polls_left = state.busy_polls_per_refresh;
        }
        Ok(())
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        let Some(command) = state.last_command else {
            return Ok(());
        };
        state.command_data.push((command, data.to_vec()));
        match command {
            WRITE_RAM_BW | WRITE_RAM_RED => data.iter().for_each(|byte| state.write_ram(*byte)),
            _ => {
                state.params.extend_from_slice(data);
                state.apply_params(command);
            }
        }
        Ok(())
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) {
        self.state.borrow_mut().resets += 1;
        delay.delay_ms(20);
    }

    fn is_busy(&mut self) -> Result<bool, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.stuck_busy {
            return Ok(true);
        }
        if state.busy_polls_left > 0 {
            state.busy_polls_left -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn busy_wait<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.stuck_busy {
            return Err(MockPanelError::Timeout);
        }
        delay.delay_ms(state.busy_polls_left);
        state.busy_polls_left = 0;
        Ok(())
    }
}

/// Fake monotonic time, advanced only by delays
///
/// Clones share one timeline, so the same instance can serve as both the
/// coordinator's [`Clock`] and its [`DelayNs`].
#[derive(Clone, Debug, Default)]
pub struct SimTime {
    now_ns: Rc<Cell<u64>>,
}

impl SimTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without delaying
    pub fn advance_ms(&self, ms: u64) {
        self.now_ns.set(self.now_ns.get() + ms * 1_000_000);
    }
}

impl Clock for SimTime {
    fn now_ms(&self) -> u64 {
        self.now_ns.get() / 1_000_000
    }
}

impl DelayNs for SimTime {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(ns));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_writes_land_in_ram() {
        let mut panel = MockPanel::new(200, 200);
        panel.send_command(SET_RAM_X_RANGE).unwrap();
        panel.send_data(&[2, 3]).unwrap();
        panel.send_command(SET_RAM_X_COUNTER).unwrap();
        panel.send_data(&[2]).unwrap();
        panel.send_command(SET_RAM_Y_COUNTER).unwrap();
        panel.send_data(&[10, 0]).unwrap();
        panel.send_command(WRITE_RAM_BW).unwrap();
        panel.send_data(&[0x11, 0x22]).unwrap();
        panel.send_data(&[0x33, 0x44]).unwrap();

        let state = panel.state();
        assert_eq!(&state.bw_ram[10 * 25 + 2..10 * 25 + 4], &[0x11, 0x22]);
        assert_eq!(&state.bw_ram[11 * 25 + 2..11 * 25 + 4], &[0x33, 0x44]);
        assert_eq!(state.red_ram[10 * 25 + 2], 0x5A);
    }

    #[test]
    fn busy_follows_activation() {
        let mut panel = MockPanel::new(200, 200).with_busy_polls(2);
        assert_eq!(panel.is_busy(), Ok(false));
        panel.send_command(MASTER_ACTIVATION).unwrap();
        assert_eq!(panel.is_busy(), Ok(true));
        assert_eq!(panel.is_busy(), Ok(true));
        assert_eq!(panel.is_busy(), Ok(false));
    }

    #[test]
    fn stuck_busy_times_out_blocking_wait() {
        let mut panel = MockPanel::new(200, 200);
        let mut time = SimTime::new();
        panel.set_stuck_busy(true);
        assert_eq!(panel.busy_wait(&mut time), Err(MockPanelError::Timeout));
        panel.set_stuck_busy(false);
        assert_eq!(panel.busy_wait(&mut time), Ok(()));
    }

    #[test]
    fn sim_time_shares_one_timeline() {
        let time = SimTime::new();
        let mut delay = time.clone();
        delay.delay_ms(7);
        time.advance_ms(3);
        assert_eq!(time.now_ms(), 10);
    }
}

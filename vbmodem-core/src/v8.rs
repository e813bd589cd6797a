//! V.8 call-negotiation handler (C7): ANSam tone generation/detection plus
//! the CI/CM/JM/CJ handshake state machine that selects the line
//! modulation before the chosen data pump takes over.
//!
//! Ported state-for-state from the source's `V8_process` switch, with the
//! two parallel `switch(s->state)` blocks (modulate, then demodulate, then
//! advance) kept as three matching match arms on one `V8Phase` rather than
//! three separate enums, since exactly one phase is ever active per call.

use crate::clock::{Clock, Timer};
use crate::config::modulation_mask;
use crate::dsp::primitives::{cos_q14, COS_BASE, COS_BITS, PHASE_BASE};
use crate::fifo::BitFifo;
use crate::fsk::{FskDemodulator, FskModulator};
use crate::v21_v23::v21_params;

const V8_SAMPLE_RATE: i32 = 8000;
const V8_N: usize = 200;
const DFT_COEF_2100: usize = ((2100.0 / V8_SAMPLE_RATE as f64 * V8_N as f64) + 0.5) as usize;

const V8_TEN_ONES: u32 = 0x3ff;
const V8_CI_SYNC: u32 = 0x001;
const V8_CM_SYNC: u32 = 0x00f;

const V8_CALL_FUNC_DATA: u8 = 0x83;
const V8_MODN0: u8 = 0xA0;
const V8_EXT: u8 = 0x08;
const V8_MODN0_V90: u8 = 0x04;
const V8_MODN0_V34: u8 = 0x02;
const V8_MODN2_V21: u8 = 0x01;
const V8_MODN2_V23: u8 = 0x20;

const V8_MAX_CI_SEQ: u32 = 10;
const V8_TE_MS: u64 = 800;

/// ANSam tone generator: 2100 Hz carrier, 15 Hz amplitude modulation
/// between 0.8 and 1.2 of full scale, phase-reversed every 450 ms.
#[derive(Debug, Clone)]
struct AnsamModulator {
    phase: i32,
    phase_incr: i32,
    mod_phase: i32,
    mod_phase_incr: i32,
    phase_reverse_samples: i32,
    phase_reverse_left: i32,
    amp: i32,
}

impl AnsamModulator {
    fn new(tone_level_db: f64) -> Self {
        Self {
            phase: 0,
            phase_incr: (PHASE_BASE as f64 * 2100.0 / V8_SAMPLE_RATE as f64) as i32,
            mod_phase: 0,
            mod_phase_incr: (PHASE_BASE as f64 * 15.0 / V8_SAMPLE_RATE as f64) as i32,
            phase_reverse_samples: (V8_SAMPLE_RATE as f64 * 0.450) as i32,
            phase_reverse_left: 0,
            amp: (10f64.powf(tone_level_db / 20.0) * 32768.0) as i32,
        }
    }

    fn generate(&mut self, samples: &mut [i16]) {
        for s in samples.iter_mut() {
            if self.phase_reverse_left == 0 {
                self.phase_reverse_left = self.phase_reverse_samples;
                self.phase = self.phase.wrapping_add(PHASE_BASE / 2);
            }
            self.phase_reverse_left -= 1;

            let mut amp = (cos_q14(self.mod_phase) * ((0.2 * COS_BASE as f64) as i32)) >> COS_BITS;
            amp += COS_BASE;
            let v = (amp * cos_q14(self.phase)) >> COS_BITS;
            *s = v.clamp(i16::MIN as i32, i16::MAX as i32) as i16;

            self.mod_phase = self.mod_phase.wrapping_add(self.mod_phase_incr);
            self.phase = self.phase.wrapping_add(self.phase_incr);
        }
        let _ = self.amp; // XXX: tone_level is never applied to the sample (see source)
    }
}

/// ANSam tone detector: block-wise energy + single-bin DFT magnitude
/// threshold at 2100 Hz.
#[derive(Debug, Clone)]
struct AnsamDemodulator {
    cos_tab: Vec<i16>,
    sin_tab: Vec<i16>,
    buf: Vec<i16>,
    buf_ptr: usize,
    detected: bool,
}

impl AnsamDemodulator {
    fn new() -> Self {
        let (cos_tab, sin_tab) = crate::dsp::primitives::goertzel_tables(V8_N);
        Self {
            cos_tab,
            sin_tab,
            buf: vec![0i16; V8_N],
            buf_ptr: 0,
            detected: false,
        }
    }

    fn process(&mut self, samples: &[i16]) {
        for &sample in samples {
            self.buf[self.buf_ptr] = sample;
            self.buf_ptr += 1;
            if self.buf_ptr >= V8_N {
                self.buf_ptr = 0;
                let scaled: Vec<i16> = self.buf.iter().map(|&v| v >> 8).collect();
                let p0: i64 = scaled.iter().map(|&v| (v as i64) * (v as i64)).sum();
                let p1 = crate::dsp::primitives::goertzel_power(
                    &self.cos_tab,
                    &self.sin_tab,
                    &scaled,
                    DFT_COEF_2100,
                    V8_N,
                );
                if p0 > 1000 && p1 > 5 * p0 {
                    self.detected = true;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitOneSecond,
    Ci,
    CiSend,
    CiOff,
    GotAnsam,
    CmSend,
    CjSend,
    Sigc,

    Wait,
    CmWait,
    JmSend,
    Siga,
}

/// Outcome of one `process()` call: either negotiation is still running,
/// it selected a modulation to hand off to, or it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V8Outcome {
    Pending,
    Selected(u32),
    Hangup,
}

/// V.8 negotiator. Owns the V.21 FSK pair used for CI/CM/JM/CJ exchange
/// and the ANSam tone codec used before CM is heard.
pub struct V8Negotiator {
    calling: bool,
    state: State,
    modulation_mask: u32,

    start_timer: Timer,
    ci_timer: Timer,
    connect_timer: Timer,
    ci_count: u32,

    v21_tx: FskModulator,
    v21_rx: FskDemodulator,
    tx_fifo: BitFifo,

    ansam_tx: AnsamModulator,
    ansam_rx: AnsamDemodulator,

    bit_buf: u32,
    bit_sync: u32,
    bit_cnt: u32,
    data_state: u32,
    rx_data: Vec<u8>,

    cm_data: Vec<u8>,
    got_cm: bool,
    decoded_modulations: u32,

    got_cj: bool,
    data_zero_count: u32,

    selected_mod_mask: u32,
    selected_modulation: u32,
}

impl V8Negotiator {
    pub fn new(calling: bool, mod_mask: u32, now: &Clock) -> Self {
        let mut start_timer = Timer::new();
        let mut connect_timer = Timer::new();
        let state = if calling {
            start_timer.set_ms(now, 1000);
            State::WaitOneSecond
        } else {
            connect_timer.set_ms(now, 200);
            State::Wait
        };

        Self {
            calling,
            state,
            modulation_mask: mod_mask,
            start_timer,
            ci_timer: Timer::new(),
            connect_timer,
            ci_count: 0,
            v21_tx: FskModulator::new(v21_params(true)),
            v21_rx: FskDemodulator::new(v21_params(false)),
            tx_fifo: BitFifo::new(4096),
            ansam_tx: AnsamModulator::new(-3.0),
            ansam_rx: AnsamDemodulator::new(),
            bit_buf: 0,
            bit_sync: 0,
            bit_cnt: 0,
            data_state: 0,
            rx_data: Vec::new(),
            cm_data: Vec::new(),
            got_cm: false,
            decoded_modulations: 0,
            got_cj: false,
            data_zero_count: 0,
            selected_mod_mask: 0,
            selected_modulation: 0,
        }
    }

    fn v8_put_byte(&mut self, data: u8) {
        self.tx_fifo.put_bits(((data as u32) << 1) | 1, 10);
    }

    fn cm_send(&mut self, mod_mask: u32) {
        self.tx_fifo.put_bits(V8_TEN_ONES, 10);
        self.tx_fifo.put_bits(V8_CM_SYNC, 10);
        self.v8_put_byte(V8_CALL_FUNC_DATA);

        let mut val = V8_MODN0;
        if mod_mask & modulation_mask::V90 != 0 {
            val |= V8_MODN0_V90;
        }
        if mod_mask & modulation_mask::V34 != 0 {
            val |= V8_MODN0_V34;
        }
        self.v8_put_byte(val);
        self.v8_put_byte(V8_EXT);

        let mut val2 = V8_EXT;
        if mod_mask & modulation_mask::V23 != 0 {
            val2 |= V8_MODN2_V23;
        }
        if mod_mask & modulation_mask::V21 != 0 {
            val2 |= V8_MODN2_V21;
        }
        self.v8_put_byte(val2);
    }

    fn select_modulation(mask: u32) -> u32 {
        let mut val = modulation_mask::HANGUP;
        if mask & modulation_mask::V21 != 0 {
            val = modulation_mask::V21;
        }
        if mask & modulation_mask::V23 != 0 {
            val = modulation_mask::V23;
        }
        if mask & modulation_mask::V34 != 0 {
            val = modulation_mask::V34;
        }
        if mask & modulation_mask::V90 != 0 {
            val = modulation_mask::V90;
        }
        val
    }

    fn cm_decode(&mut self) {
        if self.got_cm {
            return;
        }
        if !self.cm_data.is_empty() && self.cm_data == self.rx_data {
            self.got_cm = true;
            self.decoded_modulations = 0;

            let p = &self.rx_data;
            if p.len() < 4 {
                return;
            }
            if (p[0] & 0xf8) != 0x80 || p[0] != V8_CALL_FUNC_DATA {
                return;
            }
            if (p[1] & 0xf8) != V8_MODN0 {
                return;
            }
            if p[1] & V8_MODN0_V90 != 0 {
                self.decoded_modulations |= modulation_mask::V90;
            }
            if p[1] & V8_MODN0_V34 != 0 {
                self.decoded_modulations |= modulation_mask::V34;
            }

            if (p[2] & 0x1c) == V8_EXT {
                if let Some(&c3) = p.get(3) {
                    if (c3 & 0x1c) == V8_EXT {
                        if c3 & V8_MODN2_V23 != 0 {
                            self.decoded_modulations |= modulation_mask::V23;
                        }
                        if c3 & V8_MODN2_V21 != 0 {
                            self.decoded_modulations |= modulation_mask::V21;
                        }
                    }
                }
            }
            return;
        }
        self.cm_data = self.rx_data.clone();
    }

    fn on_rx_bit(&mut self, bit: u8) {
        self.bit_sync = ((self.bit_sync << 1) | bit as u32) & ((1 << 20) - 1);
        if self.bit_sync == ((V8_TEN_ONES << 10) | V8_CI_SYNC) {
            self.sync_found();
            self.data_state = 1; // CI_SYNC marker
            self.bit_buf = 0;
            self.bit_cnt = 0;
            self.rx_data.clear();
        } else if self.bit_sync == ((V8_TEN_ONES << 10) | V8_CM_SYNC) {
            self.sync_found();
            self.data_state = 2; // CM_SYNC marker
            self.bit_buf = 0;
            self.bit_cnt = 0;
            self.rx_data.clear();
        }

        if self.data_state != 0 {
            self.bit_buf = ((self.bit_buf << 1) | bit as u32) & ((1 << 10) - 1);
            self.bit_cnt += 1;
            if (self.bit_buf & 0x201) == 0x001 && self.bit_cnt >= 10 {
                let data = ((self.bit_buf >> 1) & 0xff) as u8;
                if data == 0 {
                    self.data_zero_count += 1;
                    if self.data_zero_count == 3 {
                        self.got_cj = true;
                    }
                } else {
                    self.data_zero_count = 0;
                }
                if self.rx_data.len() < 63 {
                    self.rx_data.push(data);
                }
                self.bit_cnt = 0;
            }
        }
    }

    /// Dispatch the previous sync-delimited sequence to its decoder before
    /// the new one begins accumulating, matching `data_init:` in the
    /// source's `put_bit`.
    fn sync_found(&mut self) {
        match self.data_state {
            1 => { /* CI: no actionable content beyond the call-function byte */ }
            2 => self.cm_decode(),
            _ => {}
        }
    }

    /// Advance one block of `nb_samples`. `input` is the received line
    /// signal; `output` receives this block's transmit signal.
    pub fn process(&mut self, now: &Clock, input: &[i16], output: &mut [i16]) -> V8Outcome {
        let nb_samples = input.len();
        debug_assert_eq!(output.len(), nb_samples);

        match self.state {
            State::CiSend | State::CmSend | State::JmSend | State::CjSend => {
                let fifo = &mut self.tx_fifo;
                self.v21_tx.generate(output, || fifo.get_bit().unwrap_or(1));
            }
            State::CmWait => {
                self.ansam_tx.generate(output);
            }
            _ => {
                output.fill(0);
            }
        }

        match self.state {
            State::Ci | State::CiOff | State::CiSend => {
                self.ansam_rx.process(input);
            }
            State::CmWait | State::CmSend | State::JmSend => {
                let mut bits = Vec::new();
                self.v21_rx.process(input, |b| bits.push(b));
                for b in bits {
                    self.on_rx_bit(b);
                }
            }
            _ => {}
        }

        let mut ret = V8Outcome::Pending;

        match self.state {
            State::WaitOneSecond => {
                if self.start_timer.expired(now) {
                    self.state = State::Ci;
                    self.ci_count = 0;
                    self.ansam_rx = AnsamDemodulator::new();
                    self.v21_tx = FskModulator::new(v21_params(true));
                }
            }
            State::Ci => {
                for _ in 0..4 {
                    self.tx_fifo.put_bits(V8_TEN_ONES, 10);
                    self.tx_fifo.put_bits(V8_CI_SYNC, 10);
                    self.v8_put_byte(V8_CALL_FUNC_DATA);
                }
                self.state = State::CiSend;
            }
            State::CiSend => {
                if self.tx_fifo.is_empty() {
                    self.state = State::CiOff;
                    self.ci_timer.set_ms(now, 500);
                }
            }
            State::CiOff => {
                if self.ansam_rx.detected {
                    self.ci_timer.set_ms(now, V8_TE_MS);
                    self.state = State::GotAnsam;
                } else if self.ci_timer.expired(now) {
                    self.ci_count += 1;
                    if self.ci_count == V8_MAX_CI_SEQ {
                        ret = V8Outcome::Hangup;
                    } else {
                        self.state = State::Ci;
                    }
                }
            }
            State::GotAnsam => {
                if self.ci_timer.expired(now) {
                    self.reset_decode();
                    self.state = State::CmSend;
                }
            }
            State::CmSend => {
                if self.got_cm {
                    self.selected_mod_mask = self.modulation_mask & self.decoded_modulations;
                    self.selected_modulation = Self::select_modulation(self.selected_mod_mask);
                    self.tx_fifo.flush();
                    for _ in 0..9 {
                        self.v8_put_byte(0);
                    }
                    self.state = State::CjSend;
                } else if self.tx_fifo.is_empty() {
                    self.cm_send(self.modulation_mask);
                }
            }
            State::CjSend => {
                if self.tx_fifo.is_empty() {
                    self.start_timer.set_ms(now, 75);
                    self.state = State::Sigc;
                }
            }
            State::Sigc => {
                if self.start_timer.expired(now) {
                    ret = V8Outcome::Selected(self.selected_modulation);
                }
            }

            State::Wait => {
                if self.connect_timer.expired(now) {
                    self.ansam_tx = AnsamModulator::new(-3.0);
                    self.reset_decode();
                    self.connect_timer.set_ms(now, 5000);
                    self.state = State::CmWait;
                }
            }
            State::CmWait => {
                if self.connect_timer.expired(now) {
                    ret = V8Outcome::Hangup;
                } else if self.got_cm {
                    self.v21_tx = FskModulator::new(v21_params(false));
                    self.connect_timer.set_ms(now, 5000);
                    self.state = State::JmSend;
                    self.selected_mod_mask = self.modulation_mask & self.decoded_modulations;
                    self.selected_modulation = Self::select_modulation(self.selected_mod_mask);
                }
            }
            State::JmSend => {
                if self.connect_timer.expired(now) {
                    ret = V8Outcome::Hangup;
                } else if self.got_cj {
                    self.connect_timer.set_ms(now, 75);
                    self.state = State::Siga;
                } else if self.tx_fifo.is_empty() {
                    self.cm_send(self.selected_mod_mask);
                }
            }
            State::Siga => {
                if self.connect_timer.expired(now) {
                    ret = V8Outcome::Selected(self.selected_modulation);
                }
            }
        }

        ret
    }

    fn reset_decode(&mut self) {
        self.data_state = 0;
        self.bit_sync = 0;
        self.cm_data.clear();
        self.got_cm = false;
        self.got_cj = false;
        self.data_zero_count = 0;
        self.rx_data.clear();
    }

    pub fn is_calling(&self) -> bool {
        self.calling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calling_side_starts_in_wait_one_second() {
        let clock = Clock::new();
        let negotiator = V8Negotiator::new(true, modulation_mask::V34, &clock);
        assert_eq!(negotiator.state, State::WaitOneSecond);
    }

    #[test]
    fn answering_side_starts_in_wait() {
        let clock = Clock::new();
        let negotiator = V8Negotiator::new(false, modulation_mask::V34, &clock);
        assert_eq!(negotiator.state, State::Wait);
    }

    #[test]
    fn select_modulation_prefers_higher_speed_when_available() {
        let mask = modulation_mask::V21 | modulation_mask::V23 | modulation_mask::V34;
        assert_eq!(V8Negotiator::select_modulation(mask), modulation_mask::V34);
    }

    #[test]
    fn select_modulation_hangup_when_nothing_common() {
        assert_eq!(V8Negotiator::select_modulation(0), modulation_mask::HANGUP);
    }

    /// Driving the calling side through its timers without any received
    /// signal eventually reaches CI transmission.
    #[test]
    fn calling_side_reaches_ci_after_one_second() {
        let mut clock = Clock::new();
        let mut negotiator = V8Negotiator::new(true, modulation_mask::V34, &clock);
        let input = vec![0i16; 40];
        let mut output = vec![0i16; 40];

        for _ in 0..30 {
            negotiator.process(&clock, &input, &mut output);
            clock.advance(40);
        }
        assert_eq!(negotiator.state, State::CiSend);
    }
}

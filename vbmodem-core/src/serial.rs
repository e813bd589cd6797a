//! Asynchronous-serial start/stop framing between a data pump and the
//! session's byte FIFOs (C2).
//!
//! Word on the wire, LSB first: `start(0) | data_bits | [parity] | stop(1)`.
//! The source passes a `void *opaque` pointing at the whole `sm_state` into
//! free `serial_get_bit`/`serial_put_bit` functions; we re-express that as
//! a small struct that owns its own bit accumulators and is handed
//! `&mut BitFifo` explicitly, which is the natural seam between a pump and
//! the framing layer called out in the design notes.

use crate::config::SerialConfig;
use crate::fifo::BitFifo;

/// Async-serial encoder/decoder state. One instance serializes exactly one
/// direction's word accumulator; a pump typically keeps one for TX and one
/// for RX sharing the same `SerialConfig`.
#[derive(Debug, Clone)]
pub struct AsyncSerial {
    config: SerialConfig,

    // RX accumulator
    rx_buf: u32,
    rx_cnt: u32,

    // TX accumulator
    tx_buf: u32,
    tx_cnt: u32,
}

impl AsyncSerial {
    pub fn new(config: SerialConfig) -> Self {
        assert!(
            (5..=8).contains(&config.data_bits),
            "data_bits must be in 5..=8"
        );
        Self {
            config,
            rx_buf: 0,
            rx_cnt: 0,
            tx_buf: 0,
            tx_cnt: 0,
        }
    }

    fn wordsize(&self) -> u32 {
        self.config.wordsize() as u32
    }

    fn parity_bit(&self) -> u32 {
        matches!(self.config.parity, crate::config::Parity::Odd) as u32
    }

    /// Pull one bit for the data pump to transmit. Emits idle `1`s when
    /// `tx_fifo` has no data byte queued.
    pub fn get_bit(&mut self, tx_fifo: &mut BitFifo) -> u8 {
        if self.tx_cnt == 0 {
            let data = match tx_fifo.get_byte() {
                Some(d) => d as u32,
                None => return 1,
            };
            self.tx_cnt = self.wordsize();
            self.tx_buf = if self.config.use_parity() {
                let mut p = self.parity_bit();
                for j in 0..self.config.data_bits {
                    p ^= (data >> j) & 1;
                }
                (data << 2) | (p << 1) | 1
            } else {
                (data << 1) | 1
            };
        }
        self.tx_cnt -= 1;
        ((self.tx_buf >> self.tx_cnt) & 1) as u8
    }

    /// Feed one received bit into the word accumulator. When a full word
    /// has arrived and its start/stop framing matches, extracts the data
    /// byte (validating parity if configured) and pushes it to `rx_fifo`.
    /// A parity mismatch silently drops the byte.
    pub fn put_bit(&mut self, bit: u8, rx_fifo: &mut BitFifo) {
        let wordsize = self.wordsize();
        self.rx_buf = (self.rx_buf << 1) | (bit as u32 & 1);
        if self.rx_cnt >= wordsize - 1 {
            let mask = 1 | (1 << (wordsize - 1));
            if self.rx_buf & mask == 0x1 {
                let data = (self.rx_buf & ((1 << wordsize) - 1)) >> 1;
                if self.config.use_parity() {
                    let mut p = self.parity_bit();
                    for j in 0..=self.config.data_bits as u32 {
                        p ^= (data >> j) & 1;
                    }
                    if p == 0 {
                        rx_fifo.put_byte((data >> 1) as u8);
                    }
                } else {
                    rx_fifo.put_byte(data as u8);
                }
            }
            self.rx_cnt = 0;
        } else {
            self.rx_cnt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Parity, SerialConfig};

    fn roundtrip(byte: u8, parity: Parity) {
        let cfg = SerialConfig {
            data_bits: 8,
            parity,
        };
        let mut tx = AsyncSerial::new(cfg);
        let mut rx = AsyncSerial::new(cfg);
        let mut tx_fifo = BitFifo::new(64);
        let mut rx_fifo = BitFifo::new(64);
        tx_fifo.put_byte(byte);

        // Drain one whole word (start + data + parity? + stop) plus a
        // couple of idle bits to flush the rx accumulator phase.
        for _ in 0..(cfg.wordsize() + 4) {
            let bit = tx.get_bit(&mut tx_fifo);
            rx.put_bit(bit, &mut rx_fifo);
        }

        assert_eq!(rx_fifo.get_byte(), Some(byte));
    }

    /// Encoding then decoding a byte recovers it exactly, for every parity
    /// setting.
    #[test]
    fn serial_roundtrip_no_parity() {
        for byte in [0x00, 0x01, 0xFF, 0xA5, 0x5A, 0x80, 0x7F] {
            roundtrip(byte, Parity::None);
        }
    }

    #[test]
    fn serial_roundtrip_even_parity() {
        for byte in [0x00, 0x01, 0xFF, 0xA5, 0x5A] {
            roundtrip(byte, Parity::Even);
        }
    }

    #[test]
    fn serial_roundtrip_odd_parity() {
        for byte in [0x00, 0x01, 0xFF, 0xA5, 0x5A] {
            roundtrip(byte, Parity::Odd);
        }
    }

    #[test]
    fn idle_line_emits_ones() {
        let mut tx = AsyncSerial::new(SerialConfig::default());
        let mut fifo = BitFifo::new(16);
        for _ in 0..20 {
            assert_eq!(tx.get_bit(&mut fifo), 1);
        }
    }

    #[test]
    fn parity_mismatch_drops_byte() {
        let cfg = SerialConfig {
            data_bits: 8,
            parity: Parity::Even,
        };
        let mut tx = AsyncSerial::new(cfg);
        let mut rx = AsyncSerial::new(cfg);
        let mut tx_fifo = BitFifo::new(16);
        let mut rx_fifo = BitFifo::new(16);
        tx_fifo.put_byte(0xFF);

        let mut bits = Vec::new();
        for _ in 0..cfg.wordsize() {
            bits.push(tx.get_bit(&mut tx_fifo));
        }
        // Flip the parity bit, the one just before the stop bit.
        let parity_idx = bits.len() - 2;
        bits[parity_idx] ^= 1;
        for b in bits {
            rx.put_bit(b, &mut rx_fifo);
        }
        assert!(rx_fifo.is_empty());
    }
}

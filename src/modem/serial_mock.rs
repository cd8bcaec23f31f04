//! Mock serial port implementation for testing
//!
//! This module provides a mock serial port that can be used to test the
//! modem driver without requiring actual hardware. Reads on an empty rx
//! buffer return `Poll::Pending` (with the waker parked) so deadline-based
//! wait loops hit their real timeout paths under a paused tokio clock.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Mock serial port that simulates bidirectional communication
#[derive(Clone, Default)]
pub struct MockSerialPort {
    /// Data written to the port (outgoing)
    tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Data to be read from the port (incoming)
    rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Simulated errors
    next_error: Arc<Mutex<Option<io::Error>>>,
    /// Waker parked while the rx buffer is empty
    read_waker: Arc<Mutex<Option<Waker>>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        {
            let mut rx = self.rx_buffer.lock().unwrap();
            rx.extend(data);
        }
        if let Some(waker) = self.read_waker.lock().unwrap().take() {
            waker.wake();
        }
    }

    /// Queue one CRLF-terminated response line
    pub fn queue_line(&self, line: &str) {
        self.queue_rx_data(line.as_bytes());
        self.queue_rx_data(b"\r\n");
    }

    /// Queue a bare OK status line
    pub fn queue_status_ok(&self) {
        self.queue_line("OK");
    }

    /// Queue an asynchronous EVENT line
    pub fn queue_event(&self, code: &str, sender: &str) {
        self.queue_line(&format!("EVENT {code} {sender}"));
    }

    /// Queue an ERXUDP delivery carrying the given payload, hex-encoded the
    /// way the modem does in WOPT 1 mode
    pub fn queue_erxudp(&self, src: &str, src_port: u16, payload: &[u8]) {
        let hex_payload = hex::encode_upper(payload);
        self.queue_line(&format!(
            "ERXUDP {src} FE80:0000:0000:0000:0000:0000:0000:0001 {src_port:04X} 0E1A 001D129012345678 1 {:04X} {hex_payload}",
            payload.len()
        ));
    }

    /// Queue the six-line descriptor block of one scan hit
    pub fn queue_pan_descriptor(&self, channel: &str, pan_id: &str, addr: &str) {
        self.queue_line("EPANDESC");
        self.queue_line(&format!("  Channel:{channel}"));
        self.queue_line("  Channel Page:09");
        self.queue_line(&format!("  Pan ID:{pan_id}"));
        self.queue_line(&format!("  Addr:{addr}"));
        self.queue_line("  LQI:73");
        self.queue_line("  PairID:01234567");
    }

    /// Get data that was written to the port
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Get the written data as text for command assertions
    pub fn get_tx_text(&self) -> String {
        String::from_utf8_lossy(&self.get_tx_data()).into_owned()
    }

    /// Clear all buffers
    pub fn clear(&self) {
        self.tx_buffer.lock().unwrap().clear();
        self.rx_buffer.lock().unwrap().clear();
    }

    /// Set an error to be returned on the next operation
    pub fn set_next_error(&self, error: io::Error) {
        *self.next_error.lock().unwrap() = Some(error);
    }
}

// Implement AsyncRead for MockSerialPort
impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut rx = self.rx_buffer.lock().unwrap();
        let available = rx.len().min(buf.remaining());
        if available == 0 {
            *self.read_waker.lock().unwrap() = Some(cx.waker().clone());
            return Poll::Pending;
        }

        let data: Vec<u8> = rx.drain(..available).collect();
        buf.put_slice(&data);
        Poll::Ready(Ok(()))
    }
}

// Implement AsyncWrite for MockSerialPort
impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut tx = self.tx_buffer.lock().unwrap();
        tx.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

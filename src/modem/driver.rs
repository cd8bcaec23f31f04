//! # SKSTACK Modem Driver
//!
//! This module provides the session-establishment state machine and the
//! steady-state operations of a BP35-class Wi-SUN modem. The driver owns the
//! serial transport and a line buffer; it is the only component that touches
//! the port.
//!
//! Session establishment walks Idle → Configured → Scanning → Joining →
//! Authenticating → Joined: channel configuration, Route-B credentials, an
//! active scan with growing duration, channel/PAN register writes, link-local
//! address resolution, and the PANA join handshake. Authentication failure
//! restarts from the scan after a fixed delay; an empty scan grows the scan
//! duration up to a ceiling and reissues the scan. Both retry loops are
//! unbounded by design — the meter side decides when they converge.
//!
//! Once joined, `send_property_request` wraps an ECHONET Lite Get frame in an
//! SKSENDTO command and `poll_event` waits for one ERXUDP delivery from the
//! ECHONET port, hex-decoding its payload.

use crate::constants::{
    AUTH_RETRY_DELAY, COMMAND_TIMEOUT, ECHONET_UDP_PORT, EVENT_AUTH_FAILED, EVENT_AUTH_SUCCEEDED,
    EVENT_SCAN_COMPLETE, PAN_KEY_ADDR, PAN_KEY_CHANNEL, PAN_KEY_PAN_ID, SCAN_DURATION_INITIAL,
    SCAN_DURATION_MAX,
};
use crate::echonet;
use crate::error::WiSunError;
use crate::logging::{log_debug, log_info, log_warn};
use crate::modem::line::{parse_line, ResponseLine};
use crate::modem::serial::SerialPort;
use bytes::BytesMut;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

/// Candidate PAN accumulated from the descriptor lines of one scan round.
///
/// Usable only once all three required keys have arrived; the other scan
/// keys (Channel Page, LQI, PairID) are ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PanDescriptor {
    pub channel: Option<String>,
    pub pan_id: Option<String>,
    pub addr: Option<String>,
}

impl PanDescriptor {
    fn insert(&mut self, key: &str, value: &str) {
        match key {
            PAN_KEY_CHANNEL => self.channel = Some(value.to_string()),
            PAN_KEY_PAN_ID => self.pan_id = Some(value.to_string()),
            PAN_KEY_ADDR => self.addr = Some(value.to_string()),
            _ => {}
        }
    }

    pub fn is_complete(&self) -> bool {
        self.channel.is_some() && self.pan_id.is_some() && self.addr.is_some()
    }
}

/// The driver's join-status record, replaced wholesale on each successful
/// join and invalidated on authentication failure or forced reconnect.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    route_b_id: String,
    password: String,
    channel: String,
    pan_id: String,
    peer_addr: String,
    joined: bool,
}

impl SessionState {
    pub fn joined(&self) -> bool {
        self.joined
    }

    /// Link-local address of the meter, empty until joined.
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn pan_id(&self) -> &str {
        &self.pan_id
    }
}

/// Represents a handle to the Wi-SUN modem, generic over the serial port so
/// tests can drive it with a mock transcript.
pub struct ModemHandle<P: SerialPort> {
    port: P,
    rbuf: BytesMut,
    session: SessionState,
}

impl<P: SerialPort> ModemHandle<P> {
    pub fn new(port: P, route_b_id: String, password: String) -> Self {
        ModemHandle {
            port,
            rbuf: BytesMut::with_capacity(1024),
            session: SessionState {
                route_b_id,
                password,
                ..SessionState::default()
            },
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Configures the channel: echo suppression, then the UDP payload
    /// display mode (switched to hex once, queried first so an already
    /// configured modem is left alone).
    pub async fn initialize(&mut self) -> Result<(), WiSunError> {
        self.rbuf.clear();

        self.write_command("SKSREG SFE 1").await?;
        self.expect_status().await?;

        self.write_command("ROPT").await?;
        let mode = self.expect_value().await?;
        let mode = u8::from_str_radix(&mode, 16).map_err(|_| WiSunError::InvalidHexString)?;
        if mode == 0 {
            self.write_command("WOPT 1").await?;
            self.expect_status().await?;
        }
        Ok(())
    }

    /// Runs the full Scanning → Joining → Authenticating sequence until the
    /// modem holds an authenticated point-to-point session with the meter.
    ///
    /// Authentication failures back off for a fixed delay and restart from
    /// the scan; the loop only returns on success or on a modem command
    /// failure.
    pub async fn connect(&mut self) -> Result<(), WiSunError> {
        self.session.joined = false;
        self.set_credentials().await?;

        loop {
            let descriptor = self.scan().await?;
            match self.join(&descriptor).await {
                Ok(()) => {
                    log_info("route-b session established");
                    return Ok(());
                }
                Err(WiSunError::AuthFailure) => {
                    log_warn("route-b authentication failed, retrying");
                    sleep(AUTH_RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sets the Route-B credentials and runs one scan, without joining.
    pub async fn discover(&mut self) -> Result<PanDescriptor, WiSunError> {
        self.set_credentials().await?;
        self.scan().await
    }

    async fn set_credentials(&mut self) -> Result<(), WiSunError> {
        let password = self.session.password.clone();
        self.write_command(&format!("SKSETPWD C {password}")).await?;
        self.expect_status().await?;

        let id = self.session.route_b_id.clone();
        self.write_command(&format!("SKSETRBID {id}")).await?;
        self.expect_status().await?;
        Ok(())
    }

    /// Active-scans for the meter's PAN, accumulating descriptor lines until
    /// the scan-complete event. An empty round grows the duration register
    /// (capped) and reissues the scan; a descriptor completed mid-round is
    /// retained but the round still only concludes on the event.
    async fn scan(&mut self) -> Result<PanDescriptor, WiSunError> {
        let mut duration = SCAN_DURATION_INITIAL;
        loop {
            self.write_command(&format!("SKSCAN 2 FFFFFFFF {duration:x}"))
                .await?;
            self.expect_status().await?;

            let mut descriptor = PanDescriptor::default();
            loop {
                match self.next_response(None).await? {
                    ResponseLine::Notification { kind, fields } if kind == "EVENT" => {
                        if fields.first().map(String::as_str) == Some(EVENT_SCAN_COMPLETE) {
                            if descriptor.is_complete() {
                                log_info(&format!("pan discovered: {descriptor:?}"));
                                return Ok(descriptor);
                            }
                            log_info("scan finished without a descriptor, retrying");
                            duration = (duration + 1).min(SCAN_DURATION_MAX);
                            break;
                        }
                    }
                    ResponseLine::Notification { kind, .. } if kind == "EPANDESC" => {
                        descriptor = PanDescriptor::default();
                    }
                    ResponseLine::Descriptor { key, value } => descriptor.insert(&key, &value),
                    _ => {}
                }
            }
        }
    }

    /// Applies the discovered channel and PAN id, resolves the hardware
    /// address to a link-local address, and runs the PANA join handshake.
    async fn join(&mut self, descriptor: &PanDescriptor) -> Result<(), WiSunError> {
        let incomplete = || WiSunError::Other("incomplete PAN descriptor".into());
        let channel = descriptor.channel.clone().ok_or_else(incomplete)?;
        let pan_id = descriptor.pan_id.clone().ok_or_else(incomplete)?;
        let addr = descriptor.addr.clone().ok_or_else(incomplete)?;

        self.write_command(&format!("SKSREG S2 {channel}")).await?;
        self.expect_status().await?;
        self.write_command(&format!("SKSREG S3 {pan_id}")).await?;
        self.expect_status().await?;

        // The SKLL64 reply is a single bare line with no leading marker.
        self.write_command(&format!("SKLL64 {addr}")).await?;
        let peer_addr = self.expect_value().await?;

        self.write_command(&format!("SKJOIN {peer_addr}")).await?;
        self.expect_status().await?;

        loop {
            if let ResponseLine::Notification { kind, fields } = self.next_response(None).await? {
                if kind != "EVENT" {
                    continue;
                }
                match fields.first().map(String::as_str) {
                    Some(EVENT_AUTH_FAILED) => return Err(WiSunError::AuthFailure),
                    Some(EVENT_AUTH_SUCCEEDED) => {
                        self.session.channel = channel;
                        self.session.pan_id = pan_id;
                        self.session.peer_addr = peer_addr;
                        self.session.joined = true;
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }
    }

    /// Encodes a Get request for one property and delivers it to the joined
    /// peer over UDP.
    pub async fn send_property_request(&mut self, epc: u8) -> Result<(), WiSunError> {
        if !self.session.joined {
            return Err(WiSunError::ProtocolFail("no joined session".into()));
        }
        let frame = echonet::encode_get_request(epc);
        let header = format!(
            "SKSENDTO 1 {} {:04X} 1 {:04X} ",
            self.session.peer_addr,
            ECHONET_UDP_PORT,
            frame.len()
        );
        log_debug(&format!("-> {header}<{} bytes>", frame.len()));
        self.port.write_all(header.as_bytes()).await?;
        self.port.write_all(&frame).await?;
        SerialPort::flush(&mut self.port).await?;
        self.expect_status().await
    }

    /// Waits up to `budget` for one ECHONET UDP delivery, returning its
    /// decoded payload, or `None` when the budget lapses.
    ///
    /// Deliveries whose source port is not the ECHONET port are dropped
    /// without terminating the wait; the modem may surface unrelated UDP
    /// traffic on the same line. Other asynchronous lines are skipped.
    pub async fn poll_event(&mut self, budget: Duration) -> Result<Option<Vec<u8>>, WiSunError> {
        let deadline = Instant::now() + budget;
        loop {
            let line = match self.next_response(Some(deadline)).await {
                Ok(line) => line,
                Err(WiSunError::Timeout) => return Ok(None),
                Err(e) => return Err(e),
            };
            let ResponseLine::Notification { kind, fields } = line else {
                continue;
            };
            if kind != "ERXUDP" {
                continue;
            }

            let src_port = fields
                .get(2)
                .and_then(|field| u16::from_str_radix(field, 16).ok());
            if src_port != Some(ECHONET_UDP_PORT) {
                log_debug("dropping udp delivery from foreign source port");
                continue;
            }
            let Some(hex_payload) = fields.last() else {
                continue;
            };
            match hex::decode(hex_payload) {
                Ok(payload) => return Ok(Some(payload)),
                Err(_) => {
                    log_warn("dropping udp delivery with undecodable payload");
                    continue;
                }
            }
        }
    }

    async fn write_command(&mut self, command: &str) -> Result<(), WiSunError> {
        log_debug(&format!("-> {command}"));
        self.port.write_all(command.as_bytes()).await?;
        self.port.write_all(b"\r\n").await?;
        SerialPort::flush(&mut self.port).await?;
        Ok(())
    }

    /// Waits for the command status, skipping every other line shape.
    async fn expect_status(&mut self) -> Result<(), WiSunError> {
        let deadline = Instant::now() + COMMAND_TIMEOUT;
        loop {
            match self.next_response(Some(deadline)).await? {
                ResponseLine::Status { ok: true } => return Ok(()),
                ResponseLine::Status { ok: false } => {
                    return Err(WiSunError::ProtocolFail("modem reported FAIL".into()))
                }
                _ => {}
            }
        }
    }

    /// Waits for a value line (marked or bare), skipping diagnostics.
    async fn expect_value(&mut self) -> Result<String, WiSunError> {
        let deadline = Instant::now() + COMMAND_TIMEOUT;
        loop {
            match self.next_response(Some(deadline)).await? {
                ResponseLine::Value(token) => return Ok(token),
                ResponseLine::Status { ok: false } => {
                    return Err(WiSunError::ProtocolFail("modem reported FAIL".into()))
                }
                _ => {}
            }
        }
    }

    /// Reads and classifies the next logical line, logging and consuming
    /// diagnostic lines. `None` waits without a deadline (startup only).
    async fn next_response(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<ResponseLine, WiSunError> {
        loop {
            let raw = self.read_line(deadline).await?;
            match parse_line(&raw) {
                ResponseLine::Diagnostic => log_debug(&format!("modem: {raw}")),
                other => return Ok(other),
            }
        }
    }

    /// Returns the next CRLF-delimited line, buffering reads. The remaining
    /// budget is recomputed each iteration; a lapsed deadline is an
    /// immediate `Timeout`, never an unbounded block.
    async fn read_line(&mut self, deadline: Option<Instant>) -> Result<String, WiSunError> {
        loop {
            if let Some(pos) = self.rbuf.iter().position(|b| *b == b'\n') {
                let line = self.rbuf.split_to(pos + 1);
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end_matches(['\r', '\n']);
                if text.is_empty() {
                    continue;
                }
                return Ok(text.to_string());
            }

            let mut chunk = [0u8; 256];
            let n = match deadline {
                None => self.port.read(&mut chunk).await?,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(WiSunError::Timeout);
                    }
                    timeout(remaining, self.port.read(&mut chunk))
                        .await
                        .map_err(|_| WiSunError::Timeout)??
                }
            };
            if n == 0 {
                return Err(WiSunError::SerialPortError("serial port closed".into()));
            }
            self.rbuf.extend_from_slice(&chunk[..n]);
        }
    }
}

//! # Meter Polling Loop and Reconnect Policy
//!
//! This module drives continuous polling once the modem holds a joined
//! session: it issues a Get request for the instantaneous power property
//! each cycle, decodes and dispatches every notification delivered within
//! the cycle budget, and forces a full session re-establishment after too
//! many consecutive cycles without a single dispatched notification.
//!
//! The meter may batch unrelated properties into one notification, so the
//! handler inspects every property of every decoded frame independent of
//! which request triggered the delivery. Decode failures and failure-flagged
//! service codes degrade to skipped notifications and never abort the loop.

use crate::constants::{
    CYCLE_BUDGET, EMPTY_CYCLE_LIMIT, EPC_COEFFICIENT, EPC_CUMULATIVE_UNIT,
    EPC_CUMULATIVE_WATT_HOUR, EPC_INSTANTANEOUS_WATT,
};
use crate::echonet::{self, Property};
use crate::error::WiSunError;
use crate::logging::{log_info, log_warn};
use crate::modem::driver::ModemHandle;
use crate::modem::serial::SerialPort;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Operations the polling loop needs from a joined modem. Implemented by
/// `ModemHandle`; tests substitute a scripted fake.
#[async_trait]
pub trait Modem {
    /// Re-runs session establishment from the top of the state machine.
    async fn establish(&mut self) -> Result<(), WiSunError>;

    /// Sends a Get request for one property to the joined peer.
    async fn send_property_request(&mut self, epc: u8) -> Result<(), WiSunError>;

    /// Waits up to `budget` for one ECHONET UDP payload.
    async fn poll_event(&mut self, budget: Duration) -> Result<Option<Vec<u8>>, WiSunError>;
}

#[async_trait]
impl<P: SerialPort> Modem for ModemHandle<P> {
    async fn establish(&mut self) -> Result<(), WiSunError> {
        self.connect().await
    }

    async fn send_property_request(&mut self, epc: u8) -> Result<(), WiSunError> {
        ModemHandle::send_property_request(self, epc).await
    }

    async fn poll_event(&mut self, budget: Duration) -> Result<Option<Vec<u8>>, WiSunError> {
        ModemHandle::poll_event(self, budget).await
    }
}

/// Handler verdict for one dispatched frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep processing notifications in this cycle.
    Continue,
    /// Stop processing this cycle early.
    StopCycle,
}

/// Receives every decoded frame delivered within a cycle.
pub trait FrameHandler {
    fn on_frame(&mut self, esv: u8, properties: &[Property]) -> Dispatch;
}

/// Consumer of typed meter readings; the boundary to display and metrics
/// collaborators. Invoked at most once per decoded property per frame,
/// never for failure-flagged frames.
pub trait ReadingSink {
    fn instantaneous_watt(&mut self, watt: u32);

    /// Cumulative energy with the meter's coefficient and unit scale
    /// applied (kWh as reported by the meter class).
    fn cumulative_watt_hour(&mut self, watt_hour: f64);
}

/// Meter-reported scaling constants, fetched once per session.
///
/// Held immutable until a full reconnect; the meter behind a re-established
/// session may legitimately report different constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub coefficient: u32,
    pub unit_scale: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            coefficient: 1,
            unit_scale: 1.0,
        }
    }
}

/// Requests one property and polls until it appears in a response, the
/// handler-independent building block for calibration reads. Returns `None`
/// when the budget lapses or the meter flags the request as failed.
pub async fn read_property<M: Modem>(
    modem: &mut M,
    epc: u8,
) -> Result<Option<Vec<u8>>, WiSunError> {
    struct Capture {
        target: u8,
        value: Option<Vec<u8>>,
    }

    impl FrameHandler for Capture {
        fn on_frame(&mut self, esv: u8, properties: &[Property]) -> Dispatch {
            for property in properties {
                if property.epc == self.target {
                    if !echonet::is_failure_esv(esv) {
                        self.value = Some(property.edt.clone());
                    }
                    return Dispatch::StopCycle;
                }
            }
            Dispatch::Continue
        }
    }

    let mut capture = Capture {
        target: epc,
        value: None,
    };
    modem.send_property_request(epc).await?;
    run_cycle(modem, &mut capture).await?;
    Ok(capture.value)
}

/// Fetches the coefficient and cumulative-unit properties, defaulting each
/// to 1 when the meter does not answer within the budget.
pub async fn fetch_calibration<M: Modem>(modem: &mut M) -> Result<Calibration, WiSunError> {
    let coefficient = match read_property(modem, EPC_COEFFICIENT).await? {
        Some(edt) => echonet::coefficient_from_edt(&edt),
        None => 1,
    };
    let unit_scale = match read_property(modem, EPC_CUMULATIVE_UNIT).await? {
        Some(edt) if edt.len() == 1 => echonet::unit_scale(edt[0]),
        _ => 1.0,
    };
    log_info(&format!(
        "meter calibration: coefficient={coefficient} unit_scale={unit_scale}"
    ));
    Ok(Calibration {
        coefficient,
        unit_scale,
    })
}

/// Dispatches notifications to `handler` until the cycle budget lapses or
/// the handler stops the cycle, returning the number of dispatched frames.
async fn run_cycle<M: Modem, H: FrameHandler>(
    modem: &mut M,
    handler: &mut H,
) -> Result<u32, WiSunError> {
    let deadline = Instant::now() + CYCLE_BUDGET;
    let mut dispatched = 0;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(dispatched);
        }
        match modem.poll_event(remaining).await? {
            None => return Ok(dispatched),
            Some(payload) => match echonet::parse_frame(&payload) {
                Err(e) => log_warn(&format!("skipping undecodable notification: {e}")),
                Ok(frame) => {
                    dispatched += 1;
                    if handler.on_frame(frame.esv, &frame.properties) == Dispatch::StopCycle {
                        return Ok(dispatched);
                    }
                }
            },
        }
    }
}

/// Translates decoded frames into sink calls using the session calibration.
struct MeterHandler<'a, S: ReadingSink> {
    calibration: Calibration,
    sink: &'a mut S,
}

impl<S: ReadingSink> FrameHandler for MeterHandler<'_, S> {
    fn on_frame(&mut self, esv: u8, properties: &[Property]) -> Dispatch {
        if echonet::is_failure_esv(esv) {
            return Dispatch::Continue;
        }
        for property in properties {
            match property.epc {
                EPC_INSTANTANEOUS_WATT => {
                    if let Some(watt) = echonet::instantaneous_watt(&property.edt) {
                        self.sink.instantaneous_watt(watt);
                    }
                }
                EPC_CUMULATIVE_WATT_HOUR => {
                    if let Some(raw) = echonet::cumulative_raw(&property.edt) {
                        let value = f64::from(raw)
                            * f64::from(self.calibration.coefficient)
                            * self.calibration.unit_scale;
                        self.sink.cumulative_watt_hour(value);
                    }
                }
                _ => {}
            }
        }
        Dispatch::Continue
    }
}

/// The top-level polling loop with its reconnect accounting.
pub struct MeterPoller<S: ReadingSink> {
    sink: S,
    calibration: Calibration,
    empty_cycles: u32,
}

impl<S: ReadingSink> MeterPoller<S> {
    pub fn new(sink: S) -> Self {
        MeterPoller {
            sink,
            calibration: Calibration::default(),
            empty_cycles: 0,
        }
    }

    /// Calibration constants currently applied to cumulative readings.
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Fetches the session calibration constants from the meter.
    pub async fn calibrate<M: Modem>(&mut self, modem: &mut M) -> Result<(), WiSunError> {
        self.calibration = fetch_calibration(modem).await?;
        Ok(())
    }

    /// Runs one polling cycle: request instantaneous power, dispatch every
    /// notification within the budget, update the empty-cycle counter, and
    /// force a reconnect once the counter exceeds the limit.
    ///
    /// The counter is reset before the reconnect attempt; a reconnect
    /// failure propagates as fatal.
    pub async fn step<M: Modem>(&mut self, modem: &mut M) -> Result<(), WiSunError> {
        modem.send_property_request(EPC_INSTANTANEOUS_WATT).await?;

        let mut handler = MeterHandler {
            calibration: self.calibration,
            sink: &mut self.sink,
        };
        let dispatched = run_cycle(modem, &mut handler).await?;
        if dispatched == 0 {
            self.empty_cycles += 1;
        } else {
            self.empty_cycles = 0;
        }

        if self.empty_cycles > EMPTY_CYCLE_LIMIT {
            log_warn("meter went quiet, re-establishing the session");
            self.empty_cycles = 0;
            modem.establish().await?;
            // The meter behind the new session may be a different device.
            self.calibrate(modem).await?;
            log_info("smart meter reconnected");
        }
        Ok(())
    }

    /// Polls forever; returns only on a fatal error.
    pub async fn run<M: Modem>(&mut self, modem: &mut M) -> Result<(), WiSunError> {
        loop {
            self.step(modem).await?;
        }
    }
}

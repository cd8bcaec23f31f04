//! End-to-end driver tests: a full session-establishment transcript against
//! the mock serial port, followed by calibration and one polling cycle.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use wisun_rs::constants::{
    EPC_COEFFICIENT, EPC_CUMULATIVE_UNIT, EPC_CUMULATIVE_WATT_HOUR, EPC_INSTANTANEOUS_WATT,
    ESV_GET_RES,
};
use wisun_rs::modem::serial_mock::MockSerialPort;
use wisun_rs::{MeterPoller, ModemHandle, ReadingSink};

const METER_ADDR: &str = "FE80:0000:0000:0000:021D:1290:1234:5678";

fn response_frame(properties: &[(u8, &[u8])]) -> Vec<u8> {
    let mut frame = vec![0x10, 0x81, 0x00, 0x01, 0x02, 0x88, 0x01, 0x05, 0xFF, 0x01];
    frame.push(ESV_GET_RES);
    frame.push(properties.len() as u8);
    for (epc, edt) in properties {
        frame.push(*epc);
        frame.push(edt.len() as u8);
        frame.extend_from_slice(edt);
    }
    frame
}

fn queue_join_transcript(mock: &MockSerialPort) {
    mock.queue_status_ok(); // SKSREG SFE
    mock.queue_line("OK 01"); // ROPT: hex mode already configured
    mock.queue_status_ok(); // SKSETPWD
    mock.queue_status_ok(); // SKSETRBID
    mock.queue_status_ok(); // SKSCAN
    mock.queue_pan_descriptor("39", "8888", "001D129012345678");
    mock.queue_event("22", METER_ADDR);
    mock.queue_status_ok(); // SKSREG S2
    mock.queue_status_ok(); // SKSREG S3
    mock.queue_line(METER_ADDR); // SKLL64 reply
    mock.queue_status_ok(); // SKJOIN
    mock.queue_event("25", METER_ADDR); // authentication succeeded
}

#[derive(Clone, Default)]
struct SharedSink {
    watts: Arc<Mutex<Vec<u32>>>,
    watt_hours: Arc<Mutex<Vec<f64>>>,
}

impl ReadingSink for SharedSink {
    fn instantaneous_watt(&mut self, watt: u32) {
        self.watts.lock().unwrap().push(watt);
    }

    fn cumulative_watt_hour(&mut self, watt_hour: f64) {
        self.watt_hours.lock().unwrap().push(watt_hour);
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_session_establishment_transcript() {
    let mock = MockSerialPort::new();
    queue_join_transcript(&mock);

    let mut modem = ModemHandle::new(
        mock.clone(),
        "00112233445566778899AABBCCDDEEFF".into(),
        "0123456789AB".into(),
    );
    modem.initialize().await.unwrap();
    modem.connect().await.unwrap();

    let session = modem.session();
    assert!(session.joined());
    assert_eq!(session.peer_addr(), METER_ADDR);
    assert_eq!(session.channel(), "39");
    assert_eq!(session.pan_id(), "8888");

    let tx = mock.get_tx_text();
    assert!(tx.contains("SKSREG S2 39\r\n"));
    assert!(tx.contains("SKSREG S3 8888\r\n"));
    assert!(tx.contains("SKLL64 001D129012345678\r\n"));
    assert!(tx.contains(&format!("SKJOIN {METER_ADDR}\r\n")));
}

#[tokio::test(start_paused = true)]
async fn test_calibrated_polling_cycle_delivers_scaled_readings() {
    let mock = MockSerialPort::new();
    queue_join_transcript(&mock);

    // Calibration reads: coefficient 10, unit scale 0.1 kWh.
    mock.queue_status_ok(); // SKSENDTO (0xD3)
    mock.queue_erxudp(
        METER_ADDR,
        0x0E1A,
        &response_frame(&[(EPC_COEFFICIENT, &[0x00, 0x00, 0x00, 0x0A])]),
    );
    mock.queue_status_ok(); // SKSENDTO (0xE1)
    mock.queue_erxudp(
        METER_ADDR,
        0x0E1A,
        &response_frame(&[(EPC_CUMULATIVE_UNIT, &[0x01])]),
    );

    // One polling cycle: a batched response with both watt properties.
    let mut cumulative_edt = vec![0u8; 7];
    cumulative_edt.extend_from_slice(&500u32.to_be_bytes());
    mock.queue_status_ok(); // SKSENDTO (0xE7)
    mock.queue_erxudp(
        METER_ADDR,
        0x0E1A,
        &response_frame(&[
            (EPC_INSTANTANEOUS_WATT, &[0x01, 0xF4]),
            (EPC_CUMULATIVE_WATT_HOUR, &cumulative_edt),
        ]),
    );

    let mut modem = ModemHandle::new(
        mock.clone(),
        "00112233445566778899AABBCCDDEEFF".into(),
        "0123456789AB".into(),
    );
    modem.initialize().await.unwrap();
    modem.connect().await.unwrap();

    let sink = SharedSink::default();
    let mut poller = MeterPoller::new(sink.clone());
    poller.calibrate(&mut modem).await.unwrap();
    assert_eq!(poller.calibration().coefficient, 10);
    assert_eq!(poller.calibration().unit_scale, 0.1);

    poller.step(&mut modem).await.unwrap();
    assert_eq!(*sink.watts.lock().unwrap(), vec![500]);
    assert_eq!(*sink.watt_hours.lock().unwrap(), vec![500.0]);
}

#[tokio::test(start_paused = true)]
async fn test_foreign_port_delivery_is_invisible_to_polling() {
    let mock = MockSerialPort::new();
    queue_join_transcript(&mock);

    let frame = response_frame(&[(EPC_INSTANTANEOUS_WATT, &[0x00, 0x64])]);
    mock.queue_status_ok(); // SKSENDTO
    mock.queue_erxudp(METER_ADDR, 0x1234, &frame); // dropped
    mock.queue_erxudp(METER_ADDR, 0x0E1A, &frame); // dispatched

    let mut modem = ModemHandle::new(
        mock.clone(),
        "00112233445566778899AABBCCDDEEFF".into(),
        "0123456789AB".into(),
    );
    modem.initialize().await.unwrap();
    modem.connect().await.unwrap();

    modem.send_property_request(EPC_INSTANTANEOUS_WATT).await.unwrap();
    let first = modem.poll_event(Duration::from_secs(20)).await.unwrap();
    assert_eq!(first, Some(frame));
    let second = modem.poll_event(Duration::from_secs(1)).await.unwrap();
    assert_eq!(second, None);
}

//! The modem module contains the components responsible for driving the
//! SKSTACK serial modem: line classification, the serial port abstraction,
//! and the session-establishment state machine.

pub mod driver;
pub mod line;
pub mod serial;
pub mod serial_mock;

pub use driver::{ModemHandle, PanDescriptor, SessionState};
pub use line::{parse_line, ResponseLine};
pub use serial::{open_port, SerialPort};

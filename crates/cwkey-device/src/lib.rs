//! Audio output and serial PTT collaborators for the keying station.

pub mod device;
pub mod serial;

pub use device::{find_output_device, list_output_devices, CpalBackend, CpalStream, OutputDevice};
pub use serial::{list_serial_ports, SerialLine, SerialPortBackend};

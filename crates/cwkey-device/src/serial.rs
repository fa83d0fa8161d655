use std::time::Duration;

use cwkey_core::{ControlLine, DeviceError, SerialBackend, PTT_BAUD};

/// Serial port names available on this machine.
pub fn list_serial_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(err) => {
            tracing::warn!(%err, "could not enumerate serial ports");
            Vec::new()
        }
    }
}

/// Opens PTT ports with `serialport`; RTS is the control line.
#[derive(Clone, Copy, Default)]
pub struct SerialPortBackend;

pub struct SerialLine {
    port: Box<dyn serialport::SerialPort>,
}

impl ControlLine for SerialLine {
    fn set_control_line(&mut self, active: bool) -> Result<(), DeviceError> {
        self.port
            .write_request_to_send(active)
            .map_err(|err| DeviceError::ControlLine(err.to_string()))
    }
}

impl Drop for SerialLine {
    fn drop(&mut self) {
        let _ = self.port.write_request_to_send(false);
    }
}

impl SerialBackend for SerialPortBackend {
    type Line = SerialLine;

    fn open(&self, port: &str) -> Result<SerialLine, DeviceError> {
        let open_err = |err: serialport::Error| DeviceError::SerialOpen {
            port: port.to_string(),
            reason: err.to_string(),
        };

        let mut handle = serialport::new(port, PTT_BAUD)
            .timeout(Duration::from_secs(1))
            .open()
            .map_err(open_err)?;
        handle.write_request_to_send(false).map_err(open_err)?;

        tracing::info!(port, baud = PTT_BAUD, "serial port opened");
        Ok(SerialLine { port: handle })
    }
}

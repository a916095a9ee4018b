use std::{
    io::{Read, Write},
    time::Duration,
};

pub type TransportResult<T> = Result<T, TransportError>;

/// Half-duplex byte channel to the device under test.
///
/// The default methods only need the raw primitives, so the trait is
/// implemented both for the real serial port and for mock devices in tests.
/// The handle is exclusively borrowed for a whole run; dropping the owning
/// value closes the channel, on failure paths as well.
pub trait Transport: Read + Write {
    fn set_timeout(&mut self, timeout: Duration) -> TransportResult<()>;

    /// Number of bytes currently waiting in the receive buffer
    fn bytes_available(&mut self) -> TransportResult<usize>;

    /// Discards both the input and the output buffer
    fn clear_buffers(&mut self) -> TransportResult<()>;

    /// Drains and returns everything currently buffered on the receive side
    fn read_available(&mut self) -> TransportResult<Vec<u8>> {
        let count = self.bytes_available()?;
        let mut buffer = vec![0u8; count];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

impl Transport for Box<dyn serialport::SerialPort> {
    fn set_timeout(&mut self, timeout: Duration) -> TransportResult<()> {
        serialport::SerialPort::set_timeout(self.as_mut(), timeout)?;
        Ok(())
    }

    fn bytes_available(&mut self) -> TransportResult<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn clear_buffers(&mut self) -> TransportResult<()> {
        self.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }
}

/// Opens the serial port with the fixed 8N1 line settings.
pub fn open(
    port: &str,
    baudrate: u32,
    timeout: Duration,
) -> TransportResult<Box<dyn serialport::SerialPort>> {
    serialport::new(port, baudrate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .timeout(timeout)
        .open()
        .map_err(|source| TransportError::Unavailable { port: port.into(), source })
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("serial port {port} could not be opened: {source}")]
    Unavailable { port: String, source: serialport::Error },
    #[error("serial interface error: {0}")]
    Interface(#[from] serialport::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::Duration;

use inference_harness::transport::{Transport, TransportResult};

/// Simulates the firmware on the other end of the serial line: every written
/// byte is echoed back, and each command line is answered the way the device
/// answers it (pad byte, payload, terminator).
pub struct MockDevice {
    read_buf: Vec<u8>,
    /// Raw replies handed out for `e` commands, in order
    pub execute_replies: VecDeque<Vec<u8>>,
    /// Every command line received, for assertions on framing and order
    pub commands: Vec<String>,
    /// Answer the n-th loaded element with a wrong echo
    pub mis_echo_element: Option<usize>,
    elements_seen: usize,
}

impl MockDevice {
    pub fn new(execute_replies: Vec<Vec<u8>>) -> Self {
        MockDevice {
            read_buf: Vec::new(),
            execute_replies: execute_replies.into(),
            commands: Vec::new(),
            mis_echo_element: None,
            elements_seen: 0,
        }
    }

    fn push_framed(&mut self, payload: &[u8]) {
        self.read_buf.push(0);
        self.read_buf.extend_from_slice(payload);
        self.read_buf.push(b'\n');
    }
}

impl Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let line = String::from_utf8_lossy(buf).into_owned();
        self.commands.push(line.clone());

        // Serial echo of our own command
        self.read_buf.extend_from_slice(buf);

        match buf.first() {
            Some(b'n') => self.push_framed(b"ready"),
            Some(b'i') => {
                let value = line[1..].trim().to_owned();
                let echo = if self.mis_echo_element == Some(self.elements_seen) {
                    "?".to_owned()
                } else {
                    value
                };
                self.elements_seen += 1;
                self.push_framed(echo.as_bytes());
            }
            Some(b'e') => {
                let reply =
                    self.execute_replies.pop_front().unwrap_or_else(|| b"\x007\n".to_vec());
                self.read_buf.extend_from_slice(&reply);
            }
            _ => panic!("Device received unknown command {line:?}"),
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        buf.copy_from_slice(&self.read_buf[0..buf.len()]);
        self.read_buf.drain(0..buf.len());
        Ok(buf.len())
    }
}

impl Transport for MockDevice {
    fn set_timeout(&mut self, _timeout: Duration) -> TransportResult<()> {
        Ok(())
    }

    fn bytes_available(&mut self) -> TransportResult<usize> {
        Ok(self.read_buf.len())
    }

    fn clear_buffers(&mut self) -> TransportResult<()> {
        self.read_buf.clear();
        Ok(())
    }
}

//! We use this mocking module in unit tests to emulate an accelerometer board
//! on the end of a serial port.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::transport::{Connector, TransportConfig};

/// Our mock type used to emulate a serial port.
///
/// Clones share state, so a test can keep a clone to inspect what was
/// written or inject errors after the port was handed to a board.
#[derive(Clone, Default)]
pub struct MockSerial {
    state: Rc<RefCell<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Everything written to the mock serial port
    write_buffer: heapless::Vec<u8, 512>,
    /// Bytes of the request line currently being written
    line: heapless::Vec<u8, 64>,
    /// Reply data waiting to be read
    read_buffer: heapless::Vec<u8, 512>,
    /// Current position in the read buffer
    read_position: usize,
    /// Reply sent for each request line
    replies: HashMap<String, String>,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MockSerialError {
    /// Simulated timeout, also returned when no reply data is available
    #[error("Mock read timed out")]
    Timeout,
    /// Simulated buffer overflow
    #[error("Mock buffer overflow")]
    BufferOverflow,
    /// Generic simulated error for testing
    #[error("Simulated serial error")]
    SimulatedError,
    /// No port exists at the requested endpoint
    #[error("No mock port at this endpoint")]
    NotFound,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
            MockSerialError::NotFound => embedded_io::ErrorKind::NotFound,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }

        for &byte in buf {
            state
                .write_buffer
                .push(byte)
                .map_err(|_| MockSerialError::BufferOverflow)?;
            if byte == b'\n' {
                state.complete_line()?;
            } else {
                state
                    .line
                    .push(byte)
                    .map_err(|_| MockSerialError::BufferOverflow)?;
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.state.borrow().should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        if state.read_position >= state.read_buffer.len() {
            return Err(MockSerialError::Timeout);
        }

        let available_bytes = state.read_buffer.len() - state.read_position;
        let bytes_to_read = core::cmp::min(buf.len(), available_bytes);
        let start = state.read_position;
        buf[..bytes_to_read].copy_from_slice(&state.read_buffer[start..start + bytes_to_read]);
        state.read_position += bytes_to_read;

        // Everything consumed, start over so the buffer doesn't fill up.
        if state.read_position == state.read_buffer.len() {
            state.read_buffer.clear();
            state.read_position = 0;
        }
        Ok(bytes_to_read)
    }
}

impl MockState {
    /// Queue the scripted reply for the request line just written.
    fn complete_line(&mut self) -> Result<(), MockSerialError> {
        let request = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        if let Some(reply) = self.replies.get(&request) {
            let reply = format!("{reply}\n");
            self.read_buffer
                .extend_from_slice(reply.as_bytes())
                .map_err(|_| MockSerialError::BufferOverflow)?;
        }
        Ok(())
    }
}

impl MockSerial {
    /// Create a new MockSerial instance which never replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` every time `request` is written.
    pub fn respond(self, request: &str, reply: &str) -> Self {
        self.state
            .borrow_mut()
            .replies
            .insert(request.to_owned(), reply.to_owned());
        self
    }

    /// A port answering `*IDN?`, `*RESET` and `ACC:READ?` like a healthy board.
    pub fn accelerometer(asset_tag: &str) -> Self {
        Self::new()
            .respond("*IDN?", &format!("Acme:Accelerometer:{asset_tag}:1.0"))
            .respond("*STATUS?", "OK")
            .respond("*RESET", "ACK")
            .respond("ACC:READ?", "1.0:-2.5:9.81")
    }

    /// Append raw bytes to be returned by read(), regardless of what was written.
    pub fn set_read_data(&self, data: &[u8]) -> Result<(), MockSerialError> {
        self.state
            .borrow_mut()
            .read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Get a copy of the data that was written to this mock serial port.
    pub fn written_data(&self) -> Vec<u8> {
        self.state.borrow().write_buffer.to_vec()
    }

    /// The request lines written so far.
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.state.borrow().write_buffer)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Clear the write buffer.
    pub fn clear_written_data(&self) {
        self.state.borrow_mut().write_buffer.clear();
    }

    /// Configure whether write operations should fail with an error.
    pub fn set_write_error(&self, should_error: bool) {
        self.state.borrow_mut().should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error.
    pub fn set_read_error(&self, should_error: bool) {
        self.state.borrow_mut().should_error_on_read = should_error;
    }
}

/// Opens [`MockSerial`] ports by endpoint name.
#[derive(Default)]
pub struct MockConnector {
    ports: HashMap<String, MockSerial>,
    opened: Vec<String>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, endpoint: &str, port: MockSerial) -> Self {
        self.ports.insert(endpoint.to_owned(), port);
        self
    }

    /// Endpoints opened so far, in order.
    pub fn opened(&self) -> &[String] {
        &self.opened
    }
}

impl Connector for MockConnector {
    type Port = MockSerial;

    fn open(
        &mut self,
        endpoint: &str,
        _config: &TransportConfig,
    ) -> Result<MockSerial, MockSerialError> {
        self.opened.push(endpoint.to_owned());
        self.ports
            .get(endpoint)
            .cloned()
            .ok_or(MockSerialError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_new_mock_serial() {
        let mock = MockSerial::new();
        assert_eq!(mock.written_data().len(), 0);
        assert_eq!(mock.state.borrow().read_position, 0);
        assert!(!mock.state.borrow().should_error_on_write);
        assert!(!mock.state.borrow().should_error_on_read);
    }

    #[test]
    fn test_scripted_reply() {
        let mut mock = MockSerial::new().respond("*STATUS?", "OK");
        mock.write_all(b"*STATUS?\n").unwrap();

        let mut buffer = [0u8; 8];
        let read = mock.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..read], b"OK\n");
    }

    #[test]
    fn test_reply_only_after_terminator() {
        let mut mock = MockSerial::new().respond("*STATUS?", "OK");
        mock.write_all(b"*STATUS?").unwrap();

        let mut buffer = [0u8; 8];
        assert!(matches!(mock.read(&mut buffer), Err(MockSerialError::Timeout)));
    }

    #[test]
    fn test_unknown_request_gets_no_reply() {
        let mut mock = MockSerial::new().respond("*STATUS?", "OK");
        mock.write_all(b"*RESET\n").unwrap();

        let mut buffer = [0u8; 8];
        assert!(matches!(mock.read(&mut buffer), Err(MockSerialError::Timeout)));
        assert_eq!(mock.written_lines(), vec!["*RESET".to_owned()]);
    }

    #[test]
    fn test_clones_share_state() {
        let mock = MockSerial::new();
        let mut port = mock.clone();
        port.write_all(b"hello").unwrap();
        assert_eq!(mock.written_data(), b"hello");

        mock.clear_written_data();
        assert!(port.written_data().is_empty());
    }

    #[test]
    fn test_write_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);

        assert!(matches!(mock.write(b"test"), Err(MockSerialError::SimulatedError)));
        assert!(matches!(mock.flush(), Err(MockSerialError::SimulatedError)));
        assert_eq!(mock.written_data().len(), 0);

        mock.set_write_error(false);
        assert!(mock.write(b"test").is_ok());
    }

    #[test]
    fn test_read_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"test data").unwrap();
        mock.set_read_error(true);

        let mut buffer = [0u8; 10];
        assert!(matches!(mock.read(&mut buffer), Err(MockSerialError::SimulatedError)));
    }

    #[test]
    fn test_write_buffer_overflow() {
        let mut mock = MockSerial::new();
        let large_data = vec![0u8; 600];

        assert!(matches!(
            mock.write(&large_data),
            Err(MockSerialError::BufferOverflow)
        ));
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(MockSerialError::Timeout.kind(), embedded_io::ErrorKind::TimedOut));
        assert!(matches!(MockSerialError::BufferOverflow.kind(), embedded_io::ErrorKind::OutOfMemory));
        assert!(matches!(MockSerialError::SimulatedError.kind(), embedded_io::ErrorKind::Other));
        assert!(matches!(MockSerialError::NotFound.kind(), embedded_io::ErrorKind::NotFound));
    }

    #[test]
    fn test_error_messages() {
        // Board errors carry the port error, so it must be a real error type.
        fn assert_error<E: core::error::Error>(_: &E) {}
        assert_error(&MockSerialError::Timeout);
        assert_eq!(MockSerialError::NotFound.to_string(), "No mock port at this endpoint");
        assert_eq!(MockSerialError::SimulatedError.to_string(), "Simulated serial error");
    }

    #[test]
    fn test_connector() {
        let mut connector = MockConnector::new().with_port("sim://1", MockSerial::new());
        let config = TransportConfig::default();

        assert!(connector.open("sim://1", &config).is_ok());
        assert!(matches!(
            connector.open("sim://2", &config),
            Err(MockSerialError::NotFound)
        ));
        assert_eq!(connector.opened(), ["sim://1", "sim://2"]);
    }
}

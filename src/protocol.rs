use std::time::Duration;

use crate::transport::{Transport, TransportError};

/// The closed set of commands the device firmware understands. Each one is a
/// single ASCII line; there are no sequence numbers and no checksums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resets the firmware input buffer (`n`)
    Reset,
    /// Appends one input element to the firmware buffer (`i <value>`)
    LoadElement(i8),
    /// Runs inference the given number of times and reports the predicted
    /// class (`e <iterations>`)
    Execute(u32),
}

impl Command {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Reset => b"n\n".to_vec(),
            Command::LoadElement(value) => format!("i {value}\n").into_bytes(),
            Command::Execute(iterations) => format!("e {iterations}\n").into_bytes(),
        }
    }
}

/// Settle delays used in place of per-command acknowledgements. The device
/// never signals readiness, so each write is followed by a fixed sleep before
/// the response window is drained.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub element_settle: Duration,
    pub execute_settle: Duration,
}

/// Runs one full RESET -> LOADING -> EXECUTING cycle and returns the
/// prediction the device reports for `sample`.
///
/// With `verify_echo` set, every element reply must echo the element value
/// back; otherwise element replies are discarded and correct pacing rests on
/// the settle delay alone.
pub fn run_sample(
    com: &mut impl Transport,
    sample: &[i8],
    timing: &Timing,
    iterations: u32,
    verify_echo: bool,
) -> Result<u8, ProtocolError> {
    let reply = transact(com, &Command::Reset, timing.element_settle)?;
    log::debug!("Reset reply: {:?}", String::from_utf8_lossy(&reply));

    for (index, &value) in sample.iter().enumerate() {
        let reply = transact(com, &Command::LoadElement(value), timing.element_settle)?;
        if verify_echo {
            check_element_echo(&reply, value, index)?;
        }
    }

    let reply = transact(com, &Command::Execute(iterations), timing.execute_settle)?;
    decode_prediction(&reply)
}

/// Sends one command and returns the device's reply.
///
/// Both transport buffers are cleared before and after the exchange, so no
/// stale bytes can leak into the next command's read window. The serial line
/// echoes everything we write; the echo is dropped from the front of the
/// reply.
fn transact(
    com: &mut impl Transport,
    command: &Command,
    settle: Duration,
) -> Result<Vec<u8>, ProtocolError> {
    com.clear_buffers()?;

    let bytes = command.encode();
    com.write_all(&bytes).map_err(TransportError::from)?;
    com.flush().map_err(TransportError::from)?;
    std::thread::sleep(settle);

    let mut response = com.read_available()?;
    let echoed = bytes.len().min(response.len());
    response.drain(..echoed);

    com.clear_buffers()?;

    log::debug!("{:?} -> {:?}", command, String::from_utf8_lossy(&response));
    Ok(response)
}

/// Decodes the execute reply into a prediction in [0, 255].
///
/// The reply carries one leading platform pad byte and one trailing terminator
/// byte around the ASCII decimal prediction.
pub fn decode_prediction(reply: &[u8]) -> Result<u8, ProtocolError> {
    let invalid = || ProtocolError::InvalidPredictionFormat(reply.to_vec());

    let payload = strip_framing(reply).ok_or_else(invalid)?;
    let text = std::str::from_utf8(payload).map_err(|_| invalid())?;
    text.trim().parse().map_err(|_| invalid())
}

fn check_element_echo(reply: &[u8], value: i8, index: usize) -> Result<(), ProtocolError> {
    let mismatch =
        || ProtocolError::ElementNotAcknowledged { index, reply: reply.to_vec() };

    let payload = strip_framing(reply).ok_or_else(mismatch)?;
    if payload != value.to_string().as_bytes() {
        return Err(mismatch());
    }
    Ok(())
}

/// Strips the pad byte and the terminator; `None` if the reply is too short
/// to carry both.
fn strip_framing(reply: &[u8]) -> Option<&[u8]> {
    reply.get(1..reply.len().checked_sub(1)?)
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("device reply is not a prediction: {0:?}")]
    InvalidPredictionFormat(Vec<u8>),
    #[error("element {index} was not acknowledged, reply was {reply:?}")]
    ElementNotAcknowledged { index: usize, reply: Vec<u8> },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

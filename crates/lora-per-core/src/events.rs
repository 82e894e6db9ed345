//! Asynchronous radio notification types.
//!
//! Radio drivers surface interrupts as [`RadioEvent`]s through
//! [`Radio::wait_event`](crate::radio::Radio::wait_event). The PER engine
//! handles each event to completion before asking for the next one, so
//! handlers never interleave.

use bytes::Bytes;

/// A notification raised by the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// A transmission completed.
    TxDone,

    /// A frame was received with a valid CRC.
    RxDone {
        /// Frame payload as read from the radio buffer.
        payload: Bytes,
    },

    /// The receive window closed without a frame.
    RxTimeout,

    /// A frame was received but its CRC check failed.
    CrcError,

    /// A GFSK frame had an invalid length field.
    LengthError,
}

impl RadioEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            RadioEvent::TxDone => "tx_done",
            RadioEvent::RxDone { .. } => "rx_done",
            RadioEvent::RxTimeout => "rx_timeout",
            RadioEvent::CrcError => "crc_error",
            RadioEvent::LengthError => "length_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        assert_eq!(RadioEvent::TxDone.name(), "tx_done");
        assert_eq!(
            RadioEvent::RxDone {
                payload: Bytes::from_static(b"x")
            }
            .name(),
            "rx_done"
        );
        assert_eq!(RadioEvent::RxTimeout.name(), "rx_timeout");
        assert_eq!(RadioEvent::CrcError.name(), "crc_error");
        assert_eq!(RadioEvent::LengthError.name(), "length_error");
    }
}

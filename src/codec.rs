use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::{debug, trace};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::MllpError;
use crate::mllp::{Mllp, CARRIAGE_RETURN, END_BLOCK, START_BLOCK};

/// A tokio codec for MLLP frames, for use within a
/// [Framed](https://docs.rs/tokio-util/latest/tokio_util/codec/struct.Framed.html).
///
/// Decoding runs every received byte through the [`Mllp`] state machine, so
/// frames split across reads and several frames in one read are both handled.
/// Example:
/// ```
/// use hl7_mllp::MllpCodec;
/// let mllp = MllpCodec::new();
/// ```
#[derive(Debug, Default)]
pub struct MllpCodec {
    framer: Mllp,
}

impl MllpCodec {
    /// Creates a codec with the default frame size limit.
    pub fn new() -> Self {
        MllpCodec {
            framer: Mllp::new(),
        }
    }

    /// Creates a codec that fails the stream once a frame outgrows `limit` bytes.
    pub fn with_max_frame_size(limit: usize) -> Self {
        MllpCodec {
            framer: Mllp::with_max_frame_size(limit),
        }
    }
}

// This is used for both the primary HL7 message sent from a publisher, and also any ACK/NACK messages sent from a listener.
impl Encoder<Bytes> for MllpCodec {
    type Error = MllpError;

    fn encode(&mut self, event: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(event.len() + 3); //we need an extra 3 bytes of space on top of the message proper
        dst.put_u8(START_BLOCK);
        dst.put_slice(&event);
        dst.put_u8(END_BLOCK);
        dst.put_u8(CARRIAGE_RETURN);

        debug!("MLLP: Encoded {} byte payload for send", event.len());
        Ok(())
    }
}

impl Decoder for MllpCodec {
    type Item = Bytes;
    type Error = MllpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // frames left over from a read that carried more than one go out first
        if let Some(frame) = self.framer.next_message() {
            return Ok(Some(frame));
        }

        if src.is_empty() {
            return Ok(None);
        }

        trace!("MLLP: Feeding {} bytes to the framer", src.len());
        let result = self.framer.receive(&src[..]);
        src.advance(src.len()); // the framer keeps its own copy of any partial frame
        result?;

        Ok(self.framer.next_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap_for_mllp(s: &str) -> Bytes {
        Bytes::from(format!("\x0B{}\x1C\x0D", s))
    }

    fn wrap_for_mllp_mut(s: &str) -> BytesMut {
        BytesMut::from(format!("\x0B{}\x1C\x0D", s).as_str())
    }

    #[test]
    fn implements_default() {
        let _m = MllpCodec::default();
    }

    #[test]
    fn wraps_simple_data() {
        let mut m = MllpCodec::new();
        let mut output_buf = BytesMut::with_capacity(64);

        match m.encode(Bytes::from_static(b"abcd"), &mut output_buf) {
            Ok(()) => {}
            _ => panic!("Non OK value returned from encode"),
        }
        assert_eq!(output_buf.freeze(), wrap_for_mllp("abcd"));
    }

    #[test]
    fn ensure_decoder_finds_simple_message() {
        let mut data = wrap_for_mllp_mut("abcd");
        let mut m = MllpCodec::new();

        match m.decode(&mut data) {
            Ok(Some(message)) => assert_eq!(&message[..], b"abcd"),
            Ok(None) => panic!("Failed to find a simple message!"),
            Err(err) => panic!("Error looking for simple message: {:?}", err),
        }
    }

    #[test]
    fn ensure_no_data_is_left_on_the_stream() {
        // tokio complains if a connection closes with data still sitting unread in the buffer
        let mut data = BytesMut::from("\x0BTest Data\x1C\x0D");
        let mut m = MllpCodec::new();

        let _result = m.decode(&mut data);

        assert_eq!(
            data.len(),
            0,
            "Decoder left data sitting in the buffer after read!"
        );
    }

    #[test]
    fn test_message_split_over_multiple_calls() {
        let mut mllp = MllpCodec::new();
        let mut call1 = BytesMut::from("\x0BTest");
        let mut call2 = BytesMut::from(" Data");
        let mut call3 = BytesMut::from(" Here\x1C\x0D");

        assert!(matches!(mllp.decode(&mut call1), Ok(None)));
        assert!(matches!(mllp.decode(&mut call2), Ok(None)));

        match mllp.decode(&mut call3) {
            Ok(Some(message)) => assert_eq!(&message[..], b"Test Data Here"),
            Ok(None) => panic!("decode didn't find a message on the third call..."),
            Err(err) => panic!("Unexpected error when decoding split packets: {:?}", err),
        }
    }

    #[test]
    fn queued_frames_are_returned_on_following_calls() {
        let mut mllp = MllpCodec::new();
        let mut data = wrap_for_mllp_mut("first");
        data.extend_from_slice(&wrap_for_mllp("second"));

        assert_eq!(&mllp.decode(&mut data).unwrap().unwrap()[..], b"first");
        assert!(data.is_empty());
        assert_eq!(&mllp.decode(&mut data).unwrap().unwrap()[..], b"second");
        assert!(mllp.decode(&mut data).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_is_an_error() {
        let mut mllp = MllpCodec::with_max_frame_size(8);
        let mut data = wrap_for_mllp_mut("this is far too long");

        assert!(matches!(
            mllp.decode(&mut data),
            Err(MllpError::FrameTooLarge { limit: 8 })
        ));
    }
}

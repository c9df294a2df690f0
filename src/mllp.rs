//! The non-network half of MLLP: wrapping payloads in a block and recovering
//! payloads from an arbitrary stream of reads.
//!
//! A frame on the wire is `<VT> payload <FS><CR>`.  The receiving side is a
//! byte-at-a-time state machine, so a frame can be split over any number of
//! reads and a single read may carry any number of frames.

use std::collections::VecDeque;

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;

use crate::error::MllpError;

/// Vertical-Tab char, the marker for the start of a message
pub const START_BLOCK: u8 = 0x0B;
/// File-Separator char, the marker for the end of a message
pub const END_BLOCK: u8 = 0x1C;
/// CR, sent straight after the end block
pub const CARRIAGE_RETURN: u8 = 0x0D;

/// Default ceiling on a single frame, 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Wraps `payload` in an MLLP block.  The payload is not inspected.
pub fn wrap(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + 3); //we need an extra 3 bytes on top of the message proper
    buf.put_u8(START_BLOCK);
    buf.put_slice(payload);
    buf.put_u8(END_BLOCK);
    buf.put_u8(CARRIAGE_RETURN);
    buf.freeze()
}

/// Returns the payload of the first complete frame in `data`, if there is one.
pub fn unwrap(data: &[u8]) -> Option<Bytes> {
    let mut mllp = Mllp::unbounded();
    // an unbounded framer can't overflow
    mllp.receive(data).ok()?;
    mllp.next_message()
}

/// The state of our state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParseState {
    /// We are waiting for a StartBlock byte to indicate a new message
    WaitingForStartBlock,
    /// All data is considered message data, we're waiting to see an End Block byte
    ReadingData,
    /// We've received an End-Block char, and a CR may follow
    ExpectingCarriageReturn,
}

/// Streaming MLLP frame reassembly.
#[derive(Debug)]
pub struct Mllp {
    state: ParseState,
    current_message: BytesMut,
    completed: VecDeque<Bytes>,
    max_frame_size: Option<usize>,
}

impl Default for Mllp {
    fn default() -> Self {
        Mllp::new()
    }
}

impl Mllp {
    /// A framer with the [`DEFAULT_MAX_FRAME_SIZE`] limit.
    pub fn new() -> Mllp {
        Mllp::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(limit: usize) -> Mllp {
        Mllp {
            state: ParseState::WaitingForStartBlock,
            current_message: BytesMut::new(),
            completed: VecDeque::new(),
            max_frame_size: Some(limit),
        }
    }

    /// A framer that will buffer a partial frame without limit.
    pub fn unbounded() -> Mllp {
        Mllp {
            max_frame_size: None,
            ..Mllp::with_max_frame_size(0)
        }
    }

    /// Takes the oldest completed frame, if any.
    pub fn next_message(&mut self) -> Option<Bytes> {
        self.completed.pop_front()
    }

    /// Number of completed frames waiting in [`next_message`](Self::next_message).
    pub fn pending(&self) -> usize {
        self.completed.len()
    }

    /// True while part of a frame has been read but not its end block.
    pub fn in_message(&self) -> bool {
        self.state == ParseState::ReadingData
    }

    /// Feeds a chunk of the stream through the state machine.
    ///
    /// Returns the number of completed frames now waiting.  When a frame outgrows
    /// the limit the partial data is discarded, the framer resets to wait for the
    /// next start block, and [`MllpError::FrameTooLarge`] is returned.  Frames
    /// completed earlier in the same chunk stay queued.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<usize, MllpError> {
        for b in bytes {
            match self.state {
                ParseState::WaitingForStartBlock | ParseState::ExpectingCarriageReturn => {
                    if *b == START_BLOCK {
                        self.start_frame();
                    } else if *b == CARRIAGE_RETURN
                        && self.state == ParseState::ExpectingCarriageReturn
                    {
                        self.state = ParseState::WaitingForStartBlock;
                    } else {
                        //we are meant to ignore any other bytes between frames
                        trace!("MLLP: Ignoring byte {:#04x} outside of a frame", b);
                        self.state = ParseState::WaitingForStartBlock;
                    }
                }
                ParseState::ReadingData => match *b {
                    START_BLOCK => {
                        trace!(
                            "MLLP: Start block inside a frame, discarding {} buffered bytes",
                            self.current_message.len()
                        );
                        self.start_frame();
                    }
                    END_BLOCK => {
                        let msg = self.current_message.split().freeze();
                        trace!("MLLP: Completed frame of {} bytes", msg.len());
                        self.completed.push_back(msg);
                        self.state = ParseState::ExpectingCarriageReturn;
                    }
                    _ => {
                        if let Some(limit) = self.max_frame_size {
                            if self.current_message.len() >= limit {
                                self.current_message.clear();
                                self.state = ParseState::WaitingForStartBlock;
                                return Err(MllpError::FrameTooLarge { limit });
                            }
                        }
                        self.current_message.put_u8(*b);
                    }
                },
            }
        } // end for each byte

        Ok(self.completed.len())
    }

    fn start_frame(&mut self) {
        self.current_message.clear();
        self.state = ParseState::ReadingData; // we want to interpret all further bytes as message data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wrap_for_mllp(s: &str) -> Bytes {
        Bytes::from(format!("\x0B{}\x1C\x0D", s))
    }

    fn collect(mllp: &mut Mllp) -> Vec<Bytes> {
        std::iter::from_fn(|| mllp.next_message()).collect()
    }

    #[test]
    fn can_construct_without_error() {
        let m = Mllp::new();

        assert_eq!(m.state, ParseState::WaitingForStartBlock);
        assert!(
            m.current_message.is_empty(),
            "Why do we have a message directly after instantiation?"
        );
    }

    #[test]
    fn wraps_simple_data() {
        assert_eq!(wrap(b"abcd"), wrap_for_mllp("abcd"));
    }

    #[test]
    fn ensure_ignores_data_before_start_block() {
        let mut mllp = Mllp::new();

        assert_eq!(mllp.receive(b"abcd").unwrap(), 0);
        assert!(
            mllp.current_message.is_empty(),
            "Why do we have message data when we never sent a begin block?"
        );
    }

    #[test]
    fn ensure_partial_frame_is_not_returned() {
        let mut mllp = Mllp::new();

        assert_eq!(mllp.receive(b"\x0BTest Data").unwrap(), 0);
        assert!(mllp.in_message());
        assert_eq!(mllp.next_message(), None);
    }

    #[test]
    fn trailing_carriage_return_is_not_payload() {
        let mut mllp = Mllp::new();
        mllp.receive(&wrap_for_mllp("Test Data")).unwrap();

        assert_eq!(&mllp.next_message().unwrap()[..], b"Test Data");
        assert_eq!(mllp.state, ParseState::WaitingForStartBlock);
    }

    #[test]
    fn ensure_buffer_is_reset_per_message() {
        let mut mllp = Mllp::new();

        mllp.receive(&wrap_for_mllp("Test Data")).unwrap();
        assert_eq!(&mllp.next_message().unwrap()[..], b"Test Data");

        mllp.receive(&wrap_for_mllp("This is different")).unwrap();
        assert_eq!(&mllp.next_message().unwrap()[..], b"This is different");
    }

    #[test]
    fn new_start_block_discards_dangling_frame() {
        let mut mllp = Mllp::new();
        mllp.receive(b"\x0Bhalf a mess\x0Bwhole\x1C\x0D").unwrap();

        assert_eq!(collect(&mut mllp), vec![Bytes::from_static(b"whole")]);
    }

    #[test]
    fn multiple_frames_in_one_read() {
        let mut mllp = Mllp::new();
        let mut data = wrap_for_mllp("one").to_vec();
        data.extend_from_slice(&wrap_for_mllp("two"));
        data.extend_from_slice(b"noise");
        data.extend_from_slice(&wrap_for_mllp("three"));

        assert_eq!(mllp.receive(&data).unwrap(), 3);
        assert_eq!(
            collect(&mut mllp),
            vec![
                Bytes::from_static(b"one"),
                Bytes::from_static(b"two"),
                Bytes::from_static(b"three")
            ]
        );
    }

    #[test]
    fn end_block_without_carriage_return_still_completes() {
        let mut mllp = Mllp::new();
        mllp.receive(b"\x0Bfirst\x1C\x0Bsecond\x1C\x0D").unwrap();

        assert_eq!(
            collect(&mut mllp),
            vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")]
        );
    }

    #[test]
    fn oversized_frame_is_rejected_and_framer_recovers() {
        let mut mllp = Mllp::with_max_frame_size(4);

        match mllp.receive(b"\x0Btoo long") {
            Err(MllpError::FrameTooLarge { limit }) => assert_eq!(limit, 4),
            other => panic!("expected FrameTooLarge, got {:?}", other),
        }
        assert!(!mllp.in_message());

        mllp.receive(b"\x0Bok\x1C\x0D").unwrap();
        assert_eq!(&mllp.next_message().unwrap()[..], b"ok");
    }

    #[test]
    fn frame_at_exact_limit_is_accepted() {
        let mut mllp = Mllp::with_max_frame_size(4);
        mllp.receive(&wrap_for_mllp("abcd")).unwrap();
        assert_eq!(&mllp.next_message().unwrap()[..], b"abcd");
    }

    #[test]
    fn test_real_message() {
        let mut mllp = Mllp::new();
        let data = wrap_for_mllp("MSH|^~\\&|ZIS|1^AHospital|||200405141144||¶ADT^A01|20041104082400|P|2.3|||AL|NE|||8859/15|¶EVN|A01|20041104082400.0000+0100|20041104082400¶PID||\"\"|10||Vries^Danny^D.^^de||19951202|M|||Rembrandlaan^7^Leiden^^7301TH^\"\"^^P||\"\"|\"\"||\"\"|||||||\"\"|\"\"¶PV1||I|3w^301^\"\"^01|S|||100^van den Berg^^A.S.^^\"\"^dr|\"\"||9||||H||||20041104082400.0000+0100");

        assert_eq!(mllp.receive(&data).unwrap(), 1);
        let msg = mllp.next_message().unwrap();
        assert_eq!(msg.len(), 338);
    }

    #[test]
    fn every_split_point_yields_the_same_frames() {
        let mut stream = wrap_for_mllp("MSH|^~\\&|A").to_vec();
        stream.extend_from_slice(&wrap_for_mllp("MSH|^~\\&|B"));

        let mut whole = Mllp::new();
        whole.receive(&stream).unwrap();
        let expected = collect(&mut whole);
        assert_eq!(expected.len(), 2);

        for split in 0..=stream.len() {
            let mut mllp = Mllp::new();
            mllp.receive(&stream[..split]).unwrap();
            mllp.receive(&stream[split..]).unwrap();
            assert_eq!(collect(&mut mllp), expected, "split at {}", split);
        }
    }

    fn payload() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(
            any::<u8>().prop_filter("no framing bytes", |b| *b != START_BLOCK && *b != END_BLOCK),
            0..256,
        )
    }

    proptest! {
        #[test]
        fn unwrap_inverts_wrap(p in payload()) {
            prop_assert_eq!(unwrap(&wrap(&p)), Some(Bytes::from(p)));
        }

        #[test]
        fn chunking_does_not_change_frames(
            frames in proptest::collection::vec(payload(), 1..5),
            chunk in 1usize..17,
        ) {
            let stream: Vec<u8> = frames.iter().flat_map(|f| wrap(f).to_vec()).collect();

            let mut mllp = Mllp::new();
            for piece in stream.chunks(chunk) {
                mllp.receive(piece).unwrap();
            }
            let expected: Vec<Bytes> = frames.into_iter().map(Bytes::from).collect();
            prop_assert_eq!(collect(&mut mllp), expected);
        }
    }
}

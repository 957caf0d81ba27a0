use bapsf_motion_communication::communication::encode_frame;
use bapsf_motion_communication::read_frame;
use proptest::prelude::*;
use std::io::{self, Read};

/// Reader handing out at most `step` bytes per call
struct Chunked {
    data: Vec<u8>,
    pos: usize,
    step: usize,
}

impl Read for Chunked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

proptest! {
    #[test]
    fn prop_payload_survives_any_chunking(
        payload in "[A-Z]{2}(=[-0-9A-Z]{1,8})?",
        garbage in "[a-z]{0,6}",
        step in 1usize..12,
        chunk_size in 1usize..20,
    ) {
        let mut data = garbage.into_bytes();
        data.extend(encode_frame(&payload));
        let mut reader = Chunked { data, pos: 0, step };

        let read = read_frame(&mut reader, chunk_size).unwrap();
        prop_assert_eq!(read, payload.into_bytes());
    }
}

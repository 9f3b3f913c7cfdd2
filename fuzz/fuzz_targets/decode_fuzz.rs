#![no_main]
use libfuzzer_sys::fuzz_target;
use rollsync::protocol::{blocks, delta};
use rollsync::{DeltaEvent, Reconstructor};

fuzz_target!(|data: &[u8]| {
    // Decoders must only ever return errors on hostile input.
    let _ = blocks::read_blocks(&mut &data[..]);
    let _ = delta::read_delta(&mut &data[..], Vec::<DeltaEvent>::new());

    // Replay against a small basis so Match records hit the range checks.
    if data.len() >= 2 {
        let block_size = usize::from(data[0] % 16) + 1;
        let (basis, stream) = data[1..].split_at((data.len() - 1) / 2);
        if let Ok(mut rec) = Reconstructor::new(basis, Vec::new(), block_size) {
            let _ = delta::read_delta(&mut &stream[..], &mut rec);
        }
    }
});

#![no_main]
use libfuzzer_sys::fuzz_target;
use rollsync::sync;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the block size; the rest splits into basis and new.
    let block_size = usize::from(data[0] % 64) + 1;
    let payload = &data[1..];
    let (basis, new) = payload.split_at(payload.len() / 2);

    let sig = sync::signature_all(basis, block_size).unwrap();
    let delta = sync::delta_all(&sig, new, block_size).unwrap();
    let patched = sync::patch_all(basis, &delta, block_size).unwrap();
    assert_eq!(patched, new, "roundtrip mismatch");
});

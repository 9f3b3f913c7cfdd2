use proptest::prelude::*;
use rollsync::engine::{self, DeltaEvents};
use rollsync::hash::rolling;
use rollsync::protocol::{blocks, delta};
use rollsync::sync;
use rollsync::{BlockCatalog, DeltaEvent, Reconstructor};

fn reconstruct(basis: &[u8], new: &[u8], block_size: usize) -> Vec<u8> {
    let catalog = BlockCatalog::from_slice(basis, block_size).unwrap();
    let mut rec = Reconstructor::new(basis, Vec::new(), block_size).unwrap();
    engine::diff(&catalog, block_size, new, &mut rec).unwrap();
    rec.into_inner()
}

proptest! {
    #[test]
    fn prop_rolling_update_matches_checksum(
        data in proptest::collection::vec(any::<u8>(), 2..512),
        window in 1usize..64
    ) {
        let window = window.min(data.len() - 1);
        let mut sum = rolling::checksum(&data[..window]);
        for start in 1..=data.len() - window {
            sum = rolling::update(sum, data[start - 1], data[start + window - 1], window);
            prop_assert_eq!(sum, rolling::checksum(&data[start..start + window]), "slide to {}", start);
        }
    }

    #[test]
    fn prop_diff_reconstruct_roundtrip(
        basis in proptest::collection::vec(any::<u8>(), 0..4096),
        new in proptest::collection::vec(any::<u8>(), 0..4096),
        block_size in 1usize..300
    ) {
        prop_assert_eq!(reconstruct(&basis, &new, block_size), new);
    }

    #[test]
    fn prop_edited_copy_roundtrip(
        basis in proptest::collection::vec(any::<u8>(), 64..8192),
        edits in proptest::collection::vec((any::<usize>(), any::<u8>()), 0..16),
        block_size in 4usize..128
    ) {
        let mut new = basis.clone();
        for (pos, byte) in edits {
            let pos = pos % (new.len() + 1);
            new.insert(pos, byte);
        }
        prop_assert_eq!(reconstruct(&basis, &new, block_size), new);
    }

    #[test]
    fn prop_wire_pipeline_roundtrip(
        basis in proptest::collection::vec(any::<u8>(), 0..2048),
        new in proptest::collection::vec(any::<u8>(), 0..2048),
        block_size in 1usize..64
    ) {
        let sig = sync::signature_all(&basis, block_size).unwrap();
        let delta = sync::delta_all(&sig, &new, block_size).unwrap();
        prop_assert_eq!(sync::patch_all(&basis, &delta, block_size).unwrap(), new);
    }

    #[test]
    fn prop_catalog_is_deterministic(
        basis in proptest::collection::vec(any::<u8>(), 0..4096),
        block_size in 1usize..256
    ) {
        let a = BlockCatalog::from_slice(&basis, block_size).unwrap();
        let b = BlockCatalog::build(&basis[..], block_size).unwrap();
        prop_assert_eq!(a.len(), basis.len() / block_size);
        prop_assert_eq!(a.blocks(), b.blocks());
    }

    #[test]
    fn prop_catalog_wire_roundtrip(
        basis in proptest::collection::vec(any::<u8>(), 0..4096),
        block_size in 1usize..256
    ) {
        let catalog = BlockCatalog::from_slice(&basis, block_size).unwrap();
        let bytes = blocks::encode_blocks(&catalog).unwrap();
        let decoded = blocks::read_blocks(&mut &bytes[..]).unwrap();
        prop_assert_eq!(decoded, catalog);
    }

    #[test]
    fn prop_event_stream_is_well_formed(
        basis in proptest::collection::vec(0u8..4, 0..1024),
        new in proptest::collection::vec(0u8..4, 0..1024),
        block_size in 1usize..16
    ) {
        let catalog = BlockCatalog::from_slice(&basis, block_size).unwrap();
        let events: Vec<DeltaEvent> = DeltaEvents::new(&catalog, &new[..], block_size)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        prop_assert_eq!(events.last(), Some(&DeltaEvent::Finished));
        let body = &events[..events.len() - 1];
        prop_assert!(!body.contains(&DeltaEvent::Finished));
        for pair in body.windows(2) {
            let both_literal = matches!(pair, [DeltaEvent::Literal(_), DeltaEvent::Literal(_)]);
            prop_assert!(!both_literal, "adjacent literals must be coalesced");
        }
        for event in body {
            match event {
                DeltaEvent::Match(i) => prop_assert!((*i as usize) < catalog.len()),
                DeltaEvent::Literal(data) => prop_assert!(!data.is_empty()),
                DeltaEvent::Finished => unreachable!(),
            }
        }
    }

    #[test]
    fn prop_decoder_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = delta::read_delta(&mut &data[..], Vec::<DeltaEvent>::new());
        let _ = blocks::read_blocks(&mut &data[..]);
    }
}

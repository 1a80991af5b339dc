// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use aura_core::ParticleFrame;
use proptest::prelude::*;

use crate::frame::{decode_frame, encode_frame};

proptest! {
    #[test]
    fn encode_decode_round_trips_for_any_particle_count(
        particle_count in 0usize..500,
        seed in any::<u32>(),
    ) {
        let mut frame = ParticleFrame::zeroed(particle_count, 0, 0);
        for (i, p) in frame.positions.iter_mut().enumerate() {
            let base = (seed as f32) + i as f32;
            *p = [base.sin(), base.cos(), base * 0.5];
        }
        let bytes = encode_frame(&frame);
        let decoded = decode_frame(&bytes).unwrap();
        prop_assert_eq!(decoded.positions, frame.positions);
    }

    #[test]
    fn decode_never_panics_on_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_frame(&bytes);
    }
}

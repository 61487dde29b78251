//! The variant-selection decision table, exercised through engine
//! construction.

use brotli::encode::types::{choose_hasher, EncoderParams};
use brotli::hash::types::{Hasher, HasherImpl};

fn hasher_for(quality: u32, lgwin: u32, size_hint: u64) -> Hasher {
    let mut p = EncoderParams {
        quality,
        lgwin,
        size_hint,
        ..EncoderParams::default()
    };
    p.hasher = choose_hasher(&p);
    Hasher::new(&p)
}

#[test]
fn every_quality_resolves_to_a_variant() {
    for quality in 0..=11u32 {
        for lgwin in [10u32, 16, 22, 24] {
            let h = hasher_for(quality, lgwin, 0);
            // Lookahead and key length must be consistent with the variant.
            assert!(h.hash_type_length() >= 4);
            assert!(h.store_lookahead() >= h.hash_type_length());
        }
    }
}

#[test]
fn table_memory_scales_with_parameters() {
    // The candidate-ring variants grow with quality (block size doubles per
    // level); the fixed-layout variants do not.
    let q5 = hasher_for(5, 22, 0).hash_mem_size();
    let q9 = hasher_for(9, 22, 0).hash_mem_size();
    assert!(q9 > q5, "deeper search must hold more candidates");
    let fixed_a = hasher_for(2, 10, 0).hash_mem_size();
    let fixed_b = hasher_for(2, 24, 0).hash_mem_size();
    assert_eq!(fixed_a, fixed_b, "sweep tables are window-independent");
    // The tree matcher scales with the window instead.
    let tree_small = hasher_for(11, 10, 0).hash_mem_size();
    let tree_large = hasher_for(11, 18, 0).hash_mem_size();
    assert!(tree_large > tree_small);
}

#[test]
fn variant_families_match_quality_tiers() {
    assert!(matches!(hasher_for(2, 22, 0).imp, HasherImpl::H2(_)));
    assert!(matches!(hasher_for(3, 22, 0).imp, HasherImpl::H3(_)));
    assert!(matches!(hasher_for(4, 22, 0).imp, HasherImpl::H4(_)));
    assert!(matches!(hasher_for(4, 22, 1 << 21).imp, HasherImpl::H54(_)));
    assert!(matches!(hasher_for(5, 16, 0).imp, HasherImpl::H40(_)));
    assert!(matches!(hasher_for(7, 16, 0).imp, HasherImpl::H41(_)));
    assert!(matches!(hasher_for(9, 16, 0).imp, HasherImpl::H42(_)));
    assert!(matches!(hasher_for(9, 22, 0).imp, HasherImpl::H5(_)));
    assert!(matches!(hasher_for(6, 20, 2 << 20).imp, HasherImpl::H6(_)));
    assert!(matches!(hasher_for(10, 18, 0).imp, HasherImpl::H10(_)));
    assert!(matches!(hasher_for(11, 18, 0).imp, HasherImpl::H10(_)));
}

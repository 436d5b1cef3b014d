use test_case::test_case;

use crate::error::Error;
use crate::variant::{CoreType, Variant};

#[test_case(CoreType::Ntt2_12, 6; "ntt 2^12 pairs with row exponent 6")]
#[test_case(CoreType::Ntt2_18, 9; "ntt 2^18 pairs with row exponent 9")]
#[test_case(CoreType::Ntt2_24, 12; "ntt 2^24 pairs with row exponent 12")]
#[test_case(CoreType::Reverse, 1; "reverse minimum row exponent")]
#[test_case(CoreType::Reverse, 12; "reverse maximum row exponent")]
fn supported_pairs_construct(core_type: CoreType, log_row_size: u32) {
    let variant = Variant::new(core_type, log_row_size).unwrap();
    assert_eq!(variant.core_type(), core_type);
    assert_eq!(variant.row_size(), 1 << log_row_size);
    assert_eq!(variant.capacity(), 1 << (2 * log_row_size));
}

#[test_case(CoreType::Ntt2_12, 7)]
#[test_case(CoreType::Ntt2_18, 6)]
#[test_case(CoreType::Ntt2_24, 9)]
#[test_case(CoreType::Reverse, 0)]
#[test_case(CoreType::Reverse, 13)]
fn unsupported_pairs_fail_at_construction(core_type: CoreType, log_row_size: u32) {
    assert!(matches!(
        Variant::new(core_type, log_row_size),
        Err(Error::UnsupportedVariant { .. })
    ));
}

#[test]
fn preset_constructors_match_closed_set() {
    assert_eq!(Variant::ntt_2_12(), Variant::new(CoreType::Ntt2_12, 6).unwrap());
    assert_eq!(Variant::ntt_2_18(), Variant::new(CoreType::Ntt2_18, 9).unwrap());
    assert_eq!(Variant::ntt_2_24(), Variant::new(CoreType::Ntt2_24, 12).unwrap());
    assert_eq!(Variant::reverse(6).unwrap(), Variant::new(CoreType::Reverse, 6).unwrap());
}

#[test]
fn ntt_2_12_capacity_is_4096() {
    let variant = Variant::ntt_2_12();
    assert_eq!(variant.row_size(), 64);
    assert_eq!(variant.capacity(), 4096);
}

#[test]
fn only_reverse_needs_core_launch() {
    assert!(Variant::reverse(6).unwrap().needs_core_launch());
    assert!(!Variant::ntt_2_12().needs_core_launch());
    assert!(!Variant::ntt_2_18().needs_core_launch());
    assert!(!Variant::ntt_2_24().needs_core_launch());
}

//! Property-based tests for the 20-bit DPCD address newtype.

use core::convert::TryFrom;
use platform::AuxAddress;

proptest::proptest! {
    /// force_raw never produces an out-of-range address.
    #[test]
    fn force_raw_is_always_valid(raw in proptest::prelude::any::<u32>()) {
        let a = AuxAddress::force_raw(raw);
        assert!(AuxAddress::is_valid(a.get()));
        assert_eq!(a.get(), raw & AuxAddress::MASK);
    }

    /// TryFrom accepts exactly the values force_raw leaves unchanged.
    #[test]
    fn try_from_agrees_with_mask(raw in proptest::prelude::any::<u32>()) {
        let ok = AuxAddress::try_from(raw).is_ok();
        assert_eq!(ok, raw & AuxAddress::MASK == raw);
    }

    /// Adding an offset is modular arithmetic in the 20-bit space.
    #[test]
    fn add_is_modular(base in 0u32..=0xF_FFFF, offset in proptest::prelude::any::<u32>()) {
        let a = AuxAddress::force_raw(base) + offset;
        assert_eq!(a.get(), base.wrapping_add(offset) & AuxAddress::MASK);
    }
}

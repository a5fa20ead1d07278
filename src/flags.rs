//! Option bits passed through dispatch to plugins.
//!
//! The low 16 bits are reserved for plugin-specific meaning; the crate only
//! interprets the named constants.

use core::ops::{BitOr, BitOrAssign};

macro_rules! flag_set {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            pub const EMPTY: Self = $name(0);

            pub const fn from_bits(bits: u32) -> Self {
                $name(bits)
            }

            pub const fn bits(self) -> u32 {
                self.0
            }

            pub const fn contains(self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            pub const fn with(self, other: Self) -> Self {
                $name(self.0 | other.0)
            }

            pub const fn without(self, other: Self) -> Self {
                $name(self.0 & !other.0)
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.with(rhs)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }
    };
}

flag_set!(
    /// Options for [`crate::PluginRegistry::load`].
    LoadFlags
);

flag_set!(
    /// Options for [`crate::PluginRegistry::save`].
    SaveFlags
);

impl LoadFlags {
    /// Read header information only; the plugin returns a bitmap without pixels.
    pub const HEADER_ONLY: Self = LoadFlags(1 << 31);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_operations() {
        let custom = LoadFlags::from_bits(0x2);
        let flags = LoadFlags::HEADER_ONLY | custom;
        assert!(flags.contains(LoadFlags::HEADER_ONLY));
        assert!(flags.contains(custom));
        assert!(!flags.without(custom).contains(custom));
        assert!(!LoadFlags::EMPTY.contains(LoadFlags::HEADER_ONLY));
        let mut s = SaveFlags::EMPTY;
        s |= SaveFlags::from_bits(1);
        assert_eq!(s.bits(), 1);
    }
}

use core::fmt::Debug;

/// Little endian on-disk field, stored in disk byte order
#[derive(Copy, Clone, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Little<T: Copy + Clone + Default + Debug + PartialEq + Eq + Sized>(T);

macro_rules! define {
    ($type:ty) => {
        impl Little<$type> {
            pub const fn new(value: $type) -> Self {
                Self(<$type>::to_le(value))
            }

            pub fn to_ne(self) -> $type {
                <$type>::from_le(self.0)
            }
        }

        impl From<$type> for Little<$type> {
            #[inline]
            fn from(t: $type) -> Self {
                Self::new(t)
            }
        }

        impl Debug for Little<$type> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{:#x}", self.to_ne())
            }
        }
    };
}

define!(u16);
define!(u32);

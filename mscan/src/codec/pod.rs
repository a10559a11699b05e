//! Raw byte views over wire layouts

use std::mem::size_of;

use mscan_common::Pod;

/// Copy a wire struct out of an exactly-sized byte slice
pub(crate) fn pod_from_bytes<T: Pod>(bytes: &[u8]) -> T {
    assert_eq!(bytes.len(), size_of::<T>(), "wire buffer does not match layout size");
    // SAFETY: T is Pod (repr(C), no padding, every bit pattern valid) and the
    // slice holds exactly size_of::<T>() bytes. read_unaligned tolerates any alignment.
    #[allow(unsafe_code)]
    unsafe {
        std::ptr::read_unaligned(bytes.as_ptr().cast::<T>())
    }
}

/// View a wire struct as its bytes
pub(crate) fn pod_bytes<T: Pod>(value: &T) -> &[u8] {
    // SAFETY: T is Pod, so it has no padding and all size_of::<T>() bytes are initialised.
    #[allow(unsafe_code)]
    unsafe {
        std::slice::from_raw_parts(std::ptr::from_ref(value).cast::<u8>(), size_of::<T>())
    }
}

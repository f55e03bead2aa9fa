pub mod aligned_buffer;
pub mod checksum;

pub use aligned_buffer::AlignedBuffer;
pub use checksum::{calculate_checksum, verify_checksum, Crc16, CrcService};

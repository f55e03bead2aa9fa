#![cfg_attr(not(any(test, feature = "simulator")), no_std)]

#[macro_use]
mod fmt;

pub mod protocol;
pub mod hal;
pub mod utils;

// 重新导出核心模块
pub use protocol::{ChunkId, ChunkType, Chunks, Command, DeviceType, Header, Packet, ProtocolError};
pub use hal::{Hardware, HalError, Transport, TransportEvent};
pub use utils::{AlignedBuffer, CrcService, Crc16};

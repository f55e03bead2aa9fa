//! AURA 总线协议：帧头、TLV 数据块与完整帧的编解码。
//!
//! 线上格式（小端）：
//!
//! ```text
//! | protocol u32 | cnt u32 | uid_src u32 | uid_dest u32 | cmd u16 | data_sz u16 | payload | crc u16 |
//! ```
//!
//! 负载由若干紧密排列的数据块组成，每个数据块为 `id u8 | type u8 | size u16 | value`。

pub mod chunk;
pub mod header;
pub mod packet;

use core::fmt;

pub use chunk::{Chunk, ChunkType, ChunkValue, Chunks, ScalarArray};
pub use header::Header;
pub use packet::Packet;

/// 协议魔数，小端序下即 ASCII "AURA"
pub const AURA_PROTOCOL: u32 = 0x4152_5541;
/// 上位机（PC）的 UID，同时也是广播目的地址
pub const BROADCAST_UID: u32 = 0x0000_0000;
/// 帧头长度
pub const HEADER_SIZE: usize = 20;
/// 数据块头长度
pub const CHUNK_HEADER_SIZE: usize = 4;
/// 帧尾 CRC 长度
pub const CRC_SIZE: usize = 2;
/// 负载上限
pub const MAX_DATA_SIZE: usize = 128;
/// 一帧的最大字节数
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_DATA_SIZE + CRC_SIZE;

/// 根据负载长度计算整帧长度
pub const fn frame_len(data_sz: usize) -> usize {
    HEADER_SIZE + data_sz + CRC_SIZE
}

/// 命令字
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Command {
    ReqWhoami = 1,
    AnsWhoami = 2,
    ReqData = 3,
    AnsData = 4,
    ReqWrite = 5,
    AnsWrite = 6,
    /// 保留，当前分发逻辑不使用
    ReqRead = 7,
    /// 保留，当前分发逻辑不使用
    AnsRead = 8,
}

impl Command {
    pub fn from_u16(raw: u16) -> Option<Self> {
        Some(match raw {
            1 => Self::ReqWhoami,
            2 => Self::AnsWhoami,
            3 => Self::ReqData,
            4 => Self::AnsData,
            5 => Self::ReqWrite,
            6 => Self::AnsWrite,
            7 => Self::ReqRead,
            8 => Self::AnsRead,
            _ => return None,
        })
    }
}

/// 设备类型目录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum DeviceType {
    Lb75bd = 1,
    Tmp112 = 2,
    Sht30 = 3,
    Zs05 = 4,
    Bmp180 = 5,
    Lps22hb = 6,
    Doorknot = 7,
    /// 扩展器/中继
    Expander = 8,
    /// 通用水浸传感器
    WetSens = 9,
}

impl DeviceType {
    pub fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::Lb75bd,
            2 => Self::Tmp112,
            3 => Self::Sht30,
            4 => Self::Zs05,
            5 => Self::Bmp180,
            6 => Self::Lps22hb,
            7 => Self::Doorknot,
            8 => Self::Expander,
            9 => Self::WetSens,
            _ => return None,
        })
    }
}

/// 数据块语义标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChunkId {
    /// 设备类型
    Type = 1,
    /// 中继路径上的 UID 链
    Uids = 2,
    OnOff = 3,
    Temp = 4,
    Hum = 5,
    Press = 6,
    /// 水浸传感器读数
    WetSens = 7,
    /// 断开继电器，值为继电器序号
    RelayOpen = 8,
    /// 闭合继电器，值为继电器序号
    RelayClose = 9,
    /// 继电器 1 状态
    Relay1 = 10,
    /// 继电器 2 状态
    Relay2 = 11,
    /// 电池电压 (mV)
    Battery = 12,
}

impl ChunkId {
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            1 => Self::Type,
            2 => Self::Uids,
            3 => Self::OnOff,
            4 => Self::Temp,
            5 => Self::Hum,
            6 => Self::Press,
            7 => Self::WetSens,
            8 => Self::RelayOpen,
            9 => Self::RelayClose,
            10 => Self::Relay1,
            11 => Self::Relay2,
            12 => Self::Battery,
            _ => return None,
        })
    }
}

/// 编解码错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// 追加后负载将超过 128 字节上限
    PayloadOverflow,
    /// 输入字节不足一个完整的帧头/帧
    Truncated,
    /// 帧头魔数不是 AURA
    BadMagic,
    /// 数据块声明的长度越过了剩余负载
    MalformedChunk,
    /// 数据块长度与其类型不符
    ChunkTypeMismatch,
    /// 未知的数据块类型标签
    UnknownChunkType,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::PayloadOverflow => "payload exceeds 128 bytes",
            Self::Truncated => "frame truncated",
            Self::BadMagic => "bad protocol magic",
            Self::MalformedChunk => "chunk overruns payload",
            Self::ChunkTypeMismatch => "chunk size does not match its type",
            Self::UnknownChunkType => "unknown chunk type",
        };
        f.write_str(msg)
    }
}

use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

use crate::protocol::{ProtocolError, AURA_PROTOCOL, BROADCAST_UID, HEADER_SIZE, MAX_DATA_SIZE};

/// 帧头在线上的布局，所有字段小端、无填充
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Clone, Copy)]
struct WireHeader {
    protocol: U32<LittleEndian>,
    cnt: U32<LittleEndian>,
    uid_src: U32<LittleEndian>,
    uid_dest: U32<LittleEndian>,
    cmd: U16<LittleEndian>,
    data_sz: U16<LittleEndian>,
}

const _: () = assert!(core::mem::size_of::<WireHeader>() == HEADER_SIZE);

/// 帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    /// 协议魔数
    pub protocol: u32,
    /// 序号，由发送方分配
    pub cnt: u32,
    pub uid_src: u32,
    /// 0 表示广播
    pub uid_dest: u32,
    /// 命令字原始值，未知命令也原样保留
    pub cmd: u16,
    /// 负载长度，不含帧头和 CRC
    pub data_sz: u16,
}

impl Header {
    /// 以 AURA 魔数构造帧头，负载长度为 0
    pub fn new(cnt: u32, uid_src: u32, uid_dest: u32, cmd: u16) -> Self {
        Self {
            protocol: AURA_PROTOCOL,
            cnt,
            uid_src,
            uid_dest,
            cmd,
            data_sz: 0,
        }
    }

    /// 从字节前缀解析帧头，不校验魔数
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (wire, _) = LayoutVerified::<_, WireHeader>::new_unaligned_from_prefix(bytes)
            .ok_or(ProtocolError::Truncated)?;
        let wire = wire.into_ref();
        Ok(Self {
            protocol: wire.protocol.get(),
            cnt: wire.cnt.get(),
            uid_src: wire.uid_src.get(),
            uid_dest: wire.uid_dest.get(),
            cmd: wire.cmd.get(),
            data_sz: wire.data_sz.get(),
        })
    }

    /// 编码为 20 字节线上格式
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let wire = WireHeader {
            protocol: U32::new(self.protocol),
            cnt: U32::new(self.cnt),
            uid_src: U32::new(self.uid_src),
            uid_dest: U32::new(self.uid_dest),
            cmd: U16::new(self.cmd),
            data_sz: U16::new(self.data_sz),
        };
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(wire.as_bytes());
        out
    }

    /// 把帧头写入 `out` 的前 20 字节
    pub fn encode(&self, out: &mut [u8]) -> Result<(), ProtocolError> {
        let dst = out.get_mut(..HEADER_SIZE).ok_or(ProtocolError::Truncated)?;
        dst.copy_from_slice(&self.to_bytes());
        Ok(())
    }

    pub fn has_valid_magic(&self) -> bool {
        self.protocol == AURA_PROTOCOL
    }

    pub fn is_broadcast(&self) -> bool {
        self.uid_dest == BROADCAST_UID
    }

    /// 声明的负载长度是否越过上限
    pub fn is_oversized(&self) -> bool {
        self.data_sz as usize > MAX_DATA_SIZE
    }

    pub fn command(&self) -> Option<crate::protocol::Command> {
        crate::protocol::Command::from_u16(self.cmd)
    }
}

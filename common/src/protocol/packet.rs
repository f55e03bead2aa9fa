use heapless::Vec;

use crate::protocol::chunk::encode_chunk;
use crate::protocol::{
    frame_len, ChunkId, ChunkType, Chunks, Header, ProtocolError, CHUNK_HEADER_SIZE, CRC_SIZE,
    HEADER_SIZE, MAX_DATA_SIZE, MAX_FRAME_SIZE,
};
use crate::utils::CrcService;

/// 完整的 AURA 帧：帧头 + 负载 + CRC
///
/// 缓冲区始终保持成帧状态，`header.data_sz` 与实际负载长度一致；
/// 修改后需要调用 [`Packet::seal`] 重新计算 CRC。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: Header,
    bytes: Vec<u8, MAX_FRAME_SIZE>,
}

impl Packet {
    /// 创建空负载的帧，CRC 置零
    pub fn new(mut header: Header) -> Self {
        header.data_sz = 0;
        let mut bytes = Vec::new();
        // 容量足够容纳帧头和 CRC
        let _ = bytes.extend_from_slice(&header.to_bytes());
        let _ = bytes.extend_from_slice(&[0; CRC_SIZE]);
        Self { header, bytes }
    }

    /// 从收到的整帧字节构造，要求长度与 `data_sz` 完全吻合
    pub fn from_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        let header = Header::decode(frame)?;
        if !header.has_valid_magic() {
            return Err(ProtocolError::BadMagic);
        }
        if header.is_oversized() {
            return Err(ProtocolError::PayloadOverflow);
        }
        if frame.len() != frame_len(header.data_sz as usize) {
            return Err(ProtocolError::Truncated);
        }
        let bytes = Vec::from_slice(frame).map_err(|_| ProtocolError::PayloadOverflow)?;
        Ok(Self { header, bytes })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// 修改帧头字段；`protocol` 与 `data_sz` 由帧自身维护，修改会被忽略
    pub fn edit_header(&mut self, edit: impl FnOnce(&mut Header)) {
        let protocol = self.header.protocol;
        let data_sz = self.header.data_sz;
        edit(&mut self.header);
        self.header.protocol = protocol;
        self.header.data_sz = data_sz;
        self.write_header();
    }

    fn write_header(&mut self) {
        let raw = self.header.to_bytes();
        self.bytes[..HEADER_SIZE].copy_from_slice(&raw);
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..self.bytes.len() - CRC_SIZE]
    }

    /// 遍历负载中的数据块
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks::new(self.payload())
    }

    /// 在负载末尾追加一个数据块，超出 128 字节上限时失败且帧不变
    pub fn append_chunk(&mut self, id: u8, ty: ChunkType, value: &[u8]) -> Result<(), ProtocolError> {
        if !ty.accepts_len(value.len()) {
            return Err(ProtocolError::ChunkTypeMismatch);
        }
        let payload_len = self.payload().len();
        let added = CHUNK_HEADER_SIZE + value.len();
        if payload_len + added > MAX_DATA_SIZE {
            return Err(ProtocolError::PayloadOverflow);
        }

        let start = HEADER_SIZE + payload_len;
        self.bytes
            .resize(start + added + CRC_SIZE, 0)
            .map_err(|_| ProtocolError::PayloadOverflow)?;
        encode_chunk(&mut self.bytes[start..start + added], id, ty as u8, value)?;
        // CRC 区域清零，等待 seal
        let end = self.bytes.len();
        self.bytes[end - CRC_SIZE..].fill(0);

        self.header.data_sz = (payload_len + added) as u16;
        self.write_header();
        Ok(())
    }

    /// 找到第一个标签为 `id` 的数据块，返回其值字节的可变引用
    pub fn chunk_value_mut(&mut self, id: ChunkId) -> Option<&mut [u8]> {
        let (start, len) = {
            let mut chunks = self.chunks();
            loop {
                let offset = chunks.consumed();
                let chunk = chunks.next()?;
                if chunk.id == id as u8 {
                    break (HEADER_SIZE + offset + CHUNK_HEADER_SIZE, chunk.value.len());
                }
            }
        };
        self.bytes.get_mut(start..start + len)
    }

    /// 帧尾当前存放的 CRC
    pub fn crc(&self) -> u16 {
        let end = self.bytes.len();
        u16::from_le_bytes([self.bytes[end - 2], self.bytes[end - 1]])
    }

    /// 对帧头和负载计算 CRC 并写入帧尾
    pub fn seal<C: CrcService + ?Sized>(&mut self, crc: &C) {
        let end = self.bytes.len();
        let value = crc.compute(&self.bytes[..end - CRC_SIZE]);
        self.bytes[end - CRC_SIZE..].copy_from_slice(&value.to_le_bytes());
    }

    pub fn is_valid<C: CrcService + ?Sized>(&self, crc: &C) -> bool {
        crc.validate(&self.bytes)
    }

    /// 整帧字节，可直接交给发送原语
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

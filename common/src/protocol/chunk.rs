use zerocopy::byteorder::{LittleEndian, U16};
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

use crate::protocol::{ChunkId, ProtocolError, CHUNK_HEADER_SIZE};

/// 数据块头在线上的布局
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Clone, Copy)]
struct WireChunkHeader {
    id: u8,
    ty: u8,
    size: U16<LittleEndian>,
}

const _: () = assert!(core::mem::size_of::<WireChunkHeader>() == CHUNK_HEADER_SIZE);

/// 数据块值的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChunkType {
    None = 0,
    I8 = 1,
    U8 = 2,
    I16 = 3,
    U16 = 4,
    I32 = 5,
    U32 = 6,
    F32 = 7,
    F64 = 8,
    Str = 9,
    ArrI8 = 10,
    ArrU8 = 11,
    ArrI16 = 12,
    ArrU16 = 13,
    ArrI32 = 14,
    ArrU32 = 15,
    ArrF32 = 16,
    ArrF64 = 17,
}

impl ChunkType {
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::None,
            1 => Self::I8,
            2 => Self::U8,
            3 => Self::I16,
            4 => Self::U16,
            5 => Self::I32,
            6 => Self::U32,
            7 => Self::F32,
            8 => Self::F64,
            9 => Self::Str,
            10 => Self::ArrI8,
            11 => Self::ArrU8,
            12 => Self::ArrI16,
            13 => Self::ArrU16,
            14 => Self::ArrI32,
            15 => Self::ArrU32,
            16 => Self::ArrF32,
            17 => Self::ArrF64,
            _ => return None,
        })
    }

    pub fn is_array(self) -> bool {
        self.element_type().is_some()
    }

    /// 数组类型对应的元素类型
    pub fn element_type(self) -> Option<ChunkType> {
        Some(match self {
            Self::ArrI8 => Self::I8,
            Self::ArrU8 => Self::U8,
            Self::ArrI16 => Self::I16,
            Self::ArrU16 => Self::U16,
            Self::ArrI32 => Self::I32,
            Self::ArrU32 => Self::U32,
            Self::ArrF32 => Self::F32,
            Self::ArrF64 => Self::F64,
            _ => return None,
        })
    }

    /// 标量类型的字节宽度，字符串和数组返回 `None`
    pub fn scalar_size(self) -> Option<usize> {
        match self {
            Self::None => Some(0),
            Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::F64 => Some(8),
            _ => None,
        }
    }

    /// 检查值长度是否符合该类型
    pub fn accepts_len(self, len: usize) -> bool {
        if let Some(size) = self.scalar_size() {
            return len == size;
        }
        match self.element_type().and_then(ChunkType::scalar_size) {
            Some(elem) => len % elem == 0,
            // 字符串任意长度
            None => true,
        }
    }
}

/// 同类标量数组的只读视图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarArray<'a> {
    element: ChunkType,
    bytes: &'a [u8],
}

impl<'a> ScalarArray<'a> {
    pub fn element_type(&self) -> ChunkType {
        self.element
    }

    fn element_size(&self) -> usize {
        self.element.scalar_size().unwrap_or(1).max(1)
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / self.element_size()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 第 `index` 个元素的原始小端字节
    pub fn element(&self, index: usize) -> Option<&'a [u8]> {
        let size = self.element_size();
        let start = index.checked_mul(size)?;
        self.bytes.get(start..start.checked_add(size)?)
    }

    /// 按 u32 读取元素，仅对 32 位整数数组有意义
    pub fn iter_u32(&self) -> impl Iterator<Item = u32> + 'a {
        self.bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// 解码后的数据块值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChunkValue<'a> {
    None,
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
    Str(&'a str),
    Array(ScalarArray<'a>),
}

impl<'a> ChunkValue<'a> {
    /// 把整数标量统一读成 u32，其它类型返回 `None`
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Self::U8(v) => Some(v as u32),
            Self::U16(v) => Some(v as u32),
            Self::U32(v) => Some(v),
            Self::I8(v) if v >= 0 => Some(v as u32),
            Self::I16(v) if v >= 0 => Some(v as u32),
            Self::I32(v) if v >= 0 => Some(v as u32),
            _ => None,
        }
    }
}

/// 负载中某个数据块的视图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// 语义标签原始值
    pub id: u8,
    /// 编码类型原始值
    pub ty: u8,
    pub value: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn chunk_id(&self) -> Option<ChunkId> {
        ChunkId::from_u8(self.id)
    }

    pub fn chunk_type(&self) -> Option<ChunkType> {
        ChunkType::from_u8(self.ty)
    }

    /// 编码后占用的字节数（块头 + 值）
    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_SIZE + self.value.len()
    }

    /// 先按类型标签分派，再解释值字节
    pub fn decode(&self) -> Result<ChunkValue<'a>, ProtocolError> {
        let ty = self.chunk_type().ok_or(ProtocolError::UnknownChunkType)?;
        if !ty.accepts_len(self.value.len()) {
            return Err(ProtocolError::ChunkTypeMismatch);
        }
        let v = self.value;
        Ok(match ty {
            ChunkType::None => ChunkValue::None,
            ChunkType::I8 => ChunkValue::I8(v[0] as i8),
            ChunkType::U8 => ChunkValue::U8(v[0]),
            ChunkType::I16 => ChunkValue::I16(i16::from_le_bytes([v[0], v[1]])),
            ChunkType::U16 => ChunkValue::U16(u16::from_le_bytes([v[0], v[1]])),
            ChunkType::I32 => ChunkValue::I32(i32::from_le_bytes([v[0], v[1], v[2], v[3]])),
            ChunkType::U32 => ChunkValue::U32(u32::from_le_bytes([v[0], v[1], v[2], v[3]])),
            ChunkType::F32 => ChunkValue::F32(f32::from_le_bytes([v[0], v[1], v[2], v[3]])),
            ChunkType::F64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(v);
                ChunkValue::F64(f64::from_le_bytes(raw))
            }
            ChunkType::Str => ChunkValue::Str(
                core::str::from_utf8(v).map_err(|_| ProtocolError::ChunkTypeMismatch)?,
            ),
            array => ChunkValue::Array(ScalarArray {
                element: array.element_type().unwrap_or(ChunkType::U8),
                bytes: v,
            }),
        })
    }
}

/// 把一个数据块写入 `out`，返回写入的字节数
pub fn encode_chunk(out: &mut [u8], id: u8, ty: u8, value: &[u8]) -> Result<usize, ProtocolError> {
    let total = CHUNK_HEADER_SIZE + value.len();
    if total > out.len() || value.len() > u16::MAX as usize {
        return Err(ProtocolError::PayloadOverflow);
    }
    let (mut head, rest) = LayoutVerified::<_, WireChunkHeader>::new_unaligned_from_prefix(out)
        .ok_or(ProtocolError::PayloadOverflow)?;
    head.id = id;
    head.ty = ty;
    head.size.set(value.len() as u16);
    rest[..value.len()].copy_from_slice(value);
    Ok(total)
}

/// 负载数据块的惰性迭代器
///
/// 只能向前走一遍。遇到声明长度越过剩余负载的数据块时停止，并通过
/// [`Chunks::is_malformed`] 报告。
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    payload: &'a [u8],
    offset: usize,
    malformed: bool,
}

impl<'a> Chunks<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            payload,
            offset: 0,
            malformed: false,
        }
    }

    /// 迭代是否因为格式错误提前结束
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    /// 已经消费的负载字节数
    pub fn consumed(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.malformed || self.offset >= self.payload.len() {
            return None;
        }
        let remaining = &self.payload[self.offset..];
        let Some((head, rest)) =
            LayoutVerified::<_, WireChunkHeader>::new_unaligned_from_prefix(remaining)
        else {
            self.malformed = true;
            return None;
        };
        let size = head.size.get() as usize;
        if size > rest.len() {
            self.malformed = true;
            return None;
        }
        self.offset += CHUNK_HEADER_SIZE + size;
        Some(Chunk {
            id: head.id,
            ty: head.ty,
            value: &rest[..size],
        })
    }
}

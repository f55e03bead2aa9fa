/// 对齐的接收缓冲区，DMA 直接写入
///
/// 与 `heapless::Vec` 不同，它支持在指定偏移处分段填充：
/// 先收帧头，再把负载和 CRC 接在后面。
#[repr(align(4))]
pub struct AlignedBuffer<const N: usize> {
    buffer: [u8; N],
    len: usize,
}

impl<const N: usize> AlignedBuffer<N> {
    /// 创建一个新的空缓冲区
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            len: 0,
        }
    }

    /// 获取缓冲区的只读引用
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// 获取已写入部分的可变引用
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer[..self.len]
    }

    /// 获取有效数据长度
    pub fn len(&self) -> usize {
        self.len
    }

    /// 判断缓冲区是否为空
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// 清空缓冲区
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// 在当前末尾追加数据，超出容量的部分被截断，返回实际写入的字节数
    pub fn extend_from_slice(&mut self, data: &[u8]) -> usize {
        let copy_len = core::cmp::min(N - self.len, data.len());
        self.buffer[self.len..self.len + copy_len].copy_from_slice(&data[..copy_len]);
        self.len += copy_len;
        copy_len
    }

    /// 复制数据到缓冲区（覆盖原有内容）
    pub fn copy_from_slice(&mut self, data: &[u8]) -> usize {
        self.len = 0;
        self.extend_from_slice(data)
    }
}

impl<const N: usize> Default for AlignedBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

use core::fmt;

use common::protocol::{frame_len, Header};

/// 发送队列错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// 剩余连续空间不足，帧被拒绝
    Full,
    /// 帧比整个队列还大
    TooLarge,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("send queue full"),
            Self::TooLarge => f.write_str("frame larger than send queue"),
        }
    }
}

/// 上行发送队列：字节环形缓冲区，按插入顺序保存自描述的整帧
///
/// 每帧连续存放，不跨越缓冲区末尾：末尾放不下时从头开始写，并用
/// `watermark` 记下旧数据的结束位置。这样队首帧总能以一个切片原地交给
/// 发送原语。帧长度由帧头 `data_sz` 推出，不需要额外的长度前缀。
pub struct SendQueue<const N: usize> {
    buffer: [u8; N],
    read: usize,
    write: usize,
    /// 回绕时旧数据的结束位置
    watermark: usize,
    /// 写指针已回绕到读指针之前
    inverted: bool,
}

impl<const N: usize> SendQueue<N> {
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            read: 0,
            write: 0,
            watermark: N,
            inverted: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.inverted && self.read == self.write
    }

    /// 已占用字节数
    pub fn used(&self) -> usize {
        if self.inverted {
            (self.watermark - self.read) + self.write
        } else {
            self.write - self.read
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// 在写端追加一帧；空间不足时返回错误且队列不变
    pub fn push(&mut self, frame: &[u8]) -> Result<(), QueueError> {
        let len = frame.len();
        if len > N {
            return Err(QueueError::TooLarge);
        }
        if len == 0 {
            return Ok(());
        }

        let start = if !self.inverted {
            if N - self.write >= len {
                self.write
            } else if len < self.read {
                // 尾部不够，回绕到开头
                self.watermark = self.write;
                self.inverted = true;
                0
            } else {
                return Err(QueueError::Full);
            }
        } else if self.write + len < self.read {
            self.write
        } else {
            return Err(QueueError::Full);
        };

        self.buffer[start..start + len].copy_from_slice(frame);
        self.write = start + len;
        Ok(())
    }

    /// 原地查看队首帧，不复制
    pub fn peek_oldest(&self) -> Option<&[u8]> {
        if self.is_empty() {
            return None;
        }
        let end = if self.inverted { self.watermark } else { self.write };
        let region = &self.buffer[self.read..end];
        let len = match Header::decode(region) {
            Ok(header) => frame_len(header.data_sz as usize).min(region.len()),
            // 不足一个帧头，整段交出
            Err(_) => region.len(),
        };
        Some(&region[..len])
    }

    /// 发送原语接管队首帧后，读指针前移 `n` 字节
    pub fn advance_past(&mut self, n: usize) {
        let end = if self.inverted { self.watermark } else { self.write };
        self.read = (self.read + n).min(end);
        if self.inverted && self.read == self.watermark {
            self.read = 0;
            self.inverted = false;
            self.watermark = N;
        }
        if !self.inverted && self.read == self.write {
            self.read = 0;
            self.write = 0;
        }
    }

    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
        self.watermark = N;
        self.inverted = false;
    }
}

impl<const N: usize> Default for SendQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for SendQueue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendQueue")
            .field("read", &self.read)
            .field("write", &self.write)
            .field("watermark", &self.watermark)
            .field("inverted", &self.inverted)
            .finish()
    }
}

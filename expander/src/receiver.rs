//! 单个端口的接收状态机。
//!
//! 状态转换是纯函数式的：每次接收完成后返回下一次应当发起的接收长度，
//! 由引擎交给传输层。校验通过的帧先复制到就绪槽，再重新布置接收，
//! 主循环从就绪槽取帧，不会与正在写入的 DMA 缓冲区交叠。

use common::protocol::{Header, Packet, CRC_SIZE, HEADER_SIZE, MAX_FRAME_SIZE};
use common::utils::{AlignedBuffer, CrcService};

/// 接收状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    AwaitingHeader,
    /// 等待负载 + CRC，共 `body_len` 字节
    AwaitingBody { body_len: usize },
}

/// 一次接收完成产生的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxEvent {
    /// 帧头已收，继续收负载
    HeaderAccepted,
    /// 帧头声明的负载超过上限，已被强制为 0
    HeaderOversized,
    /// 帧头魔数错误，丢弃
    BadMagic,
    /// 收到的字节数与请求不符
    LengthMismatch,
    CrcMismatch,
    /// 整帧校验通过，已放入就绪槽
    FrameReady,
    /// 就绪槽尚未被取走，新帧被丢弃
    Overrun,
}

/// 状态转换结果：下一次接收的长度以及发生的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxStep {
    pub next_len: usize,
    pub event: RxEvent,
}

/// 端口接收上下文
pub struct PortReceiver {
    state: RxState,
    buffer: AlignedBuffer<MAX_FRAME_SIZE>,
    ready: Option<Packet>,
}

impl PortReceiver {
    pub const fn new() -> Self {
        Self {
            state: RxState::AwaitingHeader,
            buffer: AlignedBuffer::new(),
            ready: None,
        }
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    /// 回到等待帧头状态，返回需要接收的字节数
    pub fn arm(&mut self) -> usize {
        self.state = RxState::AwaitingHeader;
        self.buffer.clear();
        HEADER_SIZE
    }

    /// 处理一次接收完成
    pub fn on_receive<C: CrcService + ?Sized>(&mut self, data: &[u8], crc: &C) -> RxStep {
        match self.state {
            RxState::AwaitingHeader => self.on_header(data),
            RxState::AwaitingBody { body_len } => self.on_body(data, body_len, crc),
        }
    }

    fn rearm_with(&mut self, event: RxEvent) -> RxStep {
        RxStep {
            next_len: self.arm(),
            event,
        }
    }

    fn on_header(&mut self, data: &[u8]) -> RxStep {
        if data.len() != HEADER_SIZE {
            return self.rearm_with(RxEvent::LengthMismatch);
        }
        let mut header = match Header::decode(data) {
            Ok(header) if header.has_valid_magic() => header,
            _ => return self.rearm_with(RxEvent::BadMagic),
        };

        let mut event = RxEvent::HeaderAccepted;
        if header.is_oversized() {
            // 超长负载按 0 处理：只再收 2 字节 CRC，帧头也按 0 参与校验
            header.data_sz = 0;
            event = RxEvent::HeaderOversized;
        }
        self.buffer.copy_from_slice(&header.to_bytes());

        let body_len = header.data_sz as usize + CRC_SIZE;
        self.state = RxState::AwaitingBody { body_len };
        RxStep {
            next_len: body_len,
            event,
        }
    }

    fn on_body<C: CrcService + ?Sized>(&mut self, data: &[u8], body_len: usize, crc: &C) -> RxStep {
        if data.len() != body_len {
            return self.rearm_with(RxEvent::LengthMismatch);
        }
        self.buffer.extend_from_slice(data);

        let event = if !crc.validate(self.buffer.as_slice()) {
            RxEvent::CrcMismatch
        } else if self.ready.is_some() {
            RxEvent::Overrun
        } else {
            // on_header 已保证魔数正确、data_sz 不越界，且缓冲区恰为帧头 + data_sz + CRC，
            // 因此 from_frame 唯一可能的失败是长度不符
            match Packet::from_frame(self.buffer.as_slice()) {
                Ok(packet) => {
                    self.ready = Some(packet);
                    RxEvent::FrameReady
                }
                Err(_) => RxEvent::LengthMismatch,
            }
        };
        // 无论成败都重新等待帧头
        self.rearm_with(event)
    }

    /// 是否有已校验、待处理的帧
    pub fn has_ready(&self) -> bool {
        self.ready.is_some()
    }

    /// 取走就绪帧，同时清除就绪标志
    pub fn take_ready(&mut self) -> Option<Packet> {
        self.ready.take()
    }
}

impl Default for PortReceiver {
    fn default() -> Self {
        Self::new()
    }
}

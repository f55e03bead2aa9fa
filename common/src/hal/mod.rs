pub mod serial;
#[cfg(feature = "simulator")]
pub mod simulator;

use core::fmt;

use heapless::Vec;

use crate::protocol::MAX_FRAME_SIZE;

/// 端口序号，0 固定为上行口
pub type PortIndex = usize;

/// 硬件抽象层错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// 端口仍有未完成的发送
    Busy,
    InvalidPort,
    SendFailed,
    RecvFailed,
    /// 继电器序号不存在
    InvalidRelay,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Busy => "port busy",
            Self::InvalidPort => "invalid port",
            Self::SendFailed => "send failed",
            Self::RecvFailed => "receive failed",
            Self::InvalidRelay => "invalid relay",
        };
        f.write_str(msg)
    }
}

/// 串口字节传输接口
///
/// 两个操作都只是“发起”，完成情况通过 [`TransportEvent`] 回到引擎。
pub trait Transport {
    /// 在 `port` 上发起恰好 `len` 字节的接收，替换该端口上未完成的接收
    fn start_receive(&mut self, port: PortIndex, len: usize) -> Result<(), HalError>;

    /// 在 `port` 上发起发送；实现负责在返回前接管 `bytes`
    fn start_send(&mut self, port: PortIndex, bytes: &[u8]) -> Result<(), HalError>;
}

/// 中断上下文产生的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// 接收完成，携带本次请求的全部字节
    ReceiveComplete {
        port: PortIndex,
        data: Vec<u8, MAX_FRAME_SIZE>,
    },
    SendComplete {
        port: PortIndex,
    },
    ReceiveTimeout {
        port: PortIndex,
    },
}

/// 硬件抽象层接口
pub trait Hardware {
    type Transport: Transport;

    /// 获取本设备UID
    fn device_uid(&self) -> u32;

    /// 获取串口传输接口
    fn transport(&mut self) -> &mut Self::Transport;

    /// 断开继电器
    fn relay_open(&mut self, index: u8) -> Result<(), HalError>;

    /// 闭合继电器
    fn relay_close(&mut self, index: u8) -> Result<(), HalError>;

    /// 继电器是否处于断开状态
    fn relay_is_open(&self, index: u8) -> bool;

    /// 水浸传感器状态
    fn sensor_state(&self) -> u16;

    /// 电池电压 (mV)
    fn battery_voltage(&self) -> u16;
}

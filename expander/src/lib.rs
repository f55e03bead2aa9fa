//! AURA 中继器（expander）协议引擎。
//!
//! 一个上行口朝向上位机，若干下行口连接下级设备。上行口收到的帧由主分发器
//! 转发或在本地应答；下行口收到的帧由从分发器汇聚后经发送队列逐帧送往上行口。

#![cfg_attr(not(any(test, feature = "simulator")), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod directory;
pub mod engine;
pub mod receiver;
pub mod routing;
pub mod send_queue;
pub mod templates;

pub use config::ExpanderConfig;
pub use directory::{DeviceDirectory, DirectoryError};
pub use engine::{AuraEngine, EngineStats};
pub use receiver::{PortReceiver, RxEvent, RxState};
pub use send_queue::{QueueError, SendQueue};

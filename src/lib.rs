//! AURA 串行控制总线：协议编解码与中继器引擎的统一入口。

#![cfg_attr(not(feature = "simulator"), no_std)]

pub use common;
pub use expander;

pub use common::protocol::{Command, DeviceType, Header, Packet};
pub use expander::{AuraEngine, ExpanderConfig};

use common::hal::PortIndex;
use common::protocol::DeviceType;

/// 上行口序号（朝向上位机）
pub const UPLINK_PORT: PortIndex = 0;
/// 下行口数量上限
pub const MAX_DOWNLINK_PORTS: usize = 8;
/// 每个下行口后面最多挂接的设备数（含级联中继）
pub const MAX_DEVICES_PER_PORT: usize = 4;
/// 设备目录容量，按所有下行口的最坏情况计算
pub const DIRECTORY_CAPACITY: usize = MAX_DOWNLINK_PORTS * MAX_DEVICES_PER_PORT;
/// 发送队列字节数
pub const SEND_QUEUE_CAPACITY: usize = 1024;
/// 板载继电器数量
pub const RELAY_COUNT: u8 = 2;

/// 运行时配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExpanderConfig {
    /// 应答 WHOAMI 时上报的设备类型
    pub device_type: DeviceType,
    /// 接收超时后丢弃半帧并重新等待帧头
    pub recover_on_timeout: bool,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::Expander,
            recover_on_timeout: true,
        }
    }
}

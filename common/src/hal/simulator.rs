use std::collections::VecDeque;
use std::vec::Vec;

use crate::hal::{HalError, Hardware, PortIndex, Transport};

/// 模拟端口状态
#[derive(Debug, Default)]
struct SimPort {
    /// 当前挂起的接收长度
    pending_receive: Option<usize>,
    /// 已发送、尚未被取走的帧
    sent: VecDeque<Vec<u8>>,
    /// 为 true 时拒绝发送
    refuse_sends: bool,
}

/// 模拟串口，记录每个端口的接收请求和发出的字节
#[derive(Debug)]
pub struct SimTransport {
    ports: Vec<SimPort>,
}

impl SimTransport {
    pub fn new(port_count: usize) -> Self {
        Self {
            ports: (0..port_count).map(|_| SimPort::default()).collect(),
        }
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// 端口上挂起的接收长度
    pub fn pending_receive(&self, port: PortIndex) -> Option<usize> {
        self.ports.get(port).and_then(|p| p.pending_receive)
    }

    /// 取走端口上最早发出的一帧
    pub fn pop_sent(&mut self, port: PortIndex) -> Option<Vec<u8>> {
        self.ports.get_mut(port).and_then(|p| p.sent.pop_front())
    }

    /// 取走端口上发出的全部字节块
    pub fn take_sent(&mut self, port: PortIndex) -> Vec<Vec<u8>> {
        self.ports
            .get_mut(port)
            .map(|p| p.sent.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn sent_count(&self, port: PortIndex) -> usize {
        self.ports.get(port).map_or(0, |p| p.sent.len())
    }

    pub fn set_refuse_sends(&mut self, port: PortIndex, refuse: bool) {
        if let Some(p) = self.ports.get_mut(port) {
            p.refuse_sends = refuse;
        }
    }
}

impl Transport for SimTransport {
    fn start_receive(&mut self, port: PortIndex, len: usize) -> Result<(), HalError> {
        let p = self.ports.get_mut(port).ok_or(HalError::InvalidPort)?;
        p.pending_receive = Some(len);
        Ok(())
    }

    fn start_send(&mut self, port: PortIndex, bytes: &[u8]) -> Result<(), HalError> {
        let p = self.ports.get_mut(port).ok_or(HalError::InvalidPort)?;
        if p.refuse_sends {
            return Err(HalError::Busy);
        }
        p.sent.push_back(bytes.to_vec());
        Ok(())
    }
}

/// 模拟器硬件实现
#[derive(Debug)]
pub struct SimHardware {
    uid: u32,
    transport: SimTransport,
    relays_open: [bool; 2],
    sensor_state: u16,
    battery_voltage: u16,
    /// 记录继电器动作，便于测试断言
    relay_log: Vec<(u8, bool)>,
}

impl SimHardware {
    pub fn new(uid: u32, port_count: usize) -> Self {
        Self {
            uid,
            transport: SimTransport::new(port_count),
            relays_open: [true; 2],
            sensor_state: 0,
            battery_voltage: 3300,
            relay_log: Vec::new(),
        }
    }

    pub fn transport_ref(&self) -> &SimTransport {
        &self.transport
    }

    pub fn set_sensor_state(&mut self, state: u16) {
        self.sensor_state = state;
    }

    pub fn set_battery_voltage(&mut self, millivolts: u16) {
        self.battery_voltage = millivolts;
    }

    /// 继电器动作记录：(序号, 是否断开)
    pub fn relay_log(&self) -> &[(u8, bool)] {
        &self.relay_log
    }

    fn set_relay(&mut self, index: u8, open: bool) -> Result<(), HalError> {
        let slot = self
            .relays_open
            .get_mut(index as usize)
            .ok_or(HalError::InvalidRelay)?;
        *slot = open;
        self.relay_log.push((index, open));
        Ok(())
    }
}

impl Hardware for SimHardware {
    type Transport = SimTransport;

    fn device_uid(&self) -> u32 {
        self.uid
    }

    fn transport(&mut self) -> &mut Self::Transport {
        &mut self.transport
    }

    fn relay_open(&mut self, index: u8) -> Result<(), HalError> {
        self.set_relay(index, true)
    }

    fn relay_close(&mut self, index: u8) -> Result<(), HalError> {
        self.set_relay(index, false)
    }

    fn relay_is_open(&self, index: u8) -> bool {
        self.relays_open.get(index as usize).copied().unwrap_or(true)
    }

    fn sensor_state(&self) -> u16 {
        self.sensor_state
    }

    fn battery_voltage(&self) -> u16 {
        self.battery_voltage
    }
}

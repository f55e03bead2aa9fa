use common::hal::Hardware;
use common::protocol::{
    ChunkId, ChunkType, Command, DeviceType, Header, Packet, BROADCAST_UID,
};

/// 预先构造好的应答帧，发送前只改写序号、目的地址和测量值
pub struct Templates {
    /// ANS_WHOAMI：一个设备类型数据块
    pub identity: Packet,
    /// ANS_DATA：水浸、电池、两路继电器状态
    pub state: Packet,
    /// ANS_WRITE：两路继电器状态
    pub relay_ack: Packet,
}

/// 继电器状态编码：1 为断开，0 为闭合
fn relay_byte(open: bool) -> [u8; 1] {
    [open as u8]
}

impl Templates {
    pub fn new(uid: u32, device_type: DeviceType) -> Self {
        // 以下数据块总长固定且远小于负载上限，追加不会失败
        let mut identity = Packet::new(Header::new(0, uid, BROADCAST_UID, Command::AnsWhoami as u16));
        let _ = identity.append_chunk(
            ChunkId::Type as u8,
            ChunkType::U32,
            &(device_type as u32).to_le_bytes(),
        );

        let mut state = Packet::new(Header::new(0, uid, BROADCAST_UID, Command::AnsData as u16));
        let _ = state.append_chunk(ChunkId::WetSens as u8, ChunkType::U16, &0u16.to_le_bytes());
        let _ = state.append_chunk(ChunkId::Battery as u8, ChunkType::U16, &0u16.to_le_bytes());
        let _ = state.append_chunk(ChunkId::Relay1 as u8, ChunkType::U8, &[0]);
        let _ = state.append_chunk(ChunkId::Relay2 as u8, ChunkType::U8, &[0]);

        let mut relay_ack = Packet::new(Header::new(0, uid, BROADCAST_UID, Command::AnsWrite as u16));
        let _ = relay_ack.append_chunk(ChunkId::Relay1 as u8, ChunkType::U8, &[0]);
        let _ = relay_ack.append_chunk(ChunkId::Relay2 as u8, ChunkType::U8, &[0]);

        Self {
            identity,
            state,
            relay_ack,
        }
    }

    /// 每个轮询周期开始时刷新测量值
    pub fn refresh<H: Hardware>(&mut self, hardware: &H) {
        write_value(&mut self.state, ChunkId::WetSens, &hardware.sensor_state().to_le_bytes());
        write_value(&mut self.state, ChunkId::Battery, &hardware.battery_voltage().to_le_bytes());
        self.refresh_relays(hardware);
    }

    /// 继电器动作之后单独刷新继电器状态
    pub fn refresh_relays<H: Hardware>(&mut self, hardware: &H) {
        let relay1 = relay_byte(hardware.relay_is_open(0));
        let relay2 = relay_byte(hardware.relay_is_open(1));
        for packet in [&mut self.state, &mut self.relay_ack] {
            write_value(packet, ChunkId::Relay1, &relay1);
            write_value(packet, ChunkId::Relay2, &relay2);
        }
    }
}

fn write_value(packet: &mut Packet, id: ChunkId, value: &[u8]) {
    if let Some(slot) = packet.chunk_value_mut(id) {
        if slot.len() == value.len() {
            slot.copy_from_slice(value);
        }
    }
}

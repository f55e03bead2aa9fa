//! 模拟器模式下的中继器：用脚本化的上位机和下级传感器跑一轮发现和一次数据查询。

use common::hal::simulator::SimHardware;
use common::hal::Hardware;
use common::protocol::{ChunkId, ChunkType, Command, DeviceType, Header, Packet, BROADCAST_UID, HEADER_SIZE};
use common::utils::{Crc16, CrcService};
use expander::{AuraEngine, ExpanderConfig};

const EXPANDER_UID: u32 = 0xE000_0001;
const SENSOR_UID: u32 = 0x5E00_0077;
const SENSOR_PORT: usize = 2;

type Engine = AuraEngine<SimHardware, Crc16, 4>;

fn main() {
    println!("启动 AURA 中继器（模拟器模式）");

    let hardware = SimHardware::new(EXPANDER_UID, 4);
    let mut engine: Engine = AuraEngine::new(hardware, Crc16, ExpanderConfig::default());
    engine.start();

    // 上位机发起一轮发现
    let whoami = sealed(Packet::new(Header::new(1, BROADCAST_UID, BROADCAST_UID, Command::ReqWhoami as u16)));
    deliver(&mut engine, 0, &whoami);
    engine.poll();
    drain_downlinks(&mut engine);
    print_uplink(&mut engine);

    // 下级水浸传感器应答
    let mut answer = Packet::new(Header::new(2, SENSOR_UID, BROADCAST_UID, Command::AnsWhoami as u16));
    let _ = answer.append_chunk(ChunkId::Type as u8, ChunkType::U32, &(DeviceType::WetSens as u32).to_le_bytes());
    deliver(&mut engine, SENSOR_PORT, &sealed(answer));
    engine.on_send_complete(0);
    engine.poll();
    print_uplink(&mut engine);

    // 定向查询传感器数据，只应转发到传感器所在端口
    let request = sealed(Packet::new(Header::new(3, BROADCAST_UID, SENSOR_UID, Command::ReqData as u16)));
    deliver(&mut engine, 0, &request);
    engine.on_send_complete(0);
    engine.poll();
    drain_downlinks(&mut engine);

    println!("统计: {:?}", engine.stats());
}

fn sealed(mut packet: Packet) -> Packet {
    packet.seal(&Crc16);
    packet
}

/// 按“帧头 + 负载”两次接收完成的顺序喂给引擎
fn deliver(engine: &mut Engine, port: usize, packet: &Packet) {
    let bytes = packet.as_bytes();
    engine.on_receive_complete(port, &bytes[..HEADER_SIZE]);
    engine.on_receive_complete(port, &bytes[HEADER_SIZE..]);
}

fn drain_downlinks(engine: &mut Engine) {
    for port in 1..4 {
        for frame in engine.hardware_mut().transport().take_sent(port) {
            println!("下行口 {} 转发 {} 字节", port, frame.len());
            engine.on_send_complete(port);
        }
    }
}

fn print_uplink(engine: &mut Engine) {
    for frame in engine.hardware_mut().transport().take_sent(0) {
        match Packet::from_frame(&frame) {
            Ok(packet) => {
                let header = packet.header();
                println!(
                    "上行发送 cmd={} cnt={} src={:#x} dest={:#x} crc_ok={}",
                    header.cmd,
                    header.cnt,
                    header.uid_src,
                    header.uid_dest,
                    Crc16.validate(packet.as_bytes())
                );
                for chunk in packet.chunks() {
                    println!("  chunk id={} type={} value={:?}", chunk.id, chunk.ty, chunk.decode());
                }
            }
            Err(e) => println!("上行帧无法解析: {}", e),
        }
    }
}

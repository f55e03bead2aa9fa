use common::hal::{Hardware, PortIndex, Transport};
use common::protocol::{Chunk, ChunkId, Command, Header, Packet};
use common::utils::CrcService;

use crate::config::{RELAY_COUNT, UPLINK_PORT};
use crate::engine::{AuraEngine, Reply};

/// REQ_WRITE 第一个数据块携带的继电器命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayCommand {
    Open(u8),
    Close(u8),
}

impl RelayCommand {
    /// 解析继电器命令，标签不对、值不是整数或序号越界时返回 `None`
    pub fn decode(chunk: &Chunk<'_>) -> Option<Self> {
        let index = chunk.decode().ok()?.as_u32()?;
        if index >= RELAY_COUNT as u32 {
            return None;
        }
        let index = index as u8;
        match chunk.chunk_id()? {
            ChunkId::RelayOpen => Some(Self::Open(index)),
            ChunkId::RelayClose => Some(Self::Close(index)),
            _ => None,
        }
    }
}

/// 应答帧的序号：请求序号加一
pub fn reply_cnt(request: &Header) -> u32 {
    request.cnt.wrapping_add(1)
}

impl<H: Hardware, C: CrcService, const PORTS: usize> AuraEngine<H, C, PORTS> {
    /// 处理上行口收到的帧：先转发，再处理发给本机的命令
    pub(crate) fn dispatch_master(&mut self) {
        // 取走即清除就绪标志，同一帧不会被处理两次
        let Some(packet) = self.ports[UPLINK_PORT].rx.take_ready() else {
            return;
        };
        let header = *packet.header();

        self.forward_downstream(&packet);

        if !header.is_broadcast() && header.uid_dest != self.uid {
            return;
        }

        match header.command() {
            Some(Command::ReqWhoami) => {
                info!("discovery round from {:#x}, directory cleared", header.uid_src);
                self.directory.clear();
                self.enqueue_reply(Reply::Identity, reply_cnt(&header), header.uid_src);
            }
            Some(Command::ReqData) => {
                self.enqueue_reply(Reply::State, reply_cnt(&header), header.uid_src);
            }
            Some(Command::ReqWrite) => self.handle_write(&packet),
            _ => {
                trace!("cmd {} ignored", header.cmd);
            }
        }
    }

    /// 广播发往所有下行口；定向帧查目录，只发往对应端口；查不到则丢弃
    fn forward_downstream(&mut self, packet: &Packet) {
        let header = packet.header();
        if header.is_broadcast() {
            for port in 1..PORTS {
                self.send_downlink(port, packet);
            }
        } else if let Some(port) = self.directory.lookup(header.uid_dest) {
            self.send_downlink(port, packet);
        } else if header.uid_dest != self.uid {
            self.stats.routing_misses += 1;
            debug!("no route to {:#x}, dropped", header.uid_dest);
        }
    }

    /// 直接发往下行口，不经发送队列
    fn send_downlink(&mut self, port: PortIndex, packet: &Packet) {
        if port == UPLINK_PORT || port >= PORTS {
            return;
        }
        if self.ports[port].tx_busy {
            self.stats.forward_busy_drops += 1;
            warn!("downlink {} still sending, forward dropped", port);
            return;
        }
        match self.hardware.transport().start_send(port, packet.as_bytes()) {
            Ok(()) => self.ports[port].tx_busy = true,
            Err(e) => {
                self.stats.send_failures += 1;
                warn!("downlink {} send failed: {}", port, e);
            }
        }
    }

    fn handle_write(&mut self, packet: &Packet) {
        let header = packet.header();
        let command = packet.chunks().next().and_then(|chunk| RelayCommand::decode(&chunk));
        let result = match command {
            Some(RelayCommand::Open(index)) => self.hardware.relay_open(index),
            Some(RelayCommand::Close(index)) => self.hardware.relay_close(index),
            None => {
                self.stats.bad_write_requests += 1;
                debug!("REQ_WRITE without relay command from {:#x}", header.uid_src);
                return;
            }
        };
        if let Err(e) = result {
            self.stats.bad_write_requests += 1;
            warn!("relay actuation failed: {}", e);
            return;
        }
        self.templates.refresh_relays(&self.hardware);
        self.enqueue_reply(Reply::RelayAck, reply_cnt(header), header.uid_src);
    }
}

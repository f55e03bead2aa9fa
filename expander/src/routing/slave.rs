use heapless::Vec;

use common::hal::{Hardware, PortIndex};
use common::protocol::{ChunkId, ChunkType, Command, Packet, ProtocolError, MAX_DATA_SIZE};
use common::utils::CrcService;

use crate::config::UPLINK_PORT;
use crate::engine::AuraEngine;

/// 在 ANS_WHOAMI 的 UID 链末尾追加 `uid`，返回未封装 CRC 的新帧
///
/// 负载里已有 UIDS 数组块时把它加长一个元素，否则在末尾新建一个只含
/// `uid` 的 UIDS 块。其余数据块按原顺序原样保留。
pub fn append_uid_chain(packet: &Packet, uid: u32) -> Result<Packet, ProtocolError> {
    let mut out = Packet::new(*packet.header());
    let mut chained = false;

    let mut chunks = packet.chunks();
    for chunk in chunks.by_ref() {
        if chunk.id != ChunkId::Uids as u8 || chained {
            let ty = chunk.chunk_type().ok_or(ProtocolError::UnknownChunkType)?;
            out.append_chunk(chunk.id, ty, chunk.value)?;
            continue;
        }
        if chunk.chunk_type() != Some(ChunkType::ArrU32) || chunk.value.len() % 4 != 0 {
            return Err(ProtocolError::ChunkTypeMismatch);
        }
        let mut grown: Vec<u8, MAX_DATA_SIZE> =
            Vec::from_slice(chunk.value).map_err(|_| ProtocolError::PayloadOverflow)?;
        grown
            .extend_from_slice(&uid.to_le_bytes())
            .map_err(|_| ProtocolError::PayloadOverflow)?;
        out.append_chunk(chunk.id, ChunkType::ArrU32, &grown)?;
        chained = true;
    }
    if chunks.is_malformed() {
        return Err(ProtocolError::MalformedChunk);
    }

    if !chained {
        out.append_chunk(ChunkId::Uids as u8, ChunkType::ArrU32, &uid.to_le_bytes())?;
    }
    Ok(out)
}

impl<H: Hardware, C: CrcService, const PORTS: usize> AuraEngine<H, C, PORTS> {
    /// 按端口序号依次处理各下行口的就绪帧
    pub(crate) fn dispatch_slaves(&mut self) {
        for port in (UPLINK_PORT + 1)..PORTS {
            self.dispatch_slave(port);
        }
    }

    fn dispatch_slave(&mut self, port: PortIndex) {
        let Some(packet) = self.ports[port].rx.take_ready() else {
            return;
        };
        let header = *packet.header();

        if header.command() != Some(Command::AnsWhoami) {
            self.enqueue(packet.as_bytes());
            return;
        }

        if let Err(e) = self.directory.insert(header.uid_src, port) {
            self.stats.directory_rejects += 1;
            warn!("uid {:#x} on port {} not registered: {}", header.uid_src, port, e);
        } else {
            debug!("uid {:#x} -> port {}", header.uid_src, port);
        }

        match append_uid_chain(&packet, self.uid) {
            Ok(mut chained) => {
                chained.seal(&self.crc);
                self.enqueue(chained.as_bytes());
            }
            Err(ProtocolError::PayloadOverflow) => {
                self.stats.aggregation_overflows += 1;
                warn!("uid chain from {:#x} exceeds payload bound, dropped", header.uid_src);
            }
            Err(e) => {
                // 负载无法重建时原样上送
                self.stats.malformed_answers += 1;
                debug!("malformed ANS_WHOAMI from {:#x}: {}", header.uid_src, e);
                self.enqueue(packet.as_bytes());
            }
        }
    }
}

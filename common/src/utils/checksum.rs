use crc::{Crc, CRC_16_IBM_3740};

use crate::protocol::CRC_SIZE;

/// CRC-16-CCITT（多项式 0x1021，初值 0xFFFF）
const AURA_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// 计算CRC-16校验和
pub fn calculate_checksum(data: &[u8]) -> u16 {
    AURA_CRC.checksum(data)
}

/// 快速验证校验和
pub fn verify_checksum(data: &[u8], checksum: u16) -> bool {
    calculate_checksum(data) == checksum
}

/// CRC 服务，引擎只通过它计算和校验帧尾
pub trait CrcService {
    /// 计算 `bytes` 的 CRC-16
    fn compute(&self, bytes: &[u8]) -> u16;

    /// 校验整帧：最后两个字节（小端）必须等于其余部分的 CRC
    fn validate(&self, frame: &[u8]) -> bool {
        if frame.len() < CRC_SIZE {
            return false;
        }
        let (body, tail) = frame.split_at(frame.len() - CRC_SIZE);
        self.compute(body) == u16::from_le_bytes([tail[0], tail[1]])
    }
}

/// 基于 `crc` crate 的默认实现
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc16;

impl CrcService for Crc16 {
    fn compute(&self, bytes: &[u8]) -> u16 {
        calculate_checksum(bytes)
    }
}

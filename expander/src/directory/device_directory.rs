use core::fmt;

use common::hal::PortIndex;
use heapless::LinearMap;

/// 设备目录错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DirectoryError {
    /// 目录已满，新 UID 被拒绝
    Full,
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("device directory full"),
        }
    }
}

/// 设备目录：下级设备 UID -> 下行口
///
/// 每轮发现（REQ_WHOAMI）开始时清空，随 ANS_WHOAMI 到达逐条登记。
/// 同一 UID 以最后一次登记为准；目录满时拒绝新 UID 并计数，已有 UID 仍可更新。
pub struct DeviceDirectory<const N: usize> {
    entries: LinearMap<u32, PortIndex, N>,
    rejected: u32,
}

impl<const N: usize> DeviceDirectory<N> {
    /// 创建空目录
    pub const fn new() -> Self {
        Self {
            entries: LinearMap::new(),
            rejected: 0,
        }
    }

    /// 清空目录，开始新一轮发现
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 登记或覆盖一条记录
    pub fn insert(&mut self, uid: u32, port: PortIndex) -> Result<(), DirectoryError> {
        match self.entries.insert(uid, port) {
            Ok(_) => Ok(()),
            Err(_) => {
                self.rejected = self.rejected.saturating_add(1);
                Err(DirectoryError::Full)
            }
        }
    }

    /// 查找 UID 所在的下行口
    pub fn lookup(&self, uid: u32) -> Option<PortIndex> {
        self.entries.get(&uid).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// 因目录已满而被拒绝的登记次数（跨轮累计）
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, PortIndex)> + '_ {
        self.entries.iter().map(|(uid, port)| (*uid, *port))
    }
}

impl<const N: usize> Default for DeviceDirectory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for DeviceDirectory<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDirectory")
            .field("len", &self.entries.len())
            .field("capacity", &N)
            .field("rejected", &self.rejected)
            .finish()
    }
}

//! AURA 协议引擎：持有所有端口上下文和分发上下文，生命周期与进程相同。
//!
//! 中断回调（`on_receive_complete` / `on_send_complete` / `on_receive_timeout`）
//! 只做状态转换、复制数据和重新布置下一次接收，从不触碰发送队列。
//! [`AuraEngine::poll`] 由主循环周期调用，依次执行：刷新测量值、上行分发、
//! 各下行口分发（按端口序号）、发送调度。平台若存在真正的并发，应把引擎放在
//! 临界区互斥量中，或经由 [`TransportEvent`] 消息队列把中断事件交给主循环。

use common::hal::{Hardware, PortIndex, Transport, TransportEvent};
use common::protocol::Packet;
use common::utils::CrcService;

use crate::config::{
    ExpanderConfig, DIRECTORY_CAPACITY, MAX_DOWNLINK_PORTS, SEND_QUEUE_CAPACITY, UPLINK_PORT,
};
use crate::directory::DeviceDirectory;
use crate::receiver::{PortReceiver, RxEvent, RxState};
use crate::send_queue::SendQueue;
use crate::templates::Templates;

/// 各类丢弃路径的计数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineStats {
    pub frames_received: u32,
    pub crc_errors: u32,
    pub bad_magic: u32,
    pub oversized_headers: u32,
    pub length_mismatches: u32,
    /// 就绪帧未被取走时又收到新帧
    pub rx_overruns: u32,
    pub timeouts: u32,
    /// 目的 UID 不在目录中
    pub routing_misses: u32,
    pub directory_rejects: u32,
    pub queue_overflows: u32,
    /// 下行口仍在发送，直接转发被丢弃
    pub forward_busy_drops: u32,
    pub send_failures: u32,
    /// 追加 UID 链后超出负载上限
    pub aggregation_overflows: u32,
    pub malformed_answers: u32,
    pub bad_write_requests: u32,
    pub frames_sent_up: u32,
}

/// 每个端口的上下文
pub(crate) struct PortContext {
    pub(crate) rx: PortReceiver,
    /// 端口上有一次发送尚未完成
    pub(crate) tx_busy: bool,
}

impl PortContext {
    const fn new() -> Self {
        Self {
            rx: PortReceiver::new(),
            tx_busy: false,
        }
    }
}

/// 协议引擎，`PORTS` 为端口总数（含上行口 0）
pub struct AuraEngine<H: Hardware, C: CrcService, const PORTS: usize> {
    pub(crate) hardware: H,
    pub(crate) crc: C,
    pub(crate) config: ExpanderConfig,
    pub(crate) uid: u32,
    pub(crate) ports: [PortContext; PORTS],
    pub(crate) directory: DeviceDirectory<DIRECTORY_CAPACITY>,
    pub(crate) queue: SendQueue<SEND_QUEUE_CAPACITY>,
    pub(crate) templates: Templates,
    pub(crate) stats: EngineStats,
}

impl<H: Hardware, C: CrcService, const PORTS: usize> AuraEngine<H, C, PORTS> {
    const PORT_COUNT_OK: () = assert!(
        PORTS >= 2 && PORTS - 1 <= MAX_DOWNLINK_PORTS,
        "need one uplink and 1..=MAX_DOWNLINK_PORTS downlinks"
    );

    pub fn new(hardware: H, crc: C, config: ExpanderConfig) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::PORT_COUNT_OK;

        let uid = hardware.device_uid();
        info!("aura engine uid={:#x} ports={}", uid, PORTS);
        Self {
            templates: Templates::new(uid, config.device_type),
            hardware,
            crc,
            config,
            uid,
            ports: core::array::from_fn(|_| PortContext::new()),
            directory: DeviceDirectory::new(),
            queue: SendQueue::new(),
            stats: EngineStats::default(),
        }
    }

    /// 为所有端口布置第一次帧头接收
    pub fn start(&mut self) {
        for port in 0..PORTS {
            self.arm_port(port);
        }
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn config(&self) -> &ExpanderConfig {
        &self.config
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    pub fn directory(&self) -> &DeviceDirectory<DIRECTORY_CAPACITY> {
        &self.directory
    }

    pub fn queue(&self) -> &SendQueue<SEND_QUEUE_CAPACITY> {
        &self.queue
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn rx_state(&self, port: PortIndex) -> Option<RxState> {
        self.ports.get(port).map(|p| p.rx.state())
    }

    /// 端口是否有一次发送尚未完成
    pub fn is_sending(&self, port: PortIndex) -> bool {
        self.ports.get(port).map_or(false, |p| p.tx_busy)
    }

    pub(crate) fn arm_port(&mut self, port: PortIndex) {
        let len = self.ports[port].rx.arm();
        self.start_receive(port, len);
    }

    fn start_receive(&mut self, port: PortIndex, len: usize) {
        if let Err(e) = self.hardware.transport().start_receive(port, len) {
            error!("port {} start_receive({}) failed: {}", port, len, e);
        }
    }

    /// 把中断事件交给对应的回调
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ReceiveComplete { port, data } => self.on_receive_complete(port, &data),
            TransportEvent::SendComplete { port } => self.on_send_complete(port),
            TransportEvent::ReceiveTimeout { port } => self.on_receive_timeout(port),
        }
    }

    /// 接收完成回调
    pub fn on_receive_complete(&mut self, port: PortIndex, data: &[u8]) {
        if port >= PORTS {
            return;
        }
        let step = self.ports[port].rx.on_receive(data, &self.crc);
        match step.event {
            RxEvent::HeaderAccepted => {}
            RxEvent::FrameReady => {
                self.stats.frames_received += 1;
                trace!("port {} frame ready", port);
            }
            RxEvent::HeaderOversized => {
                self.stats.oversized_headers += 1;
                warn!("port {} header data_sz over bound, forced to 0", port);
            }
            RxEvent::BadMagic => {
                self.stats.bad_magic += 1;
                debug!("port {} bad magic, resync", port);
            }
            RxEvent::LengthMismatch => {
                self.stats.length_mismatches += 1;
                debug!("port {} unexpected receive length {}", port, data.len());
            }
            RxEvent::CrcMismatch => {
                self.stats.crc_errors += 1;
                debug!("port {} crc mismatch, frame dropped", port);
            }
            RxEvent::Overrun => {
                self.stats.rx_overruns += 1;
                warn!("port {} previous frame not consumed, new frame dropped", port);
            }
        }
        self.start_receive(port, step.next_len);
    }

    /// 发送完成回调：端口转为空闲并重新布置接收（链路对引擎而言是半双工）
    pub fn on_send_complete(&mut self, port: PortIndex) {
        if port >= PORTS {
            return;
        }
        self.ports[port].tx_busy = false;
        self.arm_port(port);
    }

    /// 接收超时回调
    pub fn on_receive_timeout(&mut self, port: PortIndex) {
        if port >= PORTS {
            return;
        }
        self.stats.timeouts += 1;
        if self.config.recover_on_timeout {
            debug!("port {} receive timeout, rearm", port);
            self.arm_port(port);
        }
    }

    /// 主循环轮询：测量刷新 -> 上行分发 -> 下行分发 -> 发送调度
    pub fn poll(&mut self) {
        self.templates.refresh(&self.hardware);
        self.dispatch_master();
        self.dispatch_slaves();
        self.schedule_transmit();
    }

    /// 压入发送队列，满时丢弃并计数
    pub(crate) fn enqueue(&mut self, frame: &[u8]) {
        push_counted(&mut self.queue, &mut self.stats, frame);
    }

    /// 按请求改写模板的序号和目的地址，计算 CRC 后入队
    pub(crate) fn enqueue_reply(&mut self, which: Reply, cnt: u32, uid_dest: u32) {
        let template: &mut Packet = match which {
            Reply::Identity => &mut self.templates.identity,
            Reply::State => &mut self.templates.state,
            Reply::RelayAck => &mut self.templates.relay_ack,
        };
        template.edit_header(|h| {
            h.cnt = cnt;
            h.uid_dest = uid_dest;
        });
        template.seal(&self.crc);
        push_counted(&mut self.queue, &mut self.stats, template.as_bytes());
    }

    /// 发送调度：上行口空闲时取队首帧交给发送原语
    pub(crate) fn schedule_transmit(&mut self) {
        if self.ports[UPLINK_PORT].tx_busy {
            return;
        }
        let Some(frame) = self.queue.peek_oldest() else {
            return;
        };
        let len = frame.len();
        match self.hardware.transport().start_send(UPLINK_PORT, frame) {
            Ok(()) => {
                self.queue.advance_past(len);
                self.ports[UPLINK_PORT].tx_busy = true;
                self.stats.frames_sent_up += 1;
            }
            // 传输层仍忙，下个周期重试
            Err(common::hal::HalError::Busy) => {}
            Err(e) => {
                self.queue.advance_past(len);
                self.stats.send_failures += 1;
                error!("uplink send failed: {}, frame dropped", e);
            }
        }
    }
}

fn push_counted(queue: &mut SendQueue<SEND_QUEUE_CAPACITY>, stats: &mut EngineStats, frame: &[u8]) {
    if let Err(e) = queue.push(frame) {
        stats.queue_overflows += 1;
        warn!("send queue rejected {} bytes: {}", frame.len(), e);
    }
}

/// 本地应答种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reply {
    Identity,
    State,
    RelayAck,
}

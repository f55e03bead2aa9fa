//! 基于 `embedded-hal` 非阻塞串口的传输实现。
//!
//! 没有 DMA 的平台可以在主循环或定时中断里调用 [`NbSerialTransport::poll_port`]，
//! 把字节级收发变成引擎需要的“接收完成/发送完成”事件。

use embedded_hal::serial::{Read, Write};
use heapless::Vec;

use crate::hal::{HalError, PortIndex, Transport, TransportEvent};
use crate::protocol::MAX_FRAME_SIZE;
use crate::utils::AlignedBuffer;

struct SerialPort<S> {
    serial: S,
    /// 当前接收请求的长度
    rx_expected: Option<usize>,
    rx: AlignedBuffer<MAX_FRAME_SIZE>,
    tx: Vec<u8, MAX_FRAME_SIZE>,
    tx_pos: usize,
}

impl<S> SerialPort<S> {
    fn new(serial: S) -> Self {
        Self {
            serial,
            rx_expected: None,
            rx: AlignedBuffer::new(),
            tx: Vec::new(),
            tx_pos: 0,
        }
    }
}

/// 一组同类型的非阻塞串口
pub struct NbSerialTransport<S, const PORTS: usize> {
    ports: [SerialPort<S>; PORTS],
}

impl<S, const PORTS: usize> NbSerialTransport<S, PORTS>
where
    S: Read<u8> + Write<u8>,
{
    pub fn new(serials: [S; PORTS]) -> Self {
        Self {
            ports: serials.map(SerialPort::new),
        }
    }

    /// 端口上是否还有未发完的数据
    pub fn is_sending(&self, port: PortIndex) -> bool {
        self.ports.get(port).map_or(false, |p| !p.tx.is_empty())
    }

    /// 推进一个端口的收发，返回本次产生的事件
    ///
    /// 写错误时丢弃当前帧并按发送完成上报（尽力而为）；读错误时丢弃已收的
    /// 部分字节并按接收超时上报，由引擎决定是否重新布置接收。
    pub fn poll_port(&mut self, port: PortIndex) -> Vec<TransportEvent, 2> {
        let mut events = Vec::new();
        let Some(p) = self.ports.get_mut(port) else {
            return events;
        };

        if !p.tx.is_empty() {
            let mut done = false;
            while p.tx_pos < p.tx.len() {
                match p.serial.write(p.tx[p.tx_pos]) {
                    Ok(()) => p.tx_pos += 1,
                    Err(nb::Error::WouldBlock) => break,
                    Err(nb::Error::Other(_)) => {
                        warn!("port {} write error, frame abandoned at byte {}", port, p.tx_pos);
                        done = true;
                        break;
                    }
                }
            }
            if !done && p.tx_pos == p.tx.len() {
                done = !matches!(p.serial.flush(), Err(nb::Error::WouldBlock));
            }
            if done {
                p.tx.clear();
                p.tx_pos = 0;
                let _ = events.push(TransportEvent::SendComplete { port });
            }
        }

        if let Some(expected) = p.rx_expected {
            loop {
                if p.rx.len() == expected {
                    let mut data = Vec::new();
                    let _ = data.extend_from_slice(p.rx.as_slice());
                    p.rx.clear();
                    p.rx_expected = None;
                    let _ = events.push(TransportEvent::ReceiveComplete { port, data });
                    break;
                }
                match p.serial.read() {
                    Ok(byte) => {
                        p.rx.extend_from_slice(&[byte]);
                    }
                    Err(nb::Error::WouldBlock) => break,
                    Err(nb::Error::Other(_)) => {
                        debug!("port {} read error after {} bytes", port, p.rx.len());
                        p.rx.clear();
                        p.rx_expected = None;
                        let _ = events.push(TransportEvent::ReceiveTimeout { port });
                        break;
                    }
                }
            }
        }

        events
    }
}

impl<S, const PORTS: usize> Transport for NbSerialTransport<S, PORTS>
where
    S: Read<u8> + Write<u8>,
{
    fn start_receive(&mut self, port: PortIndex, len: usize) -> Result<(), HalError> {
        let p = self.ports.get_mut(port).ok_or(HalError::InvalidPort)?;
        if len > MAX_FRAME_SIZE {
            return Err(HalError::RecvFailed);
        }
        p.rx.clear();
        p.rx_expected = Some(len);
        Ok(())
    }

    fn start_send(&mut self, port: PortIndex, bytes: &[u8]) -> Result<(), HalError> {
        let p = self.ports.get_mut(port).ok_or(HalError::InvalidPort)?;
        if !p.tx.is_empty() {
            return Err(HalError::Busy);
        }
        p.tx
            .extend_from_slice(bytes)
            .map_err(|_| HalError::SendFailed)?;
        p.tx_pos = 0;
        Ok(())
    }
}

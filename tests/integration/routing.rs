#[cfg(test)]
mod routing_tests {
    use common::hal::simulator::SimHardware;
    use common::hal::Hardware;
    use common::protocol::{
        ChunkId, ChunkType, Command, DeviceType, Header, Packet, HEADER_SIZE, MAX_DATA_SIZE,
    };
    use common::utils::{Crc16, CrcService};
    use expander::config::{DIRECTORY_CAPACITY, MAX_DOWNLINK_PORTS, UPLINK_PORT};
    use expander::{AuraEngine, ExpanderConfig};

    const PORTS: usize = MAX_DOWNLINK_PORTS + 1;
    const UID: u32 = 0xE000_0001;
    const PC: u32 = 0;

    type Engine = AuraEngine<SimHardware, Crc16, PORTS>;

    fn engine() -> Engine {
        let mut engine = AuraEngine::new(SimHardware::new(UID, PORTS), Crc16, ExpanderConfig::default());
        engine.start();
        engine
    }

    fn deliver_raw(engine: &mut Engine, port: usize, bytes: &[u8]) {
        engine.on_receive_complete(port, &bytes[..HEADER_SIZE]);
        engine.on_receive_complete(port, &bytes[HEADER_SIZE..]);
    }

    fn request(cnt: u32, dest: u32, cmd: Command) -> Packet {
        let mut packet = Packet::new(Header::new(cnt, PC, dest, cmd as u16));
        packet.seal(&Crc16);
        packet
    }

    fn identity_answer(uid: u32) -> Packet {
        let mut packet = Packet::new(Header::new(1, uid, PC, Command::AnsWhoami as u16));
        packet
            .append_chunk(ChunkId::Type as u8, ChunkType::U32, &(DeviceType::Tmp112 as u32).to_le_bytes())
            .unwrap();
        packet.seal(&Crc16);
        packet
    }

    /// 轮询直到发送队列清空，返回上行口发出的所有帧
    fn flush_uplink(engine: &mut Engine) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            engine.poll();
            let sent = engine.hardware_mut().transport().take_sent(UPLINK_PORT);
            if sent.is_empty() && engine.queue().is_empty() {
                return out;
            }
            for frame in sent {
                engine.on_send_complete(UPLINK_PORT);
                out.push(frame);
            }
        }
    }

    fn downlink_traffic(engine: &mut Engine) -> Vec<(usize, Vec<u8>)> {
        let mut out = Vec::new();
        for port in 1..PORTS {
            for frame in engine.hardware_mut().transport().take_sent(port) {
                engine.on_send_complete(port);
                out.push((port, frame));
            }
        }
        out
    }

    #[test]
    fn test_each_device_is_reached_through_its_own_port() {
        let mut engine = engine();
        for port in 1..PORTS {
            deliver_raw(&mut engine, port, identity_answer(100 + port as u32).as_bytes());
        }
        assert_eq!(flush_uplink(&mut engine).len(), MAX_DOWNLINK_PORTS);

        for port in 1..PORTS {
            let uid = 100 + port as u32;
            let req = request(port as u32, uid, Command::ReqData);
            deliver_raw(&mut engine, UPLINK_PORT, req.as_bytes());
            engine.poll();
            assert_eq!(downlink_traffic(&mut engine), vec![(port, req.as_bytes().to_vec())]);
        }
        assert_eq!(engine.stats().routing_misses, 0);
    }

    #[test]
    fn test_directory_overflow_rejects_and_counts() {
        let mut engine = engine();
        let total = DIRECTORY_CAPACITY + 1;
        for i in 0..total {
            let port = 1 + i % MAX_DOWNLINK_PORTS;
            deliver_raw(&mut engine, port, identity_answer(1000 + i as u32).as_bytes());
            if port == MAX_DOWNLINK_PORTS || i + 1 == total {
                flush_uplink(&mut engine);
            }
        }

        assert_eq!(engine.directory().len(), DIRECTORY_CAPACITY);
        assert_eq!(engine.stats().directory_rejects, 1);
        assert_eq!(engine.stats().queue_overflows, 0);

        let last = 1000 + DIRECTORY_CAPACITY as u32;
        deliver_raw(&mut engine, UPLINK_PORT, request(9, last, Command::ReqData).as_bytes());
        engine.poll();
        assert!(downlink_traffic(&mut engine).is_empty());
        assert_eq!(engine.stats().routing_misses, 1);
    }

    #[test]
    fn test_rediscovery_follows_moved_device() {
        let mut engine = engine();
        deliver_raw(&mut engine, 3, identity_answer(77).as_bytes());
        flush_uplink(&mut engine);

        deliver_raw(&mut engine, UPLINK_PORT, request(2, 0, Command::ReqWhoami).as_bytes());
        engine.poll();
        downlink_traffic(&mut engine);
        assert_eq!(engine.directory().lookup(77), None);

        deliver_raw(&mut engine, 5, identity_answer(77).as_bytes());
        flush_uplink(&mut engine);
        assert_eq!(engine.directory().lookup(77), Some(5));

        let req = request(3, 77, Command::ReqData);
        deliver_raw(&mut engine, UPLINK_PORT, req.as_bytes());
        engine.poll();
        assert_eq!(downlink_traffic(&mut engine), vec![(5, req.as_bytes().to_vec())]);
    }

    #[test]
    fn test_reserved_read_is_forwarded_but_not_answered() {
        let mut engine = engine();
        deliver_raw(&mut engine, UPLINK_PORT, request(1, 0, Command::ReqRead).as_bytes());
        assert!(flush_uplink(&mut engine).is_empty());
        assert_eq!(downlink_traffic(&mut engine).len(), MAX_DOWNLINK_PORTS);
    }

    #[test]
    fn test_unrecognized_command_from_downlink_goes_up_unchanged() {
        let mut engine = engine();
        let mut frame = Packet::new(Header::new(4, 55, PC, 0x99));
        frame.seal(&Crc16);
        deliver_raw(&mut engine, 4, frame.as_bytes());

        assert_eq!(flush_uplink(&mut engine), vec![frame.as_bytes().to_vec()]);
        assert!(engine.directory().is_empty());
    }

    #[test]
    fn test_malformed_whoami_answer_is_registered_and_forwarded_as_is() {
        let mut engine = engine();
        // 数据块声明 10 字节，负载只剩 2 字节
        let mut header = Header::new(1, 66, PC, Command::AnsWhoami as u16);
        header.data_sz = 6;
        let mut raw = header.to_bytes().to_vec();
        raw.extend_from_slice(&[ChunkId::Type as u8, ChunkType::ArrU8 as u8, 10, 0, 0xAA, 0xBB]);
        let crc = Crc16.compute(&raw);
        raw.extend_from_slice(&crc.to_le_bytes());

        deliver_raw(&mut engine, 2, &raw);
        assert_eq!(flush_uplink(&mut engine), vec![raw]);
        assert_eq!(engine.directory().lookup(66), Some(2));
        assert_eq!(engine.stats().malformed_answers, 1);
    }

    #[test]
    fn test_full_whoami_answer_cannot_grow_and_is_dropped() {
        let mut engine = engine();
        let mut answer = Packet::new(Header::new(1, 88, PC, Command::AnsWhoami as u16));
        answer
            .append_chunk(ChunkId::Type as u8, ChunkType::U32, &(DeviceType::Expander as u32).to_le_bytes())
            .unwrap();
        let chain = vec![0u8; MAX_DATA_SIZE - 8 - 4];
        answer
            .append_chunk(ChunkId::Uids as u8, ChunkType::ArrU32, &chain)
            .unwrap();
        answer.seal(&Crc16);

        deliver_raw(&mut engine, 1, answer.as_bytes());
        assert!(flush_uplink(&mut engine).is_empty());
        assert_eq!(engine.stats().aggregation_overflows, 1);
        assert_eq!(engine.directory().lookup(88), Some(1));
    }

    #[test]
    fn test_garbage_header_resyncs_to_next_frame() {
        let mut engine = engine();
        let garbage = [0x55u8; HEADER_SIZE];
        engine.on_receive_complete(6, &garbage);
        assert_eq!(engine.stats().bad_magic, 1);

        let frame = request(1, PC, Command::AnsData);
        deliver_raw(&mut engine, 6, frame.as_bytes());
        assert_eq!(flush_uplink(&mut engine), vec![frame.as_bytes().to_vec()]);
    }
}

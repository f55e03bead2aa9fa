#[cfg(test)]
mod protocol_parsing_tests {
    use common::protocol::{
        ChunkId, ChunkType, ChunkValue, Command, DeviceType, Header, Packet, ProtocolError,
        AURA_PROTOCOL, HEADER_SIZE, MAX_DATA_SIZE,
    };
    use common::utils::{calculate_checksum, Crc16, CrcService};

    fn state_answer() -> Packet {
        let mut packet = Packet::new(Header::new(11, 0x5E00_0077, 0, Command::AnsData as u16));
        packet.append_chunk(ChunkId::WetSens as u8, ChunkType::U16, &1u16.to_le_bytes()).unwrap();
        packet.append_chunk(ChunkId::Battery as u8, ChunkType::U16, &3300u16.to_le_bytes()).unwrap();
        packet.append_chunk(ChunkId::Relay1 as u8, ChunkType::U8, &[1]).unwrap();
        packet.append_chunk(ChunkId::Relay2 as u8, ChunkType::U8, &[0]).unwrap();
        packet.seal(&Crc16);
        packet
    }

    #[test]
    fn test_header_wire_layout_is_little_endian() {
        let header = Header::new(0x0102_0304, 0xAABB_CCDD, 0x1122_3344, Command::ReqData as u16);
        let raw = header.to_bytes();
        assert_eq!(&raw[0..4], b"AURA");
        assert_eq!(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]), AURA_PROTOCOL);
        assert_eq!(&raw[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&raw[8..12], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(&raw[16..18], &[3, 0]);
        assert_eq!(&raw[18..20], &[0, 0]);
        assert_eq!(Header::decode(&raw).unwrap(), header);
    }

    #[test]
    fn test_received_frame_reproduces_chunks() {
        let packet = state_answer();
        let parsed = Packet::from_frame(packet.as_bytes()).unwrap();

        assert_eq!(parsed.header().data_sz, 6 + 6 + 5 + 5);
        let values: Vec<_> = parsed.chunks().map(|c| c.decode().unwrap()).collect();
        assert_eq!(
            values,
            vec![
                ChunkValue::U16(1),
                ChunkValue::U16(3300),
                ChunkValue::U8(1),
                ChunkValue::U8(0),
            ]
        );
    }

    fn scalar_cases() -> Vec<(ChunkType, Vec<u8>, ChunkValue<'static>)> {
        vec![
            (ChunkType::None, vec![], ChunkValue::None),
            (ChunkType::I8, (-5i8).to_le_bytes().to_vec(), ChunkValue::I8(-5)),
            (ChunkType::U8, vec![200], ChunkValue::U8(200)),
            (ChunkType::I16, (-300i16).to_le_bytes().to_vec(), ChunkValue::I16(-300)),
            (ChunkType::U16, 60000u16.to_le_bytes().to_vec(), ChunkValue::U16(60000)),
            (ChunkType::I32, (-70000i32).to_le_bytes().to_vec(), ChunkValue::I32(-70000)),
            (ChunkType::U32, 0xDEAD_BEEFu32.to_le_bytes().to_vec(), ChunkValue::U32(0xDEAD_BEEF)),
            (ChunkType::F32, 1.5f32.to_le_bytes().to_vec(), ChunkValue::F32(1.5)),
            (ChunkType::F64, (-2.25f64).to_le_bytes().to_vec(), ChunkValue::F64(-2.25)),
            (ChunkType::Str, b"hi".to_vec(), ChunkValue::Str("hi")),
        ]
    }

    fn array_cases() -> Vec<(ChunkType, Vec<u8>)> {
        vec![
            (ChunkType::ArrI8, vec![0xFF, 0x02]),
            (ChunkType::ArrU8, vec![1, 2, 3]),
            (ChunkType::ArrI16, [(-2i16).to_le_bytes(), 7i16.to_le_bytes()].concat()),
            (ChunkType::ArrU16, [1u16.to_le_bytes(), 65535u16.to_le_bytes()].concat()),
            (ChunkType::ArrI32, [(-1i32).to_le_bytes(), 9i32.to_le_bytes()].concat()),
            (ChunkType::ArrU32, [77u32.to_le_bytes(), 88u32.to_le_bytes()].concat()),
            (ChunkType::ArrF32, [0.5f32.to_le_bytes(), (-4.0f32).to_le_bytes()].concat()),
            (ChunkType::ArrF64, 3.0f64.to_le_bytes().to_vec()),
        ]
    }

    fn frame_of(cases: &[(ChunkType, &[u8])]) -> Packet {
        let mut packet = Packet::new(Header::new(1, 2, 0, Command::AnsData as u16));
        for (i, (ty, value)) in cases.iter().enumerate() {
            packet.append_chunk(i as u8 + 1, *ty, value).unwrap();
        }
        packet.seal(&Crc16);
        Packet::from_frame(packet.as_bytes()).unwrap()
    }

    #[test]
    fn test_every_scalar_type_round_trips() {
        let cases = scalar_cases();
        let input: Vec<(ChunkType, &[u8])> = cases.iter().map(|(t, v, _)| (*t, v.as_slice())).collect();
        let parsed = frame_of(&input);

        let mut chunks = parsed.chunks();
        for (i, (ty, value, expected)) in cases.iter().enumerate() {
            let chunk = chunks.next().unwrap();
            assert_eq!(chunk.id as usize, i + 1);
            assert_eq!(chunk.chunk_type(), Some(*ty));
            assert_eq!(chunk.value, value.as_slice());
            assert_eq!(chunk.decode().unwrap(), *expected, "type {:?}", ty);
        }
        assert!(chunks.next().is_none());
        assert!(!chunks.is_malformed());
    }

    #[test]
    fn test_every_array_type_round_trips() {
        let cases = array_cases();
        let input: Vec<(ChunkType, &[u8])> = cases.iter().map(|(t, v)| (*t, v.as_slice())).collect();
        let parsed = frame_of(&input);
        assert_eq!(parsed.chunks().count(), cases.len());

        for (chunk, (ty, value)) in parsed.chunks().zip(&cases) {
            let width = ty.element_type().and_then(ChunkType::scalar_size).unwrap();
            match chunk.decode().unwrap() {
                ChunkValue::Array(arr) => {
                    assert_eq!(Some(arr.element_type()), ty.element_type());
                    assert_eq!(arr.len(), value.len() / width);
                    for i in 0..arr.len() {
                        assert_eq!(arr.element(i).unwrap(), &value[i * width..(i + 1) * width]);
                    }
                }
                other => panic!("{:?} decoded as {:?}", ty, other),
            }
        }
    }

    #[test]
    fn test_mixed_payload_filling_the_bound() {
        let name = b"AURA-node";
        let tail = vec![0x5Au8; 91];
        let parsed = frame_of(&[
            (ChunkType::U32, &8u32.to_le_bytes()[..]),
            (ChunkType::Str, &name[..]),
            (ChunkType::F64, &0.125f64.to_le_bytes()[..]),
            (ChunkType::ArrU8, &tail[..]),
        ]);
        assert_eq!(parsed.header().data_sz as usize, MAX_DATA_SIZE);

        let mut chunks = parsed.chunks();
        let values: Vec<_> = chunks.by_ref().map(|c| c.decode().unwrap()).collect();
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], ChunkValue::U32(8));
        assert_eq!(values[1], ChunkValue::Str("AURA-node"));
        assert_eq!(values[2], ChunkValue::F64(0.125));
        assert!(!chunks.is_malformed());
        assert_eq!(chunks.consumed(), MAX_DATA_SIZE);

        let mut full = parsed.clone();
        assert_eq!(
            full.append_chunk(5, ChunkType::None, &[]),
            Err(ProtocolError::PayloadOverflow)
        );
    }

    #[test]
    fn test_invalid_utf8_string_is_type_mismatch() {
        let parsed = frame_of(&[(ChunkType::Str, &[0xFF, 0xFE, b'A'][..])]);
        let chunk = parsed.chunks().next().unwrap();
        assert_eq!(chunk.decode(), Err(ProtocolError::ChunkTypeMismatch));
    }

    #[test]
    fn test_any_single_bit_flip_fails_crc() {
        let packet = state_answer();
        let bytes = packet.as_bytes();
        assert!(Crc16.validate(bytes));

        let covered = bytes.len() - 2;
        for byte in 0..covered {
            for bit in 0..8 {
                let mut corrupted = bytes.to_vec();
                corrupted[byte] ^= 1 << bit;
                assert!(!Crc16.validate(&corrupted), "flip at {}:{} not detected", byte, bit);
            }
        }
    }

    #[test]
    fn test_crc_covers_header_and_payload() {
        let packet = state_answer();
        let bytes = packet.as_bytes();
        let body = &bytes[..bytes.len() - 2];
        assert_eq!(packet.crc(), calculate_checksum(body));
        assert_eq!(packet.crc(), Crc16.compute(body));
    }

    #[test]
    fn test_payload_bound_is_enforced() {
        let mut packet = Packet::new(Header::new(0, 1, 0, Command::AnsData as u16));
        let filler = [0u8; MAX_DATA_SIZE - 4 - 4];
        packet.append_chunk(ChunkId::Uids as u8, ChunkType::ArrU32, &filler).unwrap();
        // 还剩 4 字节，恰好放下一个空数据块
        packet.append_chunk(ChunkId::Relay1 as u8, ChunkType::None, &[]).unwrap();
        assert_eq!(packet.header().data_sz as usize, MAX_DATA_SIZE);
        assert_eq!(
            packet.append_chunk(ChunkId::Relay2 as u8, ChunkType::None, &[]),
            Err(ProtocolError::PayloadOverflow)
        );
    }

    #[test]
    fn test_frame_with_oversized_data_sz_is_rejected() {
        let mut header = Header::new(0, 1, 0, Command::AnsData as u16);
        header.data_sz = (MAX_DATA_SIZE + 1) as u16;
        let mut frame = vec![0u8; HEADER_SIZE + MAX_DATA_SIZE + 1 + 2];
        frame[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
        assert_eq!(Packet::from_frame(&frame), Err(ProtocolError::PayloadOverflow));
    }

    #[test]
    fn test_catalog_codes() {
        assert_eq!(Command::from_u16(2), Some(Command::AnsWhoami));
        assert_eq!(Command::from_u16(9), None);
        assert_eq!(DeviceType::from_u32(8), Some(DeviceType::Expander));
        assert_eq!(ChunkId::from_u8(2), Some(ChunkId::Uids));
        assert_eq!(ChunkType::from_u8(15), Some(ChunkType::ArrU32));
        assert_eq!(ChunkType::from_u8(18), None);
    }
}

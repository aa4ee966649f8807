extern crate bankasm;
extern crate parameterized;
mod testutil;

#[cfg(test)]
mod offsettests {
    use crate::testutil::small_map;
    use bankasm::{
        data::{Addr, Word},
        error::AsmError,
        offset::{encode, ProgrammedOffset},
    };
    use parameterized::parameterized;

    #[parameterized(depth_h = { 0, 1, 1024, 4095 })]
    fn test_read_field_and_enables(depth_h: usize) {
        let word = encode(20, 0, 4, 0, depth_h, 0, 0);
        let po = ProgrammedOffset::decode(word);
        assert_eq!(po.read_offset, 24);
        assert_eq!(po.write_offset as usize, depth_h);
        assert!(po.read_enable);
        assert!(po.write_enable);
    }

    #[parameterized(
        read = { 1023, 1024, 1025, -1, -1025 },
        expected = { 1023, 0, 1, 1023, 1023 }
    )]
    fn test_read_offset_wraps(read: i64, expected: u16) {
        assert_eq!(ProgrammedOffset::new(read, 0).read_offset, expected);
    }

    #[test]
    fn test_array_scalar_pointer() {
        let word = encode(1024, 1008, 4, 3072, 1024, 3968, 1028);
        assert_eq!(word, Word(0x5_4840_0014));
    }

    #[test]
    fn test_small_map_pointer() {
        let po = ProgrammedOffset::for_arrays(&small_map(), "B", Addr(4), "H", Addr(36)).unwrap();
        // read 32 - 16 + 4, write 96 + 32 - 112 + 36
        assert_eq!((po.read_offset, po.write_offset), (20, 52));
        assert_eq!(po.to_string(), "read 20 write 52");
    }

    #[test]
    fn test_missing_geometry() {
        let err = ProgrammedOffset::for_arrays(&small_map(), "I", Addr(0), "H", Addr(0)).unwrap_err();
        assert_eq!(
            err,
            AsmError::Config {
                bank: "I".to_string(),
                reason: "no po_inc_base configured".to_string()
            }
        );
    }
}

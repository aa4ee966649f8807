extern crate bankasm;
extern crate insta;
extern crate parameterized;
mod testutil;

#[cfg(test)]
mod banktests {
    use crate::testutil::small_map;
    use bankasm::{
        bank::MemoryBank,
        data::{Addr, Word},
        error::AsmError,
        label::Lookup,
        util::writeout_bank,
    };
    use insta::assert_display_snapshot;
    use parameterized::parameterized;

    #[test]
    fn test_labels_resolve_as_defined() {
        let map = small_map();
        let mut b = MemoryBank::allocate("B", &map).unwrap();
        let names = ["zero", "one", "two", "three"];
        for (value, name) in names.iter().enumerate() {
            b.write_literal(value as i64, Some(*name)).unwrap();
        }
        for (value, name) in names.iter().enumerate() {
            assert_eq!(b.resolve_read(name), Ok(Addr(value)));
            assert_eq!(b.resolve_write(name), Ok(Addr(32 + value)));
        }
        assert_eq!(b.lookup("four"), Lookup::Unresolved);
        assert_eq!(
            b.write_literal(9, Some("two")),
            Err(AsmError::DuplicateLabel {
                bank: "B".to_string(),
                label: "two".to_string(),
                address: Addr(2)
            })
        );
        assert_eq!(b.resolve_read("two"), Ok(Addr(2)));
    }

    #[parameterized(depth = { 1, 2, 7, 32 })]
    fn test_never_wraps(depth: usize) {
        let map = bankasm::config::MemoryMap::parse(&format!("X depth={depth} origin=0")).unwrap();
        let mut bank = MemoryBank::allocate("X", &map).unwrap();
        for value in 0..depth {
            bank.write_literal(value as i64 + 1, None).unwrap();
        }
        assert_eq!(
            bank.write_literal(-1, None),
            Err(AsmError::Capacity {
                bank: "X".to_string(),
                address: Addr(depth),
                depth
            })
        );
        assert_eq!(bank.get(Addr(0)), Word(1));
        assert_eq!(bank.len(), depth);
    }

    #[test]
    fn test_unknown_bank() {
        assert!(matches!(
            MemoryBank::allocate("Q", &small_map()),
            Err(AsmError::Config { .. })
        ));
    }

    #[test]
    fn test_parameters_and_literals() {
        let map = small_map();
        let mut a = MemoryBank::allocate("A", &map).unwrap();
        let io = a.config().require_io_base().unwrap();
        a.write_parameter("A_IO", io, None).unwrap();
        a.write_literal(0, None).unwrap();
        a.write_literal(1, Some("one")).unwrap();
        a.write_literal(-1, Some("minus_one")).unwrap();
        assert_eq!(a.resolve_write("A_IO"), Ok(Addr(24)));
        assert_display_snapshot!(writeout_bank(&a), @r###"
        0000	000000000
        0001	000000001	one
        0002	fffffffff	minus_one
        0024	000000000	A_IO
        "###);
    }
}

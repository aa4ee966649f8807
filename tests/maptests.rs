extern crate bankasm;
extern crate insta;
extern crate parameterized;
mod testutil;

#[cfg(test)]
mod maptests {
    use crate::testutil::small_map;
    use bankasm::{config::MemoryMap, data::Addr, error::AsmError};
    use insta::assert_display_snapshot;
    use parameterized::parameterized;

    #[parameterized(input = {
        "A depth=4 colour=3",
        "A origin=4",
        "A depth=4 width=0",
        "A depth=4 width=65",
        "A depth=4\nA depth=8",
        "A depth=4 origin=",
        "4A depth=4",
    })]
    fn test_rejects(input: &str) {
        assert!(matches!(
            MemoryMap::parse(input),
            Err(AsmError::Config { .. })
        ));
    }

    #[parameterized(input = {
        "",
        "# nothing but a comment",
        "A depth=4",
        "  A\tdepth=0x10   # indented, hex, commented",
        "A depth=4\n\n\nB depth=4\n",
        "A depth=4\r\nB depth=4\r\n",
    })]
    fn test_accepts(input: &str) {
        assert!(MemoryMap::parse(input).is_ok(), "{input:?}");
    }

    #[test]
    fn test_small_map_geometry() {
        let map = small_map();
        let bd = map.get("BD").unwrap();
        assert_eq!(bd.capacity(), 8);
        assert_eq!(bd.width, 10);
        assert_eq!(map.get("B").unwrap().io_base, Some(Addr(24)));
        assert!(map.get("H").unwrap().require_io_base().is_err());
    }

    #[test]
    fn test_display() {
        let map = MemoryMap::parse("A depth=0x400 origin=0 io_base=1016\nBC depth=8 lanes=8 width=3")
            .unwrap();
        assert_display_snapshot!(map, @r###"
        A base=0 depth=1024 origin=0 io_base=1016
        BC base=0 depth=8 width=3 lanes=8
        "###);
    }
}

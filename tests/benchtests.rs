extern crate bankasm;
extern crate insta;

#[cfg(test)]
mod benchtests {
    use bankasm::{
        bench::{array_scalar, by_name},
        config::MemoryMap,
        data::Addr,
        image::{mem_dump, ImageSet},
        offset::ProgrammedOffset,
        util::{writeout_bank, writeout_branches},
        AsmApp,
    };
    use insta::assert_display_snapshot;

    fn assembled() -> ImageSet {
        array_scalar::assemble(&MemoryMap::builtin().unwrap()).unwrap()
    }

    #[test]
    fn test_every_bank_is_produced() {
        let images = assembled();
        let map = MemoryMap::builtin().unwrap();
        let names = images.iter().map(|b| b.name()).collect::<Vec<_>>();
        let expected = map.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, expected);
        for bank in images.iter() {
            assert_eq!(mem_dump(bank).lines().count(), bank.depth());
        }
    }

    #[test]
    fn test_instructions() {
        let images = assembled();
        assert_display_snapshot!(writeout_bank(images.get("I").unwrap()), @r###"
        0001	440200001	init
        0002	4c200000f	outer
        0003	000000000	inner1
        0004	4403003f0	inner2
        0005	440300403
        0006	4f8000003
        0007	440200802	break
        0008	4c200000f
        0009	4403003f0	output
        0010	43f800003	output2
        "###);
    }

    #[test]
    fn test_data() {
        let images = assembled();
        assert_display_snapshot!(writeout_bank(images.get("A").unwrap()), @r###"
        0000	000000000
        0001	000000001	one
        0002	fffffffff	minus_one
        1016	000000000	A_IO
        "###);
        assert_display_snapshot!(writeout_bank(images.get("B").unwrap()), @r###"
        0000	000000000
        0001	00000000a	loop_count_init
        0002	000000000	loop_count
        0003	000000000	temp
        0004	000000000	array
        0005	000000001
        0006	000000002
        0007	000000003
        0008	000000004
        0009	000000005
        0010	000000006
        0011	000000007
        0012	000000008
        0013	000000009
        0014	fffffffff
        0015	548400014	loop_pointer_init
        1008	000000000	loop_pointer
        1016	000000000	B_IO
        "###);
    }

    #[test]
    fn test_branch_table() {
        let images = assembled();
        assert_display_snapshot!(writeout_branches(&images), @r###"
        cell	BD	BO	BC	BP	BPE
        0000	7	5	2	0	1	lane0.jmp0
        0001	4	6	0	0	0	lane0.jmp1
        0002	3	8	4	0	0	lane0.jmp2
        0003	1	10	2	0	1	lane0.jmp3
        0004	9	10	6	0	0	lane0.jmp0a
        "###);
    }

    #[test]
    fn test_other_lanes_stay_empty() {
        let images = assembled();
        let bd = images.get("BD").unwrap();
        for cell in bd.cells().filter(|c| c.address >= Addr(8)) {
            assert!(cell.word.is_zero());
        }
        let pc = images.get("PC").unwrap();
        assert_eq!(pc.get(Addr(0)).0, 1);
        assert!(pc.get(Addr(1)).is_zero());
    }

    #[test]
    fn test_pointer_init() {
        let images = assembled();
        let b = images.get("B").unwrap();
        let init = b.resolve_read("loop_pointer_init").unwrap();
        let po = ProgrammedOffset::decode(b.get(init));
        assert_eq!((po.read_offset, po.write_offset), (20, 1156));
        assert_eq!(b.resolve_write("loop_pointer"), Ok(Addr(3968)));
    }

    #[test]
    fn test_through_app() {
        let mut app = AsmApp::new().unwrap();
        assert!(by_name(array_scalar::NAME).is_some());
        let images = app.assemble(array_scalar::NAME).unwrap();
        assert_eq!(images.len(), 19);
        assert_eq!(app.bench, Some("array_scalar"));
    }
}

extern crate bankasm;
extern crate insta;
extern crate parameterized;
mod testutil;

#[cfg(test)]
mod streamtests {
    use crate::testutil::{filler, small_map};
    use bankasm::{
        assembly::Assembly,
        bank::MemoryBank,
        branch::{BranchTable, Condition},
        config::MemoryMap,
        data::{Addr, Lane, Word},
        error::AsmError,
        instr::{Operand, ADD},
        stream::{InstructionStream, StreamState},
    };
    use insta::assert_display_snapshot;
    use parameterized::parameterized;

    fn slot_values(table: &BranchTable, lane: Lane) -> Vec<Addr> {
        table
            .slots()
            .filter(|s| s.lane == lane)
            .map(|s| table.value(lane, &s.name).unwrap())
            .collect()
    }

    #[test]
    fn test_forward_branches_all_resolve() {
        let mut asm = Assembly::new(&small_map()).unwrap();
        let mut i = asm.stream("I", Lane(0), Addr(1)).unwrap();
        let table = asm.branches_mut();
        for n in 0..4 {
            filler(&mut i);
            i.jnz(table, None, &format!("jmp{n}"), &format!("t{n}"))
                .unwrap();
            filler(&mut i);
            i.label(&format!("t{n}")).unwrap();
            filler(&mut i);
        }
        assert_eq!(i.instructions().count(), 12);
        assert_eq!(i.pending().len(), 4);
        assert_eq!(slot_values(table, Lane(0)), vec![Addr(0); 4]);

        i.resolve_forward_jumps(table).unwrap();
        assert!(i.pending().is_empty());
        assert_eq!(
            slot_values(table, Lane(0)),
            vec![Addr(3), Addr(6), Addr(9), Addr(12)]
        );
        asm.link(i).unwrap();
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let map = small_map();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut i = InstructionStream::begin(bank, Lane(0), Addr(1)).unwrap();
        filler(&mut i);
        i.jmp(&mut table, "jmp0", "end").unwrap();
        i.label("end").unwrap();
        filler(&mut i);

        i.resolve_forward_jumps(&mut table).unwrap();
        let once = slot_values(&table, Lane(0));
        i.resolve_forward_jumps(&mut table).unwrap();
        assert_eq!(slot_values(&table, Lane(0)), once);
        assert_eq!(i.state(), StreamState::Finalized);
    }

    #[parameterized(between = { 0, 1, 5, 20 })]
    fn test_patch_survives_intervening_labels(between: usize) {
        let map = small_map();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut i = InstructionStream::begin(bank, Lane(0), Addr(1)).unwrap();
        filler(&mut i);
        i.jne(&mut table, Some(false), "jmp0", "target").unwrap();
        for n in 0..between {
            i.label(&format!("l{n}")).unwrap();
            filler(&mut i);
        }
        let target = i.label("target").unwrap();
        filler(&mut i);
        i.resolve_forward_jumps(&mut table).unwrap();
        assert_eq!(target, Addr(2 + between));
        assert_eq!(table.value(Lane(0), "jmp0"), Ok(target));
    }

    #[parameterized(index = { 0, 1, 2, 3 })]
    fn test_lanes_never_share_cells(index: usize) {
        let table = BranchTable::new(&small_map()).unwrap();
        for other in 0..table.slot_depth() {
            assert_ne!(table.cell(Lane(0), index), table.cell(Lane(1), other));
            assert_ne!(
                table.slot_address(Lane(0), index),
                table.slot_address(Lane(1), other)
            );
        }
    }

    #[test]
    fn test_lane_one_leaves_lane_zero_alone() {
        let map = small_map();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut lane0 = InstructionStream::begin(bank.clone(), Lane(0), Addr(1)).unwrap();
        let mut lane1 = InstructionStream::begin(bank, Lane(1), Addr(1)).unwrap();

        lane0.label("top").unwrap();
        filler(&mut lane0);
        lane0.jmp(&mut table, "jmp0", "top").unwrap();

        filler(&mut lane1);
        lane1.label("top").unwrap();
        filler(&mut lane1);
        lane1.jmp(&mut table, "jmp0", "top").unwrap();

        assert_eq!(table.value(Lane(0), "jmp0"), Ok(Addr(1)));
        assert_eq!(table.value(Lane(1), "jmp0"), Ok(Addr(2)));
        assert_eq!(table.lookup(Lane(1), "jmp0").unwrap().cell, Addr(4));
        assert_eq!(table.lookup(Lane(1), "jmp0").unwrap().address, Addr(112));
    }

    #[test]
    fn test_lane_past_table() {
        let map = small_map();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut i = InstructionStream::begin(bank, Lane(2), Addr(1)).unwrap();
        filler(&mut i);
        assert!(matches!(
            i.jmp(&mut table, "jmp0", "x"),
            Err(AsmError::LaneCapacity { .. })
        ));
    }

    #[test]
    fn test_last_write_wins() {
        let map = small_map();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut i = InstructionStream::begin(bank, Lane(0), Addr(1)).unwrap();
        i.label("near").unwrap();
        filler(&mut i);
        i.jne(&mut table, None, "jmp0", "far").unwrap();
        filler(&mut i);
        i.jmp(&mut table, "jmp0", "near").unwrap();
        assert!(i.pending().is_empty());
        i.label("far").unwrap();
        filler(&mut i);
        i.resolve_forward_jumps(&mut table).unwrap();
        assert_eq!(table.value(Lane(0), "jmp0"), Ok(Addr(1)));
    }

    #[test]
    fn test_second_writer_of_a_kind() {
        let map = small_map();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut i = InstructionStream::begin(bank, Lane(0), Addr(1)).unwrap();
        filler(&mut i);
        i.jze(&mut table, None, "jmp0", "a").unwrap();
        filler(&mut i);
        assert_eq!(
            i.jpe(&mut table, None, "jmp0", "b"),
            Err(AsmError::SlotReuse {
                slot: "jmp0".to_string(),
                condition: Condition::ParityEven
            })
        );
    }

    #[test]
    fn test_full_lane() {
        let map = small_map();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut i = InstructionStream::begin(bank, Lane(0), Addr(1)).unwrap();
        i.label("top").unwrap();
        filler(&mut i);
        for n in 0..4 {
            i.jmp(&mut table, &format!("jmp{n}"), "top").unwrap();
        }
        assert!(matches!(
            i.jmp(&mut table, "jmp4", "top"),
            Err(AsmError::Capacity { .. })
        ));
    }

    #[test]
    fn test_listing_and_companions() {
        let map = small_map();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut i = InstructionStream::begin(bank, Lane(0), Addr(1)).unwrap();
        i.label("top").unwrap();
        i.emit(ADD, vec!["x".into(), Operand::Imm(0), "y".into()])
            .unwrap();
        i.jne(&mut table, Some(true), "jmp0", "done").unwrap();
        i.nop().unwrap();
        i.jmp(&mut table, "jmp1", "top").unwrap();
        i.label("done").unwrap();
        filler(&mut i);
        i.resolve_forward_jumps(&mut table).unwrap();

        assert_display_snapshot!(i, @r###"
        0001	top	ADD x, 0, y	; JNE done via jmp0 (taken)
        0002		NOP	; JMP top via jmp1
        0003	done	ADD 0, 0, 0
        "###);

        let column = |name: &str| {
            let bank = table.column(name).unwrap();
            (bank.get(Addr(0)), bank.get(Addr(1)))
        };
        assert_eq!(column("BD"), (Word(3), Word(1)));
        assert_eq!(column("BO"), (Word(1), Word(2)));
        assert_eq!(column("BC"), (Word(2), Word(0)));
        assert_eq!(column("BP"), (Word(1), Word(0)));
        assert_eq!(column("BPE"), (Word(1), Word(0)));
    }

    const WIDE_CODE_MAP: &str = r#"
PC  depth=2    width=10
I   depth=2048 origin=0
BO  depth=4    lanes=2 width=12
BD  depth=4    lanes=2 width=10
"#;

    #[test]
    fn test_target_wider_than_table_word() {
        let map = MemoryMap::parse(WIDE_CODE_MAP).unwrap();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut i = InstructionStream::begin(bank, Lane(0), Addr(1500)).unwrap();
        i.label("top").unwrap();
        filler(&mut i);
        assert_eq!(
            i.jmp(&mut table, "jmp0", "top"),
            Err(AsmError::FieldOverflow {
                field: "BD",
                value: 1500,
                width: 10
            })
        );
        assert!(table.lookup(Lane(0), "jmp0").is_none());
        assert_eq!(i.branches().count(), 0);
    }

    #[test]
    fn test_forward_target_wider_than_table_word() {
        let map = MemoryMap::parse(WIDE_CODE_MAP).unwrap();
        let mut table = BranchTable::new(&map).unwrap();
        let bank = MemoryBank::allocate("I", &map).unwrap();
        let mut i = InstructionStream::begin(bank, Lane(0), Addr(1020)).unwrap();
        filler(&mut i);
        i.jmp(&mut table, "jmp0", "far").unwrap();
        for _ in 0..4 {
            filler(&mut i);
        }
        i.label("far").unwrap();
        filler(&mut i);
        assert!(matches!(
            i.resolve_forward_jumps(&mut table),
            Err(AsmError::FieldOverflow { field: "BD", .. })
        ));
        assert_eq!(i.state(), StreamState::Building);
        assert_eq!(table.value(Lane(0), "jmp0"), Ok(Addr(0)));
    }

    #[test]
    fn test_start_wider_than_program_counter() {
        let map = MemoryMap::parse(WIDE_CODE_MAP).unwrap();
        let mut asm = Assembly::new(&map).unwrap();
        let mut i = asm.stream("I", Lane(0), Addr(1500)).unwrap();
        filler(&mut i);
        i.resolve_forward_jumps(asm.branches_mut()).unwrap();
        assert_eq!(
            asm.link(i),
            Err(AsmError::FieldOverflow {
                field: "PC",
                value: 1500,
                width: 10
            })
        );
        assert!(asm.bank("PC").unwrap().is_empty());
    }
}

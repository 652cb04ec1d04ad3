use super::*;

fn bytes(code: &[Instruction]) -> Vec<u8> {
    encode_source(&code.to_vec().into())
}

#[test]
fn test_load_rejects_opcode_at_table_size() {
    let raw = vec![0x00, 0x1F, 0x00, 0x00];
    let err = Expression::new(vec![raw], vec![]).unwrap_err();
    assert_eq!(
        err,
        LoadError::UnknownOpcode {
            source_index: 0,
            position: 0,
            opcode: 31,
            table_size: 31,
        }
    );
}

#[test]
fn test_load_accepts_last_opcode() {
    // ensure<1> is index 30, the last table entry
    let raw = vec![0x00, 0x1E, 0x00, 0x01];
    assert!(Expression::new(vec![raw], vec![]).is_ok());
}

#[test]
fn test_load_rejects_constant_at_pool_length() {
    let ok = bytes(&[Instruction::read_constant(1)]);
    assert!(Expression::new(vec![ok], words(&[5, 6])).is_ok());

    let bad = bytes(&[Instruction::read_constant(0), Instruction::read_constant(2)]);
    let err = Expression::new(vec![bad], words(&[5, 6])).unwrap_err();
    assert_eq!(
        err,
        LoadError::ConstantOutOfRange {
            source_index: 0,
            position: 1,
            offset: 2,
            constants_len: 2,
        }
    );
}

#[test]
fn test_load_stack_reads_are_not_checked_against_pool() {
    let raw = bytes(&[Instruction::read_stack(40)]);
    assert!(Expression::new(vec![raw], vec![]).is_ok());
}

#[test]
fn test_load_rejects_partial_instruction() {
    let good = bytes(&[Instruction::read_constant(0)]);
    let err = Expression::new(vec![good, vec![0, 12, 0, 2, 0]], words(&[1])).unwrap_err();
    assert_eq!(
        err,
        LoadError::MalformedSource {
            source_index: 1,
            len: 5,
            width: 4,
        }
    );
}

#[test]
fn test_load_rejects_dangling_source_targets() {
    let sources = assemble_expression("call<0 0 2>").unwrap();
    let err = Expression::from_sources(sources, vec![]).unwrap_err();
    assert_eq!(
        err,
        LoadError::SourceOutOfRange {
            source_index: 0,
            position: 0,
            target: 2,
            sources_len: 1,
        }
    );

    let sources = assemble_expression("read-memory<stack 0>; read-memory<stack 0> do-while<1 5>").unwrap();
    assert!(matches!(
        Expression::from_sources(sources, vec![]),
        Err(LoadError::SourceOutOfRange { source_index: 1, target: 5, .. })
    ));
}

#[test]
fn test_load_rejects_invalid_operands() {
    // add over a single input
    let raw = vec![0x00, 0x0C, 0x00, 0x01];
    assert!(matches!(
        Expression::new(vec![raw], vec![]),
        Err(LoadError::InvalidOperand { opcode: "add", operand: 1, .. })
    ));

    // ensure over nothing
    let raw = vec![0x00, 0x1E, 0x00, 0x00];
    assert!(matches!(
        Expression::new(vec![raw], vec![]),
        Err(LoadError::InvalidOperand { opcode: "ensure", .. })
    ));

    // debug mode 2
    let raw = vec![0x00, 0x04, 0x00, 0x02];
    assert!(matches!(
        Expression::new(vec![raw], vec![]),
        Err(LoadError::InvalidOperand { opcode: "debug", .. })
    ));

    // loop-n<1 1 2 0>: inputs and outputs differ
    let raw = vec![0x00, 0x02, 0x10, 0x21];
    assert!(matches!(
        Expression::new(vec![raw], vec![]),
        Err(LoadError::InvalidOperand { opcode: "loop-n", .. })
    ));
}

#[test]
fn test_load_error_locates_the_instruction() {
    let raw = bytes(&[Instruction::read_constant(0), Instruction::raw(200, 0)]);
    let err = Expression::new(vec![vec![], raw], words(&[1])).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("source 1"), "{}", msg);
    assert!(msg.contains("instruction 1"), "{}", msg);
    assert!(msg.contains("200"), "{}", msg);
}

#[test]
fn test_load_accepts_empty_sources() {
    let expr = Expression::new(vec![vec![]], vec![]).unwrap();
    assert_eq!(run(&expr), Ok(vec![]));
}

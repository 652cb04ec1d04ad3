use super::*;
use crate::vm::{ArithmeticKind, MAX_STACK_SIZE};

#[test]
fn test_eval_constants_and_arithmetic() {
    let e = expr(
        "read-memory<constant 0> read-memory<constant 1> read-memory<constant 2> add<3> \
         read-memory<constant 1> mul<2>",
        &[1, 2, 3],
    );
    assert_eq!(run(&e), Ok(words(&[12])));
}

#[test]
fn test_eval_variadic_ops_fold_deepest_first() {
    let e = expr(
        "read-memory<constant 0> read-memory<constant 1> read-memory<constant 2> sub<3> \
         read-memory<constant 0> read-memory<constant 2> div<2>",
        &[20, 5, 3],
    );
    // 20 - 5 - 3, then 20 / 3
    assert_eq!(run(&e), Ok(words(&[12, 6])));
}

#[test]
fn test_eval_returns_whole_window_in_push_order() {
    let e = expr(
        "read-memory<constant 2> read-memory<constant 0> read-memory<constant 1>",
        &[7, 8, 9],
    );
    assert_eq!(run(&e), Ok(words(&[9, 7, 8])));
}

#[test]
fn test_eval_stack_reads_copy_window_values() {
    let e = expr(
        "read-memory<constant 0> read-memory<constant 1> read-memory<stack 0> read-memory<stack 1> greater-than",
        &[4, 9],
    );
    // 4 > 9 is false
    assert_eq!(run(&e), Ok(words(&[4, 9, 0])));
}

#[test]
fn test_eval_is_deterministic() {
    let e = expr(
        "read-memory<constant 0> read-memory<constant 1> exp<2> read-memory<constant 2> mod<2>",
        &[3, 40, 1_000_007],
    );
    let first = run(&e);
    assert!(first.is_ok());
    for _ in 0..8 {
        assert_eq!(run(&e), first);
    }

    let failing = expr("read-memory<constant 0> read-memory<constant 1> div<2>", &[1, 0]);
    let err = run(&failing);
    assert_eq!(run(&failing), err);
}

#[test]
fn test_eval_checked_arithmetic_aborts() {
    let cases = [
        ("read-memory<constant 0> read-memory<constant 1> sub<2>", &[1u64, 2][..], "sub", ArithmeticKind::Underflow),
        ("read-memory<constant 0> read-memory<constant 1> div<2>", &[1, 0][..], "div", ArithmeticKind::DivisionByZero),
        ("read-memory<constant 0> read-memory<constant 1> mod<2>", &[1, 0][..], "mod", ArithmeticKind::DivisionByZero),
        ("read-memory<constant 0> read-memory<constant 1> exp<2>", &[2, 256][..], "exp", ArithmeticKind::Overflow),
    ];
    for (text, constants, op, kind) in cases {
        assert_eq!(run(&expr(text, constants)), Err(VmError::Arithmetic { op, kind }), "{}", text);
    }
}

#[test]
fn test_eval_add_overflow_aborts_at_max_word() {
    let e = Expression::from_sources(
        assemble_expression("read-memory<constant 0> read-memory<constant 1> add<2>").unwrap(),
        vec![Word::MAX, word(1)],
    )
    .unwrap();
    assert_eq!(
        run(&e),
        Err(VmError::Arithmetic {
            op: "add",
            kind: ArithmeticKind::Overflow
        })
    );
}

#[test]
fn test_eval_saturating_ops_clamp() {
    let e = Expression::from_sources(
        assemble_expression(
            "read-memory<constant 1> read-memory<constant 2> saturating-sub<2> \
             read-memory<constant 0> read-memory<constant 2> saturating-add<2> \
             read-memory<constant 0> read-memory<constant 2> saturating-mul<2>",
        )
        .unwrap(),
        vec![Word::MAX, word(1), word(2)],
    )
    .unwrap();
    assert_eq!(run(&e), Ok(vec![word(0), Word::MAX, Word::MAX]));
}

#[test]
fn test_eval_logic_ops() {
    let e = expr(
        "read-memory<constant 0> read-memory<constant 1> read-memory<constant 2> eager-if \
         read-memory<constant 1> read-memory<constant 2> every<2> \
         read-memory<constant 0> read-memory<constant 2> any<2> \
         read-memory<constant 0> is-zero \
         read-memory<constant 1> read-memory<constant 1> equal-to",
        &[0, 5, 6],
    );
    assert_eq!(run(&e), Ok(words(&[6, 5, 6, 1, 1])));
}

#[test]
fn test_eval_ensure_consumes_inputs_or_aborts() {
    let ok = expr(
        "read-memory<constant 1> read-memory<constant 1> read-memory<constant 1> ensure<2>",
        &[0, 3],
    );
    assert_eq!(run(&ok), Ok(words(&[3])));

    let bad = expr(
        "read-memory<constant 1> read-memory<constant 0> read-memory<constant 1> ensure<3>",
        &[0, 3],
    );
    assert_eq!(
        run(&bad),
        Err(VmError::EnsureFailed {
            source_index: 0,
            position: 3,
            input: 1,
        })
    );
}

#[test]
fn test_eval_underflow_reports_window() {
    let e = expr("read-memory<constant 0> add<2>", &[1]);
    assert_eq!(
        run(&e),
        Err(VmError::StackUnderflow {
            source_index: 0,
            position: 1,
            needed: 2,
            available: 1,
        })
    );

    let e = expr("read-memory<constant 0> read-memory<stack 3>", &[1]);
    assert_eq!(
        run(&e),
        Err(VmError::StackUnderflow {
            source_index: 0,
            position: 1,
            needed: 4,
            available: 1,
        })
    );
}

#[test]
fn test_eval_failure_leaves_no_partial_result() {
    let e = expr(
        "read-memory<constant 0> read-memory<constant 0> add<2> read-memory<constant 0> sub<3>",
        &[4],
    );
    let mut vm = Vm::new();
    let mut ctx = VmContext::new();
    assert!(matches!(
        vm.eval(&e, 0, &mut ctx),
        Err(VmError::StackUnderflow { position: 4, .. })
    ));

    // the same vm carries nothing into the next evaluation
    let ok = expr("read-memory<constant 0>", &[4]);
    assert_eq!(vm.eval(&ok, 0, &mut ctx), Ok(words(&[4])));
}

#[test]
fn test_eval_with_seeds_entry_window() {
    let e = expr("read-memory<stack 0> read-memory<stack 1> add<2>", &[]);
    let mut vm = Vm::new();
    let mut ctx = VmContext::new();
    assert_eq!(vm.eval_with(&e, 0, &words(&[2, 3]), &mut ctx), Ok(words(&[2, 3, 5])));
}

#[test]
fn test_eval_unknown_entry_source() {
    let e = expr("read-memory<constant 0>", &[1]);
    assert_eq!(
        evaluate(&e, 1, &NullHost),
        Err(VmError::UnknownSource {
            index: 1,
            sources_len: 1
        })
    );
}

#[test]
fn test_eval_stack_is_bounded() {
    let text = vec!["read-memory<constant 0>"; MAX_STACK_SIZE + 1].join(" ");
    let e = expr(&text, &[1]);
    assert_eq!(
        run(&e),
        Err(VmError::StackOverflow {
            source_index: 0,
            position: MAX_STACK_SIZE,
            limit: MAX_STACK_SIZE,
        })
    );

    let seeded = vec![word(1); MAX_STACK_SIZE + 1];
    assert_eq!(
        Vm::new().eval_with(&e, 0, &seeded, &mut VmContext::new()),
        Err(VmError::StackOverflow {
            source_index: 0,
            position: 0,
            limit: MAX_STACK_SIZE,
        })
    );

    let text = vec!["read-memory<constant 0>"; MAX_STACK_SIZE].join(" ");
    assert_eq!(run(&expr(&text, &[1])).map(|s| s.len()), Ok(MAX_STACK_SIZE));
}

#[test]
fn test_eval_concurrent_evaluations_share_expression() {
    let e = expr(
        "read-memory<constant 0> loop-n<9 1 1 1>; read-memory<constant 1> add<2>",
        &[0, 3],
    );
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let e = e.clone();
            std::thread::spawn(move || run(&e))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(words(&[27])));
    }
}

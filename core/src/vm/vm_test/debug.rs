use super::*;
use crate::vm::{DebugSink, JsonLinesSink};

fn eval_recording(e: &Expression) -> (Result<Vec<Word>, VmError>, Vec<DebugRecord>) {
    let mut sink = RecordingSink::new();
    let result = {
        let mut ctx = VmContext::new().with_sink(&mut sink);
        Vm::new().eval(e, 0, &mut ctx)
    };
    (result, sink.records)
}

#[test]
fn test_debug_stack_emits_current_window() {
    let e = expr(
        "read-memory<constant 0> read-memory<constant 1> call<1 1 1> debug<stack>; \
         read-memory<constant 1> add<2> debug<stack>",
        &[10, 20],
    );
    let (result, records) = eval_recording(&e);
    assert_eq!(result, Ok(words(&[10, 40])));
    assert_eq!(
        records,
        vec![
            DebugRecord::Stack { stack: words(&[40]) },
            DebugRecord::Stack {
                stack: words(&[10, 40])
            },
        ]
    );
}

#[test]
fn test_debug_state_emits_source_constants_and_whole_stack() {
    let e = expr(
        "read-memory<constant 0> read-memory<constant 1> call<1 1 1>; \
         debug<state> read-memory<constant 1> add<2>",
        &[10, 20],
    );
    let (result, records) = eval_recording(&e);
    assert_eq!(result, Ok(words(&[10, 40])));
    assert_eq!(
        records,
        vec![DebugRecord::State {
            source_index: 1,
            constants: words(&[10, 20]),
            stack: words(&[10, 20]),
        }]
    );
}

#[test]
fn test_debug_does_not_change_outcome() {
    let plain = [
        "read-memory<constant 0> read-memory<constant 1> add<2> read-memory<constant 0> mul<2>",
        "read-memory<constant 0> loop-n<3 1 1 1>; read-memory<constant 1> add<2>",
        "read-memory<constant 0> read-memory<constant 1> sub<2>",
        "read-memory<constant 0> add<2>",
    ];
    for text in plain {
        let with_debug = text
            .split(';')
            .map(|src| format!("debug<state> {} debug<stack>", src.trim()))
            .collect::<Vec<_>>()
            .join("; ");
        let without = run(&expr(text, &[3, 5]));
        let (with, records) = eval_recording(&expr(&with_debug, &[3, 5]));
        match (&with, &without) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "{}", text),
            (Err(a), Err(b)) => assert_eq!(std::mem::discriminant(a), std::mem::discriminant(b), "{}", text),
            _ => panic!("debug changed the outcome of {}: {:?} vs {:?}", text, with, without),
        }
        assert!(!records.is_empty());
    }
}

struct FailingSink;

impl DebugSink for FailingSink {
    fn emit(&mut self, _record: DebugRecord) -> anyhow::Result<()> {
        anyhow::bail!("sink closed")
    }
}

#[test]
fn test_debug_sink_failures_are_swallowed() {
    let e = expr("read-memory<constant 0> debug<stack> debug<state>", &[1]);
    let mut sink = FailingSink;
    let mut ctx = VmContext::new().with_sink(&mut sink);
    assert_eq!(Vm::new().eval(&e, 0, &mut ctx), Ok(words(&[1])));
}

#[test]
fn test_debug_without_sink_still_evaluates() {
    let e = expr("read-memory<constant 0> debug<stack>", &[1]);
    assert_eq!(run(&e), Ok(words(&[1])));
}

#[test]
fn test_debug_records_stream_as_json_lines() {
    let e = expr("read-memory<constant 0> debug<stack>", &[7]);
    let mut sink = JsonLinesSink::new(Vec::new());
    {
        let mut ctx = VmContext::new().with_sink(&mut sink);
        Vm::new().eval(&e, 0, &mut ctx).unwrap();
    }
    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(text, "{\"kind\":\"stack\",\"stack\":[\"7\"]}\n");
}

#[test]
fn test_debug_mode_constructor() {
    let e = Expression::from_sources(vec![vec![Instruction::debug(DebugMode::State)].into()], vec![]).unwrap();
    let (result, records) = eval_recording(&e);
    assert_eq!(result, Ok(vec![]));
    assert_eq!(records.len(), 1);
}

//! Text form of sources.
//!
//! An instruction is `name` or `name<field field ...>`, separated by
//! whitespace. `#` starts a comment running to the end of the line unless it
//! is immediately followed by a digit, in which case `#N<operand>` spells a
//! raw opcode number. [`assemble_expression`] splits sources on `;`.

use anyhow::{Context, Result, anyhow, bail, ensure};

use super::bytecode::{
    CallOperand, ContextOperand, DebugMode, DoWhileOperand, Instruction, LoopNOperand, MemoryOperand, Source,
};
use super::opcode::{Opcode, OperandKind};

pub fn assemble_source(text: &str) -> Result<Source> {
    let mut code = Vec::new();
    for (position, token) in tokenize(text)?.into_iter().enumerate() {
        let ins = assemble_instruction(&token).with_context(|| format!("instruction {} ('{}')", position, token))?;
        code.push(ins);
    }
    Ok(Source::new(code))
}

pub fn assemble_expression(text: &str) -> Result<Vec<Source>> {
    split_sources(text)
        .into_iter()
        .enumerate()
        .map(|(idx, chunk)| assemble_source(&chunk).with_context(|| format!("source {}", idx)))
        .collect()
}

/// One instruction per line, in the syntax [`assemble_source`] reads back.
pub fn disassemble(source: &Source) -> String {
    source
        .code
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut chars = line.char_indices().peekable();
        let mut cut = line.len();
        while let Some((idx, c)) = chars.next() {
            if c == '#' && !chars.peek().is_some_and(|(_, next)| next.is_ascii_digit()) {
                cut = idx;
                break;
            }
        }
        out.push_str(&line[..cut]);
        out.push('\n');
    }
    out
}

fn split_sources(text: &str) -> Vec<String> {
    let cleaned = strip_comments(text);
    let mut chunks: Vec<String> = cleaned.split(';').map(str::to_string).collect();
    // A trailing separator does not open an empty source.
    if chunks.len() > 1 && chunks.last().is_some_and(|c| c.trim().is_empty()) {
        chunks.pop();
    }
    chunks
}

/// Whitespace separates instructions except inside `<...>`.
fn tokenize(text: &str) -> Result<Vec<String>> {
    let cleaned = strip_comments(text);
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_fields = false;
    for c in cleaned.chars() {
        match c {
            '<' => {
                ensure!(!in_fields, "nested '<' in '{}'", current);
                ensure!(!current.is_empty(), "operand fields without an opcode name");
                in_fields = true;
                current.push(c);
            }
            '>' => {
                ensure!(in_fields, "unexpected '>' after '{}'", current);
                in_fields = false;
                current.push(c);
                tokens.push(std::mem::take(&mut current));
            }
            c if c.is_whitespace() => {
                if in_fields {
                    current.push(' ');
                } else if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ';' => bail!("';' separates sources; use assemble_expression"),
            c => current.push(c),
        }
    }
    ensure!(!in_fields, "unterminated operand fields in '{}'", current);
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn assemble_instruction(token: &str) -> Result<Instruction> {
    let (name, fields) = match token.find('<') {
        Some(open) => {
            let inner = token[open + 1..]
                .strip_suffix('>')
                .ok_or_else(|| anyhow!("missing closing '>'"))?;
            (&token[..open], inner.split_whitespace().collect::<Vec<_>>())
        }
        None => (token, Vec::new()),
    };

    if let Some(raw) = name.strip_prefix('#') {
        let opcode: u16 = raw.parse().with_context(|| format!("invalid raw opcode '{}'", raw))?;
        let operand = match fields.as_slice() {
            [] => 0,
            [value] => parse_field(value, "operand")?,
            _ => bail!("raw opcode takes a single operand"),
        };
        return Ok(Instruction::raw(opcode, operand));
    }

    let op = Opcode::from_name(name).ok_or_else(|| anyhow!("unknown opcode '{}'", name))?;
    let arity = |expected: usize| -> Result<()> {
        ensure!(
            fields.len() == expected,
            "{} takes {} operand field(s), got {}",
            op,
            expected,
            fields.len()
        );
        Ok(())
    };

    let operand = match op.operand_kind() {
        OperandKind::None => {
            arity(0)?;
            0
        }
        OperandKind::Memory => {
            arity(2)?;
            let offset: u16 = parse_field(fields[1], "offset")?;
            ensure!(
                offset <= MemoryOperand::MAX_OFFSET,
                "offset {} exceeds {}",
                offset,
                MemoryOperand::MAX_OFFSET
            );
            let mem = match fields[0] {
                "stack" => MemoryOperand::stack(offset),
                "constant" => MemoryOperand::constant(offset),
                other => bail!("unknown memory region '{}' (expected stack or constant)", other),
            };
            mem.encode()
        }
        OperandKind::Call => {
            arity(3)?;
            let (inputs, outputs, source) = (
                parse_field(fields[0], "inputs")?,
                parse_field(fields[1], "outputs")?,
                parse_field(fields[2], "source")?,
            );
            CallOperand::new(inputs, outputs, source)
                .ok_or_else(|| anyhow!("call inputs and outputs must be at most 15"))?
                .encode()
        }
        OperandKind::LoopN => {
            arity(4)?;
            let (n, inputs, outputs, source) = (
                parse_field(fields[0], "n")?,
                parse_field(fields[1], "inputs")?,
                parse_field(fields[2], "outputs")?,
                parse_field(fields[3], "source")?,
            );
            LoopNOperand::new(n, inputs, outputs, source)
                .ok_or_else(|| anyhow!("loop-n fields must be at most 15"))?
                .encode()
        }
        OperandKind::DoWhile => {
            arity(2)?;
            DoWhileOperand::new(parse_field(fields[0], "inputs")?, parse_field(fields[1], "source")?).encode()
        }
        OperandKind::Context => {
            arity(2)?;
            ContextOperand::new(parse_field(fields[0], "column")?, parse_field(fields[1], "row")?).encode()
        }
        OperandKind::DebugMode => {
            arity(1)?;
            match fields[0] {
                "state" | "0" => DebugMode::State as u16,
                "stack" | "1" => DebugMode::Stack as u16,
                other => bail!("unknown debug mode '{}' (expected state or stack)", other),
            }
        }
        OperandKind::Inputs { min } => match fields.as_slice() {
            [] => min,
            [n] => {
                let n: u16 = parse_field(n, "inputs")?;
                ensure!(n >= min, "{} needs at least {} input(s)", op, min);
                n
            }
            _ => bail!("{} takes at most one operand field", op),
        },
    };
    Ok(Instruction::new(op, operand))
}

fn parse_field<T>(text: &str, what: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse::<T>()
        .with_context(|| format!("invalid {} field '{}'", what, text))
}

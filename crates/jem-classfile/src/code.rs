use crate::constant_pool::{ConstantPool, MemberRef};
use crate::error::{Error, Result};
use crate::reader::Reader;

/// Parsed `Code` attribute of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionHandler>,
}

/// One row of a `Code` attribute's exception table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u32,
    /// Exclusive.
    pub end_pc: u32,
    pub handler_pc: u32,
    /// Internal name of the caught type; `None` for catch-all (`finally`) entries.
    pub catch_type: Option<String>,
}

impl ExceptionHandler {
    pub fn covers(&self, pc: u32) -> bool {
        self.start_pc <= pc && pc < self.end_pc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

/// Decoded instruction, reduced to what exception extraction cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// `new` with the internal name of the instantiated class.
    New(String),
    Invoke { kind: InvokeKind, target: MemberRef },
    Athrow,
    Branch { targets: Vec<u32>, unconditional: bool },
    Return,
    Other(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub pc: u32,
    pub op: Op,
}

impl Code {
    pub(crate) fn parse(info: &[u8], cp: &ConstantPool) -> Result<Self> {
        let mut reader = Reader::new(info);
        let max_stack = reader.read_u2()?;
        let max_locals = reader.read_u2()?;
        let code_length = reader.read_u4()? as usize;
        let bytecode = reader.read_bytes(code_length)?;
        let instructions = decode(bytecode, cp)?;

        let table_len = reader.read_u2()? as usize;
        let mut exception_table = Vec::with_capacity(table_len);
        for _ in 0..table_len {
            let start_pc = reader.read_u2()? as u32;
            let end_pc = reader.read_u2()? as u32;
            let handler_pc = reader.read_u2()? as u32;
            let catch_index = reader.read_u2()?;
            let catch_type = if catch_index == 0 {
                None
            } else {
                Some(cp.get_class_name(catch_index)?)
            };
            exception_table.push(ExceptionHandler {
                start_pc,
                end_pc,
                handler_pc,
                catch_type,
            });
        }

        // Nested attributes (LineNumberTable, StackMapTable, ...) are not needed.
        let attributes_count = reader.read_u2()? as usize;
        for _ in 0..attributes_count {
            reader.read_u2()?;
            let len = reader.read_u4()? as usize;
            reader.read_bytes(len)?;
        }
        reader.ensure_empty()?;

        Ok(Self {
            max_stack,
            max_locals,
            instructions,
            exception_table,
        })
    }

    /// Program counters that start a basic block: branch targets and handlers.
    pub fn block_starts(&self) -> Vec<u32> {
        let mut out: Vec<u32> = self
            .instructions
            .iter()
            .flat_map(|insn| match &insn.op {
                Op::Branch { targets, .. } => targets.clone(),
                _ => Vec::new(),
            })
            .chain(self.exception_table.iter().map(|h| h.handler_pc))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

fn decode(code: &[u8], cp: &ConstantPool) -> Result<Vec<Instruction>> {
    let mut out = Vec::new();
    let mut pc = 0usize;
    while pc < code.len() {
        let opcode = code[pc];
        let u2 = |offset: usize| read_u2_at(code, pc + offset);
        let s2 = |offset: usize| -> Result<i64> { Ok(read_u2_at(code, pc + offset)? as i16 as i64) };
        let s4 = |offset: usize| -> Result<i64> { Ok(read_s4_at(code, pc + offset)? as i64) };
        let target = |delta: i64| branch_target(pc, delta);

        let (op, len) = match opcode {
            0x00..=0x0f | 0x1a..=0x35 | 0x3b..=0x83 | 0x85..=0x98 => (Op::Other(opcode), 1),
            0xbe | 0xc2 | 0xc3 | 0xca | 0xfe | 0xff => (Op::Other(opcode), 1),
            0x10 | 0x12 | 0x15..=0x19 | 0x36..=0x3a | 0xbc => (Op::Other(opcode), 2),
            0x11 | 0x13 | 0x14 | 0x84 | 0xb2..=0xb5 | 0xbd | 0xc0 | 0xc1 => {
                (Op::Other(opcode), 3)
            }
            0xc5 => (Op::Other(opcode), 4),
            0xba => (Op::Other(opcode), 5),
            0x99..=0xa6 | 0xc6 | 0xc7 => (
                Op::Branch {
                    targets: vec![target(s2(1)?)?],
                    unconditional: false,
                },
                3,
            ),
            0xa7 | 0xa8 => (
                Op::Branch {
                    targets: vec![target(s2(1)?)?],
                    unconditional: opcode == 0xa7,
                },
                3,
            ),
            0xc8 | 0xc9 => (
                Op::Branch {
                    targets: vec![target(s4(1)?)?],
                    unconditional: opcode == 0xc8,
                },
                5,
            ),
            0xa9 => (Op::Return, 2),
            0xac..=0xb1 => (Op::Return, 1),
            0xaa => {
                let base = 1 + (3 - pc % 4);
                let low = s4(base + 4)?;
                let high = s4(base + 8)?;
                if high < low {
                    return Err(Error::MalformedAttribute("Code"));
                }
                let count = (high - low + 1) as usize;
                let mut targets = vec![target(s4(base)?)?];
                for i in 0..count {
                    targets.push(target(s4(base + 12 + i * 4)?)?);
                }
                (
                    Op::Branch {
                        targets,
                        unconditional: true,
                    },
                    base + 12 + count * 4,
                )
            }
            0xab => {
                let base = 1 + (3 - pc % 4);
                let npairs = s4(base + 4)?;
                if npairs < 0 {
                    return Err(Error::MalformedAttribute("Code"));
                }
                let npairs = npairs as usize;
                let mut targets = vec![target(s4(base)?)?];
                for i in 0..npairs {
                    targets.push(target(s4(base + 8 + i * 8 + 4)?)?);
                }
                (
                    Op::Branch {
                        targets,
                        unconditional: true,
                    },
                    base + 8 + npairs * 8,
                )
            }
            0xb6..=0xb9 => {
                let kind = match opcode {
                    0xb6 => InvokeKind::Virtual,
                    0xb7 => InvokeKind::Special,
                    0xb8 => InvokeKind::Static,
                    _ => InvokeKind::Interface,
                };
                let target = cp.get_member_ref(u2(1)?)?;
                let len = if kind == InvokeKind::Interface { 5 } else { 3 };
                (Op::Invoke { kind, target }, len)
            }
            0xbb => (Op::New(cp.get_class_name(u2(1)?)?), 3),
            0xbf => (Op::Athrow, 1),
            0xc4 => {
                let widened = *code.get(pc + 1).ok_or(Error::MalformedAttribute("Code"))?;
                (Op::Other(opcode), if widened == 0x84 { 6 } else { 4 })
            }
            _ => return Err(Error::MalformedAttribute("Code")),
        };

        out.push(Instruction { pc: pc as u32, op });
        pc += len;
    }

    if pc != code.len() {
        return Err(Error::MalformedAttribute("Code"));
    }
    Ok(out)
}

fn read_u2_at(code: &[u8], at: usize) -> Result<u16> {
    match code.get(at..at + 2) {
        Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
        None => Err(Error::MalformedAttribute("Code")),
    }
}

fn read_s4_at(code: &[u8], at: usize) -> Result<i32> {
    match code.get(at..at + 4) {
        Some(b) => Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None => Err(Error::MalformedAttribute("Code")),
    }
}

fn branch_target(pc: usize, delta: i64) -> Result<u32> {
    u32::try_from(pc as i64 + delta).map_err(|_| Error::MalformedAttribute("Code"))
}

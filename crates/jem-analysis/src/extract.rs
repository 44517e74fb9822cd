//! Exception extraction from compiled classes.
//!
//! Per method this collects declared exceptions (`Exceptions` attribute),
//! exceptions raised by `athrow` on a freshly constructed (or returned)
//! object, and exceptions propagated from methods invoked inside the same
//! container. Thrown and propagated exceptions are dropped when an
//! exception-table entry covering the instruction catches them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use jem_classfile::{parse_method_descriptor, ClassFile, ExceptionHandler, MemberRef, Op};
use jem_core::names::internal_to_binary;
use jem_core::MethodInformation;

/// Superclass chains of core exception types that rarely live in the
/// analyzed container itself.
const CORE_EXCEPTION_SUPERS: &[(&str, &str)] = &[
    ("java/lang/Exception", "java/lang/Throwable"),
    ("java/lang/Error", "java/lang/Throwable"),
    ("java/lang/RuntimeException", "java/lang/Exception"),
    ("java/lang/IllegalArgumentException", "java/lang/RuntimeException"),
    ("java/lang/NumberFormatException", "java/lang/IllegalArgumentException"),
    ("java/lang/IllegalStateException", "java/lang/RuntimeException"),
    ("java/lang/IndexOutOfBoundsException", "java/lang/RuntimeException"),
    ("java/lang/ArrayIndexOutOfBoundsException", "java/lang/IndexOutOfBoundsException"),
    ("java/lang/StringIndexOutOfBoundsException", "java/lang/IndexOutOfBoundsException"),
    ("java/lang/NullPointerException", "java/lang/RuntimeException"),
    ("java/lang/ClassCastException", "java/lang/RuntimeException"),
    ("java/lang/ArithmeticException", "java/lang/RuntimeException"),
    ("java/lang/ArrayStoreException", "java/lang/RuntimeException"),
    ("java/lang/NegativeArraySizeException", "java/lang/RuntimeException"),
    ("java/lang/UnsupportedOperationException", "java/lang/RuntimeException"),
    ("java/lang/SecurityException", "java/lang/RuntimeException"),
    ("java/util/NoSuchElementException", "java/lang/RuntimeException"),
    ("java/util/ConcurrentModificationException", "java/lang/RuntimeException"),
    ("java/io/UncheckedIOException", "java/lang/RuntimeException"),
    ("java/lang/InterruptedException", "java/lang/Exception"),
    ("java/lang/CloneNotSupportedException", "java/lang/Exception"),
    ("java/lang/ReflectiveOperationException", "java/lang/Exception"),
    ("java/lang/ClassNotFoundException", "java/lang/ReflectiveOperationException"),
    ("java/lang/NoSuchMethodException", "java/lang/ReflectiveOperationException"),
    ("java/io/IOException", "java/lang/Exception"),
    ("java/io/FileNotFoundException", "java/io/IOException"),
    ("java/io/EOFException", "java/io/IOException"),
    ("java/io/UnsupportedEncodingException", "java/io/IOException"),
    ("java/lang/AssertionError", "java/lang/Error"),
    ("java/lang/LinkageError", "java/lang/Error"),
    ("java/lang/VirtualMachineError", "java/lang/Error"),
    ("java/lang/OutOfMemoryError", "java/lang/VirtualMachineError"),
    ("java/lang/StackOverflowError", "java/lang/VirtualMachineError"),
];

const MAX_SUPERCLASS_DEPTH: usize = 64;

/// Which sources of exceptions to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub declared: bool,
    pub thrown: bool,
    pub follow_invocations: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            declared: true,
            thrown: true,
            follow_invocations: true,
        }
    }
}

/// Exceptions per method, for every method of every class in `classes`.
///
/// Methods without any exception map to an empty set. Names are dotted
/// binary names.
pub fn extract_exceptions(
    classes: &[ClassFile],
    options: &ExtractOptions,
) -> BTreeMap<MethodInformation, BTreeSet<String>> {
    let container = Container::new(classes);

    let mut nodes = Vec::new();
    let mut slots: HashMap<(&str, &str, &str), usize> = HashMap::new();
    for cf in classes {
        for method in &cf.methods {
            let key = (
                cf.this_class.as_str(),
                method.name.as_str(),
                method.descriptor.as_str(),
            );
            if slots.contains_key(&key) {
                continue;
            }
            let mut node = MethodNode {
                owner: &cf.this_class,
                name: &method.name,
                descriptor: &method.descriptor,
                handlers: method
                    .code
                    .as_ref()
                    .map(|code| code.exception_table.as_slice())
                    .unwrap_or(&[]),
                local: BTreeSet::new(),
                calls: Vec::new(),
            };

            if options.declared {
                node.local.extend(method.exceptions.iter().cloned());
            }
            if let Some(code) = &method.code {
                let scan = scan_code(code);
                if options.thrown {
                    for (pc, thrown) in scan.throws {
                        if !container.is_caught(node.handlers, pc, &thrown) {
                            node.local.insert(thrown);
                        }
                    }
                }
                if options.follow_invocations {
                    node.calls = scan.invokes;
                }
            }

            slots.insert(key, nodes.len());
            nodes.push(node);
        }
    }

    // Resolve call targets now that every method has a slot.
    let mut calls = Vec::with_capacity(nodes.len());
    for node in &mut nodes {
        let resolved: Vec<(u32, usize)> = std::mem::take(&mut node.calls)
            .into_iter()
            .filter_map(|(pc, target)| {
                let (owner, name, descriptor) = container.resolve_method(target)?;
                slots
                    .get(&(owner, name, descriptor))
                    .map(|&slot| (pc, slot))
            })
            .collect();
        calls.push(resolved);
    }

    let mut results: Vec<BTreeSet<String>> = nodes.iter().map(|n| n.local.clone()).collect();
    let mut changed = true;
    while changed {
        changed = false;
        for (caller, edges) in calls.iter().enumerate() {
            for &(pc, callee) in edges {
                if callee == caller {
                    continue;
                }
                let incoming: Vec<String> = results[callee]
                    .iter()
                    .filter(|exception| !results[caller].contains(*exception))
                    .filter(|exception| !container.is_caught(nodes[caller].handlers, pc, exception))
                    .cloned()
                    .collect();
                if !incoming.is_empty() {
                    results[caller].extend(incoming);
                    changed = true;
                }
            }
        }
    }

    nodes
        .iter()
        .zip(results)
        .map(|(node, exceptions)| {
            (
                MethodInformation::new(
                    internal_to_binary(node.owner),
                    node.name,
                    node.descriptor,
                ),
                exceptions.iter().map(|e| internal_to_binary(e)).collect(),
            )
        })
        .collect()
}

struct MethodNode<'a> {
    owner: &'a str,
    name: &'a str,
    descriptor: &'a str,
    handlers: &'a [ExceptionHandler],
    /// Internal names of declared and directly thrown exceptions.
    local: BTreeSet<String>,
    calls: Vec<(u32, &'a MemberRef)>,
}

struct CodeScan<'a> {
    /// `(pc, internal name)` of each `athrow` with a known operand type.
    throws: Vec<(u32, String)>,
    invokes: Vec<(u32, &'a MemberRef)>,
}

/// Straight-line operand tracking: inside a basic block, `athrow` throws the
/// object most recently constructed by `new`/`<init>`, or returned by a call
/// made outside of constructor arguments.
fn scan_code(code: &jem_classfile::Code) -> CodeScan<'_> {
    let block_starts = code.block_starts();
    let mut throws = Vec::new();
    let mut invokes = Vec::new();

    let mut allocating: Vec<&str> = Vec::new();
    let mut operand: Option<String> = None;

    for insn in &code.instructions {
        if block_starts.binary_search(&insn.pc).is_ok() {
            allocating.clear();
            operand = None;
        }

        match &insn.op {
            Op::New(class) => allocating.push(class),
            Op::Invoke { target, .. } => {
                invokes.push((insn.pc, target));
                if target.name == "<init>" {
                    if allocating.last() == Some(&target.owner.as_str()) {
                        allocating.pop();
                        operand = Some(target.owner.clone());
                    }
                } else if allocating.is_empty() {
                    operand = parse_method_descriptor(&target.descriptor)
                        .ok()
                        .and_then(|desc| desc.returned_class().map(str::to_string));
                }
            }
            Op::Athrow => {
                if let Some(thrown) = operand.take() {
                    throws.push((insn.pc, thrown));
                }
                allocating.clear();
            }
            Op::Branch {
                unconditional: true,
                ..
            }
            | Op::Return => {
                allocating.clear();
                operand = None;
            }
            Op::Other(opcode) if pushes_unknown_reference(*opcode) && allocating.is_empty() => {
                operand = None;
            }
            Op::Branch { .. } | Op::Other(_) => {}
        }
    }

    CodeScan { throws, invokes }
}

/// `aconst_null`, `aload*`, `aaload`, `getstatic`, `getfield`, `checkcast`.
fn pushes_unknown_reference(opcode: u8) -> bool {
    matches!(opcode, 0x01 | 0x19 | 0x2a..=0x2d | 0x32 | 0xb2 | 0xb4 | 0xc0)
}

/// Class lookups within one container.
struct Container<'a> {
    classes: HashMap<&'a str, &'a ClassFile>,
    core_supers: HashMap<&'static str, &'static str>,
}

impl<'a> Container<'a> {
    fn new(classes: &'a [ClassFile]) -> Self {
        Self {
            classes: classes.iter().map(|cf| (cf.this_class.as_str(), cf)).collect(),
            core_supers: CORE_EXCEPTION_SUPERS.iter().copied().collect(),
        }
    }

    fn superclass(&self, class: &str) -> Option<&str> {
        match self.classes.get(class) {
            Some(cf) => cf.super_class.as_deref(),
            None => self.core_supers.get(class).copied(),
        }
    }

    fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        let mut current = Some(class);
        for _ in 0..MAX_SUPERCLASS_DEPTH {
            match current {
                Some(c) if c == ancestor => return true,
                Some(c) => current = self.superclass(c),
                None => return false,
            }
        }
        false
    }

    /// Whether a typed handler covering `pc` catches `exception`.
    fn is_caught(&self, handlers: &[ExceptionHandler], pc: u32, exception: &str) -> bool {
        handlers.iter().any(|handler| {
            handler.covers(pc)
                && handler
                    .catch_type
                    .as_deref()
                    .is_some_and(|caught| self.is_subclass(exception, caught))
        })
    }

    /// The in-container declaration an invocation dispatches to statically:
    /// the referenced class, its superclasses, then its interfaces.
    fn resolve_method(&self, target: &MemberRef) -> Option<(&'a str, &'a str, &'a str)> {
        let mut pending = vec![target.owner.as_str()];
        let mut visited = Vec::new();
        while let Some(class) = pending.first().copied() {
            pending.remove(0);
            if visited.contains(&class) {
                continue;
            }
            visited.push(class);
            let Some(cf) = self.classes.get(class).copied() else {
                continue;
            };
            if let Some(method) = cf.method(&target.name, &target.descriptor) {
                return Some((
                    cf.this_class.as_str(),
                    method.name.as_str(),
                    method.descriptor.as_str(),
                ));
            }
            if let Some(sup) = cf.super_class.as_deref() {
                pending.insert(0, sup);
            }
            pending.extend(cf.interfaces.iter().map(String::as_str));
        }
        None
    }
}

use std::collections::HashMap;

const ACC_PUBLIC: u16 = 0x0001;
const ACC_SUPER: u16 = 0x0020;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;

const MAJOR_JAVA_8: u16 = 52;

#[derive(Default)]
struct ConstantPoolBuilder {
    bytes: Vec<u8>,
    count: u16,
    index: HashMap<Vec<u8>, u16>,
}

impl ConstantPoolBuilder {
    fn intern(&mut self, entry: Vec<u8>) -> u16 {
        if let Some(idx) = self.index.get(&entry) {
            return *idx;
        }
        self.count += 1;
        let idx = self.count;
        self.bytes.extend_from_slice(&entry);
        self.index.insert(entry, idx);
        idx
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut entry = vec![1];
        entry.extend_from_slice(&(value.len() as u16).to_be_bytes());
        entry.extend_from_slice(value.as_bytes());
        self.intern(entry)
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        let mut entry = vec![7];
        entry.extend_from_slice(&name.to_be_bytes());
        self.intern(entry)
    }

    fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str, interface: bool) -> u16 {
        let class = self.class(owner);
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);

        let mut nat = vec![12];
        nat.extend_from_slice(&name.to_be_bytes());
        nat.extend_from_slice(&descriptor.to_be_bytes());
        let nat = self.intern(nat);

        let mut entry = vec![if interface { 11 } else { 10 }];
        entry.extend_from_slice(&class.to_be_bytes());
        entry.extend_from_slice(&nat.to_be_bytes());
        self.intern(entry)
    }
}

/// Builds a class file in memory.
#[derive(Clone, Debug)]
pub struct ClassBuilder {
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    access_flags: u16,
    methods: Vec<MethodBuilder>,
}

impl ClassBuilder {
    /// A public class extending `java/lang/Object`.
    pub fn class(internal_name: &str) -> Self {
        Self {
            name: internal_name.to_string(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            access_flags: ACC_PUBLIC | ACC_SUPER,
            methods: Vec::new(),
        }
    }

    pub fn interface(internal_name: &str) -> Self {
        Self {
            access_flags: ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT,
            ..Self::class(internal_name)
        }
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Replaces the class access flags.
    pub fn access(mut self, flags: u16) -> Self {
        self.access_flags = flags;
        self
    }

    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    pub fn internal_name(&self) -> &str {
        &self.name
    }

    pub fn build(&self) -> Vec<u8> {
        let mut cp = ConstantPoolBuilder::default();
        let this_class = cp.class(&self.name);
        let super_class = self.super_name.as_deref().map(|s| cp.class(s)).unwrap_or(0);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| cp.class(i)).collect();
        let methods: Vec<Vec<u8>> = self.methods.iter().map(|m| m.encode(&mut cp)).collect();

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        push_u16(&mut out, 0);
        push_u16(&mut out, MAJOR_JAVA_8);
        push_u16(&mut out, cp.count + 1);
        out.extend_from_slice(&cp.bytes);
        push_u16(&mut out, self.access_flags);
        push_u16(&mut out, this_class);
        push_u16(&mut out, super_class);
        push_u16(&mut out, interfaces.len() as u16);
        for idx in interfaces {
            push_u16(&mut out, idx);
        }
        // fields
        push_u16(&mut out, 0);
        push_u16(&mut out, methods.len() as u16);
        for method in methods {
            out.extend_from_slice(&method);
        }
        // class attributes
        push_u16(&mut out, 0);
        out
    }
}

#[derive(Clone, Debug)]
pub struct MethodBuilder {
    name: String,
    descriptor: String,
    access_flags: u16,
    throws: Vec<String>,
    code: Option<CodeBuilder>,
}

impl MethodBuilder {
    /// A public concrete method whose body is a bare `return`.
    pub fn new(name: &str, descriptor: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access_flags: ACC_PUBLIC,
            throws: Vec::new(),
            code: Some(CodeBuilder::returning(descriptor)),
        }
    }

    /// A public abstract method without a `Code` attribute.
    pub fn abstract_method(name: &str, descriptor: &str) -> Self {
        Self {
            access_flags: ACC_PUBLIC | ACC_ABSTRACT,
            code: None,
            ..Self::new(name, descriptor)
        }
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.access_flags = flags;
        self
    }

    /// Adds an entry to the `Exceptions` attribute.
    pub fn throws(mut self, internal_name: &str) -> Self {
        self.throws.push(internal_name.to_string());
        self
    }

    pub fn code(mut self, code: CodeBuilder) -> Self {
        self.code = Some(code);
        self
    }

    fn encode(&self, cp: &mut ConstantPoolBuilder) -> Vec<u8> {
        let name = cp.utf8(&self.name);
        let descriptor = cp.utf8(&self.descriptor);

        let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
        if let Some(code) = &self.code {
            let attr_name = cp.utf8("Code");
            attributes.push((attr_name, code.encode(cp)));
        }
        if !self.throws.is_empty() {
            let attr_name = cp.utf8("Exceptions");
            let mut info = Vec::new();
            push_u16(&mut info, self.throws.len() as u16);
            for ex in &self.throws {
                let idx = cp.class(ex);
                push_u16(&mut info, idx);
            }
            attributes.push((attr_name, info));
        }

        let mut out = Vec::new();
        push_u16(&mut out, self.access_flags);
        push_u16(&mut out, name);
        push_u16(&mut out, descriptor);
        push_u16(&mut out, attributes.len() as u16);
        for (attr_name, info) in attributes {
            push_u16(&mut out, attr_name);
            out.extend_from_slice(&(info.len() as u32).to_be_bytes());
            out.extend_from_slice(&info);
        }
        out
    }
}

#[derive(Clone, Debug)]
enum CodeOp {
    Raw(Vec<u8>),
    Class { opcode: u8, class: String },
    Invoke {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
}

#[derive(Clone, Debug)]
struct Handler {
    start: u16,
    end: u16,
    handler: u16,
    catch_type: Option<String>,
}

/// Straight-line bytecode assembler. Every op has a fixed size, so
/// [`CodeBuilder::pc`] can be used to place exception-table ranges.
#[derive(Clone, Debug, Default)]
pub struct CodeBuilder {
    ops: Vec<CodeOp>,
    len: u16,
    handlers: Vec<Handler>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A body that returns a default value matching `descriptor`'s return type.
    pub fn returning(descriptor: &str) -> Self {
        let ret = descriptor.rsplit(')').next().unwrap_or("V");
        let code = Self::new();
        match ret.chars().next() {
            Some('V') | None => code.return_(),
            Some('L') | Some('[') => code.aconst_null().areturn(),
            Some('J') => code.raw(&[0x09, 0xad]),
            Some('F') => code.raw(&[0x0b, 0xae]),
            Some('D') => code.raw(&[0x0e, 0xaf]),
            Some(_) => code.iconst_0().ireturn(),
        }
    }

    pub fn pc(&self) -> u16 {
        self.len
    }

    fn push(mut self, op: CodeOp, size: u16) -> Self {
        self.ops.push(op);
        self.len += size;
        self
    }

    pub fn raw(self, bytes: &[u8]) -> Self {
        let size = bytes.len() as u16;
        self.push(CodeOp::Raw(bytes.to_vec()), size)
    }

    pub fn new_(self, class: &str) -> Self {
        self.push(
            CodeOp::Class {
                opcode: 0xbb,
                class: class.to_string(),
            },
            3,
        )
    }

    pub fn dup(self) -> Self {
        self.raw(&[0x59])
    }

    pub fn pop(self) -> Self {
        self.raw(&[0x57])
    }

    pub fn aconst_null(self) -> Self {
        self.raw(&[0x01])
    }

    pub fn iconst_0(self) -> Self {
        self.raw(&[0x03])
    }

    pub fn aload(self, slot: u8) -> Self {
        match slot {
            0..=3 => self.raw(&[0x2a + slot]),
            _ => self.raw(&[0x19, slot]),
        }
    }

    pub fn astore(self, slot: u8) -> Self {
        match slot {
            0..=3 => self.raw(&[0x4b + slot]),
            _ => self.raw(&[0x3a, slot]),
        }
    }

    pub fn athrow(self) -> Self {
        self.raw(&[0xbf])
    }

    pub fn return_(self) -> Self {
        self.raw(&[0xb1])
    }

    pub fn areturn(self) -> Self {
        self.raw(&[0xb0])
    }

    pub fn ireturn(self) -> Self {
        self.raw(&[0xac])
    }

    fn invoke(self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> Self {
        let size = if opcode == 0xb9 { 5 } else { 3 };
        self.push(
            CodeOp::Invoke {
                opcode,
                owner: owner.to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            },
            size,
        )
    }

    pub fn invokevirtual(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.invoke(0xb6, owner, name, descriptor)
    }

    pub fn invokespecial(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.invoke(0xb7, owner, name, descriptor)
    }

    pub fn invokestatic(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.invoke(0xb8, owner, name, descriptor)
    }

    pub fn invokeinterface(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.invoke(0xb9, owner, name, descriptor)
    }

    /// `throw new <class>()`.
    pub fn throw_new(self, class: &str) -> Self {
        self.new_(class)
            .dup()
            .invokespecial(class, "<init>", "()V")
            .athrow()
    }

    /// Adds an exception-table entry. `catch_type` of `None` is a catch-all.
    pub fn handler(mut self, start: u16, end: u16, handler: u16, catch_type: Option<&str>) -> Self {
        self.handlers.push(Handler {
            start,
            end,
            handler,
            catch_type: catch_type.map(str::to_string),
        });
        self
    }

    fn encode(&self, cp: &mut ConstantPoolBuilder) -> Vec<u8> {
        let mut code = Vec::with_capacity(self.len as usize);
        for op in &self.ops {
            match op {
                CodeOp::Raw(bytes) => code.extend_from_slice(bytes),
                CodeOp::Class { opcode, class } => {
                    code.push(*opcode);
                    push_u16(&mut code, cp.class(class));
                }
                CodeOp::Invoke {
                    opcode,
                    owner,
                    name,
                    descriptor,
                } => {
                    let interface = *opcode == 0xb9;
                    code.push(*opcode);
                    push_u16(&mut code, cp.method_ref(owner, name, descriptor, interface));
                    if interface {
                        code.push(argument_slots(descriptor) + 1);
                        code.push(0);
                    }
                }
            }
        }

        let mut out = Vec::new();
        push_u16(&mut out, 8); // max_stack
        push_u16(&mut out, 8); // max_locals
        out.extend_from_slice(&(code.len() as u32).to_be_bytes());
        out.extend_from_slice(&code);
        push_u16(&mut out, self.handlers.len() as u16);
        for h in &self.handlers {
            push_u16(&mut out, h.start);
            push_u16(&mut out, h.end);
            push_u16(&mut out, h.handler);
            let catch = h.catch_type.as_deref().map(|c| cp.class(c)).unwrap_or(0);
            push_u16(&mut out, catch);
        }
        // nested attributes
        push_u16(&mut out, 0);
        out
    }
}

fn argument_slots(descriptor: &str) -> u8 {
    let params = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split(')').next())
        .unwrap_or("");
    let mut slots = 0u8;
    let mut chars = params.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            'J' | 'D' => slots += 2,
            'L' => {
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                }
                slots += 1;
            }
            '[' => {
                while chars.peek() == Some(&'[') {
                    chars.next();
                }
                if chars.next() == Some('L') {
                    for c in chars.by_ref() {
                        if c == ';' {
                            break;
                        }
                    }
                }
                slots += 1;
            }
            _ => slots += 1,
        }
    }
    slots
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

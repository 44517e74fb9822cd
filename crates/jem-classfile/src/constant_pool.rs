use crate::error::{Error, Result};
use crate::reader::Reader;

const CONSTANT_UTF8: u8 = 1;
const CONSTANT_INTEGER: u8 = 3;
const CONSTANT_FLOAT: u8 = 4;
const CONSTANT_LONG: u8 = 5;
const CONSTANT_DOUBLE: u8 = 6;
const CONSTANT_CLASS: u8 = 7;
const CONSTANT_STRING: u8 = 8;
const CONSTANT_FIELDREF: u8 = 9;
const CONSTANT_METHODREF: u8 = 10;
const CONSTANT_INTERFACE_METHODREF: u8 = 11;
const CONSTANT_NAME_AND_TYPE: u8 = 12;
const CONSTANT_METHOD_HANDLE: u8 = 15;
const CONSTANT_METHOD_TYPE: u8 = 16;
const CONSTANT_DYNAMIC: u8 = 17;
const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
const CONSTANT_MODULE: u8 = 19;
const CONSTANT_PACKAGE: u8 = 20;

#[derive(Debug, Clone)]
enum Entry {
    /// Index 0 and the second slot of `Long`/`Double` constants.
    Unusable,
    Utf8(String),
    Class { name_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MemberRef {
        tag: u8,
        class_index: u16,
        name_and_type_index: u16,
    },
    /// Constants we never dereference (numbers, strings, handles, ...).
    Other(u8),
}

/// A symbolic reference to a field or method (`CONSTANT_*ref`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    /// Internal name of the referenced owner, e.g. `java/util/List`.
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_interface: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ConstantPool {
    entries: Vec<Entry>,
}

impl ConstantPool {
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count.max(1));
        entries.push(Entry::Unusable);

        while entries.len() < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                CONSTANT_UTF8 => {
                    let len = reader.read_u2()? as usize;
                    Entry::Utf8(decode_modified_utf8(reader.read_bytes(len)?)?)
                }
                CONSTANT_INTEGER | CONSTANT_FLOAT => {
                    reader.read_u4()?;
                    Entry::Other(tag)
                }
                CONSTANT_LONG | CONSTANT_DOUBLE => {
                    reader.read_u4()?;
                    reader.read_u4()?;
                    entries.push(Entry::Other(tag));
                    Entry::Unusable
                }
                CONSTANT_CLASS => Entry::Class {
                    name_index: reader.read_u2()?,
                },
                CONSTANT_STRING | CONSTANT_METHOD_TYPE | CONSTANT_MODULE | CONSTANT_PACKAGE => {
                    reader.read_u2()?;
                    Entry::Other(tag)
                }
                CONSTANT_FIELDREF | CONSTANT_METHODREF | CONSTANT_INTERFACE_METHODREF => {
                    Entry::MemberRef {
                        tag,
                        class_index: reader.read_u2()?,
                        name_and_type_index: reader.read_u2()?,
                    }
                }
                CONSTANT_NAME_AND_TYPE => Entry::NameAndType {
                    name_index: reader.read_u2()?,
                    descriptor_index: reader.read_u2()?,
                },
                CONSTANT_METHOD_HANDLE => {
                    reader.read_u1()?;
                    reader.read_u2()?;
                    Entry::Other(tag)
                }
                CONSTANT_DYNAMIC | CONSTANT_INVOKE_DYNAMIC => {
                    reader.read_u2()?;
                    reader.read_u2()?;
                    Entry::Other(tag)
                }
                other => return Err(Error::InvalidConstantPoolTag(other)),
            };
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    fn entry(&self, index: u16) -> Result<&Entry> {
        match self.entries.get(index as usize) {
            Some(Entry::Unusable) | None => Err(Error::InvalidConstantPoolIndex(index)),
            Some(entry) => Ok(entry),
        }
    }

    pub(crate) fn get_utf8(&self, index: u16) -> Result<&str> {
        match self.entry(index)? {
            Entry::Utf8(value) => Ok(value),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    pub(crate) fn get_class_name(&self, index: u16) -> Result<String> {
        match self.entry(index)? {
            Entry::Class { name_index } => Ok(self.get_utf8(*name_index)?.to_string()),
            other => Err(mismatch(index, "Class", other)),
        }
    }

    pub(crate) fn get_member_ref(&self, index: u16) -> Result<MemberRef> {
        let (tag, class_index, name_and_type_index) = match self.entry(index)? {
            Entry::MemberRef {
                tag,
                class_index,
                name_and_type_index,
            } => (*tag, *class_index, *name_and_type_index),
            other => return Err(mismatch(index, "Methodref", other)),
        };
        let (name_index, descriptor_index) = match self.entry(name_and_type_index)? {
            Entry::NameAndType {
                name_index,
                descriptor_index,
            } => (*name_index, *descriptor_index),
            other => return Err(mismatch(name_and_type_index, "NameAndType", other)),
        };

        Ok(MemberRef {
            owner: self.get_class_name(class_index)?,
            name: self.get_utf8(name_index)?.to_string(),
            descriptor: self.get_utf8(descriptor_index)?.to_string(),
            is_interface: tag == CONSTANT_INTERFACE_METHODREF,
        })
    }
}

fn mismatch(index: u16, expected: &'static str, found: &Entry) -> Error {
    let found = match found {
        Entry::Unusable => "unusable",
        Entry::Utf8(_) => "Utf8",
        Entry::Class { .. } => "Class",
        Entry::NameAndType { .. } => "NameAndType",
        Entry::MemberRef { tag, .. } => match *tag {
            CONSTANT_FIELDREF => "Fieldref",
            CONSTANT_METHODREF => "Methodref",
            _ => "InterfaceMethodref",
        },
        Entry::Other(tag) => match *tag {
            CONSTANT_INTEGER => "Integer",
            CONSTANT_FLOAT => "Float",
            CONSTANT_LONG => "Long",
            CONSTANT_DOUBLE => "Double",
            CONSTANT_STRING => "String",
            CONSTANT_METHOD_HANDLE => "MethodHandle",
            CONSTANT_METHOD_TYPE => "MethodType",
            CONSTANT_DYNAMIC => "Dynamic",
            CONSTANT_INVOKE_DYNAMIC => "InvokeDynamic",
            CONSTANT_MODULE => "Module",
            _ => "Package",
        },
    };
    Error::ConstantPoolTypeMismatch {
        index,
        expected,
        found,
    }
}

/// Decodes the JVM's "modified UTF-8" (`\0` as two bytes, supplementary
/// characters as surrogate pairs).
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        if !s.contains('\0') {
            return Ok(s.to_string());
        }
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0x80 == 0 {
            if b0 == 0 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push(b0 as u16);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = *bytes.get(i + 1).ok_or(Error::InvalidModifiedUtf8)?;
            if b1 & 0xC0 != 0x80 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push((((b0 & 0x1F) as u16) << 6) | (b1 & 0x3F) as u16);
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = *bytes.get(i + 1).ok_or(Error::InvalidModifiedUtf8)?;
            let b2 = *bytes.get(i + 2).ok_or(Error::InvalidModifiedUtf8)?;
            if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push(
                (((b0 & 0x0F) as u16) << 12) | (((b1 & 0x3F) as u16) << 6) | (b2 & 0x3F) as u16,
            );
            i += 3;
        } else {
            return Err(Error::InvalidModifiedUtf8);
        }
    }

    String::from_utf16(&units).map_err(|_| Error::InvalidModifiedUtf8)
}

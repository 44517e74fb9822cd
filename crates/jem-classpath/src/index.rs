use std::collections::HashMap;

use jem_classfile::{access, ClassFile};
use serde::{Deserialize, Serialize};

use crate::container::read_classes;
use crate::hierarchy::InheritanceIndex;
use crate::{internal_name_to_binary, ClasspathEntry, ClasspathError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStub {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
}

impl MethodStub {
    pub fn is_static(&self) -> bool {
        self.access_flags & access::ACC_STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.access_flags & access::ACC_PRIVATE != 0
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & access::ACC_FINAL != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & access::ACC_ABSTRACT != 0
    }

    pub fn is_initializer(&self) -> bool {
        self.name == "<init>" || self.name == "<clinit>"
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStub {
    pub binary_name: String,
    pub internal_name: String,
    pub access_flags: u16,
    pub super_binary_name: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodStub>,
}

impl ClassStub {
    pub fn is_interface(&self) -> bool {
        self.access_flags & access::ACC_INTERFACE != 0
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & access::ACC_FINAL != 0
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodStub> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }
}

impl From<&ClassFile> for ClassStub {
    fn from(cf: &ClassFile) -> Self {
        ClassStub {
            binary_name: internal_name_to_binary(&cf.this_class),
            internal_name: cf.this_class.clone(),
            access_flags: cf.access_flags,
            super_binary_name: cf.super_class.as_deref().map(internal_name_to_binary),
            interfaces: cf
                .interfaces
                .iter()
                .map(|i| internal_name_to_binary(i))
                .collect(),
            methods: cf
                .methods
                .iter()
                .map(|m| MethodStub {
                    name: m.name.clone(),
                    descriptor: m.descriptor.clone(),
                    access_flags: m.access_flags,
                })
                .collect(),
        }
    }
}

/// Every class visible on a classpath, the container it comes from and the
/// inheritance graph between them.
///
/// When several entries define the same class, the earliest entry wins, as
/// it would for a JVM class loader.
#[derive(Clone, Debug, Default)]
pub struct ClasspathIndex {
    entries: Vec<ClasspathEntry>,
    stubs_by_binary: HashMap<String, ClassStub>,
    container_of: HashMap<String, usize>,
    hierarchy: InheritanceIndex,
    unavailable: Vec<ClasspathEntry>,
}

impl ClasspathIndex {
    /// Indexes every readable entry. Missing or unreadable entries are logged
    /// and skipped; see [`ClasspathIndex::unavailable`].
    pub fn build(entries: &[ClasspathEntry]) -> Self {
        let mut index = Self::default();
        for entry in entries {
            match load_entry(entry) {
                Ok((normalized, classes)) => {
                    tracing::debug!(
                        target: "jem.classpath",
                        entry = %normalized.path().display(),
                        classes = classes.len(),
                        "indexed classpath entry"
                    );
                    index.add_container(normalized, &classes);
                }
                Err(err) => {
                    tracing::warn!(
                        target: "jem.classpath",
                        entry = %entry.path().display(),
                        error = %err,
                        "skipping unreadable classpath entry"
                    );
                    index.unavailable.push(entry.clone());
                }
            }
        }
        index.rebuild_hierarchy();
        index
    }

    /// Entries skipped by [`ClasspathIndex::build`], in classpath order.
    pub fn unavailable(&self) -> &[ClasspathEntry] {
        &self.unavailable
    }

    fn add_container(&mut self, entry: ClasspathEntry, classes: &[ClassFile]) {
        let slot = self.entries.len();
        self.entries.push(entry);
        for cf in classes {
            let stub = ClassStub::from(cf);
            if self.stubs_by_binary.contains_key(&stub.binary_name) {
                continue;
            }
            self.container_of.insert(stub.binary_name.clone(), slot);
            self.stubs_by_binary.insert(stub.binary_name.clone(), stub);
        }
    }

    fn rebuild_hierarchy(&mut self) {
        let mut edges = Vec::new();
        for stub in self.stubs_by_binary.values() {
            for sup in stub.super_binary_name.iter().chain(stub.interfaces.iter()) {
                edges.push((stub.binary_name.clone(), sup.clone()));
            }
        }
        self.hierarchy = InheritanceIndex::default();
        self.hierarchy.extend(edges);
    }

    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.stubs_by_binary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs_by_binary.is_empty()
    }

    pub fn lookup_binary(&self, binary_name: &str) -> Option<&ClassStub> {
        self.stubs_by_binary.get(binary_name)
    }

    /// The (normalized) entry the winning definition of `binary_name` came from.
    pub fn container_of(&self, binary_name: &str) -> Option<&ClasspathEntry> {
        let slot = *self.container_of.get(binary_name)?;
        self.entries.get(slot)
    }

    /// Sorted binary names of the classes whose winning definition comes from `entry`.
    pub fn classes_in(&self, entry: &ClasspathEntry) -> Vec<String> {
        let Some(slot) = self.entries.iter().position(|e| e == entry) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .container_of
            .iter()
            .filter(|(_, s)| **s == slot)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn hierarchy(&self) -> &InheritanceIndex {
        &self.hierarchy
    }

    /// Sorted binary names of all indexed classes.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stubs_by_binary.keys().cloned().collect();
        names.sort();
        names
    }
}

fn load_entry(
    entry: &ClasspathEntry,
) -> Result<(ClasspathEntry, Vec<ClassFile>), ClasspathError> {
    let entry = entry.normalize()?;
    let classes = read_classes(&entry)?;
    Ok((entry, classes))
}

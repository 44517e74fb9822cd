use std::collections::{BTreeMap, BTreeSet, VecDeque};

use jem_classfile::ClassFile;

use crate::internal_name_to_binary;

/// Direct and transitive subtype/supertype relations between classes,
/// keyed by binary name. Covers both `extends` and `implements` edges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InheritanceIndex {
    pub subtypes: BTreeMap<String, Vec<String>>,
    pub supertypes: BTreeMap<String, Vec<String>>,
}

impl InheritanceIndex {
    /// Builds the graph of `classes`; supertypes outside the set still appear
    /// as edge endpoints.
    pub fn from_classes<'a>(classes: impl IntoIterator<Item = &'a ClassFile>) -> Self {
        let mut index = Self::default();
        index.extend(classes.into_iter().flat_map(class_edges));
        index
    }

    /// Adds `(subtype, supertype)` edges; only the touched lists are re-sorted.
    pub fn extend(&mut self, edges: impl IntoIterator<Item = (String, String)>) {
        let mut touched = BTreeSet::new();
        for (subtype, supertype) in edges {
            self.subtypes
                .entry(supertype.clone())
                .or_default()
                .push(subtype.clone());
            self.supertypes
                .entry(subtype.clone())
                .or_default()
                .push(supertype.clone());
            touched.insert(subtype);
            touched.insert(supertype);
        }

        // Keep results stable for deterministic tests.
        for name in &touched {
            let lists = [self.subtypes.get_mut(name), self.supertypes.get_mut(name)];
            for list in lists.into_iter().flatten() {
                list.sort();
                list.dedup();
            }
        }
    }

    pub fn direct_subtypes(&self, base: &str) -> &[String] {
        self.subtypes.get(base).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn direct_supertypes(&self, ty: &str) -> &[String] {
        self.supertypes.get(ty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Return all known (transitive) subtypes of `base`, nearest first.
    pub fn all_subtypes(&self, base: &str) -> Vec<String> {
        walk(&self.subtypes, base)
    }

    /// Return all known (transitive) supertypes of `ty`, nearest first.
    pub fn all_supertypes(&self, ty: &str) -> Vec<String> {
        walk(&self.supertypes, ty)
    }

    pub fn is_subtype(&self, ty: &str, supertype: &str) -> bool {
        ty == supertype || self.all_supertypes(ty).iter().any(|s| s == supertype)
    }
}

fn class_edges(cf: &ClassFile) -> Vec<(String, String)> {
    let this = internal_name_to_binary(&cf.this_class);
    cf.super_class
        .iter()
        .chain(cf.interfaces.iter())
        .map(|sup| (this.clone(), internal_name_to_binary(sup)))
        .collect()
}

fn walk(map: &BTreeMap<String, Vec<String>>, start: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = map.get(start).cloned().unwrap_or_default().into();

    while let Some(next) = queue.pop_front() {
        if !seen.insert(next.clone()) {
            continue;
        }
        if let Some(children) = map.get(&next) {
            queue.extend(children.iter().cloned());
        }
        out.push(next);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transitive_walks_are_breadth_first_and_deduplicated() {
        let mut index = InheritanceIndex::default();
        index.extend([
            ("b.B".to_string(), "a.A".to_string()),
            ("c.C".to_string(), "b.B".to_string()),
            ("c.C".to_string(), "a.I".to_string()),
            ("a.A".to_string(), "a.I".to_string()),
        ]);

        assert_eq!(index.all_subtypes("a.A"), vec!["b.B", "c.C"]);
        assert_eq!(index.all_subtypes("a.I"), vec!["a.A", "c.C", "b.B"]);
        assert_eq!(index.all_supertypes("c.C"), vec!["a.I", "b.B", "a.A"]);
        assert!(index.is_subtype("c.C", "a.A"));
        assert!(!index.is_subtype("a.A", "c.C"));
        assert!(index.all_subtypes("unknown").is_empty());
    }

    #[test]
    fn later_batches_merge_into_sorted_lists() {
        let mut index = InheritanceIndex::default();
        index.extend([("b.Z".to_string(), "a.A".to_string())]);
        index.extend([
            ("b.M".to_string(), "a.A".to_string()),
            ("b.Z".to_string(), "a.A".to_string()),
        ]);

        assert_eq!(index.direct_subtypes("a.A"), ["b.M", "b.Z"]);
        assert_eq!(index.direct_supertypes("b.Z"), ["a.A"]);
    }

    #[test]
    fn cycles_terminate() {
        let mut index = InheritanceIndex::default();
        index.extend([
            ("x.X".to_string(), "y.Y".to_string()),
            ("y.Y".to_string(), "x.X".to_string()),
        ]);
        assert_eq!(index.all_subtypes("x.X"), vec!["y.Y", "x.X"]);
    }
}

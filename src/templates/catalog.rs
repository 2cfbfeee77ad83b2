// Template catalog.
// Owns every record from one discovery pass and the sibling links between them.

use super::record::{TemplateId, TemplateRecord};

/// Records from one discovery pass. Siblings refer to each other by
/// [`TemplateId`], so dropping the catalog drops the whole graph.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<TemplateRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TemplateRecord) -> TemplateId {
        self.records.push(record);
        TemplateId(self.records.len() - 1)
    }

    pub fn get(&self, id: TemplateId) -> Option<&TemplateRecord> {
        self.records.get(id.0)
    }

    pub fn get_mut(&mut self, id: TemplateId) -> Option<&mut TemplateRecord> {
        self.records.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &TemplateRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| (TemplateId(index), record))
    }

    /// Register `ids` as mutual siblings.
    ///
    /// Links are symmetric and never include the record itself. Records whose
    /// repository differs from the first one are skipped.
    pub fn link_siblings(&mut self, ids: &[TemplateId]) {
        let Some(repository_id) = ids
            .first()
            .and_then(|id| self.get(*id))
            .map(|record| record.repository.id)
        else {
            return;
        };

        let group: Vec<TemplateId> = ids
            .iter()
            .copied()
            .filter(|id| match self.get(*id) {
                Some(record) if record.repository.id == repository_id => true,
                Some(record) => {
                    log::warn!(
                        "Not linking {} as a sibling: it belongs to another repository",
                        record.display_name()
                    );
                    false
                }
                None => false,
            })
            .collect();

        for &id in &group {
            let others = group.iter().copied().filter(|other| *other != id);
            self.records[id.0].siblings.extend(others);
        }
    }

    /// Records sharing a parent repository with `id`.
    pub fn siblings_of(&self, id: TemplateId) -> Vec<(TemplateId, &TemplateRecord)> {
        self.get(id)
            .map(|record| {
                record
                    .siblings()
                    .filter_map(|sibling| self.get(sibling).map(|r| (sibling, r)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Look up a template by `owner/name` and optional subdirectory.
    pub fn find(&self, full_name: &str, sub_directory: Option<&str>) -> Option<TemplateId> {
        self.iter()
            .find(|(_, record)| {
                record.repository.full_name.eq_ignore_ascii_case(full_name)
                    && record.sub_directory.as_deref() == sub_directory
            })
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::repository;

    #[test]
    fn test_link_siblings_is_symmetric_without_self() {
        let mut catalog = Catalog::new();
        let a = catalog.push(TemplateRecord::nested(repository(1, "x/y"), "a"));
        let b = catalog.push(TemplateRecord::nested(repository(1, "x/y"), "b"));
        let c = catalog.push(TemplateRecord::nested(repository(1, "x/y"), "c"));

        catalog.link_siblings(&[a, b, c]);

        let siblings_of_a: Vec<_> = catalog.get(a).unwrap().siblings().collect();
        assert_eq!(siblings_of_a, vec![b, c]);
        let siblings_of_c: Vec<_> = catalog.get(c).unwrap().siblings().collect();
        assert_eq!(siblings_of_c, vec![a, b]);
        assert_eq!(catalog.siblings_of(b).len(), 2);
    }

    #[test]
    fn test_link_siblings_skips_other_repositories() {
        let mut catalog = Catalog::new();
        let a = catalog.push(TemplateRecord::nested(repository(1, "x/y"), "a"));
        let b = catalog.push(TemplateRecord::nested(repository(1, "x/y"), "b"));
        let stranger = catalog.push(TemplateRecord::nested(repository(2, "x/z"), "a"));

        catalog.link_siblings(&[a, b, stranger]);

        assert_eq!(catalog.get(a).unwrap().siblings().collect::<Vec<_>>(), vec![b]);
        assert_eq!(catalog.get(stranger).unwrap().siblings().count(), 0);
    }

    #[test]
    fn test_find() {
        let mut catalog = Catalog::new();
        let root = catalog.push(TemplateRecord::root(repository(1, "x/root")));
        let nested = catalog.push(TemplateRecord::nested(repository(2, "x/multi"), "a"));

        assert_eq!(catalog.find("x/root", None), Some(root));
        assert_eq!(catalog.find("X/Multi", Some("a")), Some(nested));
        assert_eq!(catalog.find("x/multi", None), None);
    }
}

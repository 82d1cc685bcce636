use rosterscrape_shared::PersonRecord;

/// Insertion-ordered, append-only collection of extracted records.
#[derive(Debug, Clone, Default)]
pub struct RecordAccumulator {
    records: Vec<PersonRecord>,
}

impl RecordAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record`. Records without a name are rejected and `false` is returned.
    pub fn push(&mut self, record: PersonRecord) -> bool {
        if !record.is_valid() {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PersonRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[PersonRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PersonRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a RecordAccumulator {
    type Item = &'a PersonRecord;
    type IntoIter = std::slice::Iter<'a, PersonRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> PersonRecord {
        PersonRecord {
            name: name.into(),
            ..PersonRecord::default()
        }
    }

    #[test]
    fn keeps_insertion_order_and_duplicates() {
        let mut acc = RecordAccumulator::new();
        assert!(acc.push(named("Bob")));
        assert!(acc.push(named("Alice")));
        assert!(acc.push(named("Bob")));

        let names: Vec<&str> = acc.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Bob", "Alice", "Bob"]);
    }

    #[test]
    fn rejects_nameless_records() {
        let mut acc = RecordAccumulator::new();
        assert!(!acc.push(named("")));
        assert!(!acc.push(named("  ")));
        assert!(acc.is_empty());
        assert_eq!(acc.into_records(), Vec::<PersonRecord>::new());
    }
}

/// A slot in one of the generational tables.
///
/// `value` is `None` for the placeholder left behind by a lookup miss.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    pub(crate) value: Option<V>,
    pub(crate) access_count: u64,
}

impl<V> Entry<V> {
    pub fn new(value: V) -> Self {
        Self {
            value: Some(value),
            access_count: 0,
        }
    }

    /// Empty slot synthesized on a miss
    pub fn placeholder() -> Self {
        Self {
            value: None,
            access_count: 0,
        }
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    pub fn is_placeholder(&self) -> bool {
        self.value.is_none()
    }

    pub(crate) fn touch(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_holds_value() {
        let entry = Entry::new("subject");
        assert_eq!(entry.value(), Some(&"subject"));
        assert_eq!(entry.access_count(), 0);
        assert!(!entry.is_placeholder());
    }

    #[test]
    fn test_placeholder_is_empty() {
        let entry: Entry<String> = Entry::placeholder();
        assert!(entry.value().is_none());
        assert!(entry.is_placeholder());
    }

    #[test]
    fn test_touch_counts_accesses() {
        let mut entry = Entry::new(1);
        entry.touch();
        entry.touch();
        assert_eq!(entry.access_count(), 2);
    }
}

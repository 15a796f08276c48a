use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use crate::core::types::Record;

/// One page of a prefix search
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    pub has_more: bool,
    pub records: Vec<Record>,
    pub took_ms: u64,
}

impl SearchPage {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Wire form: `[hasMore (0|1), [{id, data}, ...]]`
impl Serialize for SearchPage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&u8::from(self.has_more))?;
        tuple.serialize_element(&self.records)?;
        tuple.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RecordId;

    #[test]
    fn serializes_as_flag_and_records() {
        let page = SearchPage {
            has_more: true,
            records: vec![Record::new(RecordId(7), "abc")],
            took_ms: 3,
        };
        let json = serde_json::to_string(&page).unwrap();
        assert_eq!(json, r#"[1,[{"id":7,"data":"abc"}]]"#);

        let empty = serde_json::to_string(&SearchPage::default()).unwrap();
        assert_eq!(empty, "[0,[]]");
    }
}

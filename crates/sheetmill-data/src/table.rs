//! Row-oriented in-memory tables.

use crate::value::Value;

/// A loaded dataset: named columns and rows of values
///
/// Every row has exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, padding or truncating rows to the column count
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Rows in table order
    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Mutable access to one column's values, top to bottom
    pub fn column_values_mut(&mut self, index: usize) -> impl Iterator<Item = &mut Value> {
        self.rows.iter_mut().filter_map(move |row| row.get_mut(index))
    }
}

/// A borrowed view of one table row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Value of the named column, `None` when the table has no such column
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.values.get(index)
    }

    /// (column, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["Name".to_string(), "Qty".to_string()],
            vec![
                vec![Value::from("Alice"), Value::Int(3)],
                vec![Value::from("Bob")],
            ],
        )
    }

    #[test]
    fn test_rows_are_padded() {
        let table = sample();
        assert_eq!(table.len(), 2);
        assert_eq!(table.row(1).unwrap().get("Qty"), Some(&Value::Empty));
    }

    #[test]
    fn test_row_lookup() {
        let table = sample();
        let row = table.row(0).unwrap();
        assert_eq!(row.get("Name"), Some(&Value::from("Alice")));
        assert_eq!(row.get("Missing"), None);

        let pairs: Vec<(&str, String)> = row.iter().map(|(k, v)| (k, v.to_string())).collect();
        assert_eq!(pairs, vec![("Name", "Alice".to_string()), ("Qty", "3".to_string())]);
    }

    #[test]
    fn test_column_values_mut() {
        let mut table = sample();
        let index = table.column_index("Name").unwrap();
        for value in table.column_values_mut(index) {
            *value = Value::from("x");
        }
        assert!(table.iter().all(|row| row.get("Name") == Some(&Value::from("x"))));
    }
}

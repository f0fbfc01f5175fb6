use crate::types::PredictionResult;
use std::fmt;

/// One labeled value in the result grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultGrid {
    pub columns: usize,
    pub cells: Vec<Cell>,
}

impl ResultGrid {
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.columns.max(1))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl fmt::Display for ResultGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .cells
            .iter()
            .map(|cell| cell.label.chars().count().max(cell.value.chars().count()))
            .max()
            .unwrap_or(0);

        for row in self.rows() {
            let labels: Vec<String> = row.iter().map(|c| format!("{:<width$}", c.label)).collect();
            let values: Vec<String> = row.iter().map(|c| format!("{:<width$}", c.value)).collect();
            writeln!(f, "{}", labels.join(" | ").trim_end())?;
            writeln!(f, "{}", values.join(" | ").trim_end())?;
        }
        Ok(())
    }
}

/// Lays out any prediction result as a grid of labeled cells.
///
/// Keys are taken in the order the result holds them; nothing about the
/// schema is assumed.
#[derive(Debug, Clone)]
pub struct ResultPresenter {
    columns: usize,
}

impl ResultPresenter {
    pub fn new() -> Self {
        Self { columns: 2 }
    }

    pub fn with_columns(columns: usize) -> Self {
        Self { columns: columns.max(1) }
    }

    pub fn render(&self, result: &PredictionResult) -> ResultGrid {
        ResultGrid {
            columns: self.columns,
            cells: result
                .iter()
                .map(|(label, value)| Cell {
                    label: label.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }
}

impl Default for ResultPresenter {
    fn default() -> Self {
        Self::new()
    }
}

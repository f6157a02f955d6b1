//! Row-major grid built from per-port series.
//!
//! Each port contributes two columns (timestamp, value). Rows are aligned by position in the
//! series, not by timestamp: row `i` holds the `i`-th newest reading of every port, so ports with
//! different sampling offsets or lengths do not line up in time. Shorter series are padded with
//! blank cells.

use crate::zentra::{FetchResult, PortSeries};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// No value at all. Distinct from `Number(0.0)`.
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn header(&self) -> &[Cell] {
        &self.rows[0]
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        &self.rows[1..]
    }

    /// Header first, then data rows.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.header().len()
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len() - 1
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TableBuilder;

impl TableBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, result: FetchResult) -> Grid {
        let ports = result.into_ports();

        let header: Vec<Cell> = ports
            .iter()
            .flat_map(|series| {
                let label = series.header();
                [Cell::Text(label.clone()), Cell::Text(label)]
            })
            .collect();

        let len = ports
            .iter()
            .map(|series| series.readings.len())
            .max()
            .unwrap_or(0);

        let mut rows = Vec::with_capacity(len + 1);
        rows.push(header);
        rows.extend((0..len).map(|idx| row_cells(&ports, idx).collect::<Vec<_>>()));

        Grid { rows }
    }
}

fn row_cells(ports: &[PortSeries], idx: usize) -> impl Iterator<Item = Cell> + '_ {
    ports
        .iter()
        .flat_map(move |series| match series.readings.get(idx) {
            Some(reading) => [
                Cell::Number(reading.timestamp as f64),
                Cell::Number(reading.value),
            ],
            None => [Cell::Blank, Cell::Blank],
        })
}

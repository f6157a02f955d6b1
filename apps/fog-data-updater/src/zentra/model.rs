use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortSeries {
    pub port_number: u32,
    pub sensor_name: String,
    /// Arrival order. ZENTRA pages newest-first, so timestamps are non-increasing.
    pub readings: Vec<Reading>,
}

impl PortSeries {
    pub fn new(port_number: u32, sensor_name: impl Into<String>) -> Self {
        Self {
            port_number,
            sensor_name: sensor_name.into(),
            readings: Vec::new(),
        }
    }

    pub fn header(&self) -> String {
        format!("Port {}: {}", self.port_number, self.sensor_name)
    }

    /// Timestamp of the last appended reading, i.e. the oldest one seen so far.
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.readings.last().map(|reading| reading.timestamp)
    }
}

/// Per-port series keyed by port number, iterated in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    ports: Vec<PortSeries>,
    index: HashMap<u32, usize>,
}

impl FetchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the series for `port_number`, creating it on first sight. The sensor name of
    /// an existing series is left as first reported.
    pub fn series_mut(&mut self, port_number: u32, sensor_name: &str) -> &mut PortSeries {
        let idx = match self.index.get(&port_number) {
            Some(&idx) => idx,
            None => {
                self.ports.push(PortSeries::new(port_number, sensor_name));
                let idx = self.ports.len() - 1;
                self.index.insert(port_number, idx);
                idx
            }
        };
        &mut self.ports[idx]
    }

    pub fn get(&self, port_number: u32) -> Option<&PortSeries> {
        self.index.get(&port_number).map(|&idx| &self.ports[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PortSeries> {
        self.ports.iter()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn reading_count(&self) -> usize {
        self.ports.iter().map(|series| series.readings.len()).sum()
    }

    /// Minimum over ports of the last appended reading. Ports that have not reported any
    /// reading yet are ignored.
    pub fn earliest_last_reading(&self) -> Option<i64> {
        self.ports
            .iter()
            .filter_map(PortSeries::oldest_timestamp)
            .min()
    }

    pub fn into_ports(self) -> Vec<PortSeries> {
        self.ports
    }
}

impl FromIterator<PortSeries> for FetchResult {
    fn from_iter<T: IntoIterator<Item = PortSeries>>(iter: T) -> Self {
        let mut result = FetchResult::new();
        for series in iter {
            result
                .series_mut(series.port_number, &series.sensor_name)
                .readings
                .extend(series.readings);
        }
        result
    }
}

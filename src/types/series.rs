//! Small aggregated value types produced from the cached frames.

use ordered_float::OrderedFloat;

/// Short month labels in calendar order, used as chart tick labels.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One value per calendar month, always 12 slots in January..December order.
///
/// A month without any contributing rows is `None` rather than being left out,
/// so charts keep a gap in its place.
///
/// # Examples
///
/// ```
/// use climazin::MonthlySeries;
///
/// let series = MonthlySeries::from_pairs(vec![(3, 21.5), (1, 25.0)]);
/// assert_eq!(series.iter().count(), 12);
/// assert_eq!(series.get(1), Some(25.0));
/// assert_eq!(series.get(2), None);
/// assert_eq!(series.get(3), Some(21.5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonthlySeries {
    values: [Option<f64>; 12],
}

impl MonthlySeries {
    /// Builds a series from `(month, value)` pairs. Months outside 1..=12 and
    /// non-finite values are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f64)>) -> Self {
        let mut values = [None; 12];
        for (month, value) in pairs {
            if (1..=12).contains(&month) && value.is_finite() {
                values[(month - 1) as usize] = Some(value);
            }
        }
        Self { values }
    }

    /// Value for a 1-based calendar month.
    pub fn get(&self, month: u32) -> Option<f64> {
        match month {
            1..=12 => self.values[(month - 1) as usize],
            _ => None,
        }
    }

    /// True when no month has data.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Iterates `(month, value)` for all 12 months in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Option<f64>)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, value)| (i as u32 + 1, *value))
    }

    /// Smallest and largest defined value, if any month has data.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let defined = self.values.iter().flatten().map(|v| OrderedFloat(*v));
        let min = defined.clone().min()?;
        let max = defined.max()?;
        Some((min.0, max.0))
    }
}

/// A horizontal wind vector in m/s, `u` eastward and `v` northward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindVector {
    pub u: f64,
    pub v: f64,
}

impl WindVector {
    pub fn speed(&self) -> f64 {
        self.u.hypot(self.v)
    }
}

/// Mean wind vector of one 60 degree direction sector at a single point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorMean {
    /// Lower bound of the sector in degrees (0, 60, ..., 300).
    pub sector: i32,
    pub mean: WindVector,
    /// Number of hourly observations that fell into the sector.
    pub hours: u32,
}

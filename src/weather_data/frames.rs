//! Typed wrappers around the cached `LazyFrame`s with the aggregations the
//! charts and samplers need.

use crate::types::series::{MonthlySeries, SectorMean, WindVector};
use crate::weather_data::error::WeatherDataError;
use polars::prelude::*;

/// Width of a wind direction sector in degrees.
pub const SECTOR_WIDTH_DEG: f64 = 60.0;

/// One year of daily records for a city or grid point.
///
/// Columns: `date`, `temp_max`, `temp_min`, `temp`, `precipitation`.
#[derive(Clone)]
pub struct DailyFrame {
    /// The underlying Polars LazyFrame containing the daily data.
    pub frame: LazyFrame,
}

impl DailyFrame {
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Mean of the daily mean temperature per calendar month.
    pub fn monthly_mean_temperature(&self) -> Result<MonthlySeries, WeatherDataError> {
        self.monthly("temp", col("temp").mean())
    }

    /// Precipitation sum per calendar month.
    ///
    /// Months where every day is null stay undefined instead of summing to 0.
    pub fn monthly_precipitation(&self) -> Result<MonthlySeries, WeatherDataError> {
        self.monthly("precipitation", col("precipitation").sum())
    }

    /// Mean daily temperature over the whole frame, `None` when no day has one.
    pub fn mean_temperature(&self) -> Result<Option<f64>, WeatherDataError> {
        let df = self
            .frame
            .clone()
            .select([col("temp").mean().alias("value")])
            .collect()?;
        let value = df.column("value")?.f64()?.get(0);
        Ok(value.filter(|v| v.is_finite()))
    }

    fn monthly(&self, column: &str, agg: Expr) -> Result<MonthlySeries, WeatherDataError> {
        let df = self
            .frame
            .clone()
            .filter(col(column).is_not_null())
            .with_column(col("date").dt().month().cast(DataType::Int64).alias("month"))
            .group_by([col("month")])
            .agg([agg.alias("value")])
            .collect()?;

        let months = df.column("month")?.i64()?;
        let values = df.column("value")?.f64()?;
        let pairs = months
            .into_iter()
            .zip(values)
            .filter_map(|(month, value)| Some((u32::try_from(month?).ok()?, value?)));
        Ok(MonthlySeries::from_pairs(pairs))
    }
}

/// One year of hourly wind records for a grid point.
///
/// Columns: `time`, `speed`, `direction`, `u`, `v`, `latitude`, `longitude`.
#[derive(Clone)]
pub struct WindFrame {
    pub frame: LazyFrame,
}

impl WindFrame {
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Mean `(u, v)` per 60 degree direction sector, keeping only sectors with
    /// at least `min_hours` observations. Sorted by sector.
    pub fn sector_means(&self, min_hours: u32) -> Result<Vec<SectorMean>, WeatherDataError> {
        let sector = ((col("direction") % lit(360.0)) / lit(SECTOR_WIDTH_DEG))
            .cast(DataType::Int64)
            * lit(SECTOR_WIDTH_DEG as i64);

        let df = self
            .frame
            .clone()
            .filter(
                col("direction")
                    .is_not_null()
                    .and(col("u").is_not_null())
                    .and(col("v").is_not_null()),
            )
            .with_column(sector.alias("sector"))
            .group_by([col("sector")])
            .agg([
                col("u").mean().alias("u"),
                col("v").mean().alias("v"),
                col("u").count().cast(DataType::Int64).alias("hours"),
            ])
            .collect()?;

        let sectors = df.column("sector")?.i64()?;
        let us = df.column("u")?.f64()?;
        let vs = df.column("v")?.f64()?;
        let hours = df.column("hours")?.i64()?;

        let mut means: Vec<SectorMean> = sectors
            .into_iter()
            .zip(us)
            .zip(vs)
            .zip(hours)
            .filter_map(|(((sector, u), v), hours)| {
                Some(SectorMean {
                    sector: i32::try_from(sector?).ok()?,
                    mean: WindVector { u: u?, v: v? },
                    hours: u32::try_from(hours?).ok()?,
                })
            })
            .filter(|s| s.hours >= min_hours)
            .collect();
        means.sort_by_key(|s| s.sector);
        Ok(means)
    }

    /// Mean vector over the sectors kept by [`WindFrame::sector_means`], or
    /// `None` when every sector was dropped.
    pub fn mean_vector(&self, min_hours: u32) -> Result<Option<WindVector>, WeatherDataError> {
        let sectors = self.sector_means(min_hours)?;
        if sectors.is_empty() {
            return Ok(None);
        }
        let n = sectors.len() as f64;
        let (u, v) = sectors
            .iter()
            .fold((0.0, 0.0), |(u, v), s| (u + s.mean.u, v + s.mean.v));
        Ok(Some(WindVector { u: u / n, v: v / n }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily(days: Vec<i32>, temp: Vec<Option<f64>>, precipitation: Vec<Option<f64>>) -> DailyFrame {
        let df = df!(
            "date" => days,
            "temp" => temp,
            "precipitation" => precipitation,
        )
        .expect("valid frame");
        DailyFrame::new(df.lazy().with_column(col("date").cast(DataType::Date)))
    }

    // 2020-01-01 is day 18262 since the epoch
    const JAN_1: i32 = 18262;
    const JAN_2: i32 = 18263;
    const MAR_1: i32 = 18322;
    const DEC_31: i32 = 18627;

    #[test]
    fn test_monthly_mean_temperature_keeps_gaps() -> Result<(), WeatherDataError> {
        let frame = daily(
            vec![JAN_1, JAN_2, MAR_1, DEC_31],
            vec![Some(20.0), Some(30.0), Some(25.0), None],
            vec![Some(1.0), Some(2.0), None, Some(3.0)],
        );
        let series = frame.monthly_mean_temperature()?;

        assert_eq!(series.iter().count(), 12);
        assert_eq!(series.get(1), Some(25.0));
        assert_eq!(series.get(2), None);
        assert_eq!(series.get(3), Some(25.0));
        // December only has a null temperature
        assert_eq!(series.get(12), None);
        Ok(())
    }

    #[test]
    fn test_monthly_precipitation_sums() -> Result<(), WeatherDataError> {
        let frame = daily(
            vec![JAN_1, JAN_2, MAR_1, DEC_31],
            vec![Some(20.0), Some(30.0), Some(25.0), None],
            vec![Some(1.0), Some(2.5), None, Some(3.0)],
        );
        let series = frame.monthly_precipitation()?;

        assert_eq!(series.get(1), Some(3.5));
        assert_eq!(series.get(3), None);
        assert_eq!(series.get(12), Some(3.0));
        Ok(())
    }

    #[test]
    fn test_empty_frame_gives_empty_series() -> Result<(), WeatherDataError> {
        let frame = daily(vec![], vec![], vec![]);
        assert!(frame.monthly_mean_temperature()?.is_empty());
        assert_eq!(frame.mean_temperature()?, None);
        Ok(())
    }

    #[test]
    fn test_mean_temperature() -> Result<(), WeatherDataError> {
        let frame = daily(
            vec![JAN_1, JAN_2, MAR_1],
            vec![Some(20.0), None, Some(26.0)],
            vec![None, None, None],
        );
        assert_eq!(frame.mean_temperature()?, Some(23.0));
        Ok(())
    }

    fn wind(directions: Vec<f64>, u: Vec<f64>, v: Vec<f64>) -> WindFrame {
        let df = df!(
            "direction" => directions,
            "u" => u,
            "v" => v,
        )
        .expect("valid frame");
        WindFrame::new(df.lazy())
    }

    #[test]
    fn test_sector_means_group_by_sixty_degrees() -> Result<(), WeatherDataError> {
        let frame = wind(
            vec![10.0, 50.0, 59.9, 60.0, 359.0],
            vec![1.0, 3.0, 2.0, 7.0, -1.0],
            vec![0.0, 0.0, 3.0, 1.0, 1.0],
        );
        let sectors = frame.sector_means(1)?;

        let keys: Vec<i32> = sectors.iter().map(|s| s.sector).collect();
        assert_eq!(keys, vec![0, 60, 300]);
        assert_eq!(sectors[0].hours, 3);
        assert!((sectors[0].mean.u - 2.0).abs() < 1e-12);
        assert!((sectors[0].mean.v - 1.0).abs() < 1e-12);
        assert_eq!(sectors[1].hours, 1);
        Ok(())
    }

    #[test]
    fn test_sparse_sectors_are_dropped() -> Result<(), WeatherDataError> {
        let frame = wind(
            vec![10.0, 20.0, 30.0, 200.0],
            vec![1.0, 1.0, 1.0, -5.0],
            vec![2.0, 2.0, 2.0, -5.0],
        );
        let sectors = frame.sector_means(3)?;
        assert_eq!(sectors.len(), 1);
        assert_eq!(sectors[0].sector, 0);

        let mean = frame.mean_vector(3)?;
        assert_eq!(mean, Some(WindVector { u: 1.0, v: 2.0 }));
        assert_eq!(frame.mean_vector(4)?, None);
        Ok(())
    }

    #[test]
    fn test_mean_vector_averages_kept_sectors() -> Result<(), WeatherDataError> {
        let frame = wind(vec![0.0, 180.0], vec![0.0, 2.0], vec![-4.0, 4.0]);
        let mean = frame.mean_vector(1)?;
        assert_eq!(mean, Some(WindVector { u: 1.0, v: 0.0 }));
        Ok(())
    }
}

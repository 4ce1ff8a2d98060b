//! Selection routing for the dashboard surface.
//!
//! A [`Selection`] picks a measure, a view, a city and a year. Some measure
//! and view pairs have no figure; they produce a static notice without
//! touching the network. Daily data is loaded once per (city, year) and
//! shared by every chart of that selection.

use crate::climazin::Climazin;
use crate::error::ClimateError;
use crate::render::chart::ChartKind;
use crate::render::Figure;
use crate::weather_data::frames::DailyFrame;
use clap::ValueEnum;
use log::{info, warn};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::RangeInclusive;
use tokio::sync::Mutex;

/// Brazilian state capitals offered by the dashboard.
pub const CITIES: [&str; 27] = [
    "Aracaju",
    "Belém",
    "Belo Horizonte",
    "Boa Vista",
    "Brasília",
    "Campo Grande",
    "Cuiabá",
    "Curitiba",
    "Florianópolis",
    "Fortaleza",
    "Goiânia",
    "João Pessoa",
    "Macapá",
    "Maceió",
    "Manaus",
    "Natal",
    "Palmas",
    "Porto Alegre",
    "Porto Velho",
    "Recife",
    "Rio Branco",
    "Rio de Janeiro",
    "Salvador",
    "São Luís",
    "São Paulo",
    "Teresina",
    "Vitória",
];

pub const YEARS: RangeInclusive<i32> = 2000..=2024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Measure {
    Temperature,
    Precipitation,
    Wind,
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Measure::Temperature => "temperature",
            Measure::Precipitation => "precipitation",
            Measure::Wind => "wind",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum View {
    Chart,
    Map,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Chart => "chart",
            View::Map => "map",
        };
        write!(f, "{}", name)
    }
}

/// A validated dashboard selection.
///
/// # Examples
///
/// ```
/// use climazin::{Measure, Selection, View};
///
/// let selection = Selection::new(Measure::Wind, View::Map, "porto alegre", 2010).unwrap();
/// assert_eq!(selection.city, "Porto Alegre");
///
/// assert!(Selection::new(Measure::Wind, View::Map, "Lisbon", 2010).is_err());
/// assert!(Selection::new(Measure::Wind, View::Map, "Recife", 1999).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub measure: Measure,
    pub view: View,
    /// Canonical spelling from [`CITIES`].
    pub city: String,
    pub year: i32,
}

impl Selection {
    /// Checks `city` against [`CITIES`] (case-insensitive) and `year` against [`YEARS`].
    pub fn new(measure: Measure, view: View, city: &str, year: i32) -> Result<Self, ClimateError> {
        let wanted = city.trim().to_lowercase();
        let city = CITIES
            .iter()
            .find(|c| c.to_lowercase() == wanted)
            .ok_or_else(|| ClimateError::InvalidSelection(format!("unknown city '{}'", city)))?;
        if !YEARS.contains(&year) {
            return Err(ClimateError::InvalidSelection(format!(
                "year {} outside {}..={}",
                year,
                YEARS.start(),
                YEARS.end()
            )));
        }
        Ok(Self {
            measure,
            view,
            city: city.to_string(),
            year,
        })
    }
}

/// The figure a measure and view pair maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    MonthlyChart(ChartKind),
    TemperatureMap,
    WindMap,
    /// No figure exists for this pair.
    Unsupported,
}

impl Route {
    pub fn of(measure: Measure, view: View) -> Self {
        match (measure, view) {
            (Measure::Temperature, View::Chart) => Route::MonthlyChart(ChartKind::Temperature),
            (Measure::Precipitation, View::Chart) => Route::MonthlyChart(ChartKind::Precipitation),
            (Measure::Temperature, View::Map) => Route::TemperatureMap,
            (Measure::Wind, View::Map) => Route::WindMap,
            (Measure::Precipitation, View::Map) | (Measure::Wind, View::Chart) => Route::Unsupported,
        }
    }
}

/// What the dashboard shows for a selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Figure(Figure),
    /// Static message for an unsupported measure and view pair.
    Notice(String),
    /// The pipeline failed; the message is meant to be shown inline.
    Error(String),
}

fn unsupported_notice(view: View) -> String {
    match view {
        View::Chart => "A chart is not available for this measure.".to_string(),
        View::Map => "A map is not available for this measure.".to_string(),
    }
}

/// Daily frames kept in memory by a [`Dashboard`] unless told otherwise.
pub const DEFAULT_MEMO_CAPACITY: usize = 32;

type FrameKey = (String, i32);

/// Loaded daily frames, evicting the oldest entry once `capacity` is reached.
struct FrameMemo {
    capacity: usize,
    frames: HashMap<FrameKey, DailyFrame>,
    order: VecDeque<FrameKey>,
}

impl FrameMemo {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            frames: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &FrameKey) -> Option<DailyFrame> {
        self.frames.get(key).cloned()
    }

    /// Stores `frame` unless the key is already present, and returns the
    /// stored frame.
    fn insert(&mut self, key: FrameKey, frame: DailyFrame) -> DailyFrame {
        if let Some(existing) = self.frames.get(&key) {
            return existing.clone();
        }
        while self.frames.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.frames.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.frames.insert(key, frame.clone());
        frame
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}

/// Serves [`Selection`]s for one [`Climazin`] client.
///
/// Daily frames behind the monthly charts are memoized per (city, year) so
/// both charts of a selection share one load. At most
/// [`DEFAULT_MEMO_CAPACITY`] frames are held, oldest first out; the parquet
/// cache on disk still serves evicted entries without a download.
pub struct Dashboard {
    client: Climazin,
    daily_frames: Mutex<FrameMemo>,
}

impl Dashboard {
    pub fn new(client: Climazin) -> Self {
        Self::with_memo_capacity(client, DEFAULT_MEMO_CAPACITY)
    }

    /// Like [`Dashboard::new`] but holds at most `capacity` daily frames
    /// (at least one).
    pub fn with_memo_capacity(client: Climazin, capacity: usize) -> Self {
        Self {
            client,
            daily_frames: Mutex::new(FrameMemo::new(capacity)),
        }
    }

    pub fn client(&self) -> &Climazin {
        &self.client
    }

    /// Produces the panel for `selection`. Never fails: pipeline errors
    /// become [`Panel::Error`].
    pub async fn render(&self, selection: &Selection) -> Panel {
        let route = Route::of(selection.measure, selection.view);
        if route == Route::Unsupported {
            info!(
                "No {} for {}, showing a notice",
                selection.view, selection.measure
            );
            return Panel::Notice(unsupported_notice(selection.view));
        }

        match self.figure(route, selection).await {
            Ok(figure) => Panel::Figure(figure),
            Err(e) => {
                warn!(
                    "Failed to render {} {} for {} ({}): {}",
                    selection.measure, selection.view, selection.city, selection.year, e
                );
                Panel::Error(e.to_string())
            }
        }
    }

    async fn figure(&self, route: Route, selection: &Selection) -> Result<Figure, ClimateError> {
        let (city, year) = (selection.city.as_str(), selection.year);
        match route {
            Route::MonthlyChart(kind) => {
                let daily = self.daily_frame(city, year).await?;
                Climazin::chart_from(kind, &daily, city, year)
            }
            Route::TemperatureMap => self.client.temperature_map().city(city).year(year).call().await,
            Route::WindMap => self.client.wind_map().city(city).year(year).call().await,
            Route::Unsupported => Err(ClimateError::InvalidSelection(format!(
                "{} {}",
                selection.measure, selection.view
            ))),
        }
    }

    /// Daily frame of (city, year), loaded at most once per dashboard.
    async fn daily_frame(&self, city: &str, year: i32) -> Result<DailyFrame, ClimateError> {
        let key = (city.to_string(), year);
        {
            let frames = self.daily_frames.lock().await;
            if let Some(frame) = frames.get(&key) {
                return Ok(frame);
            }
        }

        // Loaded outside the lock so other selections are not blocked
        let loaded = self.client.daily(city, year).await?;

        Ok(self.daily_frames.lock().await.insert(key, loaded))
    }
}

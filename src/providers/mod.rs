//! External collaborators: geocoding, weather and photo lookup.

pub mod geocoding;
pub mod photo;
pub mod weather;

pub use geocoding::VworldGeocoder;
pub use photo::{GooglePlacesPhotos, NoPhotos};
pub use weather::{latlon_to_grid, nearest_forecast_time, WeatherReport, WeatherService};

//! Common test fixtures for archive tests.
//!
//! This module provides pre-defined grids and file-naming schemes that
//! represent common archive inputs.

/// Common grid specifications for testing.
pub mod grid {
    /// 4x4 grid at 0.05 degrees anchored at (-20, 40).
    pub const SMALL_4X4: GridSpec = GridSpec {
        width: 4,
        height: 4,
        origin_x: -20.0,
        origin_y: 40.0,
        pixel_width: 0.05,
        pixel_height: -0.05,
    };

    /// Non-square grid so that lat/lon mixups show up as shape errors.
    pub const RECT_5X3: GridSpec = GridSpec {
        width: 5,
        height: 3,
        origin_x: 10.0,
        origin_y: -5.0,
        pixel_width: 0.25,
        pixel_height: -0.25,
    };

    /// Larger than one default chunk in both spatial directions.
    pub const MULTI_CHUNK_40X20: GridSpec = GridSpec {
        width: 40,
        height: 20,
        origin_x: 30.0,
        origin_y: 15.0,
        pixel_width: 0.05,
        pixel_height: -0.05,
    };

    /// North-up grid specification for testing.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct GridSpec {
        pub width: usize,
        pub height: usize,
        /// Longitude of the top-left corner.
        pub origin_x: f64,
        /// Latitude of the top-left corner.
        pub origin_y: f64,
        pub pixel_width: f64,
        /// Negative for north-up grids.
        pub pixel_height: f64,
    }

    impl GridSpec {
        /// Returns the total number of grid cells.
        pub fn size(&self) -> usize {
            self.width * self.height
        }

        /// Expected longitude of column `col`.
        pub fn lon(&self, col: usize) -> f64 {
            self.origin_x + col as f64 * self.pixel_width
        }

        /// Expected latitude of row `row`.
        pub fn lat(&self, row: usize) -> f64 {
            self.origin_y + row as f64 * self.pixel_height
        }
    }
}

/// File-naming schemes carrying a monthly date token.
pub mod names {
    /// CHIRPS monthly name, e.g. `rbb_cli_chirps-v2.0.1981.01.tif`.
    pub fn chirps_monthly(year: i32, month: u32) -> String {
        format!("rbb_cli_chirps-v2.0.{:04}.{:02}.tif", year, month)
    }

    /// Underscore-separated name, e.g. `x_2020_01.tif`.
    pub fn underscore_monthly(year: i32, month: u32) -> String {
        format!("x_{:04}_{:02}.tif", year, month)
    }
}

/// Common time values for testing.
pub mod time {
    /// Time units attribute for the default epoch.
    pub const TIME_UNITS: &str = "days since 1980-01-01 00:00:00";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spec_coordinates() {
        assert_eq!(grid::SMALL_4X4.size(), 16);
        assert_eq!(grid::SMALL_4X4.lon(0), -20.0);
        assert!((grid::SMALL_4X4.lon(3) - (-19.85)).abs() < 1e-9);
        assert!((grid::SMALL_4X4.lat(3) - 39.85).abs() < 1e-9);
    }

    #[test]
    fn test_names() {
        assert_eq!(
            names::chirps_monthly(1981, 1),
            "rbb_cli_chirps-v2.0.1981.01.tif"
        );
        assert_eq!(names::underscore_monthly(2020, 12), "x_2020_12.tif");
    }
}

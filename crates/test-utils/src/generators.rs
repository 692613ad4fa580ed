//! Test data generators for synthetic climate grids.
//!
//! Values stay well inside what the default quantization (scale 0.01,
//! `int16` storage) can represent, so every generated grid archives cleanly
//! unless a test deliberately injects something else.

/// Creates a grid whose values encode their own position.
///
/// Each cell holds `row + col / 100`, so with the default scale factor of
/// 0.01 the stored code is `row * 100 + col`.
///
/// # Example
///
/// ```
/// use test_utils::create_index_grid;
///
/// let grid = create_index_grid(4, 3);
/// assert_eq!(grid.len(), 12);
/// assert_eq!(grid[0], 0.0);   // row 0, col 0
/// assert_eq!(grid[4], 1.0);   // row 1, col 0
/// ```
pub fn create_index_grid(width: usize, height: usize) -> Vec<f32> {
    assert!(width <= 100, "index grids encode columns in two digits");
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(row as f32 + col as f32 / 100.0);
        }
    }
    data
}

/// Expected stored code of [`create_index_grid`] at `(row, col)`.
pub fn index_grid_code(row: usize, col: usize) -> i16 {
    (row * 100 + col) as i16
}

/// Creates a standardized precipitation index grid for a given month.
///
/// Values follow a smooth wave in `[-3, 3]` that shifts with `month`, so
/// consecutive slices differ everywhere.
pub fn create_spi_grid(width: usize, height: usize, month: u32) -> Vec<f32> {
    let phase = month as f32 * 0.5;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x = col as f32 / width.max(1) as f32 * std::f32::consts::TAU;
            let y = row as f32 / height.max(1) as f32 * std::f32::consts::PI;
            data.push(3.0 * (x + phase).sin() * y.cos());
        }
    }
    data
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Replaces the cells at `positions` (as `(col, row)`) with `marker`.
///
/// Pass the declared nodata value, or `f32::NAN`, to punch holes into a
/// generated grid.
pub fn with_missing(
    mut data: Vec<f32>,
    width: usize,
    marker: f32,
    positions: &[(usize, usize)],
) -> Vec<f32> {
    for &(col, row) in positions {
        if col < width {
            if let Some(cell) = data.get_mut(row * width + col) {
                *cell = marker;
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_index_grid() {
        let grid = create_index_grid(10, 5);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], 0.0);
        assert!((grid[1] - 0.01).abs() < 1e-6);
        assert_eq!(grid[10], 1.0);
        assert_eq!(index_grid_code(1, 1), 101);
    }

    #[test]
    fn test_create_spi_grid_range() {
        let grid = create_spi_grid(16, 8, 3);
        assert_eq!(grid.len(), 128);
        assert!(grid.iter().all(|v| (-3.0..=3.0).contains(v)));
        assert_ne!(grid, create_spi_grid(16, 8, 4));
    }

    #[test]
    fn test_with_missing() {
        let grid = with_missing(create_constant_grid(10, 10, 1.0), 10, f32::NAN, &[(5, 5), (0, 0)]);
        assert!(grid[0].is_nan());
        assert!(grid[55].is_nan());
        assert_eq!(grid[1], 1.0);

        let grid = with_missing(create_constant_grid(2, 2, 1.0), 2, -9999.0, &[(3, 0), (0, 9)]);
        assert!(grid.iter().all(|&v| v == 1.0));
    }
}

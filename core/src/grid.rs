#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridChoice {
    pub target_count: u32,
    pub cols: u32,
    pub rows: u32,
    pub actual_count: u32,
}

impl GridChoice {
    pub fn total(&self) -> usize {
        (self.cols as usize) * (self.rows as usize)
    }
}

pub const TARGET_PIECE_COUNTS: [u32; 9] = [24, 48, 100, 150, 300, 500, 750, 1000, 1500];
pub const DEFAULT_TARGET_COUNT: u32 = 100;
pub const GRID_DIM_MIN: u32 = 2;

pub const FALLBACK_GRID: GridChoice = GridChoice {
    target_count: 100,
    cols: 10,
    rows: 10,
    actual_count: 100,
};

pub fn grid_choice_label(choice: &GridChoice) -> String {
    if choice.actual_count == choice.target_count {
        format!(
            "{} pieces ({}x{})",
            choice.target_count, choice.cols, choice.rows
        )
    } else {
        format!(
            "{} pieces ({}x{}, actual {})",
            choice.target_count, choice.cols, choice.rows, choice.actual_count
        )
    }
}

/// Picks a column/row split whose cells roughly follow the image aspect.
///
/// The product may miss `target` by a few pieces; callers accept the
/// actual count rather than correcting it.
pub fn grid_for_count(width: u32, height: u32, target: u32) -> Option<GridChoice> {
    if target == 0 || width == 0 || height == 0 {
        return None;
    }
    let aspect = width as f32 / height as f32;
    let cols = ((target as f32 * aspect).sqrt().round() as u32).max(GRID_DIM_MIN);
    let rows = ((cols as f32 / aspect).round() as u32).max(GRID_DIM_MIN);
    let actual_count = cols.checked_mul(rows)?;
    Some(GridChoice {
        target_count: target,
        cols,
        rows,
        actual_count,
    })
}

pub fn build_grid_choices(width: u32, height: u32) -> Vec<GridChoice> {
    TARGET_PIECE_COUNTS
        .iter()
        .filter_map(|target| grid_for_count(width, height, *target))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_hundred_is_twelve_by_eight() {
        let choice = grid_for_count(1200, 800, 100).expect("grid");
        assert_eq!((choice.cols, choice.rows), (12, 8));
        assert_eq!(choice.actual_count, 96);
    }

    #[test]
    fn tiny_targets_are_floored() {
        let choice = grid_for_count(400, 400, 1).expect("grid");
        assert_eq!((choice.cols, choice.rows), (2, 2));
    }

    #[test]
    fn degenerate_inputs_have_no_grid() {
        assert!(grid_for_count(0, 100, 50).is_none());
        assert!(grid_for_count(100, 100, 0).is_none());
    }

    #[test]
    fn overflowing_targets_have_no_grid() {
        assert!(grid_for_count(1000, 1000, u32::MAX).is_none());
        assert!(grid_for_count(u32::MAX, 1, u32::MAX).is_none());
    }

    #[test]
    fn label_mentions_actual_count_when_it_differs() {
        let choice = grid_for_count(1200, 800, 100).expect("grid");
        assert_eq!(grid_choice_label(&choice), "100 pieces (12x8, actual 96)");
    }
}

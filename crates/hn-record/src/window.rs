//! Index windows over element dimensions.
//!
//! Windows are 1-based and inclusive. Values are stored column-major (first
//! index fastest) and exchanged with callers row-major (last index fastest).

/// `start..=end` in steps of `step`, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl Window {
    pub fn new(start: usize, end: usize, step: usize) -> Self {
        Self { start, end, step }
    }

    pub fn range(start: usize, end: usize) -> Self {
        Self::new(start, end, 1)
    }

    pub fn single(index: usize) -> Self {
        Self::new(index, index, 1)
    }

    /// The whole extent of a dimension.
    pub fn all(extent: usize) -> Self {
        Self::new(1, extent, 1)
    }

    pub fn count(&self) -> usize {
        if self.step == 0 || self.end < self.start {
            0
        } else {
            (self.end - self.start) / self.step + 1
        }
    }

    /// Selected 1-based indices.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.count()).map(move |i| self.start + i * self.step)
    }

    pub fn check(&self, extent: usize) -> Result<(), String> {
        if self.step == 0 {
            return Err("window step must be at least 1".into());
        }
        if self.start == 0 || self.start > self.end || self.end > extent {
            return Err(format!(
                "window {}..={} is outside 1..={extent}",
                self.start, self.end
            ));
        }
        Ok(())
    }
}

/// Column-major strides of `dims`.
pub fn strides(dims: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(dims.len());
    let mut stride = 1;
    for d in dims {
        out.push(stride);
        stride *= d;
    }
    out
}

/// Storage offsets (0-based, column-major) of every value `windows` selects,
/// listed in row-major order.
///
/// A step other than 1 is accepted only for one-dimensional elements.
pub fn storage_offsets(dims: &[usize], windows: &[Window]) -> Result<Vec<usize>, String> {
    if windows.len() != dims.len() {
        return Err(format!(
            "{} windows given for a {}-dimensional element",
            windows.len(),
            dims.len()
        ));
    }
    if dims.len() > 1 && windows.iter().any(|w| w.step != 1) {
        return Err("a step other than 1 is only supported in one dimension".into());
    }
    for (w, &extent) in windows.iter().zip(dims) {
        w.check(extent)?;
    }

    let strides = strides(dims);
    let counts: Vec<usize> = windows.iter().map(Window::count).collect();
    let total: usize = counts.iter().product();
    let mut pos = vec![0usize; dims.len()];
    let mut out = Vec::with_capacity(total);
    for _ in 0..total {
        let offset = windows
            .iter()
            .zip(&pos)
            .zip(&strides)
            .map(|((w, p), s)| (w.start - 1 + p * w.step) * s)
            .sum();
        out.push(offset);
        for k in (0..pos.len()).rev() {
            pos[k] += 1;
            if pos[k] < counts[k] {
                break;
            }
            pos[k] = 0;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_indices() {
        let w = Window::new(2, 9, 3);
        assert_eq!(w.count(), 3);
        assert_eq!(w.indices().collect::<Vec<_>>(), vec![2, 5, 8]);
        assert_eq!(Window::single(4).count(), 1);
    }

    #[test]
    fn scalar_has_one_offset() {
        assert_eq!(storage_offsets(&[], &[]).unwrap(), vec![0]);
    }

    #[test]
    fn matrix_offsets_are_row_major_over_column_major_storage() {
        // 2 rows x 3 columns
        let offsets = storage_offsets(&[2, 3], &[Window::all(2), Window::all(3)]).unwrap();
        assert_eq!(offsets, vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn sub_window() {
        let offsets = storage_offsets(&[3, 3], &[Window::range(2, 3), Window::single(3)]).unwrap();
        assert_eq!(offsets, vec![7, 8]);
    }

    #[test]
    fn step_only_in_one_dimension() {
        assert_eq!(
            storage_offsets(&[6], &[Window::new(1, 6, 2)]).unwrap(),
            vec![0, 2, 4]
        );
        assert!(storage_offsets(&[6, 2], &[Window::new(1, 6, 2), Window::all(2)]).is_err());
    }

    #[test]
    fn out_of_range_windows_fail() {
        assert!(storage_offsets(&[4], &[Window::range(0, 2)]).is_err());
        assert!(storage_offsets(&[4], &[Window::range(3, 5)]).is_err());
        assert!(storage_offsets(&[4], &[Window::range(3, 2)]).is_err());
        assert!(storage_offsets(&[4], &[Window::new(1, 4, 0)]).is_err());
        assert!(storage_offsets(&[4], &[]).is_err());
    }
}

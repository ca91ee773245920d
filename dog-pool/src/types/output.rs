use crate::PoolError;

/// Everything a completed run produced.
///
/// `results` and `errors` are in completion order, not input order.
#[derive(Debug)]
pub struct PoolOutput<T, R, E> {
    pub results: Vec<R>,
    pub errors: Vec<PoolError<T, E>>,
    result_indices: Vec<usize>,
    total: usize,
}

impl<T, R, E> PoolOutput<T, R, E> {
    pub(crate) fn with_capacity(total: usize) -> Self {
        Self {
            results: Vec::with_capacity(total),
            errors: Vec::new(),
            result_indices: Vec::with_capacity(total),
            total,
        }
    }

    pub(crate) fn push_result(&mut self, index: usize, value: R) {
        self.results.push(value);
        self.result_indices.push(index);
    }

    pub(crate) fn push_error(&mut self, error: PoolError<T, E>) {
        self.errors.push(error);
    }

    /// Input index of each entry in `results`, position for position
    pub fn result_indices(&self) -> &[usize] {
        &self.result_indices
    }

    /// Number of items the run was started with
    pub fn total(&self) -> usize {
        self.total
    }

    /// True when no item ended up in `errors`
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Reorder results by input position. Items that failed (or whose
    /// failure went to an error handler) are `None`.
    pub fn corresponding_results(self) -> Vec<Option<R>> {
        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(self.total).collect();
        for (index, value) in self.result_indices.into_iter().zip(self.results) {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(value);
            }
        }
        slots
    }

    pub fn into_parts(self) -> (Vec<R>, Vec<PoolError<T, E>>) {
        (self.results, self.errors)
    }
}
